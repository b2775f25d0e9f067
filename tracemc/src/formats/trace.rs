//! Extraction of raw tuples from a meta-interpreter execution dump.
//!
//! The dump announces its state count as `n(<count>)` and its transition count as
//! `t(<count>)`, names the initial state inside the `ret(ss(<id>,<state_map>` marker
//! and lists transitions as `[src|dest]` pairs inside `transitions([..])`. State
//! records appear as `state(<id>,{<content>})` and labels as `label(<id>,"<text>")`,
//! anywhere in the dump.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::TraceError;

static COUNT_N_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"n\((\d+)\)").unwrap());
static COUNT_T_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"t\((\d+)\)").unwrap());
static INITIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ret\(ss\((\d+),<state_map>").unwrap());
static TRANSITIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)transitions\(\[(.*?)\]\)").unwrap());
static TRANSITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\|(\d+)\]").unwrap());
static STATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)state\((\d+),\{(.*?)\}\)").unwrap());
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"label\((\d+),"([^"]+)"\)"#).unwrap());

/// Raw tuples of one trace, before any renumbering.
///
/// Identifiers are carried as the opaque strings found in the dump; nothing about
/// their value or order is meaningful.
#[derive(Clone, Debug)]
pub struct RawTrace {
    /// State count announced by the trace header.
    pub state_count: usize,
    /// Transition count announced by the trace header.
    pub transition_count: usize,
    pub initial: String,
    pub transitions: Vec<(String, String)>,
    pub states: Vec<(String, String)>,
    pub labels: Vec<(String, String)>,
}

/// Parses a trace dump into its raw tuples.
///
/// The counts, the initial state marker and the transition list are required;
/// missing states or labels are not an error here (their absence surfaces later as
/// unreachable or tag-less entries).
pub fn parse(input: &str) -> Result<RawTrace, TraceError> {
    let state_count = COUNT_N_RE
        .captures(input)
        .ok_or(TraceError::MissingCounts)?[1]
        .parse()
        .map_err(|_| TraceError::MissingCounts)?;
    let transition_count = COUNT_T_RE
        .captures(input)
        .ok_or(TraceError::MissingCounts)?[1]
        .parse()
        .map_err(|_| TraceError::MissingCounts)?;

    let initial = INITIAL_RE
        .captures(input)
        .ok_or(TraceError::MissingInitialState)?[1]
        .to_owned();

    let list = TRANSITIONS_RE
        .captures(input)
        .ok_or(TraceError::MissingTransitions)?
        .get(1)
        .ok_or(TraceError::MissingTransitions)?
        .as_str()
        .to_owned();
    let transitions = TRANSITION_RE
        .captures_iter(&list)
        .map(|capture| (capture[1].to_owned(), capture[2].to_owned()))
        .collect();

    let states = STATE_RE
        .captures_iter(input)
        .map(|capture| (capture[1].to_owned(), capture[2].to_owned()))
        .collect();
    let labels = LABEL_RE
        .captures_iter(input)
        .map(|capture| (capture[1].to_owned(), capture[2].to_owned()))
        .collect();

    debug!("Trace announces {state_count} states and {transition_count} transitions.");
    Ok(RawTrace {
        state_count,
        transition_count,
        initial,
        transitions,
        states,
        labels,
    })
}
