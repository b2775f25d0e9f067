//! Translation of rule-based meta-interpreter traces into the input formats of
//! probabilistic model checkers.
//!
//! A trace is a textual dump of states, labels and the transitions a rule-firing
//! process induced between them. The pipeline runs in three stages:
//!
//! 1. [`normalize`](normalize::normalize) renumbers the opaque state identifiers of
//!    the trace into a dense, BFS-ordered integer space rooted at the initial state.
//! 2. [`collapse`](collapse::collapse) contracts the synthetic rule-application layer:
//!    every two-hop path through a rule state becomes a single edge annotated with the
//!    metadata embedded in the rule state's content.
//! 3. [`generate`](generate) derives normalized transition probabilities (DTMC, MDP)
//!    or rates (CTMC) from the collapsed weighted multigraph.
//!
//! Each stage is a pure function of its complete input; repeated runs on the same
//! trace are byte-identical at the output boundary.

pub mod collapse;
pub mod formats;
pub mod generate;
pub mod normalize;

use std::collections::BTreeMap;

/// A dense state identifier assigned by BFS discovery order.
///
/// The initial state is always `0`; a model with `n` reachable states uses exactly
/// the identifiers `0..n`.
pub type StateId = usize;

/// A transition between two normalized states. May repeat; multiplicity is
/// meaningful and is only counted during collapsing.
pub type Transition = (StateId, StateId);

/// A normalized state together with its raw content string. The content is never
/// interpreted during normalization, only carried.
pub type State = (StateId, String);

/// A label attached to a normalized state. Zero or more per state; state `0`
/// implicitly also carries the reserved label `"init"`.
pub type Label = (StateId, String);

/// Sentinel for rule names and actions that a rule state does not declare.
pub const UNKNOWN: &str = "UNKNOWN";

/// Metadata of a rule application, extracted from a rule state's content.
///
/// Every field is optional in the trace; absent fields resolve to the documented
/// defaults rather than to a missing value.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleMeta {
    pub rule_name: String,
    pub action: String,
    pub weight: f64,
    pub rate: f64,
    pub reward: f64,
}

impl Default for RuleMeta {
    fn default() -> Self {
        Self {
            rule_name: UNKNOWN.to_owned(),
            action: UNKNOWN.to_owned(),
            weight: 1.0,
            rate: 1.0,
            reward: 0.0,
        }
    }
}

/// A contracted edge between two real states.
///
/// `count` is the number of distinct two-hop paths between `src` and `dest` that
/// carried exactly this metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct CollapsedEdge {
    pub src: StateId,
    pub dest: StateId,
    pub count: usize,
    pub meta: RuleMeta,
}

/// One outgoing edge in the generator's working view of the collapsed graph.
#[derive(Clone, Debug, PartialEq)]
pub struct AdjacencyItem {
    pub dest: StateId,
    pub count: usize,
    pub action: String,
    pub weight: f64,
    pub rate: f64,
}

/// Collapsed edges grouped by source state.
///
/// A `BTreeMap` keyed by source keeps the grouping deterministic; within a source
/// the edges keep the collapser's (dest, metadata) order, which is what makes MDP
/// choice-id assignment reproducible.
pub type AdjacencyList = BTreeMap<StateId, Vec<AdjacencyItem>>;
