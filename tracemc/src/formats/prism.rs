//! Textual output layouts for probabilistic model checkers.
//!
//! The `.tra`/`.lab`/`.trew` layouts follow the explicit-state import format of
//! PRISM [^1]; the remaining writers produce the intermediate dumps and the state
//! viewer rendering of the translator. Every writer takes its sink as an explicit
//! [`io::Write`] parameter, so callers decide whether a table lands in a file or
//! on stdout.
//!
//! [^1]: [M. Kwiatkowska, G. Norman, and D. Parker.
//! "PRISM 4.0: Verification of probabilistic real-time systems."
//! International Conference on Computer Aided Verification (CAV'11).
//! Springer, 2011.](https://doi.org/10.1007/978-3-642-22110-1_47)

use std::collections::BTreeMap;
use std::io::{self, Write};

use itertools::Itertools;

use crate::collapse::Collapsed;
use crate::generate::{CtmcTransition, DtmcTransition, MdpModel, MdpTransition};
use crate::{Label, State, StateId, Transition};

use super::round_sig;

/// Writes the normalized transition system: the announced counts, the transitions
/// deduplicated with their multiplicities, and the state contents.
pub fn write_normalized(
    w: &mut impl Write,
    n: usize,
    t: usize,
    transitions: &[Transition],
    states: &[State],
) -> io::Result<()> {
    writeln!(w, "{n} {t}")?;
    // Transitions arrive sorted, so equal pairs are consecutive.
    for (count, (src, dest)) in transitions.iter().dedup_with_count() {
        writeln!(w, "{src} {dest} {count}")?;
    }
    for (id, content) in states {
        writeln!(w, "{id} {{{}}}", content.trim())?;
    }
    Ok(())
}

/// Writes the collapsed transition system with its per-edge rule metadata.
pub fn write_collapsed(w: &mut impl Write, collapsed: &Collapsed) -> io::Result<()> {
    writeln!(w, "nodes transitions")?;
    writeln!(w, "{} {}", collapsed.node_count, collapsed.edge_count)?;

    writeln!(w, "\nsrc dest count rule_name action weight rate reward")?;
    for edge in &collapsed.edges {
        writeln!(
            w,
            "{} {} {} {} {} {} {} {}",
            edge.src,
            edge.dest,
            edge.count,
            edge.meta.rule_name,
            edge.meta.action,
            round_sig(edge.meta.weight),
            round_sig(edge.meta.rate),
            round_sig(edge.meta.reward),
        )?;
    }

    writeln!(w, "\nstate_id state_content")?;
    for (id, content) in &collapsed.states {
        writeln!(w, "{id} {{{content}}}")?;
    }

    writeln!(w, "\nstate_id label")?;
    for (id, label) in &collapsed.labels {
        writeln!(w, "{id} {label}")?;
    }
    Ok(())
}

/// Writes a DTMC `.tra` table.
pub fn write_dtmc(
    w: &mut impl Write,
    n: usize,
    t: usize,
    transitions: &[DtmcTransition],
) -> io::Result<()> {
    writeln!(w, "{n} {t}")?;
    for &(from, to, probability) in transitions {
        writeln!(w, "{from} {to} {}", round_sig(probability))?;
    }
    Ok(())
}

/// Writes an MDP `.tra` table; the header carries the total choice count between
/// the node and transition counts.
pub fn write_mdp(w: &mut impl Write, n: usize, t: usize, model: &MdpModel) -> io::Result<()> {
    writeln!(w, "{n} {} {t}", model.choice_count)?;
    for (from, choice, to, probability, _) in &model.transitions {
        writeln!(w, "{from} {choice} {to} {}", round_sig(*probability))?;
    }
    Ok(())
}

/// Writes a CTMC `.tra` table of absolute rates.
pub fn write_ctmc(
    w: &mut impl Write,
    n: usize,
    t: usize,
    transitions: &[CtmcTransition],
) -> io::Result<()> {
    writeln!(w, "{n} {t}")?;
    for &(from, to, rate) in transitions {
        writeln!(w, "{from} {to} {}", round_sig(rate))?;
    }
    Ok(())
}

/// Writes a `.lab` file: the label table followed by the state-to-label map.
///
/// State 0 always carries the reserved label `"init"` (label id 0), regardless of
/// what the trace declares.
pub fn write_labels(w: &mut impl Write, labels: &[Label]) -> io::Result<()> {
    let mut table: Vec<&str> = vec!["init"];
    let mut by_state: BTreeMap<StateId, Vec<usize>> = BTreeMap::new();
    by_state.insert(0, vec![0]);

    for (state, label) in labels {
        let id = match table.iter().position(|known| known == label) {
            Some(id) => id,
            None => {
                table.push(label);
                table.len() - 1
            }
        };
        by_state.entry(*state).or_default().push(id);
    }

    let header = table
        .iter()
        .enumerate()
        .map(|(id, label)| format!("{id}=\"{label}\""))
        .join(" ");
    writeln!(w, "{header}")?;

    for (state, ids) in &by_state {
        writeln!(w, "{state}: {}", ids.iter().join(" "))?;
    }
    Ok(())
}

/// Writes a `.trew` transition-reward file; edges without a reward are skipped.
pub fn write_rewards(w: &mut impl Write, t: usize, collapsed: &Collapsed) -> io::Result<()> {
    let rows: Vec<String> = collapsed
        .edges
        .iter()
        .filter(|edge| edge.meta.reward != 0.0)
        .map(|edge| format!("{} {} {}", edge.src, edge.dest, round_sig(edge.meta.reward)))
        .collect();
    writeln!(w, "{t} {}", rows.len())?;
    for row in rows {
        writeln!(w, "{row}")?;
    }
    Ok(())
}

/// Writes the state viewer rendering of a DTMC: one line per collapsed edge with
/// its rule name and probability, followed by the states with their labels.
pub fn write_dtmc_viewer(
    w: &mut impl Write,
    collapsed: &Collapsed,
    transitions: &[DtmcTransition],
) -> io::Result<()> {
    writeln!(w, "{} {}", collapsed.node_count, collapsed.edge_count)?;

    let probabilities: BTreeMap<(StateId, StateId), f64> = transitions
        .iter()
        .map(|&(from, to, probability)| ((from, to), probability))
        .collect();
    for edge in &collapsed.edges {
        let probability = probabilities.get(&(edge.src, edge.dest)).copied().unwrap_or(0.0);
        writeln!(
            w,
            "{} {} {} {}",
            edge.src,
            edge.dest,
            edge.meta.rule_name,
            round_sig(probability)
        )?;
    }
    write_states_with_labels(w, &collapsed.states, &collapsed.labels)
}

/// Writes the state viewer rendering of an MDP, with `action,probability` pairs.
pub fn write_mdp_viewer(w: &mut impl Write, collapsed: &Collapsed, model: &MdpModel) -> io::Result<()> {
    writeln!(w, "{} {}", collapsed.node_count, collapsed.edge_count)?;

    let probabilities: BTreeMap<(StateId, &str, StateId), f64> = model
        .transitions
        .iter()
        .map(|(from, _, to, probability, action): &MdpTransition| {
            ((*from, action.as_str(), *to), *probability)
        })
        .collect();
    for edge in &collapsed.edges {
        let key = (edge.src, edge.meta.action.as_str(), edge.dest);
        let probability = probabilities.get(&key).copied().unwrap_or(0.0);
        writeln!(
            w,
            "{} {} {} {},{}",
            edge.src,
            edge.dest,
            edge.meta.rule_name,
            edge.meta.action,
            round_sig(probability)
        )?;
    }
    write_states_with_labels(w, &collapsed.states, &collapsed.labels)
}

/// Writes the state viewer rendering of a CTMC, with absolute rates.
pub fn write_ctmc_viewer(
    w: &mut impl Write,
    collapsed: &Collapsed,
    transitions: &[CtmcTransition],
) -> io::Result<()> {
    writeln!(w, "{} {}", collapsed.node_count, collapsed.edge_count)?;

    let rates: BTreeMap<(StateId, StateId), f64> = transitions
        .iter()
        .map(|&(from, to, rate)| ((from, to), rate))
        .collect();
    for edge in &collapsed.edges {
        let rate = rates.get(&(edge.src, edge.dest)).copied().unwrap_or(1.0);
        writeln!(
            w,
            "{} {} {} {}",
            edge.src,
            edge.dest,
            edge.meta.rule_name,
            round_sig(rate)
        )?;
    }
    write_states_with_labels(w, &collapsed.states, &collapsed.labels)
}

fn write_states_with_labels(
    w: &mut impl Write,
    states: &[State],
    labels: &[Label],
) -> io::Result<()> {
    let mut by_state: BTreeMap<StateId, Vec<&str>> = BTreeMap::new();
    for (state, label) in labels {
        by_state.entry(*state).or_default().push(label);
    }
    for (id, content) in states {
        match by_state.get(id) {
            Some(names) => writeln!(w, "{id} {{{content}}} {}", names.iter().join(","))?,
            None => writeln!(w, "{id} {{{content}}}")?,
        }
    }
    Ok(())
}
