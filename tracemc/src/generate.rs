//! Derivation of DTMC, MDP and CTMC transition tables from the collapsed graph.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::{AdjacencyItem, AdjacencyList, CollapsedEdge, StateId};

/// A DTMC entry `(from, to, probability)`.
pub type DtmcTransition = (StateId, StateId, f64);
/// An MDP entry `(from, choice, to, probability, action)`.
pub type MdpTransition = (StateId, usize, StateId, f64, String);
/// A CTMC entry `(from, to, rate)`.
pub type CtmcTransition = (StateId, StateId, f64);

/// Errors raised while deriving probabilities.
///
/// A degenerate distribution would otherwise silently turn into NaN or infinity,
/// so the offending state is reported instead of dividing.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("state {state} has zero total outgoing weight")]
    DegenerateDistribution { state: StateId },
    #[error("state {state} has zero total outgoing weight for action `{action}`")]
    DegenerateChoice { state: StateId, action: String },
}

/// Groups collapsed edges by source state.
///
/// The `BTreeMap` orders the sources; within a source the edges keep the
/// collapser's `(dest, metadata)` order, which later fixes the MDP choice ids.
pub fn adjacency_list(edges: &[CollapsedEdge]) -> AdjacencyList {
    let mut adjacency: AdjacencyList = BTreeMap::new();
    for edge in edges {
        adjacency.entry(edge.src).or_default().push(AdjacencyItem {
            dest: edge.dest,
            count: edge.count,
            action: edge.meta.action.clone(),
            weight: edge.meta.weight,
            rate: edge.meta.rate,
        });
    }
    adjacency
}

/// Computes DTMC transition probabilities.
///
/// Per source state the outgoing probability mass is `weight * count` normalized
/// over the state's total; the result is sorted ascending by `(from, to)`.
pub fn generate_dtmc(adjacency: &AdjacencyList) -> Result<Vec<DtmcTransition>, GenerateError> {
    let mut transitions = Vec::new();
    for (&from, items) in adjacency {
        let total: f64 = items.iter().map(|item| item.weight * item.count as f64).sum();
        if total == 0.0 {
            return Err(GenerateError::DegenerateDistribution { state: from });
        }
        for item in items {
            let probability = (item.weight * item.count as f64) / total;
            transitions.push((from, item.dest, probability));
        }
    }
    transitions.sort_by_key(|&(from, to, _)| (from, to));
    Ok(transitions)
}

/// An MDP transition table together with its total number of choices.
#[derive(Clone, Debug)]
pub struct MdpModel {
    pub transitions: Vec<MdpTransition>,
    /// Distinct action partitions summed over all sources, not deduplicated
    /// globally.
    pub choice_count: usize,
}

/// Computes MDP transition probabilities.
///
/// Outgoing edges of a source are partitioned into choices by their action, choice
/// ids assigned in first-seen order starting at 0; probabilities are normalized
/// within each choice.
pub fn generate_mdp(adjacency: &AdjacencyList) -> Result<MdpModel, GenerateError> {
    let mut transitions = Vec::new();
    let mut choice_count = 0;
    for (&from, items) in adjacency {
        // First-seen action order assigns the choice ids.
        let mut actions: Vec<&str> = Vec::new();
        for item in items {
            if !actions.contains(&item.action.as_str()) {
                actions.push(&item.action);
            }
        }
        choice_count += actions.len();

        for (choice, &action) in actions.iter().enumerate() {
            let in_choice = || items.iter().filter(move |item| item.action == action);
            let total: f64 = in_choice().map(|item| item.weight * item.count as f64).sum();
            if total == 0.0 {
                return Err(GenerateError::DegenerateChoice {
                    state: from,
                    action: action.to_owned(),
                });
            }
            for item in in_choice() {
                let probability = (item.weight * item.count as f64) / total;
                transitions.push((from, choice, item.dest, probability, action.to_owned()));
            }
        }
    }
    transitions.sort_by(|x, y| (x.0, x.1, x.2).cmp(&(y.0, y.1, y.2)));
    Ok(MdpModel {
        transitions,
        choice_count,
    })
}

/// Computes CTMC transition rates.
///
/// Rates are absolute, `rate * count` per edge; there is no normalization across a
/// source's outgoing edges.
pub fn generate_ctmc(adjacency: &AdjacencyList) -> Vec<CtmcTransition> {
    let mut transitions: Vec<CtmcTransition> = adjacency
        .iter()
        .flat_map(|(&from, items)| {
            items
                .iter()
                .map(move |item| (from, item.dest, item.rate * item.count as f64))
        })
        .collect();
    transitions.sort_by_key(|&(from, to, _)| (from, to));
    transitions
}
