//! Renumbering of opaque trace identifiers into a dense BFS-ordered space.

use std::collections::VecDeque;

use ahash::AHashMap;
use log::debug;

use crate::{Label, State, Transition};

/// Renumbers all identifiers reachable from `initial` into `0..n` by breadth-first
/// discovery order, with `initial` mapped to `0`.
///
/// Transitions are rewritten through the mapping and sorted ascending by
/// `(src, dest)`; states and labels are rewritten and sorted ascending by state id.
/// Entries whose identifier is never discovered are dropped, transitions whose
/// source is unreachable included. Self-loops and parallel edges survive untouched;
/// merging and counting happen only during collapsing.
pub fn normalize(
    initial: &str,
    raw_transitions: &[(String, String)],
    raw_states: &[(String, String)],
    raw_labels: &[(String, String)],
) -> (Vec<Transition>, Vec<State>, Vec<Label>) {
    let mut successors: AHashMap<&str, Vec<&str>> = AHashMap::new();
    for (src, dest) in raw_transitions {
        successors.entry(src).or_default().push(dest);
    }

    // BFS discovery order fixes the new identifiers.
    let mut id_map: AHashMap<&str, usize> = AHashMap::new();
    id_map.insert(initial, 0);
    let mut queue = VecDeque::from([initial]);
    while let Some(current) = queue.pop_front() {
        for &neighbor in successors.get(current).into_iter().flatten() {
            if !id_map.contains_key(neighbor) {
                id_map.insert(neighbor, id_map.len());
                queue.push_back(neighbor);
            }
        }
    }
    debug!("Discovered {} reachable states.", id_map.len());

    let mut transitions: Vec<Transition> = raw_transitions
        .iter()
        .filter_map(|(src, dest)| {
            // If the source is reachable the destination was discovered through it.
            Some((*id_map.get(src.as_str())?, id_map[dest.as_str()]))
        })
        .collect();
    transitions.sort_unstable();

    let mut states: Vec<State> = raw_states
        .iter()
        .filter_map(|(id, content)| Some((*id_map.get(id.as_str())?, content.clone())))
        .collect();
    states.sort_by(|x, y| x.0.cmp(&y.0));

    let mut labels: Vec<Label> = raw_labels
        .iter()
        .filter_map(|(id, label)| Some((*id_map.get(id.as_str())?, label.clone())))
        .collect();
    labels.sort_by(|x, y| x.0.cmp(&y.0));

    (transitions, states, labels)
}
