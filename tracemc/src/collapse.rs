//! Contraction of the synthetic rule-application layer.
//!
//! After normalization the reachable graph alternates between two kinds of nodes:
//! *real* states, which are meaningful to the final model, and single-use *rule*
//! states interposed on every causal step, whose content carries the metadata of
//! the rule application. Collapsing removes the rule layer by contracting every
//! two-hop path `s -> r -> d` into one annotated edge `s -> d`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::LazyLock;

use ahash::AHashMap;
use log::warn;
use regex::Regex;

use crate::{CollapsedEdge, Label, RuleMeta, State, StateId, Transition};

static RULE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"rule_name\("([^"]+)"\)"#).unwrap());
static ACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"action\("([^"]+)"\)"#).unwrap());
static WEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"weight\((-?[0-9]+(?:\.[0-9]+)?)\)").unwrap());
static RATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"rate\((-?[0-9]+(?:\.[0-9]+)?)\)").unwrap());
static REWARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"reward\((-?[0-9]+(?:\.[0-9]+)?)\)").unwrap());

/// The role a node plays in the bipartite layering of the normalized graph.
///
/// Roles are assigned by the contraction walk itself rather than inferred from the
/// node's content: the start state is real, its successors are rule states, and
/// their successors are real again.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeRole {
    Real,
    Rule,
}

/// Result of contracting the rule layer out of the normalized graph.
#[derive(Clone, Debug)]
pub struct Collapsed {
    /// Number of real states reachable through two-hop paths from state 0.
    pub node_count: usize,
    /// Number of collapsed edges.
    pub edge_count: usize,
    /// Contracted edges, sorted ascending by `(src, dest)`.
    pub edges: Vec<CollapsedEdge>,
    /// States surviving the contraction, remapped into the real-state id space.
    pub states: Vec<State>,
    /// Labels of surviving states, remapped likewise.
    pub labels: Vec<Label>,
}

/// Extracts the rule metadata embedded in a rule state's content.
///
/// Each tag is matched independently anywhere in the content; absent tags resolve
/// to the defaults of [`RuleMeta`].
pub fn extract_meta(content: &str) -> RuleMeta {
    let mut meta = RuleMeta::default();
    if let Some(capture) = RULE_NAME_RE.captures(content) {
        meta.rule_name = capture[1].to_owned();
    }
    if let Some(capture) = ACTION_RE.captures(content) {
        meta.action = capture[1].to_owned();
    }
    if let Some(capture) = WEIGHT_RE.captures(content) {
        meta.weight = capture[1].parse().unwrap_or(1.0);
    }
    if let Some(capture) = RATE_RE.captures(content) {
        meta.rate = capture[1].parse().unwrap_or(1.0);
    }
    if let Some(capture) = REWARD_RE.captures(content) {
        meta.reward = capture[1].parse().unwrap_or(0.0);
    }
    meta
}

/// Contracts every two-hop path through a rule state into a single annotated edge.
///
/// The walk starts again from state 0 and moves only along contracted edges, so
/// rule states and real states that become unreachable disappear from the output;
/// the surviving real states are renumbered densely in discovery order. Paths are
/// grouped by `(src, dest, metadata)` and counted, so two rule states connecting
/// the same pair with different tags stay distinct edges; a conflict between them
/// is reported but not resolved.
pub fn collapse(transitions: &[Transition], states: &[State], labels: &[Label]) -> Collapsed {
    let mut successors: AHashMap<StateId, Vec<StateId>> = AHashMap::new();
    for &(src, dest) in transitions {
        successors.entry(src).or_default().push(dest);
    }
    let contents: AHashMap<StateId, &str> = states
        .iter()
        .map(|(id, content)| (*id, content.as_str()))
        .collect();

    let mut roles: AHashMap<StateId, NodeRole> = AHashMap::new();
    let mut classify = |id: StateId, role: NodeRole| {
        if let Some(previous) = roles.insert(id, role) {
            if previous != role {
                warn!("State {id} appears as both a real and a rule state.");
            }
        }
    };

    // BFS over the contracted graph; discovery order fixes the real-state ids.
    let mut id_map: AHashMap<StateId, StateId> = AHashMap::new();
    id_map.insert(0, 0);
    let mut queue = VecDeque::from([0]);
    // (src, dest) in old ids -> distinct metadata groups with their path counts,
    // in first-seen order.
    let mut groups: BTreeMap<(StateId, StateId), Vec<(RuleMeta, usize)>> = BTreeMap::new();

    while let Some(current) = queue.pop_front() {
        classify(current, NodeRole::Real);
        for &way_point in successors.get(&current).into_iter().flatten() {
            classify(way_point, NodeRole::Rule);
            let meta = extract_meta(contents.get(&way_point).copied().unwrap_or(""));
            for &neighbor in successors.get(&way_point).into_iter().flatten() {
                classify(neighbor, NodeRole::Real);
                let group = groups.entry((current, neighbor)).or_default();
                match group.iter_mut().find(|(m, _)| *m == meta) {
                    Some((_, count)) => *count += 1,
                    None => {
                        if !group.is_empty() {
                            warn!(
                                "Conflicting rule metadata on edge ({current}, {neighbor}); \
                                 keeping the variants as separate edges."
                            );
                        }
                        group.push((meta.clone(), 1));
                    }
                }
                if !id_map.contains_key(&neighbor) {
                    id_map.insert(neighbor, id_map.len());
                    queue.push_back(neighbor);
                }
            }
        }
    }

    let mut edges: Vec<CollapsedEdge> = groups
        .into_iter()
        .flat_map(|((src, dest), group)| {
            group.into_iter().map(move |(meta, count)| CollapsedEdge {
                src,
                dest,
                count,
                meta,
            })
        })
        .map(|mut edge| {
            edge.src = id_map[&edge.src];
            edge.dest = id_map[&edge.dest];
            edge
        })
        .collect();
    edges.sort_by_key(|edge| (edge.src, edge.dest));

    let mut kept_states: Vec<State> = states
        .iter()
        .filter_map(|(id, content)| Some((*id_map.get(id)?, content.trim().to_owned())))
        .collect();
    kept_states.sort_by(|x, y| x.0.cmp(&y.0));

    let mut kept_labels: Vec<Label> = labels
        .iter()
        .filter_map(|(id, label)| Some((*id_map.get(id)?, label.trim().to_owned())))
        .collect();
    kept_labels.sort_by(|x, y| x.0.cmp(&y.0));

    Collapsed {
        node_count: id_map.len(),
        edge_count: edges.len(),
        edges,
        states: kept_states,
        labels: kept_labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UNKNOWN;

    fn states(raw: &[(StateId, &str)]) -> Vec<State> {
        raw.iter().map(|(id, c)| (*id, c.to_string())).collect()
    }

    #[test]
    fn extracts_all_tags() {
        let meta =
            extract_meta(r#"foo rule_name("send") action("tick") weight(2.5) rate(3) reward(0.5)"#);
        assert_eq!(meta.rule_name, "send");
        assert_eq!(meta.action, "tick");
        assert_eq!(meta.weight, 2.5);
        assert_eq!(meta.rate, 3.0);
        assert_eq!(meta.reward, 0.5);
    }

    #[test]
    fn missing_tags_resolve_to_defaults() {
        let meta = extract_meta("no tags in here");
        assert_eq!(meta.rule_name, UNKNOWN);
        assert_eq!(meta.action, UNKNOWN);
        assert_eq!(meta.weight, 1.0);
        assert_eq!(meta.rate, 1.0);
        assert_eq!(meta.reward, 0.0);
    }

    #[test]
    fn contracts_a_two_state_cycle() {
        // 0 -> 1 -> 2 -> 3 -> 0 where 1 and 3 are rule states.
        let transitions = vec![(0, 1), (1, 2), (2, 3), (3, 0)];
        let states = states(&[(0, "a"), (1, "weight(2)"), (2, "b"), (3, "")]);
        let collapsed = collapse(&transitions, &states, &[]);

        assert_eq!(collapsed.node_count, 2);
        assert_eq!(collapsed.edge_count, 2);
        assert_eq!(collapsed.edges[0].src, 0);
        assert_eq!(collapsed.edges[0].dest, 1);
        assert_eq!(collapsed.edges[0].count, 1);
        assert_eq!(collapsed.edges[0].meta.weight, 2.0);
        assert_eq!(collapsed.edges[1].src, 1);
        assert_eq!(collapsed.edges[1].dest, 0);
        assert_eq!(collapsed.edges[1].meta.weight, 1.0);
        assert_eq!(collapsed.states, vec![(0, "a".to_owned()), (1, "b".to_owned())]);
    }

    #[test]
    fn rule_states_vanish_from_states_and_labels() {
        let transitions = vec![(0, 1), (1, 2)];
        let states = states(&[(0, "a"), (1, "rule"), (2, "b")]);
        let labels = vec![(1, "hidden".to_owned()), (2, "goal".to_owned())];
        let collapsed = collapse(&transitions, &states, &labels);

        assert_eq!(collapsed.node_count, 2);
        assert_eq!(collapsed.labels, vec![(1, "goal".to_owned())]);
    }

    #[test]
    fn counts_parallel_two_hop_paths() {
        // Two rule states with identical (default) metadata both connect 0 to 3.
        let transitions = vec![(0, 1), (0, 2), (1, 3), (2, 3)];
        let states = states(&[(0, "a"), (1, ""), (2, ""), (3, "b")]);
        let collapsed = collapse(&transitions, &states, &[]);

        assert_eq!(collapsed.edge_count, 1);
        assert_eq!(collapsed.edges[0].count, 2);
    }

    #[test]
    fn conflicting_metadata_stays_as_separate_edges() {
        let transitions = vec![(0, 1), (0, 2), (1, 3), (2, 3)];
        let states = states(&[
            (0, "a"),
            (1, r#"action("left")"#),
            (2, r#"action("right")"#),
            (3, "b"),
        ]);
        let collapsed = collapse(&transitions, &states, &[]);

        assert_eq!(collapsed.edge_count, 2);
        assert_eq!(collapsed.edges[0].meta.action, "left");
        assert_eq!(collapsed.edges[1].meta.action, "right");
        assert_eq!(collapsed.edges[0].count, 1);
        assert_eq!(collapsed.edges[1].count, 1);
    }

    #[test]
    fn sum_of_counts_equals_number_of_two_hop_paths() {
        // Four paths leave state 0: two to 3 and two to 4 (one rule fires twice).
        let transitions = vec![(0, 1), (0, 2), (1, 3), (1, 4), (2, 3), (2, 4)];
        let states = states(&[(0, "a"), (1, ""), (2, ""), (3, "b"), (4, "c")]);
        let collapsed = collapse(&transitions, &states, &[]);

        let leaving: usize = collapsed
            .edges
            .iter()
            .filter(|edge| edge.src == 0)
            .map(|edge| edge.count)
            .sum();
        assert_eq!(leaving, 4);
    }

    #[test]
    fn unreachable_real_states_are_dropped() {
        // 2 -> 3 -> 4 never connects back to the component of 0.
        let transitions = vec![(0, 1), (1, 0), (2, 3), (3, 4)];
        let states = states(&[(0, "a"), (1, ""), (2, "b"), (3, ""), (4, "c")]);
        let collapsed = collapse(&transitions, &states, &[]);

        assert_eq!(collapsed.node_count, 1);
        assert_eq!(collapsed.states, vec![(0, "a".to_owned())]);
    }
}
