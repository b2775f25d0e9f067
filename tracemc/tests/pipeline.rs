//! End-to-end runs over complete trace dumps.

use tracemc::collapse::{Collapsed, collapse};
use tracemc::formats::{prism, trace};
use tracemc::generate::{adjacency_list, generate_ctmc, generate_dtmc, generate_mdp};
use tracemc::normalize::normalize;

/// A two-state cycle with a rule layer in between. State 99 is declared but never
/// reachable from the initial state 10.
const CYCLE_TRACE: &str = "\
n(5) t(5)
ret(ss(10,<state_map>))
transitions([[10|21],[21|11],[11|22],[22|10],[99|98]])
state(10,{x(0)})
state(21,{rule_name(\"fire\") weight(2)})
state(11,{x(1)})
state(22,{})
state(99,{x(9)})
label(11,\"goal\")
";

/// Two rule states connect the same pair of real states with different actions.
const BRANCH_TRACE: &str = "\
n(4) t(4)
ret(ss(10,<state_map>))
transitions([[10|21],[10|22],[21|11],[22|11]])
state(10,{root})
state(21,{action(\"left\") rate(2)})
state(22,{action(\"right\")})
state(11,{leaf})
";

fn collapsed_of(input: &str) -> Collapsed {
    let raw = trace::parse(input).unwrap();
    let (transitions, states, labels) =
        normalize(&raw.initial, &raw.transitions, &raw.states, &raw.labels);
    collapse(&transitions, &states, &labels)
}

fn render_all(input: &str) -> String {
    let raw = trace::parse(input).unwrap();
    let (transitions, states, labels) =
        normalize(&raw.initial, &raw.transitions, &raw.states, &raw.labels);
    let collapsed = collapse(&transitions, &states, &labels);
    let adjacency = adjacency_list(&collapsed.edges);

    let mut out = Vec::new();
    prism::write_normalized(
        &mut out,
        raw.state_count,
        raw.transition_count,
        &transitions,
        &states,
    )
    .unwrap();
    prism::write_collapsed(&mut out, &collapsed).unwrap();
    let dtmc = generate_dtmc(&adjacency).unwrap();
    prism::write_dtmc(&mut out, collapsed.node_count, collapsed.edge_count, &dtmc).unwrap();
    let ctmc = generate_ctmc(&adjacency);
    prism::write_ctmc(&mut out, collapsed.node_count, collapsed.edge_count, &ctmc).unwrap();
    prism::write_labels(&mut out, &collapsed.labels).unwrap();
    prism::write_rewards(&mut out, collapsed.edge_count, &collapsed).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn cycle_trace_collapses_to_two_states() {
    let collapsed = collapsed_of(CYCLE_TRACE);

    assert_eq!(collapsed.node_count, 2);
    assert_eq!(collapsed.edge_count, 2);
    assert_eq!(collapsed.edges[0].count, 1);
    assert_eq!(collapsed.edges[0].meta.rule_name, "fire");
    assert_eq!(collapsed.edges[0].meta.weight, 2.0);
    assert_eq!(collapsed.edges[1].count, 1);
    assert_eq!(collapsed.edges[1].meta.weight, 1.0);
}

#[test]
fn cycle_trace_dtmc_has_certain_transitions() {
    let collapsed = collapsed_of(CYCLE_TRACE);
    let dtmc = generate_dtmc(&adjacency_list(&collapsed.edges)).unwrap();

    let mut out = Vec::new();
    prism::write_dtmc(&mut out, collapsed.node_count, collapsed.edge_count, &dtmc).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "2 2\n0 1 1\n1 0 1\n");
}

#[test]
fn cycle_trace_labels_carry_init() {
    let collapsed = collapsed_of(CYCLE_TRACE);

    let mut out = Vec::new();
    prism::write_labels(&mut out, &collapsed.labels).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "0=\"init\" 1=\"goal\"\n0: 0\n1: 1\n"
    );
}

#[test]
fn unreachable_states_never_surface() {
    let output = render_all(CYCLE_TRACE);
    assert!(!output.contains("x(9)"));
    assert!(!output.contains("99"));
}

#[test]
fn branch_trace_mdp_has_two_choices() {
    let collapsed = collapsed_of(BRANCH_TRACE);
    let model = generate_mdp(&adjacency_list(&collapsed.edges)).unwrap();

    assert_eq!(model.choice_count, 2);
    let mut out = Vec::new();
    prism::write_mdp(&mut out, collapsed.node_count, collapsed.edge_count, &model).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "2 2 2\n0 0 1 1\n0 1 1 1\n");
}

#[test]
fn branch_trace_ctmc_keeps_absolute_rates() {
    let collapsed = collapsed_of(BRANCH_TRACE);
    let ctmc = generate_ctmc(&adjacency_list(&collapsed.edges));

    assert_eq!(ctmc, vec![(0, 1, 2.0), (0, 1, 1.0)]);
}

#[test]
fn repeated_runs_are_byte_identical() {
    assert_eq!(render_all(CYCLE_TRACE), render_all(CYCLE_TRACE));
    assert_eq!(render_all(BRANCH_TRACE), render_all(BRANCH_TRACE));
}
