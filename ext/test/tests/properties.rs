//! Engine properties checked through the public API.

use agentwalk::{
    compile, ActionId, ActionKind, AgentNode, Compiled, Expression, Fragment, LookupTable, Lookups,
    MatchState, Outcome, PathIndex, PathKey, RuleAction, RuleDefinition, RuleSet, StepKind,
};
use agentwalk_test::{agent, comments, product};
use std::borrow::Cow;

/// Compile and register `texts` as extract actions of one rule, ids in order.
fn register(texts: &[&str]) -> (Vec<RuleAction>, PathIndex, Vec<usize>) {
    let mut index = PathIndex::new();
    let mut informs = Vec::new();
    let actions = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let expression = Expression::parse(text).unwrap();
            let mut action =
                RuleAction::new(ActionId::new(i), 0, ActionKind::Extract, expression, &Lookups::new())
                    .unwrap();
            informs.push(action.register(&mut index, &mut |_: &str| {}));
            action
        })
        .collect();
    (actions, index, informs)
}

fn walk<'t>(actions: &[RuleAction], index: &PathIndex, tree: &'t AgentNode) -> MatchState<'t> {
    let mut state = MatchState::new(actions.len(), 1);
    index.walk(tree, |id, path, node, value| {
        state.inform(&actions[id.index()], path, node, value);
    });
    state
}

fn firefox(version: &str) -> AgentNode {
    agent([product("Firefox", version)])
}

// ═══════════════════════════════════════════════════════════════════════════════
// Determinism
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn compiling_twice_is_identical() {
    let text = r#"LookUp[Os;agent.(0-2)product.(0)comments.(0-3)entry[0];"Other"]"#;
    let lookups = Lookups::new().with_table(LookupTable::new("Os"));
    assert_eq!(
        compile(&Expression::parse(text).unwrap(), &lookups, false).unwrap(),
        compile(&Expression::parse(text).unwrap(), &lookups, false).unwrap()
    );

    let path = "agent.(0-2)product.(0)comments.(0-3)entry[0]";
    let (_, first, first_informs) = register(&[path]);
    let (_, second, second_informs) = register(&[path]);
    assert_eq!(first_informs, vec![12]);
    assert_eq!(first_informs, second_informs);
    assert_eq!(first.registered_paths(), second.registered_paths());
}

#[test]
fn evaluating_twice_is_identical() {
    let (actions, index, _) = register(&[r#"Concat["v";agent.(0)product.(0)version]"#]);
    let tree = firefox("53.0");
    let first = walk(&actions, &index, &tree);
    let second = walk(&actions, &index, &tree);
    assert_eq!(actions[0].evaluate(&first), actions[0].evaluate(&first));
    assert_eq!(actions[0].evaluate(&first), actions[0].evaluate(&second));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Buffers
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn first_match_wins() {
    let (actions, index, informs) = register(&["agent.(0-3)product.(0)name"]);
    assert_eq!(informs, vec![4]);

    let tree = agent([product("Mozilla", "5.0"), product("Chrome", "99")]);
    let state = walk(&actions, &index, &tree);
    assert_eq!(state.informs(), 2);
    assert_eq!(state.accepted(), 1);
    let candidate = state.candidate(ActionId::new(0)).unwrap();
    assert_eq!(candidate.path.as_str(), "agent.(0)product.(0)name");
    assert_eq!(actions[0].evaluate(&state), Outcome::Matched("Mozilla".into()));
}

#[test]
fn later_candidate_is_dropped() {
    let (actions, _, _) = register(&["agent.(0-3)product.(0)name"]);
    let tree = agent([product("A", "1"), product("B", "2")]);
    let a = tree.child(Fragment::Product, 0).unwrap();
    let b = tree.child(Fragment::Product, 1).unwrap();

    let mut state = MatchState::new(1, 1);
    let path = PathKey::variable("Product");
    assert!(state.inform(&actions[0], &path, a, &Cow::Borrowed(a.value())));
    assert!(!state.inform(&actions[0], &path, b, &Cow::Borrowed(b.value())));
    assert_eq!(state.candidate(ActionId::new(0)).unwrap().value, "A/1");
}

#[test]
fn fixed_values_short_circuit() {
    let (actions, index, informs) = register(&[r#""Desktop""#, r#"Concat["v";"1"]"#]);
    assert_eq!(informs, vec![0, 0]);
    assert_eq!(index.registrations(), 0);
    assert_eq!(index.node_count(), 0);

    let state = MatchState::new(2, 1);
    assert_eq!(actions[0].evaluate(&state), Outcome::Fixed("Desktop".into()));
    assert_eq!(actions[1].evaluate(&state), Outcome::Fixed("v1".into()));
    assert!(!actions[0].must_have_matches());
}

#[test]
fn missing_candidate_is_rejected_without_running() {
    let (actions, index, _) = register(&["CleanVersion[agent.(0)product.(0)version]"]);
    assert!(actions[0].must_have_matches());

    let tree = agent([AgentNode::new(Fragment::Product, "NoVersion")]);
    let state = walk(&actions, &index, &tree);
    assert!(actions[0].cannot_be_valid(&state));
    assert_eq!(actions[0].evaluate(&state), Outcome::NotMatched);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Index shape
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn range_fans_out_into_distinct_paths() {
    let (_, index, informs) = register(&["agent.(2-4)product.(0)name"]);
    assert_eq!(informs, vec![3]);

    let paths: Vec<String> = index
        .registered_paths()
        .into_iter()
        .map(|(path, _)| path.to_string())
        .collect();
    assert_eq!(
        paths,
        vec![
            "agent.(2)product.(0)name",
            "agent.(3)product.(0)name",
            "agent.(4)product.(0)name",
        ]
    );
    // agent, then one product and one name node per index.
    assert_eq!(index.node_count(), 7);
}

#[test]
fn rules_share_index_nodes() {
    let path = r#"agent.(0)product.(0)name="Chrome""#;
    let single = RuleSet::builder()
        .rule(RuleDefinition::new("a", "AgentName", 1, path))
        .build()
        .unwrap();
    let shared = RuleSet::builder()
        .rule(RuleDefinition::new("a", "AgentName", 1, path))
        .rule(RuleDefinition::new("b", "AgentClass", 1, r#""Browser""#).require(path))
        .build()
        .unwrap();

    assert_eq!(shared.index().registrations(), 2);
    assert_eq!(shared.index().registered_paths().len(), 1);
    assert_eq!(shared.index().node_count(), single.index().node_count());

    let tree = agent([product("Chrome", "99")]);
    let (fields, trace) = shared.classify_with_trace(&tree);
    assert_eq!(trace.informs, 2);
    assert_eq!(trace.accepted, 2);
    assert_eq!(fields.value("AgentName"), Some("Chrome"));
    assert_eq!(fields.value("AgentClass"), Some("Browser"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scenarios
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn equals_on_version() {
    let (actions, index, _) = register(&[r#"agent.(0)product.(0)version="53.0""#]);

    let tree = firefox("53.0");
    let state = walk(&actions, &index, &tree);
    assert_eq!(actions[0].evaluate(&state), Outcome::Matched("53.0".into()));

    let tree = firefox("54.0");
    let state = walk(&actions, &index, &tree);
    assert_eq!(actions[0].evaluate(&state), Outcome::NotMatched);
}

#[test]
fn concat_never_fails() {
    let (actions, index, _) = register(&[r#"Concat["v";agent.(0)product.(0)version]"#]);
    let tree = firefox("53.0");
    let state = walk(&actions, &index, &tree);
    assert_eq!(actions[0].evaluate(&state), Outcome::Matched("v53.0".into()));

    let Compiled::Program(program) = actions[0].compiled() else {
        panic!("expected a program");
    };
    let concat = program
        .steps()
        .find(|kind| matches!(kind, StepKind::Concat { .. }))
        .unwrap();
    assert!(!concat.can_fail());
}

#[test]
fn word_ranges() {
    let (actions, index, _) = register(&["agent.(0)text[2-]", "agent.(0)text[-1]"]);
    let tree = AgentNode::agent("Mozilla 5.0 Windows NT")
        .with_child(AgentNode::new(Fragment::Text, "Mozilla 5.0 Windows NT"));
    let state = walk(&actions, &index, &tree);
    assert_eq!(actions[0].evaluate(&state), Outcome::Matched("Windows NT".into()));
    assert_eq!(actions[1].evaluate(&state), Outcome::Matched("NT".into()));
}

#[test]
fn comments_helper_feeds_entries() {
    let (actions, index, _) = register(&[r#"agent.(0)product.(0)comments.(0-5)entry{"Andr""#]);
    let tree = agent([product("Mozilla", "5.0").with_child(comments(&["Linux", "Android 9"]))]);
    let state = walk(&actions, &index, &tree);
    assert_eq!(actions[0].evaluate(&state), Outcome::Matched("Android 9".into()));
}
