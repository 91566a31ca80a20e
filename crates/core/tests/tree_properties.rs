//! Property tests for the action tree.
//!
//! 1. Sibling orders stay a permutation of `0..n` under any operation sequence
//! 2. Every parent reference resolves and no group is its own ancestor
//! 3. Moving a group under itself or a descendant fails and changes nothing
//! 4. Deleting a group leaves nothing that referenced its subtree

use std::collections::HashSet;

use padctl_core::{Action, ActionGroup, ActionStore, ActionType, TreeError};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    AddAction(Option<usize>),
    AddGroup(Option<usize>),
    RemoveAction(usize),
    RemoveGroup(usize),
    ActionUp(usize),
    ActionDown(usize),
    GroupUp(usize),
    GroupDown(usize),
    MoveAction(usize, Option<usize>, usize),
    MoveGroup(usize, Option<usize>, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let sel = 0usize..64;
    let parent = proptest::option::of(0usize..64);
    prop_oneof![
        3 => parent.clone().prop_map(Op::AddAction),
        2 => parent.clone().prop_map(Op::AddGroup),
        1 => sel.clone().prop_map(Op::RemoveAction),
        1 => sel.clone().prop_map(Op::RemoveGroup),
        1 => sel.clone().prop_map(Op::ActionUp),
        1 => sel.clone().prop_map(Op::ActionDown),
        1 => sel.clone().prop_map(Op::GroupUp),
        1 => sel.clone().prop_map(Op::GroupDown),
        2 => (sel.clone(), parent.clone(), 0usize..8).prop_map(|(s, p, o)| Op::MoveAction(s, p, o)),
        2 => (sel, parent, 0usize..8).prop_map(|(s, p, o)| Op::MoveGroup(s, p, o)),
    ]
}

fn pick(ids: &[String], sel: usize) -> Option<String> {
    (!ids.is_empty()).then(|| ids[sel % ids.len()].clone())
}

fn parent_id(store: &ActionStore, sel: Option<usize>) -> String {
    let groups: Vec<String> = store.groups().iter().map(|g| g.id.clone()).collect();
    sel.and_then(|s| pick(&groups, s)).unwrap_or_default()
}

fn apply(store: &mut ActionStore, op: &Op) {
    let actions: Vec<String> = store.actions().iter().map(|a| a.id.clone()).collect();
    let groups: Vec<String> = store.groups().iter().map(|g| g.id.clone()).collect();

    match op {
        Op::AddAction(p) => {
            let parent = parent_id(store, *p);
            let _ = store.add_action(Action::new("a", ActionType::Sleep).with_parent(parent));
        }
        Op::AddGroup(p) => {
            let parent = parent_id(store, *p);
            let _ = store.add_group(ActionGroup::new("g").with_parent(parent));
        }
        Op::RemoveAction(s) => {
            if let Some(id) = pick(&actions, *s) {
                let _ = store.remove_action(&id);
            }
        }
        Op::RemoveGroup(s) => {
            if let Some(id) = pick(&groups, *s) {
                let _ = store.remove_group(&id);
            }
        }
        Op::ActionUp(s) => {
            if let Some(id) = pick(&actions, *s) {
                let _ = store.move_action_up(&id);
            }
        }
        Op::ActionDown(s) => {
            if let Some(id) = pick(&actions, *s) {
                let _ = store.move_action_down(&id);
            }
        }
        Op::GroupUp(s) => {
            if let Some(id) = pick(&groups, *s) {
                let _ = store.move_group_up(&id);
            }
        }
        Op::GroupDown(s) => {
            if let Some(id) = pick(&groups, *s) {
                let _ = store.move_group_down(&id);
            }
        }
        Op::MoveAction(s, p, order) => {
            if let Some(id) = pick(&actions, *s) {
                let parent = parent_id(store, *p);
                let _ = store.move_action(&id, &parent, *order);
            }
        }
        Op::MoveGroup(s, p, order) => {
            if let Some(id) = pick(&groups, *s) {
                let parent = parent_id(store, *p);
                let _ = store.move_group(&id, &parent, *order);
            }
        }
    }
}

fn assert_well_formed(store: &ActionStore) -> Result<(), TestCaseError> {
    prop_assert!(
        store.order_violations().is_empty(),
        "order gaps under {:?}",
        store.order_violations()
    );

    let group_ids: HashSet<&str> = store.groups().iter().map(|g| g.id.as_str()).collect();
    for action in store.actions() {
        prop_assert!(action.parent_id.is_empty() || group_ids.contains(action.parent_id.as_str()));
    }
    for group in store.groups() {
        prop_assert!(group.parent_id.is_empty() || group_ids.contains(group.parent_id.as_str()));
        prop_assert!(
            group.parent_id.is_empty() || !store.is_descendant_of(&group.parent_id, &group.id),
            "group {} is its own ancestor",
            group.id
        );
    }

    // Every node is reachable from the root exactly once
    prop_assert_eq!(
        store.flat_list().len(),
        store.actions().len() + store.groups().len()
    );
    Ok(())
}

/// Build `root > g0 > g1 > ... > g(depth-1)` with one action per group.
fn chain(depth: usize) -> (ActionStore, Vec<String>) {
    let mut store = ActionStore::new();
    let mut ids = Vec::new();
    let mut parent = String::new();
    for i in 0..depth {
        let id = store
            .add_group(ActionGroup::new(format!("g{i}")).with_parent(parent.clone()))
            .unwrap();
        store
            .add_action(Action::new(format!("a{i}"), ActionType::Shell).with_parent(id.clone()))
            .unwrap();
        ids.push(id.clone());
        parent = id;
    }
    (store, ids)
}

// ═══════════════════════════════════════════════════════════════════════
// 1-2. Structural invariants hold after arbitrary operation sequences
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn orders_stay_contiguous(ops in proptest::collection::vec(op_strategy(), 1..120)) {
        let mut store = ActionStore::new();
        for op in &ops {
            apply(&mut store, op);
            assert_well_formed(&store)?;
        }
    }

    #[test]
    fn restore_preserves_tree(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let mut store = ActionStore::new();
        for op in &ops {
            apply(&mut store, op);
        }
        let before = store.flat_list();
        let (actions, groups) = store.into_parts();
        let restored = ActionStore::from_parts(actions, groups);
        prop_assert_eq!(restored.flat_list(), before);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 3. Cycle rejection
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn moving_group_into_its_subtree_is_rejected(
        depth in 1usize..8,
        a in 0usize..8,
        b in 0usize..8,
        order in 0usize..4,
    ) {
        let (mut store, ids) = chain(depth);
        let (src, dst) = (a % depth, b % depth);
        // dst at or below src in the chain
        let (src, dst) = (src.min(dst), src.max(dst));

        let before = store.clone();
        let result = store.move_group(&ids[src], &ids[dst], order);

        let is_cycle = matches!(result, Err(TreeError::Cycle { .. }));
        prop_assert!(is_cycle);
        prop_assert_eq!(store.groups(), before.groups());
        prop_assert_eq!(store.actions(), before.actions());
    }

    #[test]
    fn moving_group_upward_is_allowed(depth in 2usize..8, a in 0usize..8) {
        let (mut store, ids) = chain(depth);
        let src = 1 + a % (depth - 1);

        prop_assert!(store.move_group(&ids[src], "", 0).is_ok());
        prop_assert_eq!(&store.group(&ids[src]).unwrap().parent_id, "");
        assert_well_formed(&store)?;
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 4. Group deletion completeness
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn removing_group_leaves_no_orphans(
        ops in proptest::collection::vec(op_strategy(), 1..80),
        sel in 0usize..64,
    ) {
        let mut store = ActionStore::new();
        for op in &ops {
            apply(&mut store, op);
        }
        let groups: Vec<String> = store.groups().iter().map(|g| g.id.clone()).collect();
        let Some(target) = pick(&groups, sel) else {
            return Ok(());
        };

        let mut doomed: HashSet<String> = store.descendant_group_ids(&target).into_iter().collect();
        doomed.insert(target.clone());

        store.remove_group(&target).unwrap();

        for group in store.groups() {
            prop_assert!(!doomed.contains(&group.id));
            prop_assert!(!doomed.contains(&group.parent_id));
        }
        for action in store.actions() {
            prop_assert!(!doomed.contains(&action.parent_id));
        }
        assert_well_formed(&store)?;
    }
}
