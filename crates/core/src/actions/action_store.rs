use std::collections::{BTreeMap, HashSet};

use super::action::{Action, ActionGroup};
use crate::error::TreeError;

/// Node of the action tree, as returned by traversals.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Group(ActionGroup),
    Action(Action),
}

impl TreeNode {
    pub fn id(&self) -> &str {
        match self {
            TreeNode::Group(g) => &g.id,
            TreeNode::Action(a) => &a.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TreeNode::Group(g) => &g.name,
            TreeNode::Action(a) => &a.name,
        }
    }

    pub fn order(&self) -> usize {
        match self {
            TreeNode::Group(g) => g.order,
            TreeNode::Action(a) => a.order,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, TreeNode::Group(_))
    }
}

/// A node plus its nesting depth in a flattened tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeItem {
    pub node: TreeNode,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Action,
    Group,
}

/// Ordered forest of actions and groups.
///
/// Both collections are flat; nesting comes only from `parent_id`. Within a
/// parent, actions and groups share one order space which is always a
/// zero-based permutation `0..n`.
#[derive(Debug, Clone, Default)]
pub struct ActionStore {
    actions: Vec<Action>,
    groups: Vec<ActionGroup>,
}

impl ActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted collections.
    ///
    /// Items pointing at a missing parent are moved to the root and every
    /// parent's orders are renumbered to a contiguous sequence, keeping the
    /// relative order that was stored.
    pub fn from_parts(actions: Vec<Action>, groups: Vec<ActionGroup>) -> Self {
        let mut store = Self { actions, groups };
        store.reattach_orphans();
        store.normalize_orders();
        store
    }

    pub fn into_parts(self) -> (Vec<Action>, Vec<ActionGroup>) {
        (self.actions, self.groups)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn groups(&self) -> &[ActionGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.groups.is_empty()
    }

    // Lookup

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn group(&self, id: &str) -> Option<&ActionGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    // Creation

    /// Append an action as the last child of its parent. Returns its id.
    pub fn add_action(&mut self, mut action: Action) -> Result<String, TreeError> {
        self.ensure_parent(&action.parent_id)?;
        action.order = self.next_order(&action.parent_id);
        let id = action.id.clone();
        self.actions.push(action);
        Ok(id)
    }

    /// Append a group as the last child of its parent. Returns its id.
    pub fn add_group(&mut self, mut group: ActionGroup) -> Result<String, TreeError> {
        self.ensure_parent(&group.parent_id)?;
        group.order = self.next_order(&group.parent_id);
        let id = group.id.clone();
        self.groups.push(group);
        Ok(id)
    }

    // Editing

    /// Replace an action's editable fields. Parent and order are left alone;
    /// use [`ActionStore::move_action`] to reposition.
    pub fn update_action(&mut self, updated: &Action) -> Result<(), TreeError> {
        let action = self
            .actions
            .iter_mut()
            .find(|a| a.id == updated.id)
            .ok_or_else(|| TreeError::ActionNotFound(updated.id.clone()))?;

        action.name = updated.name.clone();
        action.action_type = updated.action_type;
        action.payload = updated.payload.clone();
        action.wait_for_completion = updated.wait_for_completion;
        Ok(())
    }

    pub fn rename_group(&mut self, id: &str, name: impl Into<String>) -> Result<(), TreeError> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| TreeError::GroupNotFound(id.to_string()))?;
        group.name = name.into();
        Ok(())
    }

    // Removal

    pub fn remove_action(&mut self, id: &str) -> Result<Action, TreeError> {
        let index = self
            .actions
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| TreeError::ActionNotFound(id.to_string()))?;

        let action = self.actions.remove(index);
        self.close_gap(&action.parent_id, action.order);
        Ok(action)
    }

    /// Remove a group together with every nested group and action.
    pub fn remove_group(&mut self, id: &str) -> Result<(), TreeError> {
        let (parent, order) = self.location(NodeKind::Group, id)?;

        let mut doomed: HashSet<String> = self.descendant_group_ids(id).into_iter().collect();
        doomed.insert(id.to_string());

        self.actions.retain(|a| !doomed.contains(&a.parent_id));
        self.groups.retain(|g| !doomed.contains(&g.id));
        self.close_gap(&parent, order);

        log::debug!("Removed group {} and {} nested group(s)", id, doomed.len() - 1);
        Ok(())
    }

    // Reordering

    pub fn move_action_up(&mut self, id: &str) -> Result<bool, TreeError> {
        self.step(NodeKind::Action, id, true)
    }

    pub fn move_action_down(&mut self, id: &str) -> Result<bool, TreeError> {
        self.step(NodeKind::Action, id, false)
    }

    pub fn move_group_up(&mut self, id: &str) -> Result<bool, TreeError> {
        self.step(NodeKind::Group, id, true)
    }

    pub fn move_group_down(&mut self, id: &str) -> Result<bool, TreeError> {
        self.step(NodeKind::Group, id, false)
    }

    /// Reparent an action. `new_order` is clamped to the end of the
    /// destination's children.
    pub fn move_action(
        &mut self,
        id: &str,
        new_parent: &str,
        new_order: usize,
    ) -> Result<(), TreeError> {
        self.relocate(NodeKind::Action, id, new_parent, new_order)
    }

    /// Reparent a group. Rejects destinations inside the group's own subtree.
    pub fn move_group(
        &mut self,
        id: &str,
        new_parent: &str,
        new_order: usize,
    ) -> Result<(), TreeError> {
        self.relocate(NodeKind::Group, id, new_parent, new_order)
    }

    // Traversal

    /// Direct children of `parent` in ascending order, actions and groups
    /// interleaved.
    pub fn children(&self, parent: &str) -> Vec<TreeNode> {
        let mut nodes: Vec<TreeNode> = self
            .groups
            .iter()
            .filter(|g| g.parent_id == parent)
            .cloned()
            .map(TreeNode::Group)
            .chain(
                self.actions
                    .iter()
                    .filter(|a| a.parent_id == parent)
                    .cloned()
                    .map(TreeNode::Action),
            )
            .collect();
        nodes.sort_by_key(|n| (n.order(), !n.is_group()));
        nodes
    }

    /// Depth-first listing of the subtree under `parent`: groups first (each
    /// followed by its own subtree), then actions, both sorted by order.
    pub fn sorted_tree(&self, parent: &str, depth: usize) -> Vec<TreeItem> {
        let mut groups: Vec<&ActionGroup> =
            self.groups.iter().filter(|g| g.parent_id == parent).collect();
        groups.sort_by_key(|g| g.order);

        let mut actions: Vec<&Action> =
            self.actions.iter().filter(|a| a.parent_id == parent).collect();
        actions.sort_by_key(|a| a.order);

        let mut items = Vec::new();
        for group in groups {
            items.push(TreeItem {
                node: TreeNode::Group(group.clone()),
                depth,
            });
            items.extend(self.sorted_tree(&group.id, depth + 1));
        }
        items.extend(actions.into_iter().map(|a| TreeItem {
            node: TreeNode::Action(a.clone()),
            depth,
        }));
        items
    }

    pub fn flat_list(&self) -> Vec<TreeItem> {
        self.sorted_tree("", 0)
    }

    /// Resolve a display name to an id, first match in flat-list order.
    pub fn find_by_name(&self, name: &str) -> Option<String> {
        self.flat_list()
            .into_iter()
            .find(|item| item.node.name() == name)
            .map(|item| item.node.id().to_string())
    }

    /// Ids of every group nested (at any depth) under `id`.
    pub fn descendant_group_ids(&self, id: &str) -> Vec<String> {
        let mut found = Vec::new();
        let mut pending = vec![id.to_string()];
        while let Some(current) = pending.pop() {
            for group in self.groups.iter().filter(|g| g.parent_id == current) {
                if found.contains(&group.id) || group.id == id {
                    continue;
                }
                found.push(group.id.clone());
                pending.push(group.id.clone());
            }
        }
        found
    }

    /// True if `candidate` is `ancestor` or lies anywhere below it.
    pub fn is_descendant_of(&self, candidate: &str, ancestor: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = candidate;
        while !current.is_empty() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current) {
                return false;
            }
            match self.group(current) {
                Some(group) => current = &group.parent_id,
                None => return false,
            }
        }
        false
    }

    /// Parents whose children do not hold orders `0..n` exactly once.
    pub fn order_violations(&self) -> Vec<String> {
        let mut orders: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for a in &self.actions {
            orders.entry(&a.parent_id).or_default().push(a.order);
        }
        for g in &self.groups {
            orders.entry(&g.parent_id).or_default().push(g.order);
        }

        orders
            .into_iter()
            .filter_map(|(parent, mut values)| {
                values.sort_unstable();
                let contiguous = values.iter().enumerate().all(|(i, &o)| i == o);
                if contiguous {
                    None
                } else if parent.is_empty() {
                    Some("<root>".to_string())
                } else {
                    Some(parent.to_string())
                }
            })
            .collect()
    }

    fn ensure_parent(&self, parent: &str) -> Result<(), TreeError> {
        if parent.is_empty() || self.group(parent).is_some() {
            Ok(())
        } else {
            Err(TreeError::GroupNotFound(parent.to_string()))
        }
    }

    fn next_order(&self, parent: &str) -> usize {
        let actions = self
            .actions
            .iter()
            .filter(|a| a.parent_id == parent)
            .map(|a| a.order);
        let groups = self
            .groups
            .iter()
            .filter(|g| g.parent_id == parent)
            .map(|g| g.order);
        actions.chain(groups).max().map_or(0, |max| max + 1)
    }

    fn child_count(&self, parent: &str) -> usize {
        self.actions.iter().filter(|a| a.parent_id == parent).count()
            + self.groups.iter().filter(|g| g.parent_id == parent).count()
    }

    fn location(&self, kind: NodeKind, id: &str) -> Result<(String, usize), TreeError> {
        match kind {
            NodeKind::Action => self
                .action(id)
                .map(|a| (a.parent_id.clone(), a.order))
                .ok_or_else(|| TreeError::ActionNotFound(id.to_string())),
            NodeKind::Group => self
                .group(id)
                .map(|g| (g.parent_id.clone(), g.order))
                .ok_or_else(|| TreeError::GroupNotFound(id.to_string())),
        }
    }

    fn place(&mut self, kind: NodeKind, id: &str, parent: &str, order: usize) {
        match kind {
            NodeKind::Action => {
                if let Some(a) = self.actions.iter_mut().find(|a| a.id == id) {
                    a.parent_id = parent.to_string();
                    a.order = order;
                }
            }
            NodeKind::Group => {
                if let Some(g) = self.groups.iter_mut().find(|g| g.id == id) {
                    g.parent_id = parent.to_string();
                    g.order = order;
                }
            }
        }
    }

    /// Visit the order slot of every child of `parent` except `skip`.
    fn for_each_sibling(&mut self, parent: &str, skip: &str, mut f: impl FnMut(&mut usize)) {
        for a in self.actions.iter_mut() {
            if a.parent_id == parent && a.id != skip {
                f(&mut a.order);
            }
        }
        for g in self.groups.iter_mut() {
            if g.parent_id == parent && g.id != skip {
                f(&mut g.order);
            }
        }
    }

    fn close_gap(&mut self, parent: &str, vacated: usize) {
        self.for_each_sibling(parent, "", |order| {
            if *order > vacated {
                *order -= 1;
            }
        });
    }

    fn step(&mut self, kind: NodeKind, id: &str, up: bool) -> Result<bool, TreeError> {
        let (parent, order) = self.location(kind, id)?;

        let target = if up {
            match order.checked_sub(1) {
                Some(t) => t,
                None => return Ok(false),
            }
        } else {
            if order + 1 >= self.next_order(&parent) {
                return Ok(false);
            }
            order + 1
        };

        let mut swapped = false;
        self.for_each_sibling(&parent, id, |sibling| {
            if !swapped && *sibling == target {
                *sibling = order;
                swapped = true;
            }
        });

        if swapped {
            self.place(kind, id, &parent, target);
        }
        Ok(swapped)
    }

    fn relocate(
        &mut self,
        kind: NodeKind,
        id: &str,
        new_parent: &str,
        new_order: usize,
    ) -> Result<(), TreeError> {
        let (old_parent, old_order) = self.location(kind, id)?;
        self.ensure_parent(new_parent)?;

        if kind == NodeKind::Group && self.is_descendant_of(new_parent, id) {
            return Err(TreeError::Cycle {
                group: id.to_string(),
                destination: new_parent.to_string(),
            });
        }

        self.for_each_sibling(&old_parent, id, |order| {
            if *order > old_order {
                *order -= 1;
            }
        });

        let mut siblings = self.child_count(new_parent);
        if old_parent == new_parent {
            siblings -= 1;
        }
        let slot = new_order.min(siblings);

        self.for_each_sibling(new_parent, id, |order| {
            if *order >= slot {
                *order += 1;
            }
        });
        self.place(kind, id, new_parent, slot);
        Ok(())
    }

    fn reattach_orphans(&mut self) {
        let known: HashSet<String> = self.groups.iter().map(|g| g.id.clone()).collect();

        for a in self.actions.iter_mut() {
            if !a.parent_id.is_empty() && !known.contains(&a.parent_id) {
                log::warn!(
                    "Action '{}' refers to missing group {}; moving to root",
                    a.name,
                    a.parent_id
                );
                a.parent_id.clear();
            }
        }
        for g in self.groups.iter_mut() {
            if !g.parent_id.is_empty() && !known.contains(&g.parent_id) {
                log::warn!(
                    "Group '{}' refers to missing group {}; moving to root",
                    g.name,
                    g.parent_id
                );
                g.parent_id.clear();
            }
        }

        // A parent loop is unreachable from the root; break it at the first member.
        let ids: Vec<String> = self.groups.iter().map(|g| g.id.clone()).collect();
        for id in ids {
            let parent = match self.group(&id) {
                Some(g) if !g.parent_id.is_empty() => g.parent_id.clone(),
                _ => continue,
            };
            if self.is_descendant_of(&parent, &id) {
                log::warn!("Group {} is part of a parent cycle; moving to root", id);
                if let Some(g) = self.groups.iter_mut().find(|g| g.id == id) {
                    g.parent_id.clear();
                }
            }
        }
    }

    fn normalize_orders(&mut self) {
        let mut parents: Vec<String> = self
            .actions
            .iter()
            .map(|a| a.parent_id.clone())
            .chain(self.groups.iter().map(|g| g.parent_id.clone()))
            .collect();
        parents.sort();
        parents.dedup();

        for parent in parents {
            let children = self.children(&parent);
            for (index, child) in children.iter().enumerate() {
                let kind = if child.is_group() {
                    NodeKind::Group
                } else {
                    NodeKind::Action
                };
                self.place(kind, child.id(), &parent, index);
            }
        }
    }
}
