//! Group hierarchy: forest construction and structural constraints.
//!
//! Every fetch yields a flat list of groups; the tree is rebuilt from
//! scratch each time. Parent links are expected to form a forest, but all
//! walks here are guarded against a corrupted cycle so bad server data can
//! never hang the console.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::warn;

use crate::error::{ConsoleError, ConsoleResult};
use crate::models::group::{Group, GroupType};

/// A group plus its children, derived on every fetch and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTreeNode {
    pub group: Group,
    pub children: Vec<GroupTreeNode>,
}

impl GroupTreeNode {
    /// Number of groups in this subtree, including the node itself.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(GroupTreeNode::size).sum::<usize>()
    }

    pub fn find(&self, id: &str) -> Option<&GroupTreeNode> {
        if self.group.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Build the forest for a flat group list.
///
/// A group is attached under its `parent_id` when that id is present in
/// `groups`; otherwise it becomes a root. Sibling and root order follow
/// input order. Groups caught in a parent cycle (unreachable from any root)
/// are promoted to roots at the point the cycle is first entered, so every
/// input group appears exactly once.
pub fn build_tree(groups: &[Group]) -> Vec<GroupTreeNode> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(groups.len());
    for (i, group) in groups.iter().enumerate() {
        index.entry(group.id.as_str()).or_insert(i);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); groups.len()];
    let mut roots = Vec::new();
    for (i, group) in groups.iter().enumerate() {
        match group.parent_id.as_deref().and_then(|p| index.get(p)) {
            Some(&parent) => children[parent].push(i),
            None => roots.push(i),
        }
    }

    let mut placed = vec![false; groups.len()];
    let mut forest = Vec::with_capacity(roots.len());
    for root in roots {
        forest.push(assemble(root, groups, &children, &mut placed));
    }

    for i in 0..groups.len() {
        if !placed[i] {
            warn!(group_id = %groups[i].id, "group is part of a parent cycle; treating it as a root");
            forest.push(assemble(i, groups, &children, &mut placed));
        }
    }

    forest
}

fn assemble(
    i: usize,
    groups: &[Group],
    children: &[Vec<usize>],
    placed: &mut [bool],
) -> GroupTreeNode {
    placed[i] = true;
    let mut node = GroupTreeNode {
        group: groups[i].clone(),
        children: Vec::with_capacity(children[i].len()),
    };
    for &child in &children[i] {
        if !placed[child] {
            node.children.push(assemble(child, groups, children, placed));
        }
    }
    node
}

/// Id lookup over a flat group list.
#[derive(Debug)]
pub struct GroupIndex<'a> {
    by_id: HashMap<&'a str, &'a Group>,
}

impl<'a> GroupIndex<'a> {
    pub fn new(groups: &'a [Group]) -> Self {
        let mut by_id = HashMap::with_capacity(groups.len());
        for group in groups {
            by_id.entry(group.id.as_str()).or_insert(group);
        }
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&'a Group> {
        self.by_id.get(id).copied()
    }

    /// Parent chain of `id`, nearest first. Stops at a root, a dangling
    /// parent reference, or the first repeated id.
    pub fn ancestors(&self, id: &str) -> Vec<&'a Group> {
        let mut ancestors = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(id);

        let mut current = self.get(id).and_then(|g| g.parent_id.as_deref());
        while let Some(parent_id) = current {
            if !visited.insert(parent_id) {
                break;
            }
            let Some(parent) = self.get(parent_id) else {
                break;
            };
            ancestors.push(parent);
            current = parent.parent_id.as_deref();
        }
        ancestors
    }

    /// Whether `ancestor_id` lies on the parent chain above `group_id`.
    pub fn is_descendant_of(&self, group_id: &str, ancestor_id: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut current = self.get(group_id).and_then(|g| g.parent_id.as_deref());
        while let Some(parent_id) = current {
            if parent_id == ancestor_id {
                return true;
            }
            if !visited.insert(parent_id) {
                return false;
            }
            current = self.get(parent_id).and_then(|g| g.parent_id.as_deref());
        }
        false
    }
}

/// Ids of every group below `id`, breadth first. Used to report what a
/// delete will take with it.
pub fn descendant_ids(groups: &[Group], id: &str) -> Vec<String> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for group in groups {
        if let Some(parent) = group.parent_id.as_deref() {
            children.entry(parent).or_default().push(group.id.as_str());
        }
    }

    let mut seen: HashSet<&str> = HashSet::from([id]);
    let mut queue: VecDeque<&str> = VecDeque::from([id]);
    let mut out = Vec::new();
    while let Some(current) = queue.pop_front() {
        for &child in children.get(current).map(Vec::as_slice).unwrap_or_default() {
            if seen.insert(child) {
                out.push(child.to_owned());
                queue.push_back(child);
            }
        }
    }
    out
}

/// Groups that may be chosen as parent for a group of `group_type`.
///
/// When `editing` names an existing group, that group and all of its
/// descendants are excluded so a move can never close a cycle.
pub fn parent_candidates<'a>(
    groups: &'a [Group],
    group_type: GroupType,
    editing: Option<&str>,
) -> Vec<&'a Group> {
    let index = GroupIndex::new(groups);
    groups
        .iter()
        .filter(|candidate| group_type.is_allowed_parent(candidate.group_type))
        .filter(|candidate| match editing {
            Some(id) => candidate.id != id && !index.is_descendant_of(&candidate.id, id),
            None => true,
        })
        .collect()
}

/// Check a type/parent combination before it is submitted.
///
/// `editing` is the id of the group being edited, `None` when creating.
/// Failures are field-level [`ConsoleError::Validation`] errors.
pub fn validate_placement(
    groups: &[Group],
    editing: Option<&str>,
    group_type: GroupType,
    parent_id: Option<&str>,
) -> ConsoleResult<()> {
    let parent_id = parent_id.filter(|p| !p.is_empty());
    let index = GroupIndex::new(groups);

    match parent_id {
        None if group_type.requires_parent() => {
            return Err(ConsoleError::validation(
                "parentId",
                format!("a {group_type} must have a parent group"),
            ));
        }
        None => {}
        Some(_) if !group_type.requires_parent() => {
            return Err(ConsoleError::validation(
                "parentId",
                format!("a {group_type} cannot have a parent group"),
            ));
        }
        Some(parent_id) => {
            let parent = index.get(parent_id).ok_or_else(|| {
                ConsoleError::validation(
                    "parentId",
                    format!("parent group `{parent_id}` does not exist"),
                )
            })?;

            if let Some(id) = editing {
                if parent.id == id {
                    return Err(ConsoleError::validation(
                        "parentId",
                        "a group cannot be its own parent",
                    ));
                }
                if index.is_descendant_of(&parent.id, id) {
                    return Err(ConsoleError::validation(
                        "parentId",
                        "a group cannot be moved under one of its descendants",
                    ));
                }
            }

            if !group_type.is_allowed_parent(parent.group_type) {
                return Err(ConsoleError::validation(
                    "parentId",
                    format!(
                        "a {group_type} cannot be placed under a {}",
                        parent.group_type
                    ),
                ));
            }
        }
    }

    // Retyping a group must keep its existing children legal.
    if let Some(id) = editing {
        if let Some(child) = groups.iter().find(|g| {
            g.parent_id.as_deref() == Some(id) && !g.group_type.is_allowed_parent(group_type)
        }) {
            return Err(ConsoleError::validation(
                "type",
                format!(
                    "child group `{}` ({}) cannot sit under a {group_type}",
                    child.name, child.group_type
                ),
            ));
        }
    }

    Ok(())
}
