use std::collections::HashSet;

use crate::{IdentityKey, NodeId, Snapshot};

/// A visible row of a [`Snapshot`], see [`flatten`].
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flattened {
    /// Identities from the top level down to this node.
    pub identifier: Vec<IdentityKey>,
    pub node: NodeId,
    pub has_children: bool,
}

impl Flattened {
    /// Zero based depth. Depth 0 means top level with 0 indentation.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.identifier.len().saturating_sub(1)
    }
}

/// Get a flat list of all visible (= below open) nodes of the `snapshot`.
///
/// The top level is always visible while nodes need to be open for their children to be visible.
#[must_use]
pub fn flatten(open_identifiers: &HashSet<Vec<IdentityKey>>, snapshot: &Snapshot) -> Vec<Flattened> {
    let mut result = Vec::new();
    flatten_level(&mut result, open_identifiers, snapshot, snapshot.roots(), &[]);
    result
}

fn flatten_level(
    result: &mut Vec<Flattened>,
    open_identifiers: &HashSet<Vec<IdentityKey>>,
    snapshot: &Snapshot,
    ids: &[NodeId],
    current: &[IdentityKey],
) {
    for node in ids.iter().filter_map(|id| snapshot.node(*id)) {
        let mut child_identifier = current.to_vec();
        child_identifier.push(node.identity());

        let is_open = open_identifiers.contains(&child_identifier);

        result.push(Flattened {
            identifier: child_identifier.clone(),
            node: node.id(),
            has_children: node.has_children(),
        });

        if let Some(children) = node.children().filter(|_| is_open) {
            flatten_level(result, open_identifiers, snapshot, children, &child_identifier);
        }
    }
}

#[cfg(test)]
use pretty_assertions::assert_eq;

#[cfg(test)]
fn example_snapshot() -> Snapshot {
    let mut sync = crate::HierarchySync::new(crate::LiveTreeCursor::new(
        &crate::LiveNode::example(),
    ));
    sync.refresh().unwrap();
    sync.snapshot()
}

#[cfg(test)]
fn open(paths: &[&[i64]]) -> HashSet<Vec<IdentityKey>> {
    paths
        .iter()
        .map(|path| path.iter().copied().map(IdentityKey::new).collect())
        .collect()
}

#[test]
fn depth_works() {
    let opened = open(&[&[2], &[2, 4]]);
    let depths = flatten(&opened, &example_snapshot())
        .into_iter()
        .map(|flattened| flattened.depth())
        .collect::<Vec<_>>();
    assert_eq!(depths, [0, 0, 1, 1, 2, 2, 1, 0]);
}

#[test]
fn depth_of_empty_identifier_is_top_level() {
    let row = Flattened {
        identifier: Vec::new(),
        node: example_snapshot().roots()[0],
        has_children: false,
    };
    assert_eq!(row.depth(), 0);
}

#[cfg(test)]
fn flatten_works(opened: &HashSet<Vec<IdentityKey>>, expected: &[i64]) {
    let result = flatten(opened, &example_snapshot());
    let actual = result
        .into_iter()
        .map(|flattened| flattened.identifier.last().unwrap().get())
        .collect::<Vec<_>>();
    assert_eq!(actual, expected);
}

#[test]
fn get_opened_nothing_opened_is_top_level() {
    flatten_works(&HashSet::new(), &[1, 2, 8]);
}

#[test]
fn get_opened_wrong_opened_is_only_top_level() {
    flatten_works(&open(&[&[1], &[2, 4]]), &[1, 2, 8]);
}

#[test]
fn get_opened_one_is_opened() {
    flatten_works(&open(&[&[2]]), &[1, 2, 3, 4, 7, 8]);
}

#[test]
fn get_opened_all_opened() {
    flatten_works(&open(&[&[2], &[2, 4]]), &[1, 2, 3, 4, 5, 6, 7, 8]);
}
