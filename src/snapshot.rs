use std::sync::Arc;

use crate::arena::{Arena, NodeRecord};
use crate::{IdentityKey, NodeId};

/// The mirrored hierarchy as of one refresh.
///
/// Cheap to clone and never mutated: a later refresh builds a new `Snapshot`.
/// Nodes that did not change between two snapshots share their storage.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    generation: u64,
    arena: Arc<Arena>,
}

impl Snapshot {
    pub(crate) const fn new(generation: u64, arena: Arc<Arena>) -> Self {
        Self { generation, arena }
    }

    pub(crate) fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Amount of changes the engine committed before this snapshot was taken.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Top level nodes in live tree order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.arena.roots
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.roots.is_empty()
    }

    /// Amount of nodes in the whole hierarchy.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns `None` for ids of nodes that were replaced or removed before this snapshot.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.arena.get(id).map(|record| NodeRef {
            id,
            record,
            snapshot: self,
        })
    }

    /// Top level nodes in live tree order.
    pub fn root_nodes(&self) -> impl Iterator<Item = NodeRef<'_>> {
        self.roots().iter().filter_map(|id| self.node(*id))
    }

    /// Select a node by the identities from the top level down to it.
    ///
    /// ```
    /// # use hierarchy_sync::{HierarchySync, IdentityKey, LiveNode, LiveTreeCursor};
    /// let key = IdentityKey::new;
    /// let live = vec![LiveNode::new(key(1), "Rig", vec![LiveNode::new_leaf(key(10), "Camera")])?];
    /// let mut sync = HierarchySync::new(LiveTreeCursor::new(&live));
    /// sync.refresh()?;
    ///
    /// let snapshot = sync.snapshot();
    /// assert_eq!(snapshot.find(&[key(1), key(10)]).map(|node| node.name()), Some("Camera"));
    /// assert!(snapshot.find(&[key(10)]).is_none());
    /// # Ok::<(), hierarchy_sync::Error>(())
    /// ```
    #[must_use]
    pub fn find(&self, path: &[IdentityKey]) -> Option<NodeRef<'_>> {
        let mut path = path.iter();
        let initial = path.next()?;
        let mut current = self
            .root_nodes()
            .find(|node| node.identity() == *initial)?;
        for identity in path {
            current = current.child_direct(*identity)?;
        }
        Some(current)
    }

    /// All nodes in pre-order together with their zero based depth.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        let mut pending = Vec::with_capacity(self.roots().len());
        pending.extend(self.roots().iter().rev().map(|id| (0, *id)));
        Iter {
            snapshot: self,
            pending,
        }
    }

    /// Whether both snapshots hold the very same record for `id`.
    ///
    /// `true` means the node was not touched between the two snapshots.
    #[must_use]
    pub fn shares_node(&self, other: &Self, id: NodeId) -> bool {
        match (self.arena.get_shared(id), other.arena.get_shared(id)) {
            (Some(mine), Some(theirs)) => Arc::ptr_eq(mine, theirs),
            _ => false,
        }
    }

    /// Whether both snapshots are the same generation of the same engine storage.
    #[must_use]
    pub fn same_generation(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.arena, &other.arena)
    }
}

/// A node inside a [`Snapshot`].
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    id: NodeId,
    record: &'a NodeRecord,
    snapshot: &'a Snapshot,
}

impl<'a> NodeRef<'a> {
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.record.name
    }

    #[must_use]
    pub const fn identity(&self) -> IdentityKey {
        self.record.identity
    }

    /// `None` when the node has no children. Never an empty slice.
    #[must_use]
    pub fn children(&self) -> Option<&'a [NodeId]> {
        self.record.children.as_deref()
    }

    #[must_use]
    pub const fn has_children(&self) -> bool {
        self.record.children.is_some()
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = NodeRef<'a>> {
        let snapshot = self.snapshot;
        self.children()
            .unwrap_or_default()
            .iter()
            .filter_map(move |id| snapshot.node(*id))
    }

    #[must_use]
    pub fn child_direct(&self, identity: IdentityKey) -> Option<NodeRef<'a>> {
        self.child_nodes().find(|child| child.identity() == identity)
    }
}

/// Pre-order iterator over a [`Snapshot`], see [`Snapshot::iter`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    snapshot: &'a Snapshot,
    pending: Vec<(usize, NodeId)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (usize, NodeRef<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (depth, id) = self.pending.pop()?;
            let Some(node) = self.snapshot.node(id) else {
                continue;
            };
            if let Some(children) = node.children() {
                self.pending
                    .extend(children.iter().rev().map(|id| (depth + 1, *id)));
            }
            return Some((depth, node));
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (usize, NodeRef<'a>);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
fn example_snapshot() -> Snapshot {
    let mut sync = crate::HierarchySync::new(crate::LiveTreeCursor::new(
        &crate::LiveNode::example(),
    ));
    sync.refresh().unwrap();
    sync.snapshot()
}

#[test]
fn empty_by_default() {
    let snapshot = Snapshot::default();
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.len(), 0);
    assert_eq!(snapshot.generation(), 0);
    assert_eq!(snapshot.iter().count(), 0);
}

#[test]
fn iter_is_pre_order_with_depth() {
    let snapshot = example_snapshot();
    let visited = snapshot
        .iter()
        .map(|(depth, node)| (depth, node.name()))
        .collect::<Vec<_>>();
    assert_eq!(
        visited,
        [
            (0, "Alfa"),
            (0, "Bravo"),
            (1, "Charlie"),
            (1, "Delta"),
            (2, "Echo"),
            (2, "Foxtrot"),
            (1, "Golf"),
            (0, "Hotel"),
        ]
    );
    assert_eq!(snapshot.len(), 8);
}

#[test]
fn leaves_have_no_children_list() {
    let snapshot = example_snapshot();
    let alfa = snapshot.find(&[IdentityKey::new(1)]).unwrap();
    assert!(alfa.children().is_none());
    assert!(!alfa.has_children());

    let bravo = snapshot.find(&[IdentityKey::new(2)]).unwrap();
    assert_eq!(bravo.children().map(<[NodeId]>::len), Some(3));
}

#[test]
fn find_follows_identity_path() {
    let snapshot = example_snapshot();
    let key = IdentityKey::new;
    let echo = snapshot.find(&[key(2), key(4), key(5)]).unwrap();
    assert_eq!(echo.name(), "Echo");
    assert!(snapshot.find(&[key(2), key(5)]).is_none());
    assert!(snapshot.find(&[]).is_none());
}

#[test]
fn snapshots_can_move_to_other_threads() {
    fn assert_send_sync<T: Send + Sync>(_: &T) {}
    let snapshot = example_snapshot();
    assert_send_sync(&snapshot);

    let names = std::thread::spawn(move || {
        snapshot
            .iter()
            .map(|(_, node)| node.name().to_owned())
            .collect::<Vec<_>>()
    })
    .join()
    .unwrap();
    assert_eq!(names.len(), 8);
}
