use std::fmt;
use std::sync::Arc;

use crate::IdentityKey;

/// Address of a node in a [`Snapshot`](crate::Snapshot).
///
/// A node that keeps its identity and position across refreshes keeps its `NodeId`.
/// Replaced or removed nodes release their slot and the generation of the slot is bumped,
/// so an old `NodeId` never points at a different node.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub(crate) name: String,
    pub(crate) identity: IdentityKey,
    /// `None` instead of an empty list.
    pub(crate) children: Option<Vec<NodeId>>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    record: Option<Arc<NodeRecord>>,
}

/// Generational storage of the mirrored nodes.
///
/// Records are shared between clones of the arena.
/// Writing a record replaces the shared pointer of this arena only.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
    pub(crate) roots: Vec<NodeId>,
}

impl Arena {
    /// Amount of live nodes.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Store a new node.
    ///
    /// An arena holds at most `u32::MAX` slots at once.
    #[allow(clippy::cast_possible_truncation)]
    pub fn insert(&mut self, record: NodeRecord) -> NodeId {
        self.len += 1;
        let record = Some(Arc::new(record));

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = record;
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                record,
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeRecord> {
        self.get_shared(id).map(Arc::as_ref)
    }

    pub(crate) fn get_shared(&self, id: NodeId) -> Option<&Arc<NodeRecord>> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.record.as_ref()
    }

    /// Overwrite the record of a live node, keeping its `NodeId`.
    ///
    /// Returns `false` when `id` is stale.
    pub fn set(&mut self, id: NodeId, record: NodeRecord) -> bool {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation && slot.record.is_some() => {
                slot.record = Some(Arc::new(record));
                true
            }
            _ => false,
        }
    }

    /// Release a node and all of its descendants.
    ///
    /// Returns the amount of released nodes.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        let mut removed = 0;
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(slot) = self.slots.get_mut(id.index as usize) else {
                continue;
            };
            if slot.generation != id.generation {
                continue;
            }
            let Some(record) = slot.record.take() else {
                continue;
            };
            // A slot whose generation is used up is retired instead of reused.
            if let Some(generation) = slot.generation.checked_add(1) {
                slot.generation = generation;
                self.free.push(id.index);
            }
            self.len -= 1;
            removed += 1;
            if let Some(children) = &record.children {
                pending.extend_from_slice(children);
            }
        }
        removed
    }
}

#[cfg(test)]
fn leaf(raw: i64) -> NodeRecord {
    NodeRecord {
        name: format!("node {raw}"),
        identity: IdentityKey::new(raw),
        children: None,
    }
}

#[test]
fn removed_ids_are_stale() {
    let mut arena = Arena::default();
    let id = arena.insert(leaf(1));
    assert_eq!(arena.remove_subtree(id), 1);
    assert!(arena.get(id).is_none());
    assert!(!arena.set(id, leaf(2)));

    let reused = arena.insert(leaf(3));
    assert_eq!(reused.index(), id.index());
    assert_ne!(reused, id);
    assert!(arena.get(id).is_none());
    assert_eq!(arena.len(), 1);
}

#[test]
fn remove_subtree_releases_descendants() {
    let mut arena = Arena::default();
    let child = arena.insert(leaf(2));
    let grandchild = arena.insert(leaf(3));
    let mut middle = leaf(4);
    middle.children = Some(vec![grandchild]);
    let middle = arena.insert(middle);
    let mut root = leaf(1);
    root.children = Some(vec![child, middle]);
    let root = arena.insert(root);
    let other = arena.insert(leaf(5));

    assert_eq!(arena.remove_subtree(root), 4);
    assert_eq!(arena.len(), 1);
    assert!(arena.get(grandchild).is_none());
    assert!(arena.get(other).is_some());
}

#[test]
fn exhausted_slots_are_retired() {
    let mut arena = Arena::default();
    let id = arena.insert(leaf(1));
    arena.slots[0].generation = u32::MAX;
    let last = NodeId {
        index: id.index,
        generation: u32::MAX,
    };

    assert_eq!(arena.remove_subtree(last), 1);
    assert!(arena.get(last).is_none());
    let fresh = arena.insert(leaf(2));
    assert_ne!(fresh.index(), id.index());
    assert!(arena.get(last).is_none());
}

#[test]
fn clones_share_records_until_written() {
    let mut arena = Arena::default();
    let id = arena.insert(leaf(1));
    let before = arena.clone();

    assert!(arena.set(id, leaf(7)));
    assert_eq!(before.get(id).map(|record| record.identity), Some(IdentityKey::new(1)));
    assert_eq!(arena.get(id).map(|record| record.identity), Some(IdentityKey::new(7)));
}
