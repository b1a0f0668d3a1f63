use std::convert::Infallible;

use crate::{HierarchyCursor, IdentityKey};

/// One object of an in-memory live tree.
///
/// Can have zero or more `children`.
///
/// # Identity
///
/// The `identity` is what [`HierarchySync`](crate::HierarchySync) compares across refreshes.
/// It needs to be unique among its siblings.
/// The `name` is only a label: renaming an object keeps it the same object.
///
/// # Example
///
/// ```
/// # use hierarchy_sync::{IdentityKey, LiveNode};
/// let camera = LiveNode::new_leaf(IdentityKey::new(10), "Camera");
/// let rig = LiveNode::new(IdentityKey::new(1), "Rig", vec![camera])?;
/// # Ok::<(), hierarchy_sync::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveNode {
    pub(super) identity: IdentityKey,
    pub(super) name: String,
    pub(super) children: Vec<LiveNode>,
}

impl LiveNode {
    /// Create a new `LiveNode` without children.
    #[must_use]
    pub fn new_leaf<N>(identity: IdentityKey, name: N) -> Self
    where
        N: Into<String>,
    {
        Self {
            identity,
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Create a new `LiveNode` with children.
    ///
    /// # Errors
    ///
    /// Errors when there are duplicate identities in the children.
    #[track_caller]
    pub fn new<N>(identity: IdentityKey, name: N, children: Vec<Self>) -> crate::Result<Self>
    where
        N: Into<String>,
    {
        crate::unique_identifiers::children(&children)?;
        Ok(Self {
            identity,
            name: name.into(),
            children,
        })
    }

    #[must_use]
    pub const fn identity(&self) -> IdentityKey {
        self.identity
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name<N>(&mut self, name: N)
    where
        N: Into<String>,
    {
        self.name = name.into();
    }

    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Get a reference to a child by index.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Self> {
        self.children.get(index)
    }

    /// Get a mutable reference to a child by index.
    #[must_use]
    pub fn child_mut(&mut self, index: usize) -> Option<&mut Self> {
        self.children.get_mut(index)
    }

    /// Add a child to the `LiveNode`.
    ///
    /// # Errors
    ///
    /// Errors when the `identity` of the `child` already exists in the children.
    pub fn add_child(&mut self, child: Self) -> crate::Result<()> {
        crate::unique_identifiers::add_child(&self.children, child.identity)?;
        self.children.push(child);
        Ok(())
    }

    /// Remove the child at `index`, returning it when it existed.
    pub fn remove_child(&mut self, index: usize) -> Option<Self> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }
}

impl LiveNode {
    #[cfg(test)]
    pub(crate) fn example() -> Vec<Self> {
        let key = IdentityKey::new;
        vec![
            Self::new_leaf(key(1), "Alfa"),
            Self::new(
                key(2),
                "Bravo",
                vec![
                    Self::new_leaf(key(3), "Charlie"),
                    Self::new(
                        key(4),
                        "Delta",
                        vec![Self::new_leaf(key(5), "Echo"), Self::new_leaf(key(6), "Foxtrot")],
                    )
                    .expect("all identities are unique"),
                    Self::new_leaf(key(7), "Golf"),
                ],
            )
            .expect("all identities are unique"),
            Self::new_leaf(key(8), "Hotel"),
        ]
    }
}

#[derive(Debug, Clone)]
struct Entry {
    depth: usize,
    name: String,
    identity: IdentityKey,
    has_children: bool,
}

/// [`HierarchyCursor`] over [`LiveNode`]s.
///
/// The nodes are flattened in pre-order when the cursor is created.
/// Call [`update`](Self::update) after the live nodes changed.
#[derive(Debug, Clone)]
pub struct LiveTreeCursor {
    entries: Vec<Entry>,
    /// One past the current entry. `0` is before the first entry, `entries.len() + 1` is exhausted.
    position: usize,
}

impl LiveTreeCursor {
    #[must_use]
    pub fn new(nodes: &[LiveNode]) -> Self {
        let mut entries = Vec::new();
        collect(&mut entries, nodes, 0);
        Self {
            entries,
            position: 0,
        }
    }

    /// Point the cursor at the current state of `nodes` and rewind it.
    pub fn update(&mut self, nodes: &[LiveNode]) {
        self.entries.clear();
        collect(&mut self.entries, nodes, 0);
        self.position = 0;
    }

    /// Amount of positions the cursor can visit.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn current(&self) -> Option<&Entry> {
        self.position
            .checked_sub(1)
            .and_then(|index| self.entries.get(index))
    }
}

fn collect(entries: &mut Vec<Entry>, nodes: &[LiveNode], depth: usize) {
    for node in nodes {
        entries.push(Entry {
            depth,
            name: node.name.clone(),
            identity: node.identity,
            has_children: !node.children.is_empty(),
        });
        collect(entries, &node.children, depth + 1);
    }
}

impl HierarchyCursor for LiveTreeCursor {
    type Error = Infallible;

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.position = 0;
        Ok(())
    }

    fn advance(&mut self) -> Result<bool, Self::Error> {
        if self.position <= self.entries.len() {
            self.position += 1;
        }
        Ok(self.position <= self.entries.len())
    }

    fn step_back(&mut self) {
        self.position = self.position.saturating_sub(1);
    }

    fn depth(&self) -> usize {
        self.current().map_or(0, |entry| entry.depth)
    }

    fn name(&self) -> &str {
        self.current().map_or("", |entry| entry.name.as_str())
    }

    fn identity(&self) -> IdentityKey {
        self.current()
            .map_or(IdentityKey::NONE, |entry| entry.identity)
    }

    fn has_children(&self) -> bool {
        self.current().is_some_and(|entry| entry.has_children)
    }
}

#[test]
#[should_panic = "DuplicateIdentity"]
fn live_node_new_errors_with_duplicate_identities() {
    let item = LiveNode::new_leaf(IdentityKey::new(1), "same");
    let another = item.clone();
    LiveNode::new(IdentityKey::new(9), "Root", vec![item, another]).unwrap();
}

#[test]
#[should_panic = "DuplicateIdentity"]
fn live_node_add_child_errors_with_duplicate_identities() {
    let item = LiveNode::new_leaf(IdentityKey::new(1), "text");
    let another = LiveNode::new_leaf(IdentityKey::new(1), "other text");
    let mut root = LiveNode::new(IdentityKey::new(9), "Root", vec![item]).unwrap();
    root.add_child(another).unwrap();
}

#[test]
fn remove_child_out_of_range_is_none() {
    let mut root = LiveNode::example().remove(1);
    assert!(root.remove_child(3).is_none());
    assert_eq!(root.remove_child(0).map(|child| child.identity()), Some(IdentityKey::new(3)));
    assert_eq!(root.children().len(), 2);
}

#[test]
fn cursor_walks_pre_order() {
    let mut cursor = LiveTreeCursor::new(&LiveNode::example());
    let mut visited = Vec::new();
    while cursor.advance().unwrap() {
        visited.push((cursor.depth(), cursor.identity().get(), cursor.has_children()));
    }
    assert_eq!(
        visited,
        [
            (0, 1, false),
            (0, 2, true),
            (1, 3, false),
            (1, 4, true),
            (2, 5, false),
            (2, 6, false),
            (1, 7, false),
            (0, 8, false),
        ]
    );
}

#[test]
fn cursor_stays_exhausted() {
    let mut cursor = LiveTreeCursor::new(&[LiveNode::new_leaf(IdentityKey::new(1), "only")]);
    assert!(cursor.advance().unwrap());
    assert!(!cursor.advance().unwrap());
    assert!(!cursor.advance().unwrap());
    assert!(cursor.identity().is_none());
}

#[test]
fn cursor_step_back_revisits_position() {
    let mut cursor = LiveTreeCursor::new(&LiveNode::example());
    cursor.advance().unwrap();
    cursor.advance().unwrap();
    assert_eq!(cursor.name(), "Bravo");
    cursor.step_back();
    assert_eq!(cursor.name(), "Alfa");
    cursor.advance().unwrap();
    assert_eq!(cursor.name(), "Bravo");

    cursor.reset().unwrap();
    cursor.advance().unwrap();
    assert_eq!(cursor.name(), "Alfa");
}

#[test]
fn cursor_step_back_after_exhaustion_returns_to_last() {
    let mut cursor = LiveTreeCursor::new(&LiveNode::example());
    while cursor.advance().unwrap() {}
    cursor.step_back();
    assert_eq!(cursor.name(), "Hotel");
}
