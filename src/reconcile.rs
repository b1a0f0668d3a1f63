use tracing::trace;

use crate::arena::{Arena, NodeRecord};
use crate::{EnumerationError, HierarchyCursor, IdentityKey, NodeId};

/// One open level of the walk.
struct Frame {
    /// `None` is the virtual root above the top level.
    depth: Option<usize>,
    /// `None` for the virtual root.
    node: Option<NodeId>,
    name: String,
    identity: IdentityKey,
    /// Children of the node before this walk.
    cached: Vec<NodeId>,
    /// Children reconciled so far.
    children: Vec<NodeId>,
}

impl Frame {
    const fn contains(&self, depth: usize) -> bool {
        match self.depth {
            Some(own) => depth > own,
            None => true,
        }
    }
}

struct Walk<'a, Cursor> {
    cursor: &'a mut Cursor,
    arena: &'a mut Arena,
    exclude: Option<IdentityKey>,
    changed: bool,
    advances: usize,
}

/// Reconcile the `arena` with the tree behind `cursor`.
///
/// Returns whether anything differs from what the `arena` held before.
/// On error the `arena` is left half updated: callers walk a copy.
pub fn reconcile<Cursor>(
    cursor: &mut Cursor,
    arena: &mut Arena,
    exclude: Option<IdentityKey>,
) -> Result<bool, EnumerationError>
where
    Cursor: HierarchyCursor,
{
    let mut walk = Walk {
        cursor,
        arena,
        exclude,
        changed: false,
        advances: 0,
    };
    walk.run()?;
    Ok(walk.changed)
}

impl<Cursor> Walk<'_, Cursor>
where
    Cursor: HierarchyCursor,
{
    fn advance(&mut self) -> Result<bool, EnumerationError> {
        let advanced = self
            .cursor
            .advance()
            .map_err(|source| EnumerationError::new(self.advances, source))?;
        if advanced {
            self.advances += 1;
        }
        Ok(advanced)
    }

    /// Hand the current position back, it is read again by the next advance.
    fn step_back(&mut self) {
        self.cursor.step_back();
        self.advances = self.advances.saturating_sub(1);
    }

    fn run(&mut self) -> Result<(), EnumerationError> {
        self.cursor
            .reset()
            .map_err(|source| EnumerationError::new(0, source))?;

        let mut stack = vec![Frame {
            depth: None,
            node: None,
            name: String::new(),
            identity: IdentityKey::NONE,
            cached: self.arena.roots.clone(),
            children: Vec::new(),
        }];
        let mut exhausted = false;

        while let Some(top) = stack.last() {
            let advanced = !exhausted && self.advance()?;
            exhausted = !advanced;

            if !advanced || !top.contains(self.cursor.depth()) {
                if advanced {
                    // Belongs to an ancestor level, which sees it on its next advance.
                    self.step_back();
                }
                if let Some(frame) = stack.pop() {
                    self.finish(frame);
                }
                continue;
            }

            let depth = self.cursor.depth();
            let identity = self.cursor.identity();
            if identity.is_none() || Some(identity) == self.exclude {
                trace!(%identity, depth, "skipping excluded subtree");
                exhausted = !self.skip_subtree(depth)?;
                continue;
            }

            let name = self.cursor.name().to_owned();
            let position = stack
                .last()
                .and_then(|parent| parent.cached.get(parent.children.len()).copied());
            let (node, cached) = self.enter(position, &name, identity);
            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
            }

            let frame = Frame {
                depth: Some(depth),
                node: Some(node),
                name,
                identity,
                cached,
                children: Vec::new(),
            };
            if self.cursor.has_children() {
                stack.push(frame);
            } else {
                self.finish(frame);
            }
        }

        Ok(())
    }

    /// Pick the node for the next position of the current level.
    /// `position` is the cached node at that position, if any.
    ///
    /// Reuses the cached node at that position when the identity still matches,
    /// otherwise replaces it (and its subtree) with a fresh node.
    /// Returns the node and its previous children.
    fn enter(
        &mut self,
        position: Option<NodeId>,
        name: &str,
        identity: IdentityKey,
    ) -> (NodeId, Vec<NodeId>) {
        if let Some(cached) = position {
            if let Some(record) = self.arena.get(cached) {
                if record.identity == identity {
                    return (cached, record.children.clone().unwrap_or_default());
                }
            }
            let released = self.arena.remove_subtree(cached);
            trace!(%identity, ?cached, released, "structural replacement");
        }

        self.changed = true;
        let fresh = self.arena.insert(NodeRecord {
            name: name.to_owned(),
            identity,
            children: None,
        });
        (fresh, Vec::new())
    }

    /// Skip the subtree of the node at `depth` the cursor is on.
    ///
    /// Returns `false` when that exhausted the cursor.
    fn skip_subtree(&mut self, depth: usize) -> Result<bool, EnumerationError> {
        while self.advance()? {
            if self.cursor.depth() <= depth {
                self.step_back();
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn finish(&mut self, frame: Frame) {
        let Frame {
            node,
            name,
            identity,
            cached,
            children,
            ..
        } = frame;

        if let Some(stale) = cached.get(children.len()..).filter(|stale| !stale.is_empty()) {
            for id in stale {
                self.arena.remove_subtree(*id);
            }
            trace!(%identity, kept = children.len(), removed = stale.len(), "truncated children");
            self.changed = true;
        }

        let Some(node) = node else {
            self.arena.roots = children;
            return;
        };

        let record = NodeRecord {
            name,
            identity,
            children: (!children.is_empty()).then_some(children),
        };
        if self.arena.get(node) != Some(&record) {
            self.changed = true;
            self.arena.set(node, record);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{HierarchySync, IdentityKey, LiveNode, LiveTreeCursor, Snapshot};

    fn key(raw: i64) -> IdentityKey {
        IdentityKey::new(raw)
    }

    fn leaf(raw: i64, name: &str) -> LiveNode {
        LiveNode::new_leaf(key(raw), name)
    }

    fn branch(raw: i64, name: &str, children: Vec<LiveNode>) -> LiveNode {
        LiveNode::new(key(raw), name, children).unwrap()
    }

    fn outline(snapshot: &Snapshot) -> Vec<(usize, String)> {
        snapshot
            .iter()
            .map(|(depth, node)| (depth, node.name().to_owned()))
            .collect()
    }

    fn expected(rows: &[(usize, &str)]) -> Vec<(usize, String)> {
        rows.iter()
            .map(|(depth, name)| (*depth, (*name).to_owned()))
            .collect()
    }

    fn synced(live: &[LiveNode]) -> HierarchySync<LiveTreeCursor> {
        let mut sync = HierarchySync::new(LiveTreeCursor::new(live));
        assert!(sync.refresh().unwrap());
        sync
    }

    fn resync(sync: &mut HierarchySync<LiveTreeCursor>, live: &[LiveNode]) -> bool {
        sync.cursor_mut().update(live);
        sync.refresh().unwrap()
    }

    fn simple() -> Vec<LiveNode> {
        vec![branch(1, "A", vec![leaf(10, "X")]), leaf(2, "B")]
    }

    #[test]
    fn first_refresh_builds_tree() {
        let sync = synced(&simple());
        let snapshot = sync.snapshot();
        assert_eq!(outline(&snapshot), expected(&[(0, "A"), (1, "X"), (0, "B")]));
        assert_eq!(snapshot.generation(), 1);
    }

    #[test]
    fn empty_live_tree_is_no_change() {
        let mut sync = HierarchySync::new(LiveTreeCursor::new(&[]));
        assert!(!sync.refresh().unwrap());
        assert!(sync.snapshot().is_empty());
        assert_eq!(sync.generation(), 0);
    }

    #[test]
    fn second_refresh_without_changes_is_idempotent() {
        let live = simple();
        let mut sync = synced(&live);
        let before = sync.snapshot();

        assert!(!resync(&mut sync, &live));
        let after = sync.snapshot();
        assert!(after.same_generation(&before));
        assert_eq!(after.roots(), before.roots());
    }

    #[test]
    fn rename_keeps_node_id() {
        let mut live = simple();
        let mut sync = synced(&live);
        let before = sync.snapshot();
        let b = before.find(&[key(2)]).unwrap().id();

        live[1].set_name("B2");
        assert!(resync(&mut sync, &live));
        let after = sync.snapshot();

        let renamed = after.find(&[key(2)]).unwrap();
        assert_eq!(renamed.id(), b);
        assert_eq!(renamed.name(), "B2");
        assert_eq!(before.node(b).unwrap().name(), "B");

        let a = before.find(&[key(1)]).unwrap().id();
        let x = before.find(&[key(1), key(10)]).unwrap().id();
        assert!(after.shares_node(&before, a));
        assert!(after.shares_node(&before, x));
        assert!(!after.shares_node(&before, b));
    }

    #[test]
    fn nested_rename_keeps_parent_record() {
        let mut live = simple();
        let mut sync = synced(&live);
        let before = sync.snapshot();

        live[0].child_mut(0).unwrap().set_name("X2");
        assert!(resync(&mut sync, &live));
        let after = sync.snapshot();

        let a = before.find(&[key(1)]).unwrap().id();
        let x = before.find(&[key(1), key(10)]).unwrap().id();
        assert!(after.shares_node(&before, a));
        assert_eq!(after.node(x).unwrap().name(), "X2");
    }

    #[test]
    fn identity_change_replaces_node() {
        let mut sync = synced(&simple());
        let before = sync.snapshot();
        let b = before.find(&[key(2)]).unwrap().id();

        let live = vec![branch(1, "A", vec![leaf(10, "X")]), leaf(3, "B")];
        assert!(resync(&mut sync, &live));
        let after = sync.snapshot();

        let replaced = after.find(&[key(3)]).unwrap();
        assert_ne!(replaced.id(), b);
        assert!(after.node(b).is_none());
        assert_eq!(after.roots()[0], before.roots()[0]);
        assert_eq!(after.len(), 3);
    }

    #[test]
    fn replacement_discards_whole_subtree() {
        let mut sync = synced(&simple());
        let before = sync.snapshot();
        let x = before.find(&[key(1), key(10)]).unwrap().id();

        // Same child identity below a different parent identity is a new node
        let live = vec![branch(5, "A", vec![leaf(10, "X")]), leaf(2, "B")];
        assert!(resync(&mut sync, &live));
        let after = sync.snapshot();

        let new_x = after.find(&[key(5), key(10)]).unwrap();
        assert_ne!(new_x.id(), x);
        assert!(after.node(x).is_none());
        assert_eq!(after.len(), 3);
    }

    #[test]
    fn shrinking_truncates() {
        let live = vec![leaf(1, "A"), leaf(2, "B"), leaf(3, "C")];
        let mut sync = synced(&live);
        let before = sync.snapshot();
        let c = before.roots()[2];

        assert!(resync(&mut sync, &live[..1]));
        let after = sync.snapshot();
        assert_eq!(outline(&after), expected(&[(0, "A")]));
        assert_eq!(after.roots()[0], before.roots()[0]);
        assert!(after.node(c).is_none());
        assert_eq!(after.len(), 1);
    }

    #[test]
    fn growing_appends() {
        let mut live = simple();
        let mut sync = synced(&live);
        let before = sync.snapshot();

        live[0].add_child(leaf(11, "Y")).unwrap();
        live.push(leaf(4, "D"));
        assert!(resync(&mut sync, &live));
        let after = sync.snapshot();

        assert_eq!(
            outline(&after),
            expected(&[(0, "A"), (1, "X"), (1, "Y"), (0, "B"), (0, "D")])
        );
        assert_eq!(&after.roots()[..2], before.roots());
    }

    #[test]
    fn losing_all_children_clears_list() {
        let mut live = simple();
        let mut sync = synced(&live);
        let before = sync.snapshot();
        let x = before.find(&[key(1), key(10)]).unwrap().id();

        live[0].remove_child(0);
        assert!(resync(&mut sync, &live));
        let after = sync.snapshot();

        let a = after.find(&[key(1)]).unwrap();
        assert!(a.children().is_none());
        assert_eq!(a.id(), before.roots()[0]);
        assert!(after.node(x).is_none());
    }

    #[test]
    fn gaining_children_on_leaf() {
        let mut live = simple();
        let mut sync = synced(&live);
        let b = sync.snapshot().roots()[1];

        live[1].add_child(leaf(20, "Z")).unwrap();
        assert!(resync(&mut sync, &live));
        let after = sync.snapshot();

        let node = after.find(&[key(2)]).unwrap();
        assert_eq!(node.id(), b);
        assert_eq!(node.children().map(<[_]>::len), Some(1));
    }

    #[test]
    fn moved_node_is_replaced_at_both_positions() {
        let live = vec![leaf(1, "A"), leaf(2, "B")];
        let mut sync = synced(&live);
        let before = sync.snapshot();

        let swapped = vec![leaf(2, "B"), leaf(1, "A")];
        assert!(resync(&mut sync, &swapped));
        let after = sync.snapshot();

        assert_eq!(outline(&after), expected(&[(0, "B"), (0, "A")]));
        for id in before.roots() {
            assert!(after.node(*id).is_none());
        }
    }

    #[test]
    fn excluded_subtree_is_absent_anywhere() {
        let own = || branch(99, "Editor", vec![leaf(100, "Rig"), leaf(101, "Menu")]);
        let layouts = [
            vec![own(), leaf(1, "A"), leaf(2, "B")],
            vec![leaf(1, "A"), own(), leaf(2, "B")],
            vec![leaf(1, "A"), leaf(2, "B"), own()],
        ];
        for live in layouts {
            let mut sync = HierarchySync::new(LiveTreeCursor::new(&live)).exclude(key(99));
            assert!(sync.refresh().unwrap());
            assert_eq!(outline(&sync.snapshot()), expected(&[(0, "A"), (0, "B")]));
        }
    }

    #[test]
    fn excluded_last_child_does_not_swallow_next_sibling_of_parent() {
        let live = vec![
            branch(1, "P", vec![leaf(2, "C"), branch(99, "Editor", vec![leaf(100, "Rig")])]),
            leaf(3, "Q"),
        ];
        let mut sync = HierarchySync::new(LiveTreeCursor::new(&live)).exclude(key(99));
        assert!(sync.refresh().unwrap());
        let snapshot = sync.snapshot();
        assert_eq!(outline(&snapshot), expected(&[(0, "P"), (1, "C"), (0, "Q")]));
        assert_eq!(snapshot.find(&[key(1)]).unwrap().name(), "P");
    }

    #[test]
    fn only_child_excluded_leaves_no_children() {
        let live = vec![branch(1, "P", vec![leaf(99, "Editor")])];
        let mut sync = HierarchySync::new(LiveTreeCursor::new(&live)).exclude(key(99));
        assert!(sync.refresh().unwrap());
        let snapshot = sync.snapshot();
        assert!(snapshot.find(&[key(1)]).unwrap().children().is_none());
        assert!(!sync.refresh().unwrap());
    }

    #[test]
    fn excluded_tree_is_empty() {
        let live = vec![branch(99, "Editor", vec![leaf(100, "Rig")])];
        let mut sync = HierarchySync::new(LiveTreeCursor::new(&live)).exclude(key(99));
        assert!(!sync.refresh().unwrap());
        assert!(sync.snapshot().is_empty());
    }

    #[test]
    fn sentinel_identity_is_skipped() {
        let live = vec![
            leaf(1, "A"),
            branch(0, "Gone", vec![leaf(7, "Orphan")]),
            leaf(2, "B"),
        ];
        let sync = synced(&live);
        assert_eq!(outline(&sync.snapshot()), expected(&[(0, "A"), (0, "B")]));
    }

    #[test]
    fn held_snapshot_survives_later_refreshes() {
        let mut live = LiveNode::example();
        let mut sync = synced(&live);
        let held = sync.snapshot();
        let outline_before = outline(&held);

        live.remove(0);
        live[0].set_name("Renamed");
        assert!(resync(&mut sync, &live));

        assert_eq!(outline(&held), outline_before);
        assert_eq!(held.len(), 8);
        assert_ne!(outline(&sync.snapshot()), outline_before);
    }

    /// A single chain of `len` nodes, each the only child of the previous one.
    struct ChainCursor {
        len: usize,
        position: usize,
    }

    impl crate::HierarchyCursor for ChainCursor {
        type Error = std::convert::Infallible;

        fn reset(&mut self) -> Result<(), Self::Error> {
            self.position = 0;
            Ok(())
        }

        fn advance(&mut self) -> Result<bool, Self::Error> {
            self.position = (self.position + 1).min(self.len + 1);
            Ok(self.position <= self.len)
        }

        fn step_back(&mut self) {
            self.position = self.position.saturating_sub(1);
        }

        fn depth(&self) -> usize {
            self.position.saturating_sub(1)
        }

        fn name(&self) -> &str {
            "level"
        }

        #[allow(clippy::cast_possible_wrap)]
        fn identity(&self) -> IdentityKey {
            key(self.position as i64)
        }

        fn has_children(&self) -> bool {
            self.position < self.len
        }
    }

    #[test]
    fn deep_chain_walks_without_recursion() {
        let mut sync = HierarchySync::new(ChainCursor {
            len: 100_000,
            position: 0,
        });
        assert!(sync.refresh().unwrap());
        let snapshot = sync.snapshot();
        assert_eq!(snapshot.len(), 100_000);
        assert_eq!(snapshot.iter().last().map(|(depth, _)| depth), Some(99_999));
        assert!(!sync.refresh().unwrap());
    }
}
