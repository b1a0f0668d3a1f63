#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]

/*!
Mirror a live scene hierarchy into a persistent tree for editor list views.

[`HierarchySync`] walks the live tree through a [`HierarchyCursor`] once per [`refresh`](HierarchySync::refresh) and reconciles it with the tree of the previous refresh.
Nodes which keep their [`IdentityKey`] at their position keep their [`NodeId`], so list views keep their selection and scroll state.
Registered [`HierarchyConsumer`]s only hear about a refresh when something actually changed.
They receive an immutable [`Snapshot`] which stays valid while the engine moves on.
*/

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, trace, warn};

mod arena;
mod consumer;
mod cursor;
mod error;
mod flatten;
mod identity;
#[cfg(feature = "json")]
mod json;
mod list_state;
mod live_tree;
mod reconcile;
mod snapshot;
mod unique_identifiers;

pub use crate::arena::NodeId;
pub use crate::consumer::{HierarchyConsumer, SharedConsumer};
pub use crate::cursor::HierarchyCursor;
pub use crate::error::{EnumerationError, Error, Result};
pub use crate::flatten::{flatten, Flattened};
pub use crate::identity::IdentityKey;
pub use crate::list_state::{HierarchyList, HierarchyListState};
pub use crate::live_tree::{LiveNode, LiveTreeCursor};
pub use crate::snapshot::{Iter, NodeRef, Snapshot};

use crate::consumer::Consumers;

/// Keeps a mirror of the tree behind a [`HierarchyCursor`] and tells [`HierarchyConsumer`]s about changes.
///
/// # Example
///
/// ```
/// # use std::cell::RefCell;
/// # use std::rc::Rc;
/// # use hierarchy_sync::{HierarchyList, HierarchySync, IdentityKey, LiveNode, LiveTreeCursor};
/// let key = IdentityKey::new;
/// let mut live = vec![
///     LiveNode::new(key(1), "A", vec![LiveNode::new_leaf(key(10), "X")])?,
///     LiveNode::new_leaf(key(2), "B"),
/// ];
///
/// let list = Rc::new(RefCell::new(HierarchyList::default()));
/// let mut sync = HierarchySync::new(LiveTreeCursor::new(&live));
/// sync.register(list.clone());
///
/// assert!(sync.refresh()?);
/// assert_eq!(list.borrow().rows().len(), 2);
///
/// // Nothing changed, nobody is bothered
/// assert!(!sync.refresh()?);
///
/// live[1].set_name("B2");
/// sync.cursor_mut().update(&live);
/// assert!(sync.refresh()?);
/// # Ok::<(), hierarchy_sync::Error>(())
/// ```
#[derive(Debug)]
pub struct HierarchySync<Cursor> {
    cursor: Cursor,
    /// Identity of the owning context which never shows up in its own hierarchy.
    exclude: Option<IdentityKey>,
    snapshot: Snapshot,
    consumers: Consumers,
    invalidated: bool,
}

impl<Cursor> HierarchySync<Cursor>
where
    Cursor: HierarchyCursor,
{
    /// Create a new `HierarchySync` with an empty hierarchy.
    ///
    /// Nothing is walked until the first [`refresh`](Self::refresh).
    #[must_use]
    pub fn new(cursor: Cursor) -> Self {
        Self {
            cursor,
            exclude: None,
            snapshot: Snapshot::default(),
            consumers: Consumers::default(),
            invalidated: false,
        }
    }

    /// Leave out the subtree of the object with this identity, wherever it shows up.
    ///
    /// Use the identity of the object owning this `HierarchySync` so the list does not display itself.
    #[must_use]
    pub const fn exclude(mut self, identity: IdentityKey) -> Self {
        self.exclude = Some(identity);
        self
    }

    #[must_use]
    pub const fn excluded(&self) -> Option<IdentityKey> {
        self.exclude
    }

    #[must_use]
    pub const fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Access the cursor, for example to point it at a rebuilt live tree.
    #[must_use]
    pub fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    /// The hierarchy as of the last refresh which changed something.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.clone()
    }

    /// Amount of refreshes which changed the hierarchy.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.snapshot.generation()
    }

    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Register a consumer and immediately hand it the current hierarchy.
    ///
    /// The current hierarchy is empty before the first refresh.
    /// Registering the same consumer twice delivers every change to it twice.
    pub fn register(&mut self, consumer: SharedConsumer) {
        crate::consumer::deliver(&consumer, &self.snapshot);
        self.consumers.push(consumer);
    }

    /// Remove the first registration of `consumer`.
    ///
    /// Returns `false` when it was not registered.
    pub fn unregister<C>(&mut self, consumer: &Rc<RefCell<C>>) -> bool
    where
        C: HierarchyConsumer + ?Sized,
    {
        self.consumers.remove(consumer)
    }

    /// Walk the live tree and reconcile the hierarchy with it.
    ///
    /// Returns `true` when the hierarchy changed.
    /// Only then all registered consumers receive the new [`Snapshot`].
    /// A renamed node counts as a change while it keeps its [`NodeId`].
    ///
    /// # Errors
    ///
    /// Errors when the cursor fails.
    /// The hierarchy and the consumers are left as they were.
    pub fn refresh(&mut self) -> Result<bool> {
        let mut arena = self.snapshot.arena().clone();
        let changed = match reconcile::reconcile(&mut self.cursor, &mut arena, self.exclude) {
            Ok(changed) => changed,
            Err(error) => {
                warn!(visited = error.visited, %error, "refresh aborted, keeping the previous hierarchy");
                return Err(error.into());
            }
        };
        self.invalidated = false;

        if !changed {
            trace!(generation = self.generation(), "hierarchy unchanged");
            return Ok(false);
        }

        self.snapshot = Snapshot::new(self.generation() + 1, Arc::new(arena));
        let notified = self.consumers.deliver(&self.snapshot);
        debug!(
            generation = self.generation(),
            nodes = self.snapshot.len(),
            notified,
            "hierarchy changed"
        );
        Ok(true)
    }

    /// Remember that the live tree might have changed.
    ///
    /// Call this from the host's change notification and [`refresh_if_invalidated`](Self::refresh_if_invalidated) once per tick.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    #[must_use]
    pub const fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// [`refresh`](Self::refresh) when [`invalidate`](Self::invalidate) was called since the last successful refresh.
    ///
    /// Returns `true` when the hierarchy changed.
    ///
    /// # Errors
    ///
    /// Errors when the cursor fails. The invalidation is kept so the next tick tries again.
    pub fn refresh_if_invalidated(&mut self) -> Result<bool> {
        if self.invalidated {
            self.refresh()
        } else {
            Ok(false)
        }
    }
}
