use std::collections::HashSet;

use crate::flatten::{flatten, Flattened};
use crate::{HierarchyConsumer, IdentityKey, Snapshot};

/// Keeps the state of what is currently selected and what was opened in a hierarchy list view.
///
/// Everything is stored as identity paths, so the state stays valid across refreshes as long as the nodes keep their identity.
/// After a refresh call [`retain_existing`](Self::retain_existing) to forget about nodes that are gone.
///
/// # Example
///
/// ```
/// # use hierarchy_sync::{HierarchyListState, IdentityKey};
/// let mut state = HierarchyListState::default();
/// state.open(vec![IdentityKey::new(1)]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct HierarchyListState {
    pub(super) opened: HashSet<Vec<IdentityKey>>,
    pub(super) selected: Vec<IdentityKey>,
}

impl HierarchyListState {
    #[must_use]
    pub fn get_all_opened(&self) -> Vec<Vec<IdentityKey>> {
        self.opened.iter().cloned().collect()
    }

    /// Get a flat list of all visible (= below open) nodes with this `HierarchyListState`.
    #[must_use]
    pub fn flatten(&self, snapshot: &Snapshot) -> Vec<Flattened> {
        flatten(&self.opened, snapshot)
    }

    #[must_use]
    pub fn selected(&self) -> Vec<IdentityKey> {
        self.selected.clone()
    }

    /// Selects the given identity path.
    ///
    /// Returns `true` when the selection changed.
    ///
    /// Clear the selection by passing an empty vector:
    ///
    /// ```rust
    /// # use hierarchy_sync::HierarchyListState;
    /// # let mut state = HierarchyListState::default();
    /// state.select(Vec::new());
    /// ```
    pub fn select(&mut self, identifier: Vec<IdentityKey>) -> bool {
        let changed = self.selected != identifier;
        self.selected = identifier;
        changed
    }

    /// Open a node.
    /// Returns `true` if the node was closed and has been opened.
    /// Returns `false` if the node was already open.
    pub fn open(&mut self, identifier: Vec<IdentityKey>) -> bool {
        if identifier.is_empty() {
            false
        } else {
            self.opened.insert(identifier)
        }
    }

    /// Close a node.
    /// Returns `true` if the node was open and has been closed.
    /// Returns `false` if the node was already closed.
    pub fn close(&mut self, identifier: &[IdentityKey]) -> bool {
        self.opened.remove(identifier)
    }

    /// Forget about nodes that no longer exist in the `snapshot`.
    ///
    /// Opened paths that do not resolve are dropped.
    /// The selection falls back to its deepest ancestor which still exists.
    ///
    /// Returns `true` when anything was forgotten.
    pub fn retain_existing(&mut self, snapshot: &Snapshot) -> bool {
        let opened_before = self.opened.len();
        self.opened
            .retain(|identifier| snapshot.find(identifier).is_some());

        let selected_before = self.selected.len();
        while !self.selected.is_empty() && snapshot.find(&self.selected).is_none() {
            self.selected.pop();
        }

        opened_before != self.opened.len() || selected_before != self.selected.len()
    }
}

/// A list view's data: the latest [`Snapshot`] together with its [`HierarchyListState`].
///
/// Register it on a [`HierarchySync`](crate::HierarchySync) to keep it up to date.
#[derive(Debug, Default, Clone)]
pub struct HierarchyList {
    pub snapshot: Snapshot,
    pub state: HierarchyListState,
}

impl HierarchyList {
    /// Visible rows with the current state.
    #[must_use]
    pub fn rows(&self) -> Vec<Flattened> {
        self.state.flatten(&self.snapshot)
    }
}

impl HierarchyConsumer for HierarchyList {
    fn set_hierarchy(&mut self, snapshot: Snapshot) {
        self.state.retain_existing(&snapshot);
        self.snapshot = snapshot;
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
fn path(raw: &[i64]) -> Vec<IdentityKey> {
    raw.iter().copied().map(IdentityKey::new).collect()
}

#[test]
fn open_and_close_track_paths() {
    let mut state = HierarchyListState::default();
    assert!(!state.open(Vec::new()));
    assert!(state.open(path(&[2])));
    assert!(!state.open(path(&[2])));
    assert_eq!(state.get_all_opened(), [path(&[2])]);

    assert!(state.close(&path(&[2])));
    assert!(!state.close(&path(&[2])));
    assert!(state.get_all_opened().is_empty());
}

#[test]
fn opened_paths_control_visible_rows() {
    let snapshot = example_snapshot();
    let mut state = HierarchyListState::default();
    assert_eq!(state.flatten(&snapshot).len(), 3);

    state.open(path(&[2]));
    let rows = state.flatten(&snapshot);
    let identifiers = rows
        .iter()
        .map(|row| row.identifier.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        identifiers,
        [
            path(&[1]),
            path(&[2]),
            path(&[2, 3]),
            path(&[2, 4]),
            path(&[2, 7]),
            path(&[8]),
        ]
    );
}

#[test]
fn select_reports_changes() {
    let mut state = HierarchyListState::default();
    assert!(state.select(path(&[2, 4])));
    assert!(!state.select(path(&[2, 4])));
    assert_eq!(state.selected(), path(&[2, 4]));
    assert!(state.select(Vec::new()));
    assert!(state.selected().is_empty());
}

#[test]
fn retain_existing_prunes_missing_paths() {
    let snapshot = example_snapshot();
    let mut state = HierarchyListState::default();
    state.open(path(&[2]));
    state.open(path(&[2, 4]));
    state.open(path(&[9]));
    state.select(path(&[2, 4, 99]));

    assert!(state.retain_existing(&snapshot));
    let mut opened = state.get_all_opened();
    opened.sort();
    assert_eq!(opened, [path(&[2]), path(&[2, 4])]);
    assert_eq!(state.selected(), path(&[2, 4]));

    assert!(!state.retain_existing(&snapshot));
}
