use crate::IdentityKey;

/// Depth first, pre-order cursor over a live tree.
///
/// This is everything [`HierarchySync`](crate::HierarchySync) needs to know about the tree it mirrors.
/// A host scene graph, a file system or the in-memory [`LiveTreeCursor`](crate::LiveTreeCursor) can all provide it.
///
/// The accessors ([`depth`](Self::depth), [`name`](Self::name), …) are only called after [`advance`](Self::advance) returned `true`.
pub trait HierarchyCursor {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Rewind to before the first node.
    ///
    /// # Errors
    ///
    /// Errors when the live tree can not be enumerated.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Move to the next node in pre-order.
    ///
    /// Returns `false` once the tree is exhausted.
    /// Calling it again after that keeps returning `false`.
    ///
    /// # Errors
    ///
    /// Errors when the live tree can not be enumerated.
    fn advance(&mut self) -> Result<bool, Self::Error>;

    /// Move back one position, un-consuming the last [`advance`](Self::advance).
    fn step_back(&mut self);

    /// Zero based depth. Depth 0 means top level.
    fn depth(&self) -> usize;

    fn name(&self) -> &str;

    fn identity(&self) -> IdentityKey;

    fn has_children(&self) -> bool;
}
