use crate::IdentityKey;

/// Result type of this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The live tree could not be walked. Nothing was changed.
    #[error(transparent)]
    Enumeration(#[from] EnumerationError),

    /// Siblings of a [`LiveNode`](crate::LiveNode) have to have distinct identities.
    #[error("The children contain duplicate identity {identity}")]
    DuplicateIdentity { identity: IdentityKey },
}

/// A [`HierarchyCursor`](crate::HierarchyCursor) failed while it was walked.
#[derive(Debug, thiserror::Error)]
#[error("enumerating the live tree failed after {visited} positions")]
pub struct EnumerationError {
    /// Positions the walk consumed before failing.
    ///
    /// A position handed back with [`step_back`](crate::HierarchyCursor::step_back) counts once it is read again.
    pub visited: usize,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl EnumerationError {
    pub(crate) fn new<E>(visited: usize, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            visited,
            source: Box::new(source),
        }
    }
}
