use std::collections::HashSet;

use crate::{Error, IdentityKey, LiveNode};

/// Ensures that all identities of the children are unique.
///
/// When you mark the calling function with `#[track_caller]` it gets easier to find the misbehaving caller.
///
/// # Errors
///
/// Errors with the first identity that appears twice.
#[track_caller]
pub fn children(children: &[LiveNode]) -> crate::Result<()> {
    let mut seen = HashSet::with_capacity(children.len());
    for child in children {
        if !seen.insert(child.identity()) {
            return Err(Error::DuplicateIdentity {
                identity: child.identity(),
            });
        }
    }
    Ok(())
}

/// Ensures that the to be added child identity does not exist in the already existing children.
///
/// # Errors
///
/// Errors when the new child would duplicate an existing identity in the children.
#[track_caller]
pub fn add_child(existing_children: &[LiveNode], add: IdentityKey) -> crate::Result<()> {
    let identity_exists_already = existing_children
        .iter()
        .any(|child| child.identity() == add);
    if identity_exists_already {
        Err(Error::DuplicateIdentity { identity: add })
    } else {
        Ok(())
    }
}
