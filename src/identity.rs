#![allow(clippy::module_name_repetitions)]

use std::fmt;

/// Stable identity of an object in the live tree.
///
/// Handed out by the host (for example an instance id) and used as the only key when comparing the live tree with the cached one.
/// Identities are unique among siblings.
/// The value `0` is reserved for "no external object", see [`IdentityKey::NONE`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentityKey(i64);

impl IdentityKey {
    /// Sentinel for a cursor position that does not point at an object.
    pub const NONE: Self = Self(0);

    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<i64> for IdentityKey {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[test]
fn zero_is_the_sentinel() {
    assert!(IdentityKey::NONE.is_none());
    assert!(IdentityKey::default().is_none());
    assert!(!IdentityKey::new(-3).is_none());
}

#[test]
fn display_shows_raw_value() {
    assert_eq!(IdentityKey::new(42).to_string(), "#42");
}
