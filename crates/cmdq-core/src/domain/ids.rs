//! Strongly-typed identifiers.
//!
//! Every id is a ULID wrapped in `Id<Marker>`. The marker only exists at
//! compile time (`PhantomData`), so a `HandleId` can never be passed where a
//! `ProcessorId` is expected while both stay 16 bytes wide.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for id kinds; supplies the display prefix.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic ULID-backed id.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// Fresh id stamped with the current time.
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// Markers
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Handle {}

impl IdMarker for Handle {
    fn prefix() -> &'static str {
        "cmd-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Proc {}

impl IdMarker for Proc {
    fn prefix() -> &'static str {
        "proc-"
    }
}

/// Identifier of one submitted command.
pub type HandleId = Id<Handle>;

/// Identifier of a processor instance.
pub type ProcessorId = Id<Proc>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_their_prefix() {
        let handle = HandleId::generate();
        let processor = ProcessorId::generate();

        assert!(handle.to_string().starts_with("cmd-"));
        assert!(processor.to_string().starts_with("proc-"));
        // let _: HandleId = processor; // <- does not compile
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = HandleId::generate();
        let b = HandleId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn ids_survive_serde() {
        let id = HandleId::generate();
        let json = serde_json::to_string(&id).unwrap();
        let back: HandleId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn id_is_as_small_as_a_ulid() {
        assert_eq!(std::mem::size_of::<HandleId>(), std::mem::size_of::<Ulid>());
    }
}
