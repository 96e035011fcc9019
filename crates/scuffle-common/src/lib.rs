//! # Scuffle Common
//!
//! Shared identifiers and error types for the Scuffle simulation core.
//!
//! - ID types (EntityId, DefinitionId, SoundId)
//! - The simulation error enum
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_allocation_is_sequential() {
        let mut ids = EntityIdAllocator::new();
        let a = ids.allocate().expect("first id");
        let b = ids.allocate().expect("second id");
        assert_eq!(a.raw(), 1);
        assert_eq!(b.raw(), 2);
        assert!(a.is_valid());
        assert!(!EntityId::NULL.is_valid());
    }

    #[test]
    fn test_entity_id_allocator_exhaustion() {
        let mut ids = EntityIdAllocator::new();
        let mut count = 0u32;
        while ids.allocate().is_some() {
            count += 1;
        }
        assert_eq!(count, u32::from(u16::MAX) - 1);
        assert!(ids.allocate().is_none());
    }

    #[test]
    fn test_error_display() {
        let err = SimError::UnknownSound("whoosh".to_string());
        assert_eq!(err.to_string(), "unknown sound: whoosh");

        let err = SimError::UnknownDefinition(DefinitionId::new(7));
        assert_eq!(err.to_string(), "unknown fighter definition: def:7");
    }
}
