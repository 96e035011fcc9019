//! Error types for the simulation core.
//!
//! Every variant here is a content/configuration bug: something was looked
//! up that was never registered. Running out of pooled capacity is not an
//! error and never shows up in this enum.

use thiserror::Error;

use crate::ids::{DefinitionId, EntityId};

/// Top-level error type for simulation operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Fighter definition id was never registered
    #[error("unknown fighter definition: {0}")]
    UnknownDefinition(DefinitionId),

    /// Sound name was never registered
    #[error("unknown sound: {0}")]
    UnknownSound(String),

    /// Entity is not alive in this world
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// A definition can produce an action it has no move data for
    #[error("definition '{definition}' has no move data for '{action}'")]
    MissingMove {
        /// Definition name
        definition: String,
        /// Move identifier of the missing action
        action: String,
    },

    /// Definition data failed to parse or validate
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// No spawn point configured for the requested slot
    #[error("no spawn point configured for slot {0}")]
    NoSpawnPoint(usize),

    /// The world ran out of entity ids
    #[error("entity id space exhausted")]
    IdsExhausted,
}

/// Result type alias for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
