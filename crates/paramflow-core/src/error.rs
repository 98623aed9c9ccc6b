//! Error types for the core crate.

use thiserror::Error;

use crate::coerce::CoercionError;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Entity type was never registered.
    #[error("Entity type not registered: {0}")]
    UnknownEntityType(String),

    /// Entity type name already taken.
    #[error("Entity type already registered: {0}")]
    AlreadyRegistered(String),

    /// Field not declared by the entity schema.
    #[error("Unknown field {field} on entity type {entity}")]
    UnknownField { entity: String, field: String },

    /// Value could not be coerced into the field type.
    #[error("Coercion error: {0}")]
    Coercion(#[from] CoercionError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}
