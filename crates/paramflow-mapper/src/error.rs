//! Error types for the mapping pipeline.

use thiserror::Error;

use paramflow_core::CoercionError;

/// Result type for mapper operations.
pub type Result<T> = std::result::Result<T, MapperError>;

/// Failure of a strict value transform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    #[error("invalid float: {0:?}")]
    InvalidFloat(String),

    #[error("invalid boolean: {0:?}")]
    InvalidBool(String),

    #[error("invalid IP address: {0:?}")]
    InvalidAddress(String),
}

/// Mapper error types.
#[derive(Debug, Clone, Error)]
pub enum MapperError {
    /// Type registry lookup or schema error.
    #[error(transparent)]
    Registry(#[from] paramflow_core::Error),

    /// Rule names a transform that is not registered (strict mode).
    #[error("Unknown transform {name} in rule {rule}")]
    UnknownTransform { rule: String, name: String },

    /// Rule key extractor never reads the path or value (strict mode).
    #[error("Key extractor of rule {rule} is constant: {expr:?}")]
    ConstantExtractor { rule: String, expr: String },

    /// Routed pattern has no bound rule.
    #[error("No rule bound to pattern {0}")]
    RuleNotFound(String),

    /// Transform rejected the raw value.
    #[error("Transform {name} failed on {value:?}: {source}")]
    Transform {
        name: String,
        value: String,
        #[source]
        source: TransformError,
    },

    /// Setter rejected the transformed value.
    #[error("Cannot set {entity}.{field}: {source}")]
    Setter {
        entity: String,
        field: String,
        #[source]
        source: CoercionError,
    },

    /// Registration attempted after sealing.
    #[error("Mapper is sealed; {0} can no longer be registered")]
    Sealed(String),

    /// Processing stopped by a cancellation signal.
    #[error("Processing cancelled")]
    Cancelled,
}

impl MapperError {
    /// True for errors raised while ingesting an item, as opposed to
    /// registration-time errors.
    pub fn is_item_error(&self) -> bool {
        matches!(self, Self::Transform { .. } | Self::Setter { .. })
    }
}
