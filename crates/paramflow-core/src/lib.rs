//! Core types and traits for ParamFlow.
//!
//! This crate defines the foundations shared by the mapping pipeline:
//!
//! - **FieldValue**: the dynamically typed value handed from transforms to setters
//! - **FromFieldValue**: declared coercion rules for every settable field type
//! - **EntitySchema / TypeRegistry**: reflection-free field access for registered types
//! - **MapperConfig**: tunables for batching, caching and registration strictness
//! - **logging**: tracing subscriber setup

pub mod coerce;
pub mod config;
pub mod entity;
pub mod error;
pub mod logging;
pub mod registry;
pub mod value;

pub use coerce::{CoercionError, CoercionErrorKind, FromFieldValue};
pub use config::MapperConfig;
pub use entity::{Entity, EntitySchema, Instance, SharedInstance};
pub use error::{Error, Result};
pub use registry::{Setter, TypeInfo, TypeRegistry};
pub use value::FieldValue;

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::coerce::FromFieldValue;
    pub use crate::config::MapperConfig;
    pub use crate::entity::{Entity, EntitySchema, Instance, SharedInstance};
    pub use crate::error::{Error, Result};
    pub use crate::registry::{TypeInfo, TypeRegistry};
    pub use crate::value::FieldValue;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
