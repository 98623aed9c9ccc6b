//! Mapping rules.

use std::sync::Arc;

use paramflow_core::{Setter, TypeInfo};

use crate::extractor::KeyExtractor;
use crate::pattern::{Pattern, PatternId};

/// Binds a path pattern to one field of an entity type.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Label used in logs and registration errors
    pub name: String,
    pub pattern: Pattern,
    pub entity: String,
    pub field: String,
    /// Transform name or `|`-separated chain
    pub transform: Option<String>,
    pub extractor: KeyExtractor,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        pattern: Pattern,
        entity: impl Into<String>,
        field: impl Into<String>,
        extractor: KeyExtractor,
    ) -> Self {
        Self {
            name: name.into(),
            pattern,
            entity: entity.into(),
            field: field.into(),
            transform: None,
            extractor,
        }
    }

    /// Rule built from its textual parts; the pattern text doubles as the name.
    pub fn parse(pattern: &str, entity: &str, field: &str, key: &str) -> Self {
        Self::new(
            pattern,
            Pattern::compile(pattern),
            entity,
            field,
            KeyExtractor::compile(key),
        )
    }

    pub fn with_transform(mut self, transform: impl Into<String>) -> Self {
        let transform = transform.into();
        self.transform = (!transform.is_empty()).then_some(transform);
        self
    }
}

/// A registered rule with its registry lookups resolved.
pub(crate) struct CompiledRule {
    pub(crate) id: PatternId,
    pub(crate) rule: Rule,
    pub(crate) type_info: Arc<TypeInfo>,
    /// `None` when the field is not declared; writes are then dropped
    pub(crate) setter: Option<Setter>,
}

impl std::fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRule")
            .field("id", &self.id)
            .field("rule", &self.rule.name)
            .field("entity", &self.type_info.name())
            .field("field", &self.rule.field)
            .finish()
    }
}
