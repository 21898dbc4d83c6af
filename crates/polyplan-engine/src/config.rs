//! Compiler configuration.

use polyplan_common::types::{ModelTrait, NamespaceId};
use serde::{Deserialize, Serialize};

/// Settings for a [`QueryCompiler`](crate::QueryCompiler).
///
/// # Examples
///
/// ```
/// use polyplan_common::types::ModelTrait;
/// use polyplan_engine::Config;
///
/// let config = Config::default()
///     .with_target_model(ModelTrait::Document)
///     .with_plan_cache_capacity(64);
///
/// assert_eq!(config.target_model, ModelTrait::Document);
/// assert_eq!(config.plan_cache_capacity, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Namespace queries are compiled against.
    pub namespace: NamespaceId,

    /// Model the compiled root is delivered in. Plans in another model are
    /// wrapped in a transform.
    pub target_model: ModelTrait,

    /// Whether a namespace without a graph may be queried through a
    /// substitution graph over its entities.
    pub allow_substitution: bool,

    /// Capacity of the plan interning cache. Zero disables interning.
    pub plan_cache_capacity: usize,

    /// Whether finished plans are re-validated before they are returned.
    pub validate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: NamespaceId::new(0),
            target_model: ModelTrait::Graph,
            allow_substitution: true,
            plan_cache_capacity: 256,
            validate: true,
        }
    }
}

impl Config {
    /// Sets the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: NamespaceId) -> Self {
        self.namespace = namespace;
        self
    }

    /// Sets the model compiled plans are delivered in.
    #[must_use]
    pub fn with_target_model(mut self, model: ModelTrait) -> Self {
        self.target_model = model;
        self
    }

    /// Disallows substitution graphs; a namespace without a graph is then an
    /// unknown entity.
    #[must_use]
    pub fn without_substitution(mut self) -> Self {
        self.allow_substitution = false;
        self
    }

    /// Sets the plan cache capacity.
    #[must_use]
    pub fn with_plan_cache_capacity(mut self, capacity: usize) -> Self {
        self.plan_cache_capacity = capacity;
        self
    }

    /// Enables or disables validation of finished plans.
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.namespace, NamespaceId::new(0));
        assert_eq!(config.target_model, ModelTrait::Graph);
        assert!(config.allow_substitution);
        assert_eq!(config.plan_cache_capacity, 256);
        assert!(config.validate);
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .with_namespace(NamespaceId::new(3))
            .without_substitution()
            .with_plan_cache_capacity(0)
            .with_validation(false);
        assert_eq!(config.namespace, NamespaceId::new(3));
        assert!(!config.allow_substitution);
        assert_eq!(config.plan_cache_capacity, 0);
        assert!(!config.validate);
    }
}
