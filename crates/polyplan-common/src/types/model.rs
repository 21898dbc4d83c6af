//! Data-model traits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The data model under which a plan subtree is evaluated.
///
/// Every plan node carries one. A node's trait must equal its children's,
/// except directly below a transform node, which is where the model changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ModelTrait {
    /// Tables of typed rows.
    Relational,
    /// Collections of schemaless documents.
    Document,
    /// Labeled property graphs.
    #[default]
    Graph,
}

impl ModelTrait {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relational => "RELATIONAL",
            Self::Document => "DOCUMENT",
            Self::Graph => "GRAPH",
        }
    }

    /// Parses a model name, case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "RELATIONAL" | "REL" => Some(Self::Relational),
            "DOCUMENT" | "DOC" => Some(Self::Document),
            "GRAPH" | "LPG" => Some(Self::Graph),
            _ => None,
        }
    }
}

impl fmt::Display for ModelTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model() {
        assert_eq!(ModelTrait::parse("graph"), Some(ModelTrait::Graph));
        assert_eq!(ModelTrait::parse("Relational"), Some(ModelTrait::Relational));
        assert_eq!(ModelTrait::parse("doc"), Some(ModelTrait::Document));
        assert_eq!(ModelTrait::parse("kv"), None);
        assert_eq!(ModelTrait::default(), ModelTrait::Graph);
    }
}
