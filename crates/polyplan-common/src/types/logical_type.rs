//! Logical types of values flowing through a plan.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The statically known type of an expression or schema field.
///
/// `Any` is the dynamic type: property extraction and unknown functions
/// produce it, and every type rule accepts it where a concrete type is
/// expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    /// Dynamic type, checked at execution time.
    Any,
    /// The type of the `null` literal.
    Null,
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit float.
    Float64,
    /// UTF-8 string.
    String,
    /// Homogeneous list.
    List(Box<LogicalType>),
    /// String-keyed map.
    Map,
    /// Schemaless document (document model record).
    Document,
    /// Labeled property graph node.
    Node,
    /// Labeled property graph edge.
    Edge,
    /// Alternating sequence of nodes and edges.
    Path,
    /// A whole graph (the row type of a graph scan).
    Graph,
}

impl LogicalType {
    /// Creates a list type with the given element type.
    #[must_use]
    pub fn list_of(element: LogicalType) -> Self {
        Self::List(Box::new(element))
    }

    /// Returns the element type if this is a list type.
    #[must_use]
    pub fn element_type(&self) -> Option<&LogicalType> {
        match self {
            Self::List(inner) => Some(inner),
            _ => None,
        }
    }

    /// Returns true for list types.
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Returns true for types whose values are checked only at runtime.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Any | Self::Null)
    }

    /// Returns true if a boolean operator accepts this type.
    #[must_use]
    pub fn is_boolean_like(&self) -> bool {
        matches!(self, Self::Bool | Self::Any | Self::Null)
    }

    /// Returns true if an arithmetic operator accepts this type.
    #[must_use]
    pub fn is_numeric_like(&self) -> bool {
        matches!(self, Self::Int64 | Self::Float64 | Self::Any | Self::Null)
    }

    /// Returns true if a string operator accepts this type.
    #[must_use]
    pub fn is_string_like(&self) -> bool {
        matches!(self, Self::String | Self::Any | Self::Null)
    }

    /// Returns true for node, edge, and path types.
    #[must_use]
    pub fn is_graph_element(&self) -> bool {
        matches!(self, Self::Node | Self::Edge | Self::Path)
    }

    /// Returns true if properties can be read from values of this type.
    #[must_use]
    pub fn has_properties(&self) -> bool {
        matches!(
            self,
            Self::Node | Self::Edge | Self::Map | Self::Document | Self::Any | Self::Null
        )
    }

    /// Returns the least common type of two types.
    ///
    /// Equal types unify to themselves, `Null` unifies with anything, integers
    /// widen to floats, lists unify element-wise; everything else is `Any`.
    #[must_use]
    pub fn unify(&self, other: &LogicalType) -> LogicalType {
        match (self, other) {
            (a, b) if a == b => a.clone(),
            (Self::Null, t) | (t, Self::Null) => t.clone(),
            (Self::Int64, Self::Float64) | (Self::Float64, Self::Int64) => Self::Float64,
            (Self::List(a), Self::List(b)) => Self::list_of(a.unify(b)),
            _ => Self::Any,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Null => f.write_str("null"),
            Self::Bool => f.write_str("bool"),
            Self::Int64 => f.write_str("int64"),
            Self::Float64 => f.write_str("float64"),
            Self::String => f.write_str("string"),
            Self::List(inner) => write!(f, "list<{inner}>"),
            Self::Map => f.write_str("map"),
            Self::Document => f.write_str("document"),
            Self::Node => f.write_str("node"),
            Self::Edge => f.write_str("edge"),
            Self::Path => f.write_str("path"),
            Self::Graph => f.write_str("graph"),
        }
    }
}
