//! Literal values, including graph elements.
//!
//! Graph literals ([`GraphNode`], [`GraphEdge`], [`GraphPath`]) are what the
//! translator embeds into plans: match patterns become path literals, and
//! created nodes/edges become node/edge literals. They identify their
//! endpoints by pattern-variable name, never by storage id, so the same query
//! always produces the same literal.

use super::LogicalType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Properties of a node or edge, ordered by key.
pub type PropertyMap = BTreeMap<String, Value>;

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// The null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A 64-bit integer.
    Int64(i64),
    /// A 64-bit float.
    Float64(f64),
    /// A string.
    String(Arc<str>),
    /// A list of values.
    List(Vec<Value>),
    /// A string-keyed map.
    Map(PropertyMap),
    /// A graph node.
    Node(GraphNode),
    /// A graph edge.
    Edge(GraphEdge),
    /// A graph path.
    Path(GraphPath),
}

impl Value {
    /// Returns the logical type of this value.
    #[must_use]
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Self::Null => LogicalType::Null,
            Self::Bool(_) => LogicalType::Bool,
            Self::Int64(_) => LogicalType::Int64,
            Self::Float64(_) => LogicalType::Float64,
            Self::String(_) => LogicalType::String,
            Self::List(items) => {
                let element = items
                    .iter()
                    .map(Value::logical_type)
                    .reduce(|acc, t| acc.unify(&t))
                    .unwrap_or(LogicalType::Any);
                LogicalType::list_of(element)
            }
            Self::Map(_) => LogicalType::Map,
            Self::Node(_) => LogicalType::Node,
            Self::Edge(_) => LogicalType::Edge,
            Self::Path(_) => LogicalType::Path,
        }
    }

    /// Returns the string content if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this is the null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int64(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float64(f)
    }
}

/// Direction of an edge relative to the order its endpoints were written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeDirection {
    /// Outgoing edge: ->
    Outgoing,
    /// Incoming edge: <-
    Incoming,
    /// Undirected edge: -
    Undirected,
}

/// A node literal.
///
/// A node with `is_variable` set is a placeholder standing for the node bound
/// to `variable` elsewhere in the plan; only the name is meaningful.
///
/// An anonymous node has no variable but may carry a generated `key`, which
/// is what edges written next to it use as their endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GraphNode {
    /// Labels of the node.
    pub labels: Vec<String>,
    /// Properties of the node.
    pub properties: PropertyMap,
    /// Pattern variable the node is bound to, if named.
    pub variable: Option<String>,
    /// Generated key of an anonymous node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Whether this literal is a placeholder for a bound variable.
    pub is_variable: bool,
}

impl GraphNode {
    /// Creates a node literal with the given labels and properties.
    #[must_use]
    pub fn new(labels: Vec<String>, properties: PropertyMap, variable: Option<String>) -> Self {
        Self {
            labels,
            properties,
            variable,
            key: None,
            is_variable: false,
        }
    }

    /// Sets the generated key of an anonymous node.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Returns the name edges refer to this node by: its variable, or its
    /// generated key.
    #[must_use]
    pub fn endpoint_name(&self) -> Option<&str> {
        self.variable.as_deref().or(self.key.as_deref())
    }

    /// Creates a placeholder node standing for the named variable.
    #[must_use]
    pub fn placeholder(variable: impl Into<String>) -> Self {
        Self {
            labels: Vec::new(),
            properties: PropertyMap::new(),
            variable: Some(variable.into()),
            key: None,
            is_variable: true,
        }
    }
}

/// An edge literal.
///
/// `source` and `target` are the variable names of the endpoints as they were
/// written in the pattern; `direction` says which way the edge points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Labels (relationship types) of the edge.
    pub labels: Vec<String>,
    /// Properties of the edge.
    pub properties: PropertyMap,
    /// Variable of the left endpoint.
    pub source: String,
    /// Variable of the right endpoint.
    pub target: String,
    /// Direction of the edge.
    pub direction: EdgeDirection,
    /// Pattern variable the edge is bound to, if named.
    pub variable: Option<String>,
    /// Minimum hops (for variable-length patterns).
    pub min_hops: u32,
    /// Maximum hops, `None` for unbounded.
    pub max_hops: Option<u32>,
}

impl GraphEdge {
    /// Creates a single-hop edge literal.
    #[must_use]
    pub fn new(
        labels: Vec<String>,
        properties: PropertyMap,
        source: impl Into<String>,
        target: impl Into<String>,
        direction: EdgeDirection,
        variable: Option<String>,
    ) -> Self {
        Self {
            labels,
            properties,
            source: source.into(),
            target: target.into(),
            direction,
            variable,
            min_hops: 1,
            max_hops: Some(1),
        }
    }

    /// Returns true if this edge matches exactly one hop.
    #[must_use]
    pub fn is_single_hop(&self) -> bool {
        self.min_hops == 1 && self.max_hops == Some(1)
    }
}

/// A path literal: the nodes and edges of one match pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GraphPath {
    /// Nodes in pattern order.
    pub nodes: Vec<GraphNode>,
    /// Edges in pattern order; edge `i` connects node `i` and node `i + 1`.
    pub edges: Vec<GraphEdge>,
    /// Variable the whole path is bound to, if named.
    pub variable: Option<String>,
}

impl GraphPath {
    /// Returns the type of the element bound to `name` within this path.
    #[must_use]
    pub fn element_type(&self, name: &str) -> Option<LogicalType> {
        if self.variable.as_deref() == Some(name) {
            return Some(LogicalType::Path);
        }
        if self.nodes.iter().any(|n| n.variable.as_deref() == Some(name)) {
            return Some(LogicalType::Node);
        }
        if self.edges.iter().any(|e| e.variable.as_deref() == Some(name)) {
            return Some(LogicalType::Edge);
        }
        None
    }

    /// Returns the named elements of this path in declaration order.
    ///
    /// Nodes and edges are interleaved as written; the path variable, if any,
    /// comes last. Names repeated within the path are reported once.
    #[must_use]
    pub fn named_elements(&self) -> Vec<(String, LogicalType)> {
        let mut out: Vec<(String, LogicalType)> = Vec::new();
        let mut push = |name: Option<&String>, ty: LogicalType| {
            if let Some(name) = name {
                if !out.iter().any(|(n, _)| n == name) {
                    out.push((name.clone(), ty));
                }
            }
        };
        for (i, node) in self.nodes.iter().enumerate() {
            push(node.variable.as_ref(), LogicalType::Node);
            if let Some(edge) = self.edges.get(i) {
                push(edge.variable.as_ref(), LogicalType::Edge);
            }
        }
        push(self.variable.as_ref(), LogicalType::Path);
        out
    }
}

fn write_properties(f: &mut fmt::Formatter<'_>, properties: &PropertyMap) -> fmt::Result {
    if properties.is_empty() {
        return Ok(());
    }
    f.write_str(" {")?;
    for (i, (key, value)) in properties.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{key}: {value}")?;
    }
    f.write_str("}")
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        if self.is_variable {
            f.write_str("?")?;
        }
        match (&self.variable, &self.key) {
            (Some(var), _) => f.write_str(var)?,
            (None, Some(key)) => write!(f, "#{key}")?,
            (None, None) => {}
        }
        for label in &self.labels {
            write!(f, ":{label}")?;
        }
        write_properties(f, &self.properties)?;
        f.write_str(")")
    }
}

impl fmt::Display for GraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (left, right) = match self.direction {
            EdgeDirection::Outgoing => ("-", "->"),
            EdgeDirection::Incoming => ("<-", "-"),
            EdgeDirection::Undirected => ("-", "-"),
        };
        write!(f, "({}){left}[", self.source)?;
        if let Some(var) = &self.variable {
            f.write_str(var)?;
        }
        for (i, label) in self.labels.iter().enumerate() {
            f.write_str(if i == 0 { ":" } else { "|" })?;
            f.write_str(label)?;
        }
        if !self.is_single_hop() {
            write!(f, "*{}..", self.min_hops)?;
            if let Some(max) = self.max_hops {
                write!(f, "{max}")?;
            }
        }
        write_properties(f, &self.properties)?;
        write!(f, "]{right}({})", self.target)
    }
}

impl fmt::Display for GraphPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(var) = &self.variable {
            write!(f, "{var} = ")?;
        }
        f.write_str("<")?;
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{node}")?;
        }
        for edge in &self.edges {
            write!(f, ", {edge}")?;
        }
        f.write_str(">")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int64(i) => write!(f, "{i}"),
            Self::Float64(x) => write!(f, "{x:?}"),
            Self::String(s) => write!(f, "{:?}", s.as_ref()),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Self::Node(node) => write!(f, "{node}"),
            Self::Edge(edge) => write!(f, "{edge}"),
            Self::Path(path) => write!(f, "{path}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knows_path() -> GraphPath {
        GraphPath {
            nodes: vec![
                GraphNode::new(vec!["Person".into()], PropertyMap::new(), Some("a".into())),
                GraphNode::new(vec![], PropertyMap::new(), Some("b".into())),
            ],
            edges: vec![GraphEdge::new(
                vec!["KNOWS".into()],
                PropertyMap::new(),
                "a",
                "b",
                EdgeDirection::Outgoing,
                Some("e".into()),
            )],
            variable: None,
        }
    }

    #[test]
    fn test_list_type_unifies_elements() {
        let list = Value::List(vec![Value::Int64(1), Value::Float64(2.5)]);
        assert_eq!(list.logical_type(), LogicalType::list_of(LogicalType::Float64));

        let empty = Value::List(vec![]);
        assert_eq!(empty.logical_type(), LogicalType::list_of(LogicalType::Any));
    }

    #[test]
    fn test_path_named_elements() {
        let path = knows_path();
        let named = path.named_elements();
        assert_eq!(
            named,
            vec![
                ("a".to_string(), LogicalType::Node),
                ("e".to_string(), LogicalType::Edge),
                ("b".to_string(), LogicalType::Node),
            ]
        );
        assert_eq!(path.element_type("e"), Some(LogicalType::Edge));
        assert_eq!(path.element_type("x"), None);
    }

    #[test]
    fn test_display_is_canonical() {
        let path = knows_path();
        assert_eq!(
            path.to_string(),
            "<(a:Person), (b), (a)-[e:KNOWS]->(b)>"
        );

        let mut props = PropertyMap::new();
        props.insert("p".into(), Value::Int64(1));
        props.insert("a".into(), Value::from("x"));
        let node = GraphNode::new(vec!["L".into()], props, Some("x".into()));
        assert_eq!(node.to_string(), "(x:L {a: \"x\", p: 1})");
        assert_eq!(GraphNode::placeholder("n").to_string(), "(?n)");
    }

    #[test]
    fn test_anonymous_key_is_distinct_from_variable() {
        let anonymous = GraphNode::new(vec!["A".into()], PropertyMap::new(), None).with_key("k");
        let named = GraphNode::new(vec!["A".into()], PropertyMap::new(), Some("k".into()));
        assert_eq!(anonymous.to_string(), "(#k:A)");
        assert_eq!(named.to_string(), "(k:A)");
        assert_eq!(anonymous.endpoint_name(), Some("k"));
        assert_eq!(named.endpoint_name(), Some("k"));
        assert_eq!(GraphNode::default().endpoint_name(), None);
    }
}
