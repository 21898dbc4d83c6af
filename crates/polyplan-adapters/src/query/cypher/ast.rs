//! Cypher Abstract Syntax Tree.

use polyplan_common::utils::error::SourceSpan;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use polyplan_common::types::EdgeDirection;

/// A Cypher query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    /// A single query: clauses executed in order.
    Single(SingleQuery),
    /// `q1 UNION [ALL] q2 ...`
    Union {
        /// The combined queries.
        queries: Vec<SingleQuery>,
        /// Whether duplicates are kept (UNION ALL).
        all: bool,
    },
    /// `USING PERIODIC COMMIT [n] ...`
    PeriodicCommit {
        /// Rows per commit.
        batch_size: Option<u64>,
        /// The query.
        query: SingleQuery,
    },
}

impl Query {
    /// Creates a single query from clauses.
    #[must_use]
    pub fn single(clauses: Vec<Clause>) -> Self {
        Self::Single(SingleQuery {
            clauses,
            span: None,
        })
    }
}

/// An ordered list of clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleQuery {
    /// The clauses, in source order.
    pub clauses: Vec<Clause>,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// A clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    /// `[OPTIONAL] MATCH pattern [WHERE cond]`
    Match(MatchClause),
    /// `WITH items [WHERE cond]`
    With(WithClause),
    /// `RETURN items`
    Return(ReturnClause),
    /// `CREATE pattern`
    Create(CreateClause),
    /// `SET items`
    Set(SetClause),
    /// `REMOVE items`
    Remove(RemoveClause),
    /// `[DETACH] DELETE vars`
    Delete(DeleteClause),
    /// `UNWIND list AS x`
    Unwind(UnwindClause),
    /// `CALL proc() [YIELD ...]`
    Call(CallClause),
    /// `USE graph`
    Use(UseClause),
    /// `MERGE pattern`
    Merge(MergeClause),
    /// `FOREACH (x IN list | ...)`
    Foreach(ForeachClause),
    /// `LOAD CSV FROM url AS row`
    LoadCsv(LoadCsvClause),
}

impl Clause {
    /// Returns the clause keyword.
    #[must_use]
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Match(m) if m.optional => "OPTIONAL MATCH",
            Self::Match(_) => "MATCH",
            Self::With(_) => "WITH",
            Self::Return(_) => "RETURN",
            Self::Create(_) => "CREATE",
            Self::Set(_) => "SET",
            Self::Remove(_) => "REMOVE",
            Self::Delete(d) if d.detach => "DETACH DELETE",
            Self::Delete(_) => "DELETE",
            Self::Unwind(_) => "UNWIND",
            Self::Call(_) => "CALL",
            Self::Use(_) => "USE",
            Self::Merge(_) => "MERGE",
            Self::Foreach(_) => "FOREACH",
            Self::LoadCsv(_) => "LOAD CSV",
        }
    }

    /// Returns the source span, if the parser recorded one.
    #[must_use]
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            Self::Match(c) => c.span,
            Self::With(c) => c.span,
            Self::Return(c) => c.span,
            Self::Create(c) => c.span,
            Self::Set(c) => c.span,
            Self::Remove(c) => c.span,
            Self::Delete(c) => c.span,
            Self::Unwind(c) => c.span,
            Self::Call(c) => c.span,
            Self::Use(c) => c.span,
            Self::Merge(c) => c.span,
            Self::Foreach(c) => c.span,
            Self::LoadCsv(c) => c.span,
        }
    }
}

/// A MATCH clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchClause {
    /// Whether this is an OPTIONAL MATCH.
    #[serde(default)]
    pub optional: bool,
    /// Graph patterns to match.
    pub patterns: Vec<Pattern>,
    /// Optional WHERE condition.
    #[serde(default)]
    pub where_clause: Option<Expression>,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// A WITH clause for query chaining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithClause {
    /// Whether to use DISTINCT.
    #[serde(default)]
    pub distinct: bool,
    /// Whether `*` passes every variable through.
    #[serde(default)]
    pub star: bool,
    /// Items to pass to the next query part.
    #[serde(default)]
    pub items: Vec<ReturnItem>,
    /// Optional ORDER BY.
    #[serde(default)]
    pub order_by: Vec<OrderByItem>,
    /// Optional SKIP.
    #[serde(default)]
    pub skip: Option<Expression>,
    /// Optional LIMIT.
    #[serde(default)]
    pub limit: Option<Expression>,
    /// Optional WHERE condition after WITH.
    #[serde(default)]
    pub where_clause: Option<Expression>,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// A RETURN clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnClause {
    /// Whether to return DISTINCT results.
    #[serde(default)]
    pub distinct: bool,
    /// Whether `*` returns every variable.
    #[serde(default)]
    pub star: bool,
    /// Items to return.
    #[serde(default)]
    pub items: Vec<ReturnItem>,
    /// Optional ORDER BY.
    #[serde(default)]
    pub order_by: Vec<OrderByItem>,
    /// Optional SKIP.
    #[serde(default)]
    pub skip: Option<Expression>,
    /// Optional LIMIT.
    #[serde(default)]
    pub limit: Option<Expression>,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

impl ReturnClause {
    /// Creates a RETURN clause over the given items.
    #[must_use]
    pub fn new(items: Vec<ReturnItem>) -> Self {
        Self {
            distinct: false,
            star: false,
            items,
            order_by: Vec::new(),
            skip: None,
            limit: None,
            span: None,
        }
    }
}

/// An item in a RETURN or WITH clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnItem {
    /// The expression to return.
    pub expression: Expression,
    /// Optional alias (AS name).
    #[serde(default)]
    pub alias: Option<String>,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

impl ReturnItem {
    /// Creates an item without alias.
    #[must_use]
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            alias: None,
            span: None,
        }
    }

    /// Creates an item with an alias.
    pub fn aliased(expression: Expression, alias: impl Into<String>) -> Self {
        Self {
            expression,
            alias: Some(alias.into()),
            span: None,
        }
    }

    /// Returns the output column name: the alias, or the expression text.
    #[must_use]
    pub fn name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.expression.to_string())
    }
}

/// A sort item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByItem {
    /// The expression to sort by.
    pub expression: Expression,
    /// Sort order.
    #[serde(default)]
    pub order: SortOrder,
}

/// Sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// A CREATE clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateClause {
    /// Patterns to create.
    pub patterns: Vec<Pattern>,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// A SET clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetClause {
    /// Assignments, applied in order.
    pub items: Vec<SetItem>,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// One assignment of a SET clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SetItem {
    /// `SET n.key = value`
    Property {
        /// Variable name.
        variable: String,
        /// Property key.
        property: String,
        /// Value expression.
        value: Expression,
    },
    /// `SET n = map`
    Replace {
        /// Variable name.
        variable: String,
        /// Map expression.
        value: Expression,
    },
    /// `SET n += map`
    Merge {
        /// Variable name.
        variable: String,
        /// Map expression.
        value: Expression,
    },
    /// `SET n:Label`
    Labels {
        /// Variable name.
        variable: String,
        /// Labels to add.
        labels: Vec<String>,
    },
}

impl SetItem {
    /// Returns the variable being assigned to.
    #[must_use]
    pub fn variable(&self) -> &str {
        match self {
            Self::Property { variable, .. }
            | Self::Replace { variable, .. }
            | Self::Merge { variable, .. }
            | Self::Labels { variable, .. } => variable,
        }
    }
}

/// A REMOVE clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveClause {
    /// Items to remove, in order.
    pub items: Vec<RemoveItem>,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// One item of a REMOVE clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RemoveItem {
    /// `REMOVE n.key`
    Property {
        /// Variable name.
        variable: String,
        /// Property key.
        property: String,
    },
    /// `REMOVE n:Label`
    Labels {
        /// Variable name.
        variable: String,
        /// Labels to remove.
        labels: Vec<String>,
    },
}

impl RemoveItem {
    /// Returns the variable being changed.
    #[must_use]
    pub fn variable(&self) -> &str {
        match self {
            Self::Property { variable, .. } | Self::Labels { variable, .. } => variable,
        }
    }
}

/// A DELETE clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteClause {
    /// Variables to delete.
    pub variables: Vec<String>,
    /// Whether to use DETACH DELETE.
    #[serde(default)]
    pub detach: bool,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// An UNWIND clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnwindClause {
    /// The list expression.
    pub expression: Expression,
    /// Name bound to each element.
    pub alias: String,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// A standalone CALL clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallClause {
    /// Fully qualified procedure name, e.g. `db.labels`.
    pub procedure: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<Expression>,
    /// Whether `YIELD *` was written.
    #[serde(default)]
    pub yield_all: bool,
    /// Explicit yield items.
    #[serde(default)]
    pub yield_items: Vec<String>,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// A USE clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseClause {
    /// Graph name.
    pub graph: String,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// A MERGE clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeClause {
    /// Pattern to match or create.
    pub pattern: Pattern,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// A FOREACH clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeachClause {
    /// Loop variable.
    pub variable: String,
    /// List iterated over.
    pub list: Expression,
    /// Nested update clauses.
    #[serde(default)]
    pub clauses: Vec<Clause>,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// A LOAD CSV clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCsvClause {
    /// Source URL.
    pub url: String,
    /// Row variable.
    pub variable: String,
    /// Whether the first line holds headers.
    #[serde(default)]
    pub with_headers: bool,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// A graph pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// A node pattern.
    Node(NodePattern),
    /// An edge pattern connecting nodes.
    Path(PathPattern),
}

impl Pattern {
    /// Returns the path variable (`p = ...`), if any.
    #[must_use]
    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::Node(_) => None,
            Self::Path(p) => p.variable.as_deref(),
        }
    }

    /// Returns the leading node pattern.
    #[must_use]
    pub fn source(&self) -> &NodePattern {
        match self {
            Self::Node(n) => n,
            Self::Path(p) => &p.source,
        }
    }

    /// Returns the edge patterns (empty for a lone node).
    #[must_use]
    pub fn edges(&self) -> &[EdgePattern] {
        match self {
            Self::Node(_) => &[],
            Self::Path(p) => &p.edges,
        }
    }
}

/// A node pattern like (n:Person).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePattern {
    /// Variable name (optional).
    #[serde(default)]
    pub variable: Option<String>,
    /// Labels to match.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Property filters.
    #[serde(default)]
    pub properties: Vec<(String, Expression)>,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

impl NodePattern {
    /// Creates a node pattern bound to `variable`.
    pub fn named(variable: impl Into<String>) -> Self {
        Self {
            variable: Some(variable.into()),
            labels: Vec::new(),
            properties: Vec::new(),
            span: None,
        }
    }

    /// Creates an anonymous node pattern.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            variable: None,
            labels: Vec::new(),
            properties: Vec::new(),
            span: None,
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Adds a property filter.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Expression) -> Self {
        self.properties.push((key.into(), value));
        self
    }
}

/// A path pattern like (a)-[:KNOWS]->(b).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPattern {
    /// Path variable (`p = ...`).
    #[serde(default)]
    pub variable: Option<String>,
    /// Source node pattern.
    pub source: NodePattern,
    /// Edge patterns.
    pub edges: Vec<EdgePattern>,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

/// An edge pattern like -[:KNOWS]->.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgePattern {
    /// Variable name (optional).
    #[serde(default)]
    pub variable: Option<String>,
    /// Edge types to match.
    #[serde(default)]
    pub types: Vec<String>,
    /// Direction of the edge.
    pub direction: EdgeDirection,
    /// Property filters.
    #[serde(default)]
    pub properties: Vec<(String, Expression)>,
    /// Variable-length range (`*min..max`).
    #[serde(default)]
    pub range: Option<HopRange>,
    /// Target node pattern.
    pub target: NodePattern,
    /// Source span.
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

impl EdgePattern {
    /// Creates a single-hop edge pattern to `target`.
    #[must_use]
    pub fn new(variable: Option<String>, direction: EdgeDirection, target: NodePattern) -> Self {
        Self {
            variable,
            types: Vec::new(),
            direction,
            properties: Vec::new(),
            range: None,
            target,
            span: None,
        }
    }

    /// Adds an edge type.
    #[must_use]
    pub fn with_type(mut self, edge_type: impl Into<String>) -> Self {
        self.types.push(edge_type.into());
        self
    }
}

/// Hop bounds of a variable-length edge pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopRange {
    /// Minimum hops (default 1).
    #[serde(default)]
    pub min: Option<u32>,
    /// Maximum hops (unbounded if absent).
    #[serde(default)]
    pub max: Option<u32>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// A literal value.
    Literal(Literal),
    /// A variable reference.
    Variable(String),
    /// A parameter reference ($name).
    Parameter(String),
    /// A property access (var.prop).
    PropertyAccess {
        /// The variable.
        variable: String,
        /// The property name.
        property: String,
    },
    /// A label test (var:Label).
    HasLabels {
        /// The variable.
        variable: String,
        /// Labels that must all be present.
        labels: Vec<String>,
    },
    /// A binary operation.
    Binary {
        /// Left operand.
        left: Box<Expression>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expression>,
    },
    /// A unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expression>,
    },
    /// A function call.
    FunctionCall {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<Expression>,
        /// Whether DISTINCT was written (aggregates only).
        #[serde(default)]
        distinct: bool,
    },
    /// `count(*)`
    CountStar,
    /// A list expression.
    List(Vec<Expression>),
    /// A map expression.
    Map(Vec<(String, Expression)>),
    /// A CASE expression.
    Case {
        /// Optional input expression.
        input: Option<Box<Expression>>,
        /// When clauses.
        whens: Vec<(Expression, Expression)>,
        /// Else clause.
        else_clause: Option<Box<Expression>>,
    },
}

impl Expression {
    /// A variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// A property access.
    pub fn prop(variable: impl Into<String>, property: impl Into<String>) -> Self {
        Self::PropertyAccess {
            variable: variable.into(),
            property: property.into(),
        }
    }

    /// An integer literal.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }

    /// A string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::String(value.into()))
    }

    /// A binary operation.
    #[must_use]
    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// A function call.
    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self::FunctionCall {
            name: name.into(),
            args,
            distinct: false,
        }
    }

    /// Returns true if this expression contains an aggregate function call.
    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::CountStar => true,
            Self::FunctionCall { name, args, .. } => {
                is_aggregate_name(name) || args.iter().any(Self::contains_aggregate)
            }
            Self::Binary { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Self::Unary { operand, .. } => operand.contains_aggregate(),
            Self::List(items) => items.iter().any(Self::contains_aggregate),
            Self::Map(entries) => entries.iter().any(|(_, e)| e.contains_aggregate()),
            Self::Case {
                input,
                whens,
                else_clause,
            } => {
                input.as_deref().is_some_and(Self::contains_aggregate)
                    || whens
                        .iter()
                        .any(|(w, t)| w.contains_aggregate() || t.contains_aggregate())
                    || else_clause.as_deref().is_some_and(Self::contains_aggregate)
            }
            Self::Literal(_)
            | Self::Variable(_)
            | Self::Parameter(_)
            | Self::PropertyAccess { .. }
            | Self::HasLabels { .. } => false,
        }
    }
}

/// Returns true for the names of aggregate functions.
#[must_use]
pub fn is_aggregate_name(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "count" | "sum" | "avg" | "min" | "max" | "collect"
    )
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Null literal.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    String(String),
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Comparison
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,

    // Logical
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
    /// Logical XOR.
    Xor,

    // Arithmetic
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Modulo.
    Mod,
    /// Exponentiation.
    Pow,

    // String and list
    /// IN list membership.
    In,
    /// STARTS WITH.
    StartsWith,
    /// ENDS WITH.
    EndsWith,
    /// CONTAINS.
    Contains,
    /// `=~` regular expression match.
    RegexMatch,
}

impl BinaryOp {
    /// Returns the operator as written in Cypher.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "^",
            Self::In => "IN",
            Self::StartsWith => "STARTS WITH",
            Self::EndsWith => "ENDS WITH",
            Self::Contains => "CONTAINS",
            Self::RegexMatch => "=~",
        }
    }
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Logical NOT.
    Not,
    /// Unary minus.
    Neg,
    /// IS NULL.
    IsNull,
    /// IS NOT NULL.
    IsNotNull,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Renders the expression as Cypher text. This is also the default column
/// name of an unaliased RETURN item.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Variable(name) => f.write_str(name),
            Self::Parameter(name) => write!(f, "${name}"),
            Self::PropertyAccess { variable, property } => write!(f, "{variable}.{property}"),
            Self::HasLabels { variable, labels } => {
                f.write_str(variable)?;
                for label in labels {
                    write!(f, ":{label}")?;
                }
                Ok(())
            }
            Self::Binary { left, op, right } => write!(f, "{left} {} {right}", op.symbol()),
            Self::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "NOT {operand}"),
                UnaryOp::Neg => write!(f, "-{operand}"),
                UnaryOp::IsNull => write!(f, "{operand} IS NULL"),
                UnaryOp::IsNotNull => write!(f, "{operand} IS NOT NULL"),
            },
            Self::FunctionCall {
                name,
                args,
                distinct,
            } => {
                write!(f, "{name}(")?;
                if *distinct {
                    f.write_str("DISTINCT ")?;
                }
                write_list(f, args)?;
                f.write_str(")")
            }
            Self::CountStar => f.write_str("count(*)"),
            Self::List(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Self::Case {
                input,
                whens,
                else_clause,
            } => {
                f.write_str("CASE")?;
                if let Some(input) = input {
                    write!(f, " {input}")?;
                }
                for (when, then) in whens {
                    write!(f, " WHEN {when} THEN {then}")?;
                }
                if let Some(other) = else_clause {
                    write!(f, " ELSE {other}")?;
                }
                f.write_str(" END")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_column_names() {
        assert_eq!(ReturnItem::new(Expression::prop("a", "name")).name(), "a.name");
        assert_eq!(
            ReturnItem::new(Expression::call("count", vec![Expression::var("a")])).name(),
            "count(a)"
        );
        assert_eq!(
            ReturnItem::aliased(Expression::var("a"), "person").name(),
            "person"
        );
        let cmp = Expression::binary(Expression::prop("a", "age"), BinaryOp::Gt, Expression::int(3));
        assert_eq!(cmp.to_string(), "a.age > 3");
        assert_eq!(Expression::string("it's").to_string(), "'it\\'s'");
    }

    #[test]
    fn test_contains_aggregate() {
        assert!(Expression::CountStar.contains_aggregate());
        assert!(
            Expression::binary(
                Expression::call("SUM", vec![Expression::prop("a", "x")]),
                BinaryOp::Add,
                Expression::int(1)
            )
            .contains_aggregate()
        );
        assert!(!Expression::call("size", vec![Expression::var("xs")]).contains_aggregate());
    }

    #[test]
    fn test_clause_keywords() {
        let m = Clause::Match(MatchClause {
            optional: true,
            patterns: vec![],
            where_clause: None,
            span: Some(SourceSpan::new(0, 14, 1, 1)),
        });
        assert_eq!(m.keyword(), "OPTIONAL MATCH");
        assert_eq!(m.span().map(|s| s.line), Some(1));
        let d = Clause::Delete(DeleteClause {
            variables: vec!["n".into()],
            detach: true,
            span: None,
        });
        assert_eq!(d.keyword(), "DETACH DELETE");
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{
            "Single": {
                "clauses": [
                    {"Match": {"patterns": [
                        {"Path": {
                            "source": {"variable": "a", "labels": ["Person"]},
                            "edges": [{
                                "variable": "e",
                                "direction": "Outgoing",
                                "target": {"variable": "b"}
                            }]
                        }}
                    ]}},
                    {"Return": {"items": [
                        {"expression": {"Variable": "a"}},
                        {"expression": {"PropertyAccess": {"variable": "b", "property": "name"}}, "alias": "n"}
                    ]}}
                ]
            }
        }"#;
        let query: Query = serde_json::from_str(json).unwrap();
        let Query::Single(single) = &query else {
            panic!("Expected single query");
        };
        assert_eq!(single.clauses.len(), 2);
        let Clause::Match(m) = &single.clauses[0] else {
            panic!("Expected MATCH clause");
        };
        assert_eq!(m.patterns[0].source().labels, vec!["Person".to_string()]);
        assert_eq!(m.patterns[0].edges()[0].direction, EdgeDirection::Outgoing);
        let Clause::Return(r) = &single.clauses[1] else {
            panic!("Expected RETURN clause");
        };
        assert_eq!(r.items[1].name(), "n");

        let back = serde_json::to_string(&query).unwrap();
        let again: Query = serde_json::from_str(&back).unwrap();
        assert_eq!(again, query);
    }
}
