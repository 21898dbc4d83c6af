//! Plan nodes.
//!
//! A plan is a tree of [`PlanNode`]s. Each node wraps one [`PlanOp`] (the
//! operator and its payload) together with what every node has: its inputs,
//! its output schema, its data model, and its fingerprint.
//!
//! Nodes are only built through the constructors on [`PlanNode`]. Each
//! constructor validates the payload against the inputs, derives the output
//! schema, and checks that the node's model agrees with its inputs' (only
//! [`PlanOp::Transform`] may change the model). Nodes are never mutated;
//! rewrites build new nodes and share untouched subtrees.

use crate::algebra::expr::{ExprRef, Operator};
use crate::algebra::schema::{Field, Schema};
use crate::catalog::{Catalog, EntityRef};
use hashbrown::HashSet;
use polyplan_common::types::{
    EntityId, GraphEdge, GraphNode, LogicalType, ModelTrait, NamespaceId, Value,
};
use polyplan_common::utils::error::{Error, Result};
use polyplan_common::utils::hash::stable_hash;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt::{self, Write as _};
use std::sync::Arc;

/// A shared plan node.
pub type PlanRef = Arc<PlanNode>;

type Inputs = SmallVec<[PlanRef; 2]>;

/// The kind of statement a compiled plan performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryKind {
    /// Read-only query.
    Select,
    /// Creates elements.
    Insert,
    /// Changes existing elements.
    Update,
    /// Removes elements.
    Delete,
}

impl QueryKind {
    /// Returns the upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write operation of a [`ModifyOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifyOperation {
    /// Insert the literal elements the input yields.
    Insert,
    /// Replace the targeted elements with the values the input yields.
    Update,
    /// Remove the targeted elements.
    Delete,
}

impl ModifyOperation {
    /// Returns the upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// Sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order.
    Ascending,
    /// Descending order.
    Descending,
}

/// A sort key: an input field and a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    /// Input field to sort by.
    pub index: usize,
    /// Sort order.
    pub order: SortOrder,
}

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    /// Count rows.
    Count,
    /// Sum values.
    Sum,
    /// Average values.
    Avg,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// Collect into list.
    Collect,
}

impl AggregateFunction {
    /// Looks up an aggregate function by name, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "avg" => Some(Self::Avg),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "collect" => Some(Self::Collect),
            _ => None,
        }
    }

    /// Returns the upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Collect => "COLLECT",
        }
    }
}

/// One aggregate computed by an [`AggregateOp`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateCall {
    /// Aggregate function.
    pub function: AggregateFunction,
    /// Input fields aggregated over; empty for `count(*)`.
    pub args: Vec<usize>,
    /// Whether to use DISTINCT.
    pub distinct: bool,
    /// Output field name.
    pub name: String,
}

impl fmt::Display for AggregateCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function.as_str())?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        if self.args.is_empty() {
            f.write_str("*")?;
        }
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "${arg}")?;
        }
        write!(f, ") AS {}", self.name)
    }
}

/// Full scan of a stored entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOp {
    /// The scanned entity.
    pub entity: EntityRef,
}

/// Filter rows based on a predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOp {
    /// The filter predicate.
    pub predicate: ExprRef,
}

/// Compute one output field per expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectOp {
    /// Expressions over the input.
    pub exprs: Vec<ExprRef>,
    /// Output names; an entry without a name is evaluated but not exposed.
    pub names: Vec<Option<String>>,
}

/// Bind pattern variables against a graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOp {
    /// One `PatternMatch` call per bound variable.
    pub calls: Vec<ExprRef>,
    /// Variable names, parallel to `calls`.
    pub names: Vec<String>,
}

/// Aggregate with grouping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateOp {
    /// Input fields grouped by.
    pub group_keys: Vec<usize>,
    /// Aggregates to compute.
    pub calls: Vec<AggregateCall>,
}

/// Write to a stored entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifyOp {
    /// The entity written to.
    pub entity: EntityRef,
    /// Insert, update, or delete.
    pub operation: ModifyOperation,
    /// Names of the targeted variables.
    pub target_names: Vec<String>,
    /// New values (update) or targeted values (delete), parallel to
    /// `target_names`.
    pub target_exprs: Vec<ExprRef>,
}

/// Unnest a list field into one row per element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnwindOp {
    /// Input field holding the list.
    pub index: usize,
    /// Name of the output field.
    pub alias: String,
}

/// Literal rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuesOp {
    /// Literal nodes, one output field each.
    pub nodes: Vec<GraphNode>,
    /// Literal edges between the nodes.
    pub edges: Vec<GraphEdge>,
    /// Literal scalar rows.
    pub rows: Vec<Vec<Value>>,
    /// Names of the row columns.
    pub row_names: Vec<String>,
}

/// Call a catalog procedure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallOp {
    /// Namespace the procedure runs against.
    pub namespace: NamespaceId,
    /// Procedure name.
    pub procedure: String,
    /// Arguments.
    pub arguments: Vec<ExprRef>,
    /// Whether all result fields are yielded.
    pub yield_all: bool,
    /// Yielded fields when not `yield_all`.
    pub yield_items: Vec<String>,
}

/// Change the data model of its inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformOp {
    /// Element types to materialize, in order.
    pub operation_order: Vec<LogicalType>,
    /// Statement kind being bridged.
    pub operation: QueryKind,
    /// Model of every input.
    pub in_model: ModelTrait,
    /// Model of the output.
    pub out_model: ModelTrait,
    /// Names of the inputs (entity names for substitution graphs).
    pub names: Vec<String>,
}

/// Sort, then optionally skip and limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortOp {
    /// Sort keys, most significant first.
    pub keys: Vec<SortKey>,
    /// Rows to skip.
    pub offset: Option<u64>,
    /// Maximum number of rows to return.
    pub limit: Option<u64>,
}

/// A plan operator and its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlanOp {
    /// Scan a stored entity.
    Scan(ScanOp),
    /// Filter rows based on a predicate.
    Filter(FilterOp),
    /// Compute named expressions.
    Project(ProjectOp),
    /// Bind graph pattern variables.
    Match(MatchOp),
    /// Aggregate with grouping.
    Aggregate(AggregateOp),
    /// Insert, update, or delete.
    Modify(ModifyOp),
    /// Unnest a list.
    Unwind(UnwindOp),
    /// Literal nodes, edges, and rows.
    Values(ValuesOp),
    /// Call a catalog procedure.
    Call(CallOp),
    /// Change data model.
    Transform(TransformOp),
    /// Order, skip, and limit.
    Sort(SortOp),
}

impl PlanOp {
    /// Returns the operator name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Scan(_) => "Scan",
            Self::Filter(_) => "Filter",
            Self::Project(_) => "Project",
            Self::Match(_) => "Match",
            Self::Aggregate(_) => "Aggregate",
            Self::Modify(_) => "Modify",
            Self::Unwind(_) => "Unwind",
            Self::Values(_) => "Values",
            Self::Call(_) => "Call",
            Self::Transform(_) => "Transform",
            Self::Sort(_) => "Sort",
        }
    }

    fn payload(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_payload(&mut out);
        out
    }

    fn write_payload(&self, out: &mut String) -> fmt::Result {
        match self {
            Self::Scan(op) => write!(out, "{}", op.entity),
            Self::Filter(op) => write!(out, "{}", op.predicate),
            Self::Project(op) => {
                for (i, (expr, name)) in op.exprs.iter().zip(&op.names).enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    // Names are quoted so an unnamed entry never reads as a field name.
                    match name {
                        Some(name) => write!(out, "{name:?}={expr}")?,
                        None => write!(out, "_={expr}")?,
                    }
                }
                Ok(())
            }
            Self::Match(op) => {
                for (i, (call, name)) in op.calls.iter().zip(&op.names).enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write!(out, "{name}={call}")?;
                }
                Ok(())
            }
            Self::Aggregate(op) => {
                write!(out, "keys={:?}, calls=[", op.group_keys)?;
                for (i, call) in op.calls.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write!(out, "{call}")?;
                }
                out.push(']');
                Ok(())
            }
            Self::Modify(op) => {
                write!(out, "{} {}", op.operation.as_str(), op.entity)?;
                for (name, expr) in op.target_names.iter().zip(&op.target_exprs) {
                    write!(out, ", {name}={expr}")?;
                }
                Ok(())
            }
            Self::Unwind(op) => write!(out, "${} AS {}", op.index, op.alias),
            Self::Values(op) => {
                out.push_str("nodes=[");
                write_joined(out, &op.nodes)?;
                out.push_str("], edges=[");
                write_joined(out, &op.edges)?;
                out.push(']');
                if !op.row_names.is_empty() {
                    write!(out, ", columns={:?}, rows=[", op.row_names)?;
                    for (i, row) in op.rows.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push('(');
                        write_joined(out, row)?;
                        out.push(')');
                    }
                    out.push(']');
                }
                Ok(())
            }
            Self::Call(op) => {
                write!(out, "{} {}(", op.namespace, op.procedure)?;
                write_joined(out, &op.arguments)?;
                out.push(')');
                if op.yield_all {
                    out.push_str(" YIELD *");
                } else if !op.yield_items.is_empty() {
                    write!(out, " YIELD {}", op.yield_items.join(", "))?;
                }
                Ok(())
            }
            Self::Transform(op) => {
                write!(
                    out,
                    "{}->{}, {}, order=[",
                    op.in_model, op.out_model, op.operation
                )?;
                write_joined(out, &op.operation_order)?;
                write!(out, "], names={:?}", op.names)
            }
            Self::Sort(op) => {
                for (i, key) in op.keys.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let dir = match key.order {
                        SortOrder::Ascending => "ASC",
                        SortOrder::Descending => "DESC",
                    };
                    write!(out, "${} {dir}", key.index)?;
                }
                if let Some(offset) = op.offset {
                    write!(out, ", offset={offset}")?;
                }
                if let Some(limit) = op.limit {
                    write!(out, ", limit={limit}")?;
                }
                Ok(())
            }
        }
    }
}

fn write_joined<T: fmt::Display>(out: &mut String, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write!(out, "{item}")?;
    }
    Ok(())
}

/// Result fields of the procedures `CALL` accepts.
fn procedure_schema(name: &str) -> Option<Schema> {
    let string = || LogicalType::String;
    let fields = match name {
        "db.labels" => vec![Field::new("label", string())],
        "db.relationshipTypes" => vec![Field::new("relationshipType", string())],
        "db.propertyKeys" => vec![Field::new("propertyKey", string())],
        "db.schema.nodeTypeProperties" => vec![
            Field::new("nodeType", string()),
            Field::new("propertyName", string()),
            Field::new("propertyTypes", LogicalType::list_of(string())),
        ],
        _ => return None,
    };
    Some(Schema::new(fields))
}

/// A node of a query plan.
#[derive(Debug, Serialize)]
pub struct PlanNode {
    op: PlanOp,
    inputs: Inputs,
    schema: Schema,
    model: ModelTrait,
    fingerprint: String,
}

impl PlanNode {
    fn build(op: PlanOp, inputs: Inputs, schema: Schema, model: ModelTrait) -> Result<PlanRef> {
        if !matches!(op, PlanOp::Transform(_)) {
            if let Some(child) = inputs.iter().find(|i| i.model != model) {
                return Err(Error::ModelMismatch {
                    parent: model,
                    child: child.model,
                });
            }
        }
        let mut fingerprint = format!("{}[{}]({})", op.kind(), model, op.payload());
        if let PlanOp::Transform(_) = op {
            let _ = write!(fingerprint, "{schema}");
        }
        if !inputs.is_empty() {
            fingerprint.push('[');
            for (i, input) in inputs.iter().enumerate() {
                if i > 0 {
                    fingerprint.push(';');
                }
                fingerprint.push_str(&input.fingerprint);
            }
            fingerprint.push(']');
        }
        Ok(Arc::new(Self {
            op,
            inputs,
            schema,
            model,
            fingerprint,
        }))
    }

    /// Full scan of `entity`; the schema is the entity's row shape.
    pub fn scan(entity: EntityRef) -> Result<PlanRef> {
        let schema = entity.schema();
        let model = entity.model;
        Self::build(PlanOp::Scan(ScanOp { entity }), Inputs::new(), schema, model)
    }

    /// Full scan of the entity with catalog id `id`.
    pub fn scan_by_id(catalog: &dyn Catalog, id: EntityId) -> Result<PlanRef> {
        let entity = catalog
            .entity(id)
            .ok_or_else(|| Error::UnknownEntity(id.to_string()))?;
        Self::scan(entity)
    }

    /// Keeps the rows of `input` for which `predicate` holds.
    pub fn filter(input: PlanRef, predicate: ExprRef) -> Result<PlanRef> {
        if !predicate.ty().is_boolean_like() {
            return Err(Error::type_mismatch("bool", predicate.ty()));
        }
        check_refs(&input.schema, std::slice::from_ref(&predicate))?;
        let schema = input.schema.clone();
        let model = input.model;
        Self::build(
            PlanOp::Filter(FilterOp { predicate }),
            smallvec::smallvec![input],
            schema,
            model,
        )
    }

    /// Computes `exprs` over `input`.
    ///
    /// Entries whose name is `None` are kept in the payload but get no output
    /// field.
    pub fn project(
        input: PlanRef,
        exprs: Vec<ExprRef>,
        names: Vec<Option<String>>,
    ) -> Result<PlanRef> {
        if exprs.len() != names.len() {
            return Err(Error::InvalidPlan(format!(
                "project has {} expressions but {} names",
                exprs.len(),
                names.len()
            )));
        }
        check_refs(&input.schema, &exprs)?;
        let schema = exprs
            .iter()
            .zip(&names)
            .filter_map(|(expr, name)| {
                name.as_ref()
                    .map(|name| Field::new(name.clone(), expr.ty().clone()))
            })
            .collect();
        let model = input.model;
        Self::build(
            PlanOp::Project(ProjectOp { exprs, names }),
            smallvec::smallvec![input],
            schema,
            model,
        )
    }

    /// Binds pattern variables over a graph input.
    ///
    /// Each call must be a `PatternMatch` call; the output has one field per
    /// name, typed as the element the call binds.
    pub fn pattern_match(input: PlanRef, calls: Vec<ExprRef>, names: Vec<String>) -> Result<PlanRef> {
        if input.model != ModelTrait::Graph {
            return Err(Error::UnsupportedInput(format!(
                "pattern match requires a GRAPH input, found {}",
                input.model
            )));
        }
        if calls.len() != names.len() {
            return Err(Error::InvalidPlan(format!(
                "match has {} calls but {} names",
                calls.len(),
                names.len()
            )));
        }
        if let Some(bad) = calls
            .iter()
            .find(|c| c.operator() != Some(&Operator::PatternMatch))
        {
            return Err(Error::InvalidPlan(format!(
                "match expects pattern calls, found {bad}"
            )));
        }
        check_refs(&input.schema, &calls)?;
        let schema = calls
            .iter()
            .zip(&names)
            .map(|(call, name)| Field::new(name.clone(), call.ty().clone()))
            .collect();
        Self::build(
            PlanOp::Match(MatchOp { calls, names }),
            smallvec::smallvec![input],
            schema,
            ModelTrait::Graph,
        )
    }

    /// Groups `input` by `group_keys` and computes `calls` per group.
    ///
    /// The output is an `_id` document holding the group key followed by one
    /// document field per call.
    pub fn aggregate(
        input: PlanRef,
        group_keys: Vec<usize>,
        calls: Vec<AggregateCall>,
    ) -> Result<PlanRef> {
        let width = input.schema.len();
        let out_of_range = group_keys
            .iter()
            .chain(calls.iter().flat_map(|c| c.args.iter()))
            .find(|&&i| i >= width);
        if let Some(index) = out_of_range {
            return Err(Error::InvalidPlan(format!(
                "aggregate refers to ${index} but input has {width} fields"
            )));
        }
        let schema = std::iter::once(Field::new("_id", LogicalType::Document))
            .chain(
                calls
                    .iter()
                    .map(|c| Field::new(c.name.clone(), LogicalType::Document)),
            )
            .collect();
        let model = input.model;
        Self::build(
            PlanOp::Aggregate(AggregateOp { group_keys, calls }),
            smallvec::smallvec![input],
            schema,
            model,
        )
    }

    /// Writes the rows of `input` to `entity`.
    ///
    /// Inserts take no targets. Updates and deletes need at least one target,
    /// one expression per target name. The output is a single row count.
    pub fn modify(
        entity: EntityRef,
        input: PlanRef,
        operation: ModifyOperation,
        target_names: Vec<String>,
        target_exprs: Vec<ExprRef>,
    ) -> Result<PlanRef> {
        match operation {
            ModifyOperation::Insert => {
                if !target_names.is_empty() || !target_exprs.is_empty() {
                    return Err(Error::InvalidPlan("insert takes no targets".into()));
                }
            }
            ModifyOperation::Update | ModifyOperation::Delete => {
                if target_names.is_empty() {
                    return Err(Error::EmptyOperation(format!(
                        "empty {} is not permitted",
                        operation.as_str().to_ascii_lowercase()
                    )));
                }
                if target_names.len() != target_exprs.len() {
                    return Err(Error::InvalidPlan(format!(
                        "modify has {} targets but {} expressions",
                        target_names.len(),
                        target_exprs.len()
                    )));
                }
            }
        }
        check_refs(&input.schema, &target_exprs)?;
        let model = input.model;
        Self::build(
            PlanOp::Modify(ModifyOp {
                entity,
                operation,
                target_names,
                target_exprs,
            }),
            smallvec::smallvec![input],
            Schema::single("ROWCOUNT", LogicalType::Int64),
            model,
        )
    }

    /// Emits one row per element of the list in field `index`.
    ///
    /// The field must be list-typed or dynamic. The output is exactly one
    /// field, `alias`, typed as the list's element.
    pub fn unwind(input: PlanRef, index: usize, alias: impl Into<String>) -> Result<PlanRef> {
        let field = input.schema.field(index).ok_or_else(|| {
            Error::InvalidPlan(format!(
                "unwind refers to ${index} but input has {} fields",
                input.schema.len()
            ))
        })?;
        let element = match &field.ty {
            LogicalType::List(inner) => (**inner).clone(),
            LogicalType::Any => LogicalType::Any,
            other => return Err(Error::type_mismatch("list", other)),
        };
        let alias = alias.into();
        let schema = Schema::single(alias.clone(), element);
        let model = input.model;
        Self::build(
            PlanOp::Unwind(UnwindOp { index, alias }),
            smallvec::smallvec![input],
            schema,
            model,
        )
    }

    /// Literal nodes, edges, and rows.
    ///
    /// Each node yields one node field named after its variable, or `"null"`
    /// when anonymous. Row columns follow, typed from the first row. Every
    /// edge endpoint must name one of the nodes, by variable or by key.
    pub fn values(
        nodes: Vec<GraphNode>,
        edges: Vec<GraphEdge>,
        rows: Vec<Vec<Value>>,
        row_names: Vec<String>,
    ) -> Result<PlanRef> {
        if let Some(row) = rows.iter().find(|r| r.len() != row_names.len()) {
            return Err(Error::InvalidPlan(format!(
                "values row has {} columns, expected {}",
                row.len(),
                row_names.len()
            )));
        }
        let endpoints: HashSet<&str> = nodes.iter().filter_map(GraphNode::endpoint_name).collect();
        if let Some(edge) = edges.iter().find(|e| {
            !endpoints.contains(e.source.as_str()) || !endpoints.contains(e.target.as_str())
        }) {
            return Err(Error::InvalidPlan(format!(
                "values edge {edge} refers to a node it does not create"
            )));
        }
        drop(endpoints);
        let mut fields: Vec<Field> = nodes
            .iter()
            .map(|n| {
                Field::new(
                    n.variable.clone().unwrap_or_else(|| "null".to_string()),
                    LogicalType::Node,
                )
            })
            .collect();
        for (j, name) in row_names.iter().enumerate() {
            let ty = rows
                .first()
                .map_or(LogicalType::Any, |row| row[j].logical_type());
            fields.push(Field::new(name.clone(), ty));
        }
        Self::build(
            PlanOp::Values(ValuesOp {
                nodes,
                edges,
                rows,
                row_names,
            }),
            Inputs::new(),
            Schema::new(fields),
            ModelTrait::Graph,
        )
    }

    /// Calls a catalog procedure.
    ///
    /// Only `db.labels`, `db.relationshipTypes`, `db.propertyKeys`, and
    /// `db.schema.nodeTypeProperties` are accepted, none of which take
    /// arguments. Without explicit yield items every result field is
    /// returned.
    pub fn call(
        namespace: NamespaceId,
        procedure: impl Into<String>,
        arguments: Vec<ExprRef>,
        yield_all: bool,
        yield_items: Vec<String>,
    ) -> Result<PlanRef> {
        let procedure = procedure.into();
        let full = procedure_schema(&procedure)
            .ok_or_else(|| Error::UnsupportedProcedure(procedure.clone()))?;
        if !arguments.is_empty() {
            return Err(Error::type_mismatch(
                "no arguments",
                format!("{} arguments", arguments.len()),
            ));
        }
        let schema = if yield_all || yield_items.is_empty() {
            full
        } else {
            yield_items
                .iter()
                .map(|item| {
                    full.find(item)
                        .map(|(_, f)| f.clone())
                        .ok_or_else(|| Error::UnboundVariable(item.clone()))
                })
                .collect::<Result<Vec<_>>>()
                .map(Schema::new)?
        };
        Self::build(
            PlanOp::Call(CallOp {
                namespace,
                procedure,
                arguments,
                yield_all,
                yield_items,
            }),
            Inputs::new(),
            schema,
            ModelTrait::Graph,
        )
    }

    /// Changes the model of `inputs` from `in_model` to `out_model`.
    ///
    /// The output schema is given by the caller, since the mapping between
    /// models is not something the ordinary type rules can derive. `names`
    /// is either empty or names each input.
    pub fn transform(
        inputs: Vec<PlanRef>,
        schema: Schema,
        operation_order: Vec<LogicalType>,
        operation: QueryKind,
        in_model: ModelTrait,
        out_model: ModelTrait,
        names: Vec<String>,
    ) -> Result<PlanRef> {
        if inputs.is_empty() {
            return Err(Error::InvalidPlan("transform needs at least one input".into()));
        }
        if !names.is_empty() && names.len() != inputs.len() {
            return Err(Error::InvalidPlan(format!(
                "transform has {} inputs but {} names",
                inputs.len(),
                names.len()
            )));
        }
        if let Some(child) = inputs.iter().find(|i| i.model != in_model) {
            return Err(Error::ModelMismatch {
                parent: in_model,
                child: child.model,
            });
        }
        Self::build(
            PlanOp::Transform(TransformOp {
                operation_order,
                operation,
                in_model,
                out_model,
                names,
            }),
            inputs.into_iter().collect(),
            schema,
            out_model,
        )
    }

    /// Sorts `input` by `keys`, then applies `offset` and `limit`.
    pub fn sort(
        input: PlanRef,
        keys: Vec<SortKey>,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> Result<PlanRef> {
        let width = input.schema.len();
        if let Some(key) = keys.iter().find(|k| k.index >= width) {
            return Err(Error::InvalidPlan(format!(
                "sort refers to ${} but input has {width} fields",
                key.index
            )));
        }
        let schema = input.schema.clone();
        let model = input.model;
        Self::build(
            PlanOp::Sort(SortOp {
                keys,
                offset,
                limit,
            }),
            smallvec::smallvec![input],
            schema,
            model,
        )
    }

    /// Returns the operator and payload.
    #[must_use]
    pub fn op(&self) -> &PlanOp {
        &self.op
    }

    /// Returns the operator name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.op.kind()
    }

    /// Returns the inputs.
    #[must_use]
    pub fn inputs(&self) -> &[PlanRef] {
        &self.inputs
    }

    /// Returns the first input, if any.
    #[must_use]
    pub fn input(&self) -> Option<&PlanRef> {
        self.inputs.first()
    }

    /// Returns the output schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the data model.
    #[must_use]
    pub fn model(&self) -> ModelTrait {
        self.model
    }

    /// Returns the canonical structural encoding of this subtree.
    ///
    /// Two plans with equal fingerprints compute the same result over the
    /// same data.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Returns a stable 64-bit hash of the fingerprint.
    #[must_use]
    pub fn digest(&self) -> u64 {
        stable_hash(self.fingerprint.as_str())
    }

    /// Returns the number of nodes in this subtree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.inputs.iter().map(|i| i.node_count()).sum::<usize>()
    }

    /// Renders this subtree as an indented tree, one node per line.
    #[must_use]
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(&mut out, 0);
        out
    }

    fn explain_into(&self, out: &mut String, depth: usize) {
        let _ = writeln!(
            out,
            "{:indent$}{}[{}]({}) -> {}",
            "",
            self.kind(),
            self.model,
            self.op.payload(),
            self.schema,
            indent = depth * 2
        );
        for input in &self.inputs {
            input.explain_into(out, depth + 1);
        }
    }

    /// Applies `f` to every expression in this node's payload.
    ///
    /// Returns this node itself when `f` returns every expression unchanged
    /// (pointer-equal), and a freshly validated node otherwise.
    pub fn rewrite_expressions<F>(self: &Arc<Self>, mut f: F) -> Result<PlanRef>
    where
        F: FnMut(&ExprRef) -> Result<ExprRef>,
    {
        let op = match &self.op {
            PlanOp::Filter(op) => {
                let predicate = f(&op.predicate)?;
                if Arc::ptr_eq(&predicate, &op.predicate) {
                    return Ok(Arc::clone(self));
                }
                PlanOp::Filter(FilterOp { predicate })
            }
            PlanOp::Project(op) => match rewrite_all(&op.exprs, &mut f)? {
                Some(exprs) => PlanOp::Project(ProjectOp {
                    exprs,
                    names: op.names.clone(),
                }),
                None => return Ok(Arc::clone(self)),
            },
            PlanOp::Match(op) => match rewrite_all(&op.calls, &mut f)? {
                Some(calls) => PlanOp::Match(MatchOp {
                    calls,
                    names: op.names.clone(),
                }),
                None => return Ok(Arc::clone(self)),
            },
            PlanOp::Modify(op) => match rewrite_all(&op.target_exprs, &mut f)? {
                Some(target_exprs) => PlanOp::Modify(ModifyOp {
                    target_exprs,
                    ..op.clone()
                }),
                None => return Ok(Arc::clone(self)),
            },
            PlanOp::Call(op) => match rewrite_all(&op.arguments, &mut f)? {
                Some(arguments) => PlanOp::Call(CallOp {
                    arguments,
                    ..op.clone()
                }),
                None => return Ok(Arc::clone(self)),
            },
            _ => return Ok(Arc::clone(self)),
        };
        Self::rebuild(op, self.inputs.to_vec(), &self.schema)
    }

    /// Returns this node over new inputs.
    ///
    /// Returns this node itself when every new input is pointer-equal to the
    /// old one.
    pub fn with_inputs(self: &Arc<Self>, inputs: Vec<PlanRef>) -> Result<PlanRef> {
        let unchanged = inputs.len() == self.inputs.len()
            && inputs
                .iter()
                .zip(&self.inputs)
                .all(|(a, b)| Arc::ptr_eq(a, b));
        if unchanged {
            return Ok(Arc::clone(self));
        }
        Self::rebuild(self.op.clone(), inputs, &self.schema)
    }

    /// Re-derives every node of this subtree from its payload and inputs and
    /// checks that the stored schemas and models agree.
    pub fn validate(&self) -> Result<()> {
        for input in &self.inputs {
            input.validate()?;
        }
        let rebuilt = Self::rebuild(self.op.clone(), self.inputs.to_vec(), &self.schema)?;
        if rebuilt.schema != self.schema || rebuilt.fingerprint != self.fingerprint {
            return Err(Error::Internal(format!(
                "{} node does not match its re-derived form",
                self.kind()
            )));
        }
        Ok(())
    }

    fn rebuild(op: PlanOp, inputs: Vec<PlanRef>, schema: &Schema) -> Result<PlanRef> {
        if let PlanOp::Transform(t) = op {
            return Self::transform(
                inputs,
                schema.clone(),
                t.operation_order,
                t.operation,
                t.in_model,
                t.out_model,
                t.names,
            );
        }
        let arity = match op {
            PlanOp::Scan(_) | PlanOp::Values(_) | PlanOp::Call(_) => 0,
            _ => 1,
        };
        if inputs.len() != arity {
            return Err(Error::InvalidPlan(format!(
                "{} takes {arity} inputs, got {}",
                op.kind(),
                inputs.len()
            )));
        }
        let mut inputs = inputs.into_iter();
        let mut input = || inputs.next().ok_or_else(|| Error::Internal("missing input".into()));
        match op {
            PlanOp::Scan(op) => Self::scan(op.entity),
            PlanOp::Filter(op) => Self::filter(input()?, op.predicate),
            PlanOp::Project(op) => Self::project(input()?, op.exprs, op.names),
            PlanOp::Match(op) => Self::pattern_match(input()?, op.calls, op.names),
            PlanOp::Aggregate(op) => Self::aggregate(input()?, op.group_keys, op.calls),
            PlanOp::Modify(op) => Self::modify(
                op.entity,
                input()?,
                op.operation,
                op.target_names,
                op.target_exprs,
            ),
            PlanOp::Unwind(op) => Self::unwind(input()?, op.index, op.alias),
            PlanOp::Values(op) => Self::values(op.nodes, op.edges, op.rows, op.row_names),
            PlanOp::Call(op) => Self::call(
                op.namespace,
                op.procedure,
                op.arguments,
                op.yield_all,
                op.yield_items,
            ),
            PlanOp::Sort(op) => Self::sort(input()?, op.keys, op.offset, op.limit),
            PlanOp::Transform(_) => Err(Error::Internal("transform handled above".into())),
        }
    }
}

impl PartialEq for PlanNode {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for PlanNode {}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.explain())
    }
}

fn rewrite_all<F>(exprs: &[ExprRef], f: &mut F) -> Result<Option<Vec<ExprRef>>>
where
    F: FnMut(&ExprRef) -> Result<ExprRef>,
{
    let mut changed = false;
    let mut out = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let next = f(expr)?;
        changed |= !Arc::ptr_eq(&next, expr);
        out.push(next);
    }
    Ok(changed.then_some(out))
}

/// Every input reference must point at a field of `schema` and carry that
/// field's type.
fn check_refs(schema: &Schema, exprs: &[ExprRef]) -> Result<()> {
    let fields = schema.fields();
    for (index, ty) in exprs.iter().flat_map(|e| e.input_refs()) {
        let field = fields.get(index).ok_or_else(|| {
            Error::InvalidPlan(format!(
                "expression refers to ${index} but input has {} fields",
                fields.len()
            ))
        })?;
        if field.ty != *ty {
            return Err(Error::type_mismatch(
                format!("{} for ${index}", field.ty),
                ty,
            ));
        }
    }
    Ok(())
}

/// Returns the names that occur more than once in `names`.
#[must_use]
pub fn duplicate_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut dups = Vec::new();
    for name in names {
        if !seen.insert(name) && !dups.contains(&name) {
            dups.push(name);
        }
    }
    dups
}
