//! Translation context.
//!
//! Clause handlers do not build plan nodes directly. They push named
//! expressions onto the *pending* queue and bind created pattern elements,
//! then call one of the `combine_*` actions, which drains that state into
//! exactly one new plan node on top of the stack. Each combine action starts
//! with explicit guards ([`TranslationContext::add_default_scan_if_necessary`],
//! [`TranslationContext::add_project_if_necessary`]) that bring the stack into
//! the shape the action expects.
//!
//! A context is owned by a single compile and dropped when it finishes.

use crate::query::bridge;
use indexmap::IndexMap;
use polyplan_common::types::{GraphEdge, GraphNode, LogicalType, ModelTrait, NamespaceId, Value};
use polyplan_common::utils::error::{Error, Result};
use polyplan_core::algebra::{
    Expr, ExprRef, ModifyOperation, Operator, PlanNode, PlanOp, PlanRef, QueryKind, Schema,
};
use polyplan_core::catalog::{Catalog, EntityRef};
use std::collections::VecDeque;
use std::fmt;

/// What a query's default scan reads.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphSource {
    /// The namespace's own graph.
    Entity(EntityRef),
    /// A namespace without a graph, read through a substitution graph over
    /// the entities named by `labels` (all entities if empty).
    Substitution {
        /// The namespace.
        namespace: NamespaceId,
        /// Labels the query mentions.
        labels: Vec<String>,
    },
}

impl GraphSource {
    /// Resolves the graph of `namespace`.
    ///
    /// Falls back to a substitution graph when the namespace exists but has
    /// no graph and `allow_substitution` is set.
    pub fn resolve(
        catalog: &dyn Catalog,
        namespace: NamespaceId,
        allow_substitution: bool,
        labels: Vec<String>,
    ) -> Result<Self> {
        if let Some(graph) = catalog.graph(namespace) {
            return Ok(Self::Entity(graph));
        }
        if allow_substitution && catalog.namespace(namespace).is_some() {
            return Ok(Self::Substitution { namespace, labels });
        }
        Err(Error::UnknownEntity(format!("no graph in namespace {namespace}")))
    }
}

/// A relationship bound by a CREATE pattern, with the names of its endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundEdge {
    /// Variable of the relationship, if named.
    pub name: Option<String>,
    /// The edge literal.
    pub edge: GraphEdge,
    /// Key of the source node.
    pub left: String,
    /// Key of the target node.
    pub right: String,
}

/// Where the endpoints of a created edge come from, with the upstream field
/// positions of those that are upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointCase {
    /// Both endpoints are fields of the upstream plan.
    BothUpstream {
        /// Field of the source.
        left: usize,
        /// Field of the target.
        right: usize,
    },
    /// Both endpoints are created by the same clause.
    BothNew,
    /// Only the source is upstream.
    LeftUpstream {
        /// Field of the source.
        left: usize,
    },
    /// Only the target is upstream.
    RightUpstream {
        /// Field of the target.
        right: usize,
    },
}

impl EndpointCase {
    /// Classifies an edge by locating its endpoint keys in `upstream`.
    #[must_use]
    pub fn classify(upstream: &Schema, edge: &BoundEdge) -> Self {
        match (upstream.index_of(&edge.left), upstream.index_of(&edge.right)) {
            (Some(left), Some(right)) => Self::BothUpstream { left, right },
            (None, None) => Self::BothNew,
            (Some(left), None) => Self::LeftUpstream { left },
            (None, Some(right)) => Self::RightUpstream { right },
        }
    }
}

/// Mutable state threaded through the clause handlers of one compile.
pub struct TranslationContext<'a> {
    catalog: &'a dyn Catalog,
    source: GraphSource,
    stack: Vec<PlanRef>,
    pending: VecDeque<(Option<String>, ExprRef)>,
    bound_nodes: IndexMap<String, GraphNode>,
    bound_edges: Vec<BoundEdge>,
    kind: Option<QueryKind>,
    anonymous: usize,
}

impl<'a> TranslationContext<'a> {
    /// Creates an empty context reading from `source`.
    pub fn new(catalog: &'a dyn Catalog, source: GraphSource) -> Self {
        Self {
            catalog,
            source,
            stack: Vec::new(),
            pending: VecDeque::new(),
            bound_nodes: IndexMap::new(),
            bound_edges: Vec::new(),
            kind: None,
            anonymous: 0,
        }
    }

    /// Returns the graph source.
    #[must_use]
    pub fn source(&self) -> &GraphSource {
        &self.source
    }

    /// Returns the query kind set so far.
    #[must_use]
    pub fn kind(&self) -> Option<QueryKind> {
        self.kind
    }

    /// Sets the query kind.
    pub fn set_kind(&mut self, kind: QueryKind) {
        self.kind = Some(kind);
    }

    /// Sets the query kind unless one is set already.
    pub fn set_kind_if_unset(&mut self, kind: QueryKind) {
        self.kind.get_or_insert(kind);
    }

    /// Returns a fresh key for an anonymous pattern node.
    pub fn next_anonymous(&mut self) -> String {
        let key = format!("_anon{}", self.anonymous);
        self.anonymous += 1;
        key
    }

    /// Pushes a plan onto the stack.
    pub fn push(&mut self, plan: PlanRef) {
        self.stack.push(plan);
    }

    /// Returns the top of the stack.
    #[must_use]
    pub fn peek(&self) -> Option<&PlanRef> {
        self.stack.last()
    }

    /// Pops the top of the stack.
    pub fn pop(&mut self) -> Result<PlanRef> {
        self.stack
            .pop()
            .ok_or_else(|| Error::UnsupportedInput("clause has no input".into()))
    }

    /// Returns true if nothing has been pushed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Returns the schema of the top of the stack, which is what expressions
    /// of the current clause refer to.
    #[must_use]
    pub fn scope(&self) -> Schema {
        self.peek().map(|p| p.schema().clone()).unwrap_or_default()
    }

    /// Queues a named (or unnamed) expression for the next combine.
    pub fn add(&mut self, name: Option<String>, expr: ExprRef) {
        self.pending.push_back((name, expr));
    }

    /// Removes and returns the queued expression named `name`, keeping the
    /// order of the rest.
    pub fn take_pending(&mut self, name: &str) -> Option<ExprRef> {
        let index = self
            .pending
            .iter()
            .position(|(n, _)| n.as_deref() == Some(name))?;
        self.pending.remove(index).map(|(_, expr)| expr)
    }

    /// Returns true if a queued expression is named `name`.
    #[must_use]
    pub fn has_pending(&self, name: &str) -> bool {
        self.pending.iter().any(|(n, _)| n.as_deref() == Some(name))
    }

    /// Returns the number of queued expressions.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Binds a node to be created under `key`. A key already bound keeps its
    /// first node; returns whether the node was added.
    pub fn bind_node(&mut self, key: impl Into<String>, node: GraphNode) -> bool {
        let key = key.into();
        if self.bound_nodes.contains_key(&key) {
            return false;
        }
        self.bound_nodes.insert(key, node);
        true
    }

    /// Returns true if a node is bound under `key`.
    #[must_use]
    pub fn is_bound(&self, key: &str) -> bool {
        self.bound_nodes.contains_key(key)
    }

    /// Binds an edge to be created.
    pub fn bind_edge(&mut self, edge: BoundEdge) {
        self.bound_edges.push(edge);
    }

    /// Returns the entity modifying clauses write to.
    pub fn target_entity(&self) -> Result<&EntityRef> {
        match &self.source {
            GraphSource::Entity(entity) => Ok(entity),
            GraphSource::Substitution { namespace, .. } => Err(Error::UnsupportedOperation(
                format!("cannot modify the substitution graph of namespace {namespace}"),
            )),
        }
    }

    /// Pushes a full scan of the graph if the stack is empty.
    pub fn add_default_scan_if_necessary(&mut self) -> Result<()> {
        if !self.stack.is_empty() {
            return Ok(());
        }
        let scan = match &self.source {
            GraphSource::Entity(entity) => PlanNode::scan(entity.clone())?,
            GraphSource::Substitution { namespace, labels } => {
                bridge::substitution_scan(self.catalog, *namespace, labels)?
            }
        };
        tracing::debug!(scan = %scan.kind(), "default scan");
        self.stack.push(scan);
        Ok(())
    }

    /// Projects the queued expressions if the top of the stack is still the
    /// bare graph.
    ///
    /// Expressions over the graph itself cannot be filtered on directly; they
    /// are projected first and the queue is replaced by references to the
    /// projected fields.
    pub fn add_project_if_necessary(&mut self) -> Result<()> {
        let bare_graph = self
            .peek()
            .is_some_and(|top| top.schema().is_single(&LogicalType::Graph));
        if !bare_graph || self.pending.is_empty() {
            return Ok(());
        }
        let input = self.pop()?;
        let mut counter = 0;
        let (names, exprs): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .map(|(name, expr)| (Some(name.unwrap_or_else(|| expr_name(&mut counter))), expr))
            .unzip();
        let project = PlanNode::project(input, exprs, names)?;
        for (i, field) in project.schema().fields().iter().enumerate() {
            self.pending.push_back((
                Some(field.name.clone()),
                Expr::input_ref(i, field.ty.clone()),
            ));
        }
        tracing::debug!(fields = project.schema().len(), "projected before filter");
        self.stack.push(project);
        Ok(())
    }

    /// Drains the queued pattern calls into one `Match` over the graph.
    ///
    /// A `Match` directly on top of the stack is extended instead, so
    /// consecutive MATCH clauses bind into one node; a variable bound by the
    /// earlier clause keeps its first binding.
    pub fn combine_match(&mut self) -> Result<()> {
        self.add_default_scan_if_necessary()?;
        let top = self.pop()?;
        if top.model() != ModelTrait::Graph {
            return Err(Error::UnsupportedInput(format!(
                "MATCH requires a GRAPH input, found {}",
                top.model()
            )));
        }
        let (input, mut calls, mut names) = if let PlanOp::Match(m) = top.op() {
            let input = top
                .input()
                .cloned()
                .ok_or_else(|| Error::Internal("match without input".into()))?;
            (input, m.calls.clone(), m.names.clone())
        } else if top.schema().is_single(&LogicalType::Graph) {
            (top, Vec::new(), Vec::new())
        } else {
            return Err(Error::UnsupportedOperation(format!(
                "MATCH after {} is not supported",
                top.kind()
            )));
        };
        for (name, call) in self.pending.drain(..) {
            let name =
                name.ok_or_else(|| Error::Internal("unnamed pattern element".into()))?;
            if !names.contains(&name) {
                names.push(name);
                calls.push(call);
            }
        }
        tracing::debug!(bindings = names.len(), "combine match");
        self.stack.push(PlanNode::pattern_match(input, calls, names)?);
        self.clear_variables();
        Ok(())
    }

    /// Drains the queued predicates into one `Filter`, ANDing them.
    pub fn combine_filter(&mut self) -> Result<()> {
        match self.stack.len() {
            0 => return Err(Error::UnsupportedInput("filter has no input".into())),
            1 => {}
            n => return Err(Error::Internal(format!("filter over {n} stacked plans"))),
        }
        self.add_project_if_necessary()?;
        let condition = self.condition()?;
        let input = self.pop()?;
        tracing::debug!(predicate = %condition, "combine filter");
        self.stack.push(PlanNode::filter(input, condition)?);
        self.clear_variables();
        Ok(())
    }

    fn condition(&mut self) -> Result<ExprRef> {
        let mut predicates: Vec<ExprRef> = self.pending.drain(..).map(|(_, e)| e).collect();
        match predicates.len() {
            0 => Err(Error::EmptyOperation("filter without predicate".into())),
            1 => Ok(predicates.remove(0)),
            _ => Expr::call(Operator::And, predicates),
        }
    }

    /// Turns the bound nodes and edges into an insert.
    ///
    /// With nothing upstream this is a `Values` of the literals. Otherwise
    /// the literals are projected over the upstream plan: nodes already
    /// produced upstream are not created again, and each edge is attached to
    /// its endpoints, referring to upstream fields where they exist and to
    /// placeholder nodes otherwise.
    pub fn combine_values(&mut self) -> Result<()> {
        if self.bound_nodes.is_empty() && self.bound_edges.is_empty() {
            return Err(Error::EmptyOperation("nothing to create".into()));
        }
        let entity = self.target_entity()?.clone();
        let nodes = std::mem::take(&mut self.bound_nodes);
        let edges = std::mem::take(&mut self.bound_edges);

        let input = match self.stack.pop() {
            None => {
                tracing::debug!(nodes = nodes.len(), edges = edges.len(), "combine values");
                PlanNode::values(
                    nodes.into_values().collect(),
                    edges.into_iter().map(|e| e.edge).collect(),
                    Vec::new(),
                    Vec::new(),
                )?
            }
            Some(upstream) => {
                let (names, exprs) = adjusted_literals(upstream.schema(), nodes, edges)?;
                tracing::debug!(entries = exprs.len(), "combine values over {}", upstream.kind());
                PlanNode::project(upstream, exprs, names)?
            }
        };
        self.stack.push(PlanNode::modify(
            entity,
            input,
            ModifyOperation::Insert,
            Vec::new(),
            Vec::new(),
        )?);
        self.clear_variables();
        Ok(())
    }

    /// Drains the queued targets into an update.
    pub fn combine_update(&mut self) -> Result<()> {
        self.combine_modify(ModifyOperation::Update)
    }

    /// Drains the queued targets into a delete.
    pub fn combine_delete(&mut self) -> Result<()> {
        self.combine_modify(ModifyOperation::Delete)
    }

    /// Drains the queued property and label assignments into an update.
    pub fn combine_set(&mut self) -> Result<()> {
        self.combine_modify(ModifyOperation::Update)
    }

    fn combine_modify(&mut self, operation: ModifyOperation) -> Result<()> {
        if self.pending.is_empty() {
            return Err(Error::EmptyOperation(format!(
                "empty {} is not permitted",
                operation.as_str().to_ascii_lowercase()
            )));
        }
        let entity = self.target_entity()?.clone();
        let input = self.pop()?;
        let mut names = Vec::with_capacity(self.pending.len());
        let mut exprs = Vec::with_capacity(self.pending.len());
        for (name, expr) in self.pending.drain(..) {
            names.push(name.ok_or_else(|| Error::Internal("unnamed modify target".into()))?);
            exprs.push(expr);
        }
        tracing::debug!(operation = %operation.as_str(), targets = ?names, "combine modify");
        self.stack
            .push(PlanNode::modify(entity, input, operation, names, exprs)?);
        self.clear_variables();
        Ok(())
    }

    fn clear_variables(&mut self) {
        self.bound_nodes.clear();
        self.bound_edges.clear();
    }

    /// Finishes the translation and returns the plan and its query kind.
    ///
    /// Exactly one plan must be left on the stack, and nothing may be
    /// queued or bound.
    pub fn build(mut self) -> Result<(PlanRef, QueryKind)> {
        if !self.pending.is_empty() {
            return Err(Error::Internal(format!(
                "{} expressions left unconsumed",
                self.pending.len()
            )));
        }
        if !self.bound_nodes.is_empty() || !self.bound_edges.is_empty() {
            return Err(Error::Internal("pattern elements left unconsumed".into()));
        }
        if self.stack.len() > 1 {
            return Err(Error::Internal(format!(
                "{} plans left on the stack",
                self.stack.len()
            )));
        }
        let root = self
            .stack
            .pop()
            .ok_or_else(|| Error::InvalidPlan("query produced no plan".into()))?;
        Ok((root, self.kind.unwrap_or(QueryKind::Select)))
    }
}

impl fmt::Debug for TranslationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationContext")
            .field("source", &self.source)
            .field("stack", &self.stack.len())
            .field("pending", &self.pending.len())
            .field("bound_nodes", &self.bound_nodes.len())
            .field("bound_edges", &self.bound_edges.len())
            .field("kind", &self.kind)
            .finish()
    }
}

fn expr_name(counter: &mut usize) -> String {
    let name = format!("EXPR${counter}");
    *counter += 1;
    name
}

/// Builds the projection of new node literals followed by adjusted edges.
fn adjusted_literals(
    upstream: &Schema,
    nodes: IndexMap<String, GraphNode>,
    edges: Vec<BoundEdge>,
) -> Result<(Vec<Option<String>>, Vec<ExprRef>)> {
    let mut counter = 0;
    let mut names = Vec::new();
    let mut exprs = Vec::new();

    for (key, node) in nodes {
        if upstream.index_of(&key).is_some() {
            continue;
        }
        names.push(Some(
            node.variable.clone().unwrap_or_else(|| expr_name(&mut counter)),
        ));
        exprs.push(Expr::literal(Value::Node(node)));
    }

    let field = |index: usize| {
        upstream
            .field(index)
            .map(|f| Expr::input_ref(index, f.ty.clone()))
            .ok_or_else(|| Error::Internal(format!("no upstream field ${index}")))
    };
    let placeholder = |key: &str| Expr::literal(Value::Node(GraphNode::placeholder(key)));

    for bound in edges {
        let case = EndpointCase::classify(upstream, &bound);
        tracing::trace!(edge = %bound.edge, ?case, "adjusting edge");
        let (l, r) = match case {
            EndpointCase::BothUpstream { left, right } => (field(left)?, field(right)?),
            EndpointCase::BothNew => (placeholder(&bound.left), placeholder(&bound.right)),
            EndpointCase::LeftUpstream { left } => (field(left)?, placeholder(&bound.right)),
            EndpointCase::RightUpstream { right } => (placeholder(&bound.left), field(right)?),
        };
        let call = Expr::call(
            Operator::AdjustEdge,
            vec![Expr::literal(Value::Edge(bound.edge)), l, r],
        )?;
        names.push(Some(bound.name.unwrap_or_else(|| expr_name(&mut counter))));
        exprs.push(call);
    }
    Ok((names, exprs))
}
