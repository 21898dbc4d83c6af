//! Cypher clause AST to plan translator.
//!
//! Walks the clauses of a query once, in order. Each clause handler queues
//! expressions or binds pattern elements in the [`TranslationContext`] and
//! then calls the combine action that turns them into a plan node. Errors
//! are wrapped with the index and keyword of the clause that raised them.

use crate::compiler::CompiledQuery;
use crate::config::Config;
use crate::query::context::{BoundEdge, GraphSource, TranslationContext};
use hashbrown::HashSet;
use polyplan_adapters::query::cypher::ast;
use polyplan_common::types::{
    EdgeDirection, GraphEdge, GraphNode, GraphPath, LogicalType, NamespaceId, PropertyMap, Value,
};
use polyplan_common::utils::error::{Error, Result};
use polyplan_core::algebra::node::duplicate_names;
use polyplan_core::algebra::{
    AggregateCall, AggregateFunction, Expr, ExprRef, Operator, PlanNode, PlanRef, QueryKind,
    Schema, SortKey, SortOrder, StringMatch,
};
use polyplan_core::catalog::Catalog;
use std::sync::Arc;

/// Translates a Cypher query to a plan.
///
/// # Errors
///
/// Returns an error if the namespace cannot be resolved or a clause cannot
/// be translated. Clause errors carry the clause's position.
pub fn translate(query: &ast::Query, catalog: &dyn Catalog, config: &Config) -> Result<CompiledQuery> {
    let single = match query {
        ast::Query::Single(single) => single,
        ast::Query::Union { .. } => {
            return Err(Error::UnsupportedOperation("UNION is not supported".into()));
        }
        ast::Query::PeriodicCommit { .. } => {
            return Err(Error::UnsupportedOperation(
                "USING PERIODIC COMMIT is not supported".into(),
            ));
        }
    };
    let labels = underlying_labels(&single.clauses);
    let source = GraphSource::resolve(
        catalog,
        config.namespace,
        config.allow_substitution,
        labels,
    )?;
    let translator = CypherTranslator {
        ctx: TranslationContext::new(catalog, source),
        namespace: config.namespace,
    };
    translator.translate_query(single)
}

/// The parts RETURN and WITH share.
struct Projection<'q> {
    distinct: bool,
    star: bool,
    items: &'q [ast::ReturnItem],
    order_by: &'q [ast::OrderByItem],
    skip: Option<&'q ast::Expression>,
    limit: Option<&'q ast::Expression>,
}

impl Projection<'_> {
    fn is_sorted(&self) -> bool {
        !self.order_by.is_empty() || self.skip.is_some() || self.limit.is_some()
    }
}

impl<'q> From<&'q ast::ReturnClause> for Projection<'q> {
    fn from(c: &'q ast::ReturnClause) -> Self {
        Self {
            distinct: c.distinct,
            star: c.star,
            items: &c.items,
            order_by: &c.order_by,
            skip: c.skip.as_ref(),
            limit: c.limit.as_ref(),
        }
    }
}

impl<'q> From<&'q ast::WithClause> for Projection<'q> {
    fn from(c: &'q ast::WithClause) -> Self {
        Self {
            distinct: c.distinct,
            star: c.star,
            items: &c.items,
            order_by: &c.order_by,
            skip: c.skip.as_ref(),
            limit: c.limit.as_ref(),
        }
    }
}

/// Translator from the Cypher clause AST to a plan.
struct CypherTranslator<'a> {
    ctx: TranslationContext<'a>,
    namespace: NamespaceId,
}

impl CypherTranslator<'_> {
    fn translate_query(mut self, query: &ast::SingleQuery) -> Result<CompiledQuery> {
        for (index, clause) in query.clauses.iter().enumerate() {
            tracing::debug!(index, clause = clause.keyword(), "translating clause");
            self.translate_clause(clause)
                .map_err(|e| e.at_clause(index, clause.keyword()))?;
        }
        let (root, kind) = self.ctx.build()?;
        Ok(CompiledQuery { root, kind })
    }

    fn translate_clause(&mut self, clause: &ast::Clause) -> Result<()> {
        match clause {
            ast::Clause::Match(c) => self.translate_match(c),
            ast::Clause::With(c) => self.translate_with(c),
            ast::Clause::Return(c) => self.convert_return(&Projection::from(c)),
            ast::Clause::Create(c) => self.translate_create(c),
            ast::Clause::Set(c) => self.translate_set(c),
            ast::Clause::Remove(c) => self.translate_remove(c),
            ast::Clause::Delete(c) => self.translate_delete(c),
            ast::Clause::Unwind(c) => self.translate_unwind(c),
            ast::Clause::Call(c) => self.translate_call(c),
            ast::Clause::Use(c) => {
                tracing::warn!(graph = %c.graph, "USE is ignored, compiling against the configured namespace");
                Ok(())
            }
            ast::Clause::Merge(_) | ast::Clause::Foreach(_) | ast::Clause::LoadCsv(_) => Err(
                Error::UnsupportedOperation(format!("{} is not supported", clause.keyword())),
            ),
        }
    }

    // === MATCH ===

    fn translate_match(&mut self, clause: &ast::MatchClause) -> Result<()> {
        if clause.optional {
            return Err(Error::UnsupportedOperation(
                "OPTIONAL MATCH is not supported".into(),
            ));
        }
        self.ctx.set_kind_if_unset(QueryKind::Select);

        let graph = Expr::input_ref(0, LogicalType::Graph);
        let mut seen = HashSet::new();
        for pattern in &clause.patterns {
            let path = self.match_path(pattern)?;
            let elements = path.named_elements();
            let literal = Expr::literal(Value::Path(path));
            for (name, _) in elements {
                if !seen.insert(name.clone()) {
                    continue;
                }
                let call = Expr::call(
                    Operator::PatternMatch,
                    vec![
                        Arc::clone(&graph),
                        Arc::clone(&literal),
                        Expr::literal(Value::from(name.as_str())),
                    ],
                )?;
                self.ctx.add(Some(name), call);
            }
        }
        self.ctx.combine_match()?;

        if let Some(predicate) = &clause.where_clause {
            self.translate_where(predicate)?;
        }
        Ok(())
    }

    fn translate_where(&mut self, predicate: &ast::Expression) -> Result<()> {
        let scope = self.ctx.scope();
        let condition = self.translate_expression(&scope, predicate)?;
        self.ctx.add(None, condition);
        self.ctx.combine_filter()
    }

    fn match_path(&mut self, pattern: &ast::Pattern) -> Result<GraphPath> {
        let (mut left, source) = self.pattern_node(pattern.source())?;
        let mut nodes = vec![source];
        let mut edges = Vec::with_capacity(pattern.edges().len());
        for edge in pattern.edges() {
            let (right, target) = self.pattern_node(&edge.target)?;
            let mut literal = GraphEdge::new(
                edge.types.clone(),
                literal_properties(&edge.properties)?,
                left,
                right.clone(),
                edge.direction,
                edge.variable.clone(),
            );
            if let Some(range) = edge.range {
                literal.min_hops = range.min.unwrap_or(1);
                literal.max_hops = range.max;
            }
            edges.push(literal);
            nodes.push(target);
            left = right;
        }
        Ok(GraphPath {
            nodes,
            edges,
            variable: pattern.variable().map(str::to_string),
        })
    }

    /// Returns the key a pattern node is known by and its literal.
    fn pattern_node(&mut self, node: &ast::NodePattern) -> Result<(String, GraphNode)> {
        let literal = GraphNode::new(
            node.labels.clone(),
            literal_properties(&node.properties)?,
            node.variable.clone(),
        );
        match &node.variable {
            Some(variable) => Ok((variable.clone(), literal)),
            None => {
                let key = self.ctx.next_anonymous();
                Ok((key.clone(), literal.with_key(key)))
            }
        }
    }

    // === RETURN / WITH ===

    fn translate_with(&mut self, clause: &ast::WithClause) -> Result<()> {
        self.convert_return(&Projection::from(clause))?;
        if let Some(predicate) = &clause.where_clause {
            self.translate_where(predicate)?;
        }
        Ok(())
    }

    fn convert_return(&mut self, projection: &Projection<'_>) -> Result<()> {
        self.ctx.add_default_scan_if_necessary()?;
        let input = self.ctx.pop()?;
        let scope = input.schema().clone();

        let mut names: Vec<String> = Vec::new();
        let mut items: Vec<&ast::Expression> = Vec::new();
        let mut star_exprs: Vec<ExprRef> = Vec::new();
        if projection.star {
            for (i, field) in scope.fields().iter().enumerate() {
                names.push(field.name.clone());
                star_exprs.push(Expr::input_ref(i, field.ty.clone()));
            }
        }
        for item in projection.items {
            names.push(item.name());
            items.push(&item.expression);
        }
        if names.is_empty() {
            return Err(Error::InvalidPlan("projection without items".into()));
        }
        let duplicates = duplicate_names(names.iter().map(String::as_str));
        if !duplicates.is_empty() {
            return Err(Error::InvalidPlan(format!(
                "duplicate column name: {}",
                duplicates.join(", ")
            )));
        }

        if items.iter().any(|e| e.contains_aggregate()) {
            let node = self.aggregate_projection(input, &scope, star_exprs, &names, &items)?;
            let node = sort_aggregated(node, projection)?;
            self.ctx.push(node);
            return Ok(());
        }

        let mut exprs = star_exprs;
        for expr in &items {
            exprs.push(self.translate_expression(&scope, expr)?);
        }

        if projection.distinct {
            tracing::warn!("DISTINCT is ignored, duplicate rows are kept");
        }

        if !projection.is_sorted() {
            self.ctx
                .push(PlanNode::project(input, exprs, names.into_iter().map(Some).collect())?);
            return Ok(());
        }

        // Sort names that are not output columns become hidden fields.
        let mut hidden: Vec<String> = Vec::new();
        let mut hidden_exprs: Vec<ExprRef> = Vec::new();
        for item in projection.order_by {
            let name = sort_name(&item.expression);
            if names.contains(&name) || hidden.contains(&name) {
                continue;
            }
            hidden_exprs.push(self.translate_expression(&scope, &item.expression)?);
            hidden.push(name);
        }
        let visible = names.len();
        exprs.extend(hidden_exprs);
        let all_names: Vec<Option<String>> =
            names.into_iter().chain(hidden.iter().cloned()).map(Some).collect();
        let project = PlanNode::project(input, exprs, all_names)?;
        let mut node = sort(project, projection)?;

        if !hidden.is_empty() {
            tracing::debug!(hidden = ?hidden, "removing hidden sort fields");
            let fields = node.schema().fields()[..visible].to_vec();
            let exprs = fields
                .iter()
                .enumerate()
                .map(|(i, f)| Expr::input_ref(i, f.ty.clone()))
                .collect();
            let names = fields.into_iter().map(|f| Some(f.name)).collect();
            node = PlanNode::project(node, exprs, names)?;
        }
        self.ctx.push(node);
        Ok(())
    }

    /// Projects the group keys and aggregate arguments, then aggregates.
    fn aggregate_projection(
        &self,
        input: PlanRef,
        scope: &Schema,
        star_exprs: Vec<ExprRef>,
        names: &[String],
        items: &[&ast::Expression],
    ) -> Result<PlanRef> {
        let star = star_exprs.len();
        let mut key_exprs = star_exprs;
        let mut key_names: Vec<Option<String>> =
            names[..star].iter().cloned().map(Some).collect();
        let mut aggregates = Vec::new();

        for (expr, name) in items.iter().zip(&names[star..]) {
            if expr.contains_aggregate() {
                aggregates.push((aggregate_parts(expr)?, name));
            } else {
                key_exprs.push(self.translate_expression(scope, expr)?);
                key_names.push(Some(name.clone()));
            }
        }

        let group_keys: Vec<usize> = (0..key_exprs.len()).collect();
        let mut exprs = key_exprs;
        let mut project_names = key_names;
        let mut calls = Vec::with_capacity(aggregates.len());
        for ((function, argument, distinct), name) in aggregates {
            let args = match argument {
                Some(arg) => {
                    exprs.push(self.translate_expression(scope, arg)?);
                    project_names.push(Some(format!("EXPR${}", calls.len())));
                    vec![exprs.len() - 1]
                }
                None => Vec::new(),
            };
            calls.push(AggregateCall {
                function,
                args,
                distinct,
                name: name.clone(),
            });
        }
        tracing::debug!(keys = group_keys.len(), calls = calls.len(), "grouping projection");
        let project = PlanNode::project(input, exprs, project_names)?;
        PlanNode::aggregate(project, group_keys, calls)
    }

    // === CREATE ===

    fn translate_create(&mut self, clause: &ast::CreateClause) -> Result<()> {
        self.ctx.set_kind(QueryKind::Insert);
        let upstream = self.ctx.scope();

        for pattern in &clause.patterns {
            if pattern.variable().is_some() {
                return Err(Error::UnsupportedOperation(
                    "named paths in CREATE are not supported".into(),
                ));
            }
            if pattern.edges().len() > 1 {
                return Err(Error::UnsupportedOperation(
                    "CREATE supports at most one relationship per path".into(),
                ));
            }
            let left = self.create_node(pattern.source(), &upstream)?;
            for edge in pattern.edges() {
                let right = self.create_node(&edge.target, &upstream)?;
                let (source, target) = match edge.direction {
                    EdgeDirection::Outgoing => (left.clone(), right),
                    EdgeDirection::Incoming => (right, left.clone()),
                    EdgeDirection::Undirected => {
                        return Err(Error::UnsupportedOperation(
                            "relationships must be directed in CREATE".into(),
                        ));
                    }
                };
                if edge.types.len() != 1 {
                    return Err(Error::UnsupportedOperation(format!(
                        "relationships need exactly one type in CREATE, found {}",
                        edge.types.len()
                    )));
                }
                if edge.range.is_some() {
                    return Err(Error::UnsupportedOperation(
                        "variable-length relationships cannot be created".into(),
                    ));
                }
                let literal = GraphEdge::new(
                    edge.types.clone(),
                    literal_properties(&edge.properties)?,
                    source.clone(),
                    target.clone(),
                    EdgeDirection::Outgoing,
                    edge.variable.clone(),
                );
                self.ctx.bind_edge(BoundEdge {
                    name: edge.variable.clone(),
                    edge: literal,
                    left: source,
                    right: target,
                });
            }
        }
        self.ctx.combine_values()
    }

    /// Binds a node to create and returns its key.
    fn create_node(&mut self, node: &ast::NodePattern, upstream: &Schema) -> Result<String> {
        if let Some(variable) = &node.variable {
            let declared = upstream.index_of(variable).is_some();
            if declared && (!node.labels.is_empty() || !node.properties.is_empty()) {
                return Err(Error::UnsupportedOperation(format!(
                    "{variable} is already bound and cannot be redeclared with labels or properties"
                )));
            }
        }
        let (key, literal) = self.pattern_node(node)?;
        if !self.ctx.bind_node(key.clone(), literal) {
            tracing::trace!(key = %key, "node already bound in this clause");
        }
        Ok(key)
    }

    // === SET / REMOVE / DELETE ===

    fn translate_set(&mut self, clause: &ast::SetClause) -> Result<()> {
        self.ctx.set_kind(QueryKind::Update);
        let scope = self.ctx.scope();
        for item in &clause.items {
            let variable = item.variable();
            let target = self.update_target(&scope, variable)?;
            let update = match item {
                ast::SetItem::Property {
                    property, value, ..
                } => Expr::call(
                    Operator::SetProperty,
                    vec![
                        target,
                        Expr::literal(Value::from(property.as_str())),
                        self.translate_expression(&scope, value)?,
                    ],
                )?,
                ast::SetItem::Replace { value, .. } => Expr::call(
                    Operator::SetProperties,
                    vec![
                        target,
                        self.translate_expression(&scope, value)?,
                        Expr::literal(Value::Bool(true)),
                    ],
                )?,
                ast::SetItem::Merge { value, .. } => Expr::call(
                    Operator::SetProperties,
                    vec![
                        target,
                        self.translate_expression(&scope, value)?,
                        Expr::literal(Value::Bool(false)),
                    ],
                )?,
                ast::SetItem::Labels { labels, .. } => {
                    if *target.ty() == LogicalType::Edge && labels.len() != 1 {
                        return Err(Error::UnsupportedOperation(
                            "edges require exactly one label".into(),
                        ));
                    }
                    Expr::call(Operator::SetLabels, vec![target, string_list(labels)])?
                }
            };
            self.ctx.add(Some(variable.to_string()), update);
        }
        self.ctx.combine_set()
    }

    fn translate_remove(&mut self, clause: &ast::RemoveClause) -> Result<()> {
        self.ctx.set_kind(QueryKind::Update);
        let scope = self.ctx.scope();
        for item in &clause.items {
            let variable = item.variable();
            let target = self.update_target(&scope, variable)?;
            let update = match item {
                ast::RemoveItem::Property { property, .. } => Expr::call(
                    Operator::RemoveProperty,
                    vec![target, Expr::literal(Value::from(property.as_str()))],
                )?,
                ast::RemoveItem::Labels { labels, .. } => {
                    Expr::call(Operator::RemoveLabels, vec![target, string_list(labels)])?
                }
            };
            self.ctx.add(Some(variable.to_string()), update);
        }
        self.ctx.combine_update()
    }

    /// Returns what an update of `variable` applies to: the update already
    /// queued for it, so updates chain, or else the bound field.
    fn update_target(&mut self, scope: &Schema, variable: &str) -> Result<ExprRef> {
        match self.ctx.take_pending(variable) {
            Some(queued) => Ok(queued),
            None => lookup(scope, variable),
        }
    }

    fn translate_delete(&mut self, clause: &ast::DeleteClause) -> Result<()> {
        self.ctx.set_kind(QueryKind::Delete);
        if clause.detach {
            tracing::debug!("DETACH DELETE plans the same as DELETE");
        }
        let scope = self.ctx.scope();
        for variable in &clause.variables {
            let target = lookup(&scope, variable)?;
            if !target.ty().is_graph_element() && !target.ty().is_dynamic() {
                return Err(Error::type_mismatch("node, edge or path", target.ty()));
            }
            if !self.ctx.has_pending(variable) {
                self.ctx.add(Some(variable.clone()), target);
            }
        }
        self.ctx.combine_delete()
    }

    // === UNWIND / CALL ===

    fn translate_unwind(&mut self, clause: &ast::UnwindClause) -> Result<()> {
        let alias = clause.alias.as_str();
        if self.ctx.is_empty() {
            let value = literal_value(&clause.expression).ok_or_else(|| {
                Error::UnsupportedOperation(
                    "UNWIND without a preceding clause needs a literal list".into(),
                )
            })?;
            let list = match value {
                Value::List(_) => value,
                Value::Null => Value::List(Vec::new()),
                other => Value::List(vec![other]),
            };
            let values = PlanNode::values(Vec::new(), Vec::new(), vec![vec![list]], vec![
                alias.to_string(),
            ])?;
            self.ctx.push(PlanNode::unwind(values, 0, alias)?);
            return Ok(());
        }

        let input = self.ctx.pop()?;
        let mut expr = self.translate_expression(input.schema(), &clause.expression)?;
        if !expr.ty().is_list() {
            expr = Expr::call(Operator::ToList, vec![expr])?;
        }
        let (input, index) = match expr.as_input_ref() {
            Some(index) => (input, index),
            None => {
                let fields = input.schema().fields();
                let mut exprs: Vec<ExprRef> = fields
                    .iter()
                    .enumerate()
                    .map(|(i, f)| Expr::input_ref(i, f.ty.clone()))
                    .collect();
                let mut names: Vec<Option<String>> =
                    fields.iter().map(|f| Some(f.name.clone())).collect();
                let index = exprs.len();
                exprs.push(expr);
                names.push(Some(alias.to_string()));
                (PlanNode::project(input, exprs, names)?, index)
            }
        };
        self.ctx.push(PlanNode::unwind(input, index, alias)?);
        Ok(())
    }

    fn translate_call(&mut self, clause: &ast::CallClause) -> Result<()> {
        if !self.ctx.is_empty() {
            return Err(Error::UnsupportedOperation(
                "CALL is only supported as a standalone clause".into(),
            ));
        }
        let arguments = clause
            .args
            .iter()
            .map(|arg| self.translate_expression(&Schema::default(), arg))
            .collect::<Result<Vec<_>>>()?;
        self.ctx.set_kind_if_unset(QueryKind::Select);
        self.ctx.push(PlanNode::call(
            self.namespace,
            clause.procedure.as_str(),
            arguments,
            clause.yield_all,
            clause.yield_items.clone(),
        )?);
        Ok(())
    }

    // === Expressions ===

    fn translate_expression(&self, scope: &Schema, expr: &ast::Expression) -> Result<ExprRef> {
        match expr {
            ast::Expression::Literal(lit) => Ok(Expr::literal(translate_literal(lit))),
            ast::Expression::Variable(name) => lookup(scope, name),
            ast::Expression::Parameter(name) => Err(Error::UnsupportedOperation(format!(
                "parameter ${name} is not supported"
            ))),
            ast::Expression::PropertyAccess { variable, property } => Expr::call(
                Operator::ExtractProperty,
                vec![
                    lookup(scope, variable)?,
                    Expr::literal(Value::from(property.as_str())),
                ],
            ),
            ast::Expression::HasLabels { variable, labels } => Expr::call(
                Operator::HasLabels,
                vec![lookup(scope, variable)?, string_list(labels)],
            ),
            ast::Expression::Binary { left, op, right } => {
                let left = self.translate_expression(scope, left)?;
                let right = self.translate_expression(scope, right)?;
                let op = match op {
                    ast::BinaryOp::StartsWith => {
                        return Expr::string_match(StringMatch::StartsWith, left, &right);
                    }
                    ast::BinaryOp::EndsWith => {
                        return Expr::string_match(StringMatch::EndsWith, left, &right);
                    }
                    ast::BinaryOp::Contains => {
                        return Expr::string_match(StringMatch::Contains, left, &right);
                    }
                    ast::BinaryOp::Eq => Operator::Eq,
                    ast::BinaryOp::Ne => Operator::Ne,
                    ast::BinaryOp::Lt => Operator::Lt,
                    ast::BinaryOp::Le => Operator::Le,
                    ast::BinaryOp::Gt => Operator::Gt,
                    ast::BinaryOp::Ge => Operator::Ge,
                    ast::BinaryOp::And => Operator::And,
                    ast::BinaryOp::Or => Operator::Or,
                    ast::BinaryOp::Xor => Operator::Xor,
                    ast::BinaryOp::Add => Operator::Add,
                    ast::BinaryOp::Sub => Operator::Sub,
                    ast::BinaryOp::Mul => Operator::Mul,
                    ast::BinaryOp::Div => Operator::Div,
                    ast::BinaryOp::Mod => Operator::Mod,
                    ast::BinaryOp::Pow => Operator::Pow,
                    ast::BinaryOp::In => Operator::In,
                    ast::BinaryOp::RegexMatch => Operator::Regex,
                };
                Expr::call(op, vec![left, right])
            }
            ast::Expression::Unary { op, operand } => {
                let operand = self.translate_expression(scope, operand)?;
                let op = match op {
                    ast::UnaryOp::Not => Operator::Not,
                    ast::UnaryOp::Neg => Operator::Neg,
                    ast::UnaryOp::IsNull => Operator::IsNull,
                    ast::UnaryOp::IsNotNull => Operator::IsNotNull,
                };
                Expr::call(op, vec![operand])
            }
            ast::Expression::FunctionCall { name, args, .. } => {
                if ast::is_aggregate_name(name) {
                    return Err(Error::UnsupportedOperation(format!(
                        "aggregate {name}() is only allowed in RETURN or WITH"
                    )));
                }
                let args = args
                    .iter()
                    .map(|a| self.translate_expression(scope, a))
                    .collect::<Result<Vec<_>>>()?;
                Expr::call(Operator::function(name), args)
            }
            ast::Expression::CountStar => Err(Error::UnsupportedOperation(
                "count(*) is only allowed in RETURN or WITH".into(),
            )),
            ast::Expression::List(items) => {
                let items = items
                    .iter()
                    .map(|i| self.translate_expression(scope, i))
                    .collect::<Result<Vec<_>>>()?;
                Expr::call(Operator::MakeList, items)
            }
            ast::Expression::Map(entries) => {
                let mut operands = Vec::with_capacity(entries.len() * 2);
                for (key, value) in entries {
                    operands.push(Expr::literal(Value::from(key.as_str())));
                    operands.push(self.translate_expression(scope, value)?);
                }
                Expr::call(Operator::MakeMap, operands)
            }
            ast::Expression::Case {
                input,
                whens,
                else_clause,
            } => {
                let input = input
                    .as_deref()
                    .map(|i| self.translate_expression(scope, i))
                    .transpose()?;
                let mut operands = Vec::with_capacity(whens.len() * 2 + 1);
                for (when, then) in whens {
                    let when = self.translate_expression(scope, when)?;
                    let condition = match &input {
                        Some(input) => Expr::call(Operator::Eq, vec![Arc::clone(input), when])?,
                        None => when,
                    };
                    operands.push(condition);
                    operands.push(self.translate_expression(scope, then)?);
                }
                if let Some(otherwise) = else_clause {
                    operands.push(self.translate_expression(scope, otherwise)?);
                }
                Expr::call(Operator::Case, operands)
            }
        }
    }
}

/// Sorts an aggregated result. Only output columns can be sorted on.
fn sort_aggregated(node: PlanRef, projection: &Projection<'_>) -> Result<PlanRef> {
    if !projection.is_sorted() {
        return Ok(node);
    }
    if let Some(item) = projection
        .order_by
        .iter()
        .find(|item| node.schema().index_of(&sort_name(&item.expression)).is_none())
    {
        return Err(Error::UnsupportedOperation(format!(
            "ORDER BY {} after aggregation must name an aggregate column",
            item.expression
        )));
    }
    sort(node, projection)
}

fn sort(input: PlanRef, projection: &Projection<'_>) -> Result<PlanRef> {
    let keys = projection
        .order_by
        .iter()
        .map(|item| {
            let name = sort_name(&item.expression);
            let index = input
                .schema()
                .index_of(&name)
                .ok_or_else(|| Error::UnboundVariable(name.clone()))?;
            let order = match item.order {
                ast::SortOrder::Asc => SortOrder::Ascending,
                ast::SortOrder::Desc => SortOrder::Descending,
            };
            Ok(SortKey { index, order })
        })
        .collect::<Result<Vec<_>>>()?;
    let offset = projection.skip.map(|e| row_count(e, "SKIP")).transpose()?;
    let limit = projection.limit.map(|e| row_count(e, "LIMIT")).transpose()?;
    PlanNode::sort(input, keys, offset, limit)
}

fn lookup(scope: &Schema, name: &str) -> Result<ExprRef> {
    scope
        .find(name)
        .map(|(i, f)| Expr::input_ref(i, f.ty.clone()))
        .ok_or_else(|| Error::UnboundVariable(name.to_string()))
}

fn translate_literal(lit: &ast::Literal) -> Value {
    match lit {
        ast::Literal::Null => Value::Null,
        ast::Literal::Bool(b) => Value::Bool(*b),
        ast::Literal::Integer(i) => Value::Int64(*i),
        ast::Literal::Float(f) => Value::Float64(*f),
        ast::Literal::String(s) => Value::from(s.as_str()),
    }
}

/// Evaluates an expression made only of literals.
fn literal_value(expr: &ast::Expression) -> Option<Value> {
    match expr {
        ast::Expression::Literal(lit) => Some(translate_literal(lit)),
        ast::Expression::List(items) => items
            .iter()
            .map(literal_value)
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        ast::Expression::Map(entries) => entries
            .iter()
            .map(|(k, v)| literal_value(v).map(|v| (k.clone(), v)))
            .collect::<Option<PropertyMap>>()
            .map(Value::Map),
        ast::Expression::Unary {
            op: ast::UnaryOp::Neg,
            operand,
        } => match literal_value(operand)? {
            Value::Int64(i) => i.checked_neg().map(Value::Int64),
            Value::Float64(f) => Some(Value::Float64(-f)),
            _ => None,
        },
        _ => None,
    }
}

fn literal_properties(properties: &[(String, ast::Expression)]) -> Result<PropertyMap> {
    properties
        .iter()
        .map(|(key, value)| {
            literal_value(value).map(|v| (key.clone(), v)).ok_or_else(|| {
                Error::UnsupportedOperation(format!(
                    "pattern property {key} must be a literal, found {value}"
                ))
            })
        })
        .collect()
}

fn string_list(items: &[String]) -> ExprRef {
    Expr::literal(Value::List(
        items.iter().map(|s| Value::from(s.as_str())).collect(),
    ))
}

/// Name a sort expression is looked up by: the variable, `var.prop`, or the
/// expression text.
fn sort_name(expr: &ast::Expression) -> String {
    match expr {
        ast::Expression::Variable(name) => name.clone(),
        ast::Expression::PropertyAccess { variable, property } => format!("{variable}.{property}"),
        other => other.to_string(),
    }
}

fn row_count(expr: &ast::Expression, clause: &str) -> Result<u64> {
    match literal_value(expr) {
        Some(Value::Int64(n)) => u64::try_from(n).ok(),
        _ => None,
    }
    .ok_or_else(|| {
        Error::UnsupportedOperation(format!(
            "{clause} requires a non-negative integer literal, found {expr}"
        ))
    })
}

/// Splits an aggregate item into function, argument, and DISTINCT flag.
fn aggregate_parts(
    expr: &ast::Expression,
) -> Result<(AggregateFunction, Option<&ast::Expression>, bool)> {
    match expr {
        ast::Expression::CountStar => Ok((AggregateFunction::Count, None, false)),
        ast::Expression::FunctionCall {
            name,
            args,
            distinct,
        } => {
            let function = AggregateFunction::from_name(name).ok_or_else(|| {
                Error::UnsupportedOperation(format!(
                    "aggregate inside {name}() is not supported"
                ))
            })?;
            match args.as_slice() {
                [arg] if !arg.contains_aggregate() => Ok((function, Some(arg), *distinct)),
                [_] => Err(Error::UnsupportedOperation(
                    "nested aggregates are not supported".into(),
                )),
                _ => Err(Error::UnsupportedOperation(format!(
                    "{name}() takes exactly one argument"
                ))),
            }
        }
        other => Err(Error::UnsupportedOperation(format!(
            "aggregate must be the outermost expression, found {other}"
        ))),
    }
}

/// Node labels the query mentions, in first-seen order.
fn underlying_labels(clauses: &[ast::Clause]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    let mut add = |node: &ast::NodePattern| {
        for label in &node.labels {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }
    };
    for clause in clauses {
        let patterns: &[ast::Pattern] = match clause {
            ast::Clause::Match(c) => &c.patterns,
            ast::Clause::Create(c) => &c.patterns,
            ast::Clause::Merge(c) => std::slice::from_ref(&c.pattern),
            _ => continue,
        };
        for pattern in patterns {
            add(pattern.source());
            for edge in pattern.edges() {
                add(&edge.target);
            }
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use polyplan_core::algebra::{ModifyOperation, PlanOp};

    fn compile(clauses: Vec<ast::Clause>) -> Result<CompiledQuery> {
        let catalog = MemoryCatalog::with_default_graph();
        translate(&ast::Query::single(clauses), &catalog, &Config::default())
    }

    fn node(var: &str) -> ast::NodePattern {
        ast::NodePattern::named(var)
    }

    fn labelled(var: &str, label: &str) -> ast::NodePattern {
        ast::NodePattern::named(var).with_label(label)
    }

    fn path(source: ast::NodePattern, edges: Vec<ast::EdgePattern>) -> ast::Pattern {
        ast::Pattern::Path(ast::PathPattern {
            variable: None,
            source,
            edges,
            span: None,
        })
    }

    fn out_edge(var: Option<&str>, ty: &str, target: ast::NodePattern) -> ast::EdgePattern {
        ast::EdgePattern::new(var.map(str::to_string), EdgeDirection::Outgoing, target).with_type(ty)
    }

    fn match_(patterns: Vec<ast::Pattern>, where_clause: Option<ast::Expression>) -> ast::Clause {
        ast::Clause::Match(ast::MatchClause {
            optional: false,
            patterns,
            where_clause,
            span: None,
        })
    }

    fn return_(items: Vec<ast::ReturnItem>) -> ast::Clause {
        ast::Clause::Return(ast::ReturnClause::new(items))
    }

    fn create(patterns: Vec<ast::Pattern>) -> ast::Clause {
        ast::Clause::Create(ast::CreateClause {
            patterns,
            span: None,
        })
    }

    fn item(expr: ast::Expression) -> ast::ReturnItem {
        ast::ReturnItem::new(expr)
    }

    fn find<'p>(plan: &'p PlanRef, kind: &str) -> Option<&'p PlanRef> {
        if plan.kind() == kind {
            return Some(plan);
        }
        plan.inputs().iter().find_map(|i| find(i, kind))
    }

    // === MATCH ===

    #[test]
    fn test_translate_simple_match() {
        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(labelled("n", "Person"))], None),
            return_(vec![item(ast::Expression::var("n"))]),
        ])
        .unwrap();

        assert_eq!(compiled.kind, QueryKind::Select);
        assert_eq!(compiled.root.kind(), "Project");
        assert_eq!(compiled.root.schema().to_string(), "[n: node]");
        let m = find(&compiled.root, "Match").unwrap();
        let PlanOp::Match(op) = m.op() else {
            panic!("Expected Match");
        };
        assert_eq!(op.names, vec!["n".to_string()]);
        assert_eq!(m.input().unwrap().kind(), "Scan");
    }

    #[test]
    fn test_translate_match_path_binds_each_element_once() {
        let pattern = path(
            node("a"),
            vec![out_edge(
                Some("e"),
                "KNOWS",
                ast::NodePattern::anonymous(),
            )],
        );
        let again = path(node("a"), vec![out_edge(None, "LIKES", node("b"))]);
        let compiled = compile(vec![match_(vec![pattern, again], None)]).unwrap();

        assert_eq!(compiled.root.schema().to_string(), "[a: node, e: edge, b: node]");
        let PlanOp::Match(op) = compiled.root.op() else {
            panic!("Expected Match");
        };
        // Calls of one pattern share its path literal.
        assert!(Arc::ptr_eq(&op.calls[0].operands()[1], &op.calls[1].operands()[1]));
    }

    #[test]
    fn test_translate_match_with_where() {
        let compiled = compile(vec![
            match_(
                vec![ast::Pattern::Node(node("n"))],
                Some(ast::Expression::binary(
                    ast::Expression::prop("n", "age"),
                    ast::BinaryOp::Gt,
                    ast::Expression::int(30),
                )),
            ),
            return_(vec![item(ast::Expression::prop("n", "name"))]),
        ])
        .unwrap();

        assert_eq!(compiled.root.schema().to_string(), "[n.name: any]");
        let filter = find(&compiled.root, "Filter").unwrap();
        let PlanOp::Filter(f) = filter.op() else {
            panic!("Expected Filter");
        };
        assert_eq!(f.predicate.operator(), Some(&Operator::Gt));
        let left = &f.predicate.operands()[0];
        assert_eq!(left.operator(), Some(&Operator::ExtractProperty));
        assert_eq!(left.operands()[0].as_input_ref(), Some(0));
    }

    #[test]
    fn test_translate_starts_with() {
        let compiled = compile(vec![
            match_(
                vec![ast::Pattern::Node(node("n"))],
                Some(ast::Expression::binary(
                    ast::Expression::prop("n", "name"),
                    ast::BinaryOp::StartsWith,
                    ast::Expression::string("Al"),
                )),
            ),
            return_(vec![item(ast::Expression::var("n"))]),
        ])
        .unwrap();
        let filter = find(&compiled.root, "Filter").unwrap();
        let PlanOp::Filter(f) = filter.op() else {
            panic!("Expected Filter");
        };
        assert_eq!(f.predicate.operator(), Some(&Operator::Like));
        let pattern = f.predicate.operands()[1].as_literal().and_then(Value::as_str);
        assert_eq!(pattern, Some("Al%"));
    }

    #[test]
    fn test_translate_optional_match_unsupported() {
        let err = compile(vec![ast::Clause::Match(ast::MatchClause {
            optional: true,
            patterns: vec![ast::Pattern::Node(node("n"))],
            where_clause: None,
            span: None,
        })])
        .unwrap_err();
        assert_eq!(err.clause_index(), Some(0));
        assert!(matches!(err.root(), Error::UnsupportedOperation(_)));
    }

    #[test]
    fn test_translate_unbound_variable() {
        let err = compile(vec![
            match_(vec![ast::Pattern::Node(node("n"))], None),
            return_(vec![item(ast::Expression::var("m"))]),
        ])
        .unwrap_err();
        assert_eq!(err.clause_index(), Some(1));
        assert_eq!(err.root(), &Error::UnboundVariable("m".into()));
    }

    #[test]
    fn test_translate_non_literal_pattern_property() {
        let n = node("n").with_property("age", ast::Expression::var("x"));
        let err = compile(vec![match_(vec![ast::Pattern::Node(n)], None)]).unwrap_err();
        assert!(matches!(err.root(), Error::UnsupportedOperation(_)));
    }

    // === RETURN / WITH ===

    #[test]
    fn test_translate_order_by_hidden_field() {
        let mut ret = ast::ReturnClause::new(vec![item(ast::Expression::prop("n", "name"))]);
        ret.order_by = vec![ast::OrderByItem {
            expression: ast::Expression::prop("n", "age"),
            order: ast::SortOrder::Desc,
        }];
        ret.limit = Some(ast::Expression::int(10));
        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(node("n"))], None),
            ast::Clause::Return(ret),
        ])
        .unwrap();

        let root = &compiled.root;
        assert_eq!(root.kind(), "Project");
        assert_eq!(root.schema().names(), vec!["n.name"]);
        let sort = root.input().unwrap();
        let PlanOp::Sort(s) = sort.op() else {
            panic!("Expected Sort");
        };
        assert_eq!(s.keys, vec![SortKey {
            index: 1,
            order: SortOrder::Descending
        }]);
        assert_eq!(s.limit, Some(10));
        assert_eq!(sort.schema().names(), vec!["n.name", "n.age"]);
    }

    #[test]
    fn test_translate_order_by_visible_field() {
        let mut ret = ast::ReturnClause::new(vec![item(ast::Expression::var("n"))]);
        ret.order_by = vec![ast::OrderByItem {
            expression: ast::Expression::var("n"),
            order: ast::SortOrder::Asc,
        }];
        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(node("n"))], None),
            ast::Clause::Return(ret),
        ])
        .unwrap();
        assert_eq!(compiled.root.kind(), "Sort");
        assert_eq!(compiled.root.input().unwrap().kind(), "Project");
    }

    #[test]
    fn test_translate_count_aggregate() {
        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(labelled("n", "Person"))], None),
            return_(vec![
                item(ast::Expression::prop("n", "city")),
                ast::ReturnItem::aliased(ast::Expression::CountStar, "total"),
            ]),
        ])
        .unwrap();

        let PlanOp::Aggregate(agg) = compiled.root.op() else {
            panic!("Expected Aggregate");
        };
        assert_eq!(agg.group_keys, vec![0]);
        assert_eq!(agg.calls.len(), 1);
        assert_eq!(agg.calls[0].function, AggregateFunction::Count);
        assert!(agg.calls[0].args.is_empty());
        assert_eq!(compiled.root.schema().to_string(), "[_id: document, total: document]");
    }

    #[test]
    fn test_translate_sum_aggregate_argument() {
        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(node("n"))], None),
            return_(vec![ast::ReturnItem::aliased(
                ast::Expression::call("sum", vec![ast::Expression::prop("n", "age")]),
                "s",
            )]),
        ])
        .unwrap();
        let PlanOp::Aggregate(agg) = compiled.root.op() else {
            panic!("Expected Aggregate");
        };
        assert!(agg.group_keys.is_empty());
        assert_eq!(agg.calls[0].args, vec![0]);
        assert_eq!(compiled.root.input().unwrap().schema().names(), vec!["EXPR$0"]);
    }

    #[test]
    fn test_translate_distinct_keeps_columns() {
        let mut ret = ast::ReturnClause::new(vec![ast::ReturnItem::aliased(
            ast::Expression::prop("n", "name"),
            "name",
        )]);
        ret.distinct = true;
        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(node("n"))], None),
            ast::Clause::Return(ret),
        ])
        .unwrap();
        assert_eq!(compiled.root.kind(), "Project");
        assert_eq!(compiled.root.schema().names(), vec!["name"]);

        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(node("n"))], None),
            ast::Clause::With(ast::WithClause {
                distinct: true,
                star: false,
                items: vec![ast::ReturnItem::aliased(ast::Expression::var("n"), "y")],
                order_by: Vec::new(),
                skip: None,
                limit: None,
                where_clause: None,
                span: None,
            }),
            return_(vec![item(ast::Expression::var("y"))]),
        ])
        .unwrap();
        assert_eq!(compiled.root.schema().to_string(), "[y: node]");
        assert!(find(&compiled.root, "Aggregate").is_none());
    }

    #[test]
    fn test_translate_duplicate_columns() {
        let err = compile(vec![
            match_(vec![ast::Pattern::Node(node("n"))], None),
            return_(vec![
                item(ast::Expression::var("n")),
                item(ast::Expression::var("n")),
            ]),
        ])
        .unwrap_err();
        assert!(matches!(err.root(), Error::InvalidPlan(_)));
    }

    #[test]
    fn test_translate_with_where() {
        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(node("n"))], None),
            ast::Clause::With(ast::WithClause {
                distinct: false,
                star: false,
                items: vec![ast::ReturnItem::aliased(ast::Expression::prop("n", "age"), "age")],
                order_by: Vec::new(),
                skip: None,
                limit: None,
                where_clause: Some(ast::Expression::binary(
                    ast::Expression::var("age"),
                    ast::BinaryOp::Ge,
                    ast::Expression::int(18),
                )),
                span: None,
            }),
            return_(vec![item(ast::Expression::var("age"))]),
        ])
        .unwrap();
        let filter = compiled.root.input().unwrap();
        assert_eq!(filter.kind(), "Filter");
        assert_eq!(filter.input().unwrap().schema().names(), vec!["age"]);
    }

    #[test]
    fn test_translate_return_star() {
        let mut ret = ast::ReturnClause::new(Vec::new());
        ret.star = true;
        let compiled = compile(vec![
            match_(
                vec![path(node("a"), vec![out_edge(Some("r"), "KNOWS", node("b"))])],
                None,
            ),
            ast::Clause::Return(ret),
        ])
        .unwrap();
        assert_eq!(compiled.root.schema().names(), vec!["a", "r", "b"]);
    }

    // === CREATE ===

    #[test]
    fn test_translate_create_unfiltered() {
        let compiled = compile(vec![create(vec![path(
            labelled("a", "Person"),
            vec![out_edge(None, "KNOWS", labelled("b", "Person"))],
        )])])
        .unwrap();

        assert_eq!(compiled.kind, QueryKind::Insert);
        let PlanOp::Modify(m) = compiled.root.op() else {
            panic!("Expected Modify");
        };
        assert_eq!(m.operation, ModifyOperation::Insert);
        let PlanOp::Values(v) = compiled.root.input().unwrap().op() else {
            panic!("Expected Values");
        };
        assert_eq!(v.nodes.len(), 2);
        assert_eq!(v.edges[0].source, "a");
        assert_eq!(v.edges[0].target, "b");
    }

    #[test]
    fn test_translate_create_incoming_normalized() {
        let edge = ast::EdgePattern::new(None, EdgeDirection::Incoming, node("b")).with_type("KNOWS");
        let compiled = compile(vec![create(vec![path(node("a"), vec![edge])])]).unwrap();
        let PlanOp::Values(v) = compiled.root.input().unwrap().op() else {
            panic!("Expected Values");
        };
        assert_eq!(v.edges[0].source, "b");
        assert_eq!(v.edges[0].target, "a");
        assert_eq!(v.edges[0].direction, EdgeDirection::Outgoing);
    }

    #[test]
    fn test_translate_create_rules() {
        let undirected =
            ast::EdgePattern::new(None, EdgeDirection::Undirected, node("b")).with_type("R");
        let err = compile(vec![create(vec![path(node("a"), vec![undirected])])]).unwrap_err();
        assert!(matches!(err.root(), Error::UnsupportedOperation(_)));

        let untyped = ast::EdgePattern::new(None, EdgeDirection::Outgoing, node("b"));
        let err = compile(vec![create(vec![path(node("a"), vec![untyped])])]).unwrap_err();
        assert!(matches!(err.root(), Error::UnsupportedOperation(_)));

        let long = path(
            node("a"),
            vec![
                out_edge(None, "R", node("b")),
                out_edge(None, "R", node("c")),
            ],
        );
        let err = compile(vec![create(vec![long])]).unwrap_err();
        assert!(matches!(err.root(), Error::UnsupportedOperation(_)));
    }

    #[test]
    fn test_translate_create_after_match() {
        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(node("a"))], None),
            create(vec![path(node("a"), vec![out_edge(Some("r"), "KNOWS", node("b"))])]),
        ])
        .unwrap();
        let project = compiled.root.input().unwrap();
        assert_eq!(project.kind(), "Project");
        // `a` comes from the match and is not created again.
        assert_eq!(project.schema().names(), vec!["b", "r"]);
    }

    #[test]
    fn test_translate_create_anonymous_endpoints() {
        let anonymous = |label: &str| ast::NodePattern::anonymous().with_label(label);
        let compiled = compile(vec![create(vec![path(
            anonymous("A"),
            vec![out_edge(None, "R", anonymous("B"))],
        )])])
        .unwrap();

        let values = compiled.root.input().unwrap();
        assert_eq!(values.schema().to_string(), "[null: node, null: node]");
        let PlanOp::Values(v) = values.op() else {
            panic!("Expected Values");
        };
        let keys: Vec<_> = v.nodes.iter().map(GraphNode::endpoint_name).collect();
        assert_eq!(keys, vec![Some(v.edges[0].source.as_str()), Some(v.edges[0].target.as_str())]);
        assert!(v.nodes.iter().all(|n| n.variable.is_none()));
        assert_ne!(v.edges[0].source, v.edges[0].target);
    }

    #[test]
    fn test_translate_create_anonymous_after_match() {
        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(node("a"))], None),
            create(vec![path(
                node("a"),
                vec![out_edge(None, "R", ast::NodePattern::anonymous().with_label("B"))],
            )]),
        ])
        .unwrap();

        let project = compiled.root.input().unwrap();
        let PlanOp::Project(p) = project.op() else {
            panic!("Expected Project");
        };
        assert_eq!(project.schema().names(), vec!["EXPR$0", "EXPR$1"]);
        let Some(Value::Node(created)) = p.exprs[0].as_literal() else {
            panic!("Expected node literal");
        };
        let key = created.endpoint_name().unwrap();

        let adjust = &p.exprs[1];
        assert_eq!(adjust.operator(), Some(&Operator::AdjustEdge));
        assert_eq!(adjust.operands()[1].as_input_ref(), Some(0));
        assert_eq!(
            adjust.operands()[2].as_literal(),
            Some(&Value::Node(GraphNode::placeholder(key)))
        );
    }

    // === SET / REMOVE / DELETE ===

    #[test]
    fn test_translate_set_chains_updates() {
        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(node("n"))], None),
            ast::Clause::Set(ast::SetClause {
                items: vec![
                    ast::SetItem::Property {
                        variable: "n".into(),
                        property: "age".into(),
                        value: ast::Expression::int(31),
                    },
                    ast::SetItem::Labels {
                        variable: "n".into(),
                        labels: vec!["Adult".into()],
                    },
                ],
                span: None,
            }),
        ])
        .unwrap();

        assert_eq!(compiled.kind, QueryKind::Update);
        let PlanOp::Modify(m) = compiled.root.op() else {
            panic!("Expected Modify");
        };
        assert_eq!(m.operation, ModifyOperation::Update);
        assert_eq!(m.target_names, vec!["n".to_string()]);
        let update = &m.target_exprs[0];
        assert_eq!(update.operator(), Some(&Operator::SetLabels));
        assert_eq!(update.operands()[0].operator(), Some(&Operator::SetProperty));
    }

    #[test]
    fn test_translate_remove() {
        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(node("n"))], None),
            ast::Clause::Remove(ast::RemoveClause {
                items: vec![ast::RemoveItem::Property {
                    variable: "n".into(),
                    property: "age".into(),
                }],
                span: None,
            }),
        ])
        .unwrap();
        let PlanOp::Modify(m) = compiled.root.op() else {
            panic!("Expected Modify");
        };
        assert_eq!(m.target_exprs[0].operator(), Some(&Operator::RemoveProperty));
        assert_eq!(compiled.kind, QueryKind::Update);
    }

    #[test]
    fn test_translate_detach_delete() {
        let delete = |detach| {
            compile(vec![
                match_(vec![ast::Pattern::Node(node("n"))], None),
                ast::Clause::Delete(ast::DeleteClause {
                    variables: vec!["n".into()],
                    detach,
                    span: None,
                }),
            ])
            .unwrap()
        };
        let plain = delete(false);
        let detach = delete(true);
        assert_eq!(plain.kind, QueryKind::Delete);
        assert_eq!(plain.root.fingerprint(), detach.root.fingerprint());
    }

    #[test]
    fn test_translate_empty_delete() {
        let err = compile(vec![
            match_(vec![ast::Pattern::Node(node("n"))], None),
            ast::Clause::Delete(ast::DeleteClause {
                variables: Vec::new(),
                detach: false,
                span: None,
            }),
        ])
        .unwrap_err();
        assert!(matches!(err.root(), Error::EmptyOperation(_)));
    }

    // === UNWIND / CALL / other clauses ===

    #[test]
    fn test_translate_unwind_literal() {
        let compiled = compile(vec![
            ast::Clause::Unwind(ast::UnwindClause {
                expression: ast::Expression::List(vec![
                    ast::Expression::int(1),
                    ast::Expression::int(2),
                ]),
                alias: "x".into(),
                span: None,
            }),
            return_(vec![item(ast::Expression::var("x"))]),
        ])
        .unwrap();
        assert_eq!(compiled.root.schema().to_string(), "[x: int64]");
        let unwind = compiled.root.input().unwrap();
        assert_eq!(unwind.kind(), "Unwind");
        assert_eq!(unwind.input().unwrap().kind(), "Values");
    }

    #[test]
    fn test_translate_unwind_coerces_scalar() {
        let compiled = compile(vec![
            match_(vec![ast::Pattern::Node(node("n"))], None),
            ast::Clause::Unwind(ast::UnwindClause {
                expression: ast::Expression::prop("n", "tags"),
                alias: "t".into(),
                span: None,
            }),
        ])
        .unwrap();
        let project = compiled.root.input().unwrap();
        let PlanOp::Project(p) = project.op() else {
            panic!("Expected Project");
        };
        assert_eq!(p.exprs.last().unwrap().operator(), Some(&Operator::ToList));
        assert_eq!(compiled.root.schema().to_string(), "[t: any]");
    }

    #[test]
    fn test_translate_call() {
        let compiled = compile(vec![
            ast::Clause::Call(ast::CallClause {
                procedure: "db.labels".into(),
                args: Vec::new(),
                yield_all: false,
                yield_items: Vec::new(),
                span: None,
            }),
            return_(vec![item(ast::Expression::var("label"))]),
        ])
        .unwrap();
        assert_eq!(compiled.root.schema().to_string(), "[label: string]");

        let err = compile(vec![ast::Clause::Call(ast::CallClause {
            procedure: "db.dropEverything".into(),
            args: Vec::new(),
            yield_all: false,
            yield_items: Vec::new(),
            span: None,
        })])
        .unwrap_err();
        assert!(matches!(err.root(), Error::UnsupportedProcedure(_)));
    }

    #[test]
    fn test_translate_unsupported_clauses() {
        let err = compile(vec![ast::Clause::Merge(ast::MergeClause {
            pattern: ast::Pattern::Node(node("n")),
            span: None,
        })])
        .unwrap_err();
        assert!(matches!(err.root(), Error::UnsupportedOperation(_)));

        let union = ast::Query::Union {
            queries: Vec::new(),
            all: false,
        };
        let catalog = MemoryCatalog::with_default_graph();
        let err = translate(&union, &catalog, &Config::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)));
    }

    #[test]
    fn test_translate_use_is_ignored() {
        let compiled = compile(vec![
            ast::Clause::Use(ast::UseClause {
                graph: "other".into(),
                span: None,
            }),
            match_(vec![ast::Pattern::Node(node("n"))], None),
        ])
        .unwrap();
        assert_eq!(compiled.root.kind(), "Match");
    }

    #[test]
    fn test_translate_parameter_unsupported() {
        let err = compile(vec![
            match_(
                vec![ast::Pattern::Node(node("n"))],
                Some(ast::Expression::binary(
                    ast::Expression::prop("n", "age"),
                    ast::BinaryOp::Eq,
                    ast::Expression::Parameter("age".into()),
                )),
            ),
        ])
        .unwrap_err();
        assert!(matches!(err.root(), Error::UnsupportedOperation(_)));
    }

    #[test]
    fn test_underlying_labels() {
        let clauses = vec![
            match_(vec![ast::Pattern::Node(labelled("a", "Person"))], None),
            create(vec![path(
                labelled("b", "City"),
                vec![out_edge(None, "IN", labelled("c", "Person"))],
            )]),
        ];
        assert_eq!(underlying_labels(&clauses), vec!["Person", "City"]);
    }
}
