//! Model bridging.
//!
//! Two places need a plan in one model to feed a consumer in another:
//!
//! - A namespace without a graph is queried through a *substitution graph*:
//!   a transform that presents the namespace's collections or tables as a
//!   graph.
//! - A compiled graph plan delivered to a relational or document consumer is
//!   wrapped in a transform that turns graph elements into documents.

use polyplan_common::types::{LogicalType, ModelTrait, NamespaceId};
use polyplan_common::utils::error::{Error, Result};
use polyplan_core::algebra::{Field, PlanNode, PlanRef, QueryKind, Schema};
use polyplan_core::catalog::Catalog;

/// Delivers `plan` in `target`.
///
/// Returns `plan` itself when it already is in `target`. Otherwise the plan is
/// wrapped in a transform whose schema keeps every field name and turns every
/// graph-element field into a document.
pub fn to_model(plan: PlanRef, target: ModelTrait, operation: QueryKind) -> Result<PlanRef> {
    if plan.model() == target {
        return Ok(plan);
    }
    let mut order = Vec::new();
    let schema: Schema = plan
        .schema()
        .fields()
        .iter()
        .map(|f| {
            if f.ty.is_graph_element() {
                order.push(f.ty.clone());
                Field::new(f.name.clone(), LogicalType::Document)
            } else {
                f.clone()
            }
        })
        .collect();
    tracing::debug!(from = %plan.model(), to = %target, "bridging plan");
    let in_model = plan.model();
    PlanNode::transform(vec![plan], schema, order, operation, in_model, target, Vec::new())
}

/// Builds the default scan of a namespace that has no graph.
///
/// The scan is a transform over full scans of the namespace's entities whose
/// names appear in `labels`, or of all entities when `labels` is empty. Each
/// entity contributes nodes, so the order is one `node` per input.
pub fn substitution_scan(
    catalog: &dyn Catalog,
    namespace: NamespaceId,
    labels: &[String],
) -> Result<PlanRef> {
    let info = catalog
        .namespace(namespace)
        .ok_or_else(|| Error::UnknownEntity(namespace.to_string()))?;
    let entities: Vec<_> = catalog
        .entities(namespace)
        .into_iter()
        .filter(|e| labels.is_empty() || labels.contains(&e.name))
        .collect();
    if entities.is_empty() {
        return Err(Error::UnknownEntity(if labels.is_empty() {
            format!("{} has no entities", info.name)
        } else {
            format!("{} has no entity named {}", info.name, labels.join(" or "))
        }));
    }
    let names = entities.iter().map(|e| e.name.clone()).collect();
    let order = vec![LogicalType::Node; entities.len()];
    let scans = entities
        .into_iter()
        .map(PlanNode::scan)
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(namespace = %info.name, inputs = scans.len(), "substitution graph");
    PlanNode::transform(
        scans,
        Schema::single("graph", LogicalType::Graph),
        order,
        QueryKind::Select,
        info.model,
        ModelTrait::Graph,
        names,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use polyplan_common::types::{GraphNode, GraphPath, PropertyMap, Value};
    use polyplan_core::algebra::{Expr, Operator, PlanOp};

    fn graph_plan(catalog: &MemoryCatalog) -> PlanRef {
        let graph = catalog.graph(NamespaceId::new(0)).unwrap();
        let scan = PlanNode::scan(graph).unwrap();
        let path = GraphPath {
            nodes: vec![GraphNode::new(vec![], PropertyMap::new(), Some("n".into()))],
            edges: vec![],
            variable: None,
        };
        let call = Expr::call(
            Operator::PatternMatch,
            vec![
                Expr::input_ref(0, LogicalType::Graph),
                Expr::literal(Value::Path(path)),
                Expr::literal("n".into()),
            ],
        )
        .unwrap();
        PlanNode::pattern_match(scan, vec![call], vec!["n".into()]).unwrap()
    }

    #[test]
    fn test_to_model_identity() {
        let catalog = MemoryCatalog::with_default_graph();
        let plan = graph_plan(&catalog);
        let same = to_model(plan.clone(), ModelTrait::Graph, QueryKind::Select).unwrap();
        assert!(std::sync::Arc::ptr_eq(&plan, &same));
    }

    #[test]
    fn test_to_model_documents() {
        let catalog = MemoryCatalog::with_default_graph();
        let plan = graph_plan(&catalog);
        let bridged = to_model(plan, ModelTrait::Document, QueryKind::Select).unwrap();
        assert_eq!(bridged.model(), ModelTrait::Document);
        assert_eq!(bridged.schema().to_string(), "[n: document]");
        let PlanOp::Transform(t) = bridged.op() else {
            panic!("Expected Transform");
        };
        assert_eq!(t.in_model, ModelTrait::Graph);
        assert_eq!(t.operation_order, vec![LogicalType::Node]);
    }

    #[test]
    fn test_substitution_scan_filters_by_label() {
        let mut catalog = MemoryCatalog::new();
        let ns = catalog.add_namespace("docs", ModelTrait::Document);
        catalog.add_collection(ns, "Person");
        catalog.add_collection(ns, "City");

        let all = substitution_scan(&catalog, ns, &[]).unwrap();
        assert_eq!(all.inputs().len(), 2);
        assert_eq!(all.model(), ModelTrait::Graph);
        assert_eq!(all.schema().to_string(), "[graph: graph]");

        let people = substitution_scan(&catalog, ns, &["Person".to_string()]).unwrap();
        assert_eq!(people.inputs().len(), 1);
        let PlanOp::Transform(t) = people.op() else {
            panic!("Expected Transform");
        };
        assert_eq!(t.names, vec!["Person".to_string()]);
        assert_eq!(t.in_model, ModelTrait::Document);
        assert_eq!(t.operation, QueryKind::Select);

        let err = substitution_scan(&catalog, ns, &["Movie".to_string()]).unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(_)));
        let err = substitution_scan(&catalog, NamespaceId::new(9), &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(_)));
    }
}
