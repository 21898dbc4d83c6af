//! Property tests over compiled plans.

use polyplan_adapters::query::cypher::ast::{
    Clause, Expression, Literal, MatchClause, NodePattern, OrderByItem, Pattern, Query,
    ReturnClause, ReturnItem, SortOrder, UnwindClause,
};
use polyplan_common::types::LogicalType;
use polyplan_engine::{Config, MemoryCatalog, QueryCompiler};
use proptest::prelude::*;
use std::sync::Arc;

fn compiler() -> QueryCompiler {
    QueryCompiler::new(
        Arc::new(MemoryCatalog::with_default_graph()),
        Config::default().with_plan_cache_capacity(0),
    )
}

fn match_n() -> Clause {
    Clause::Match(MatchClause {
        optional: false,
        patterns: vec![Pattern::Node(NodePattern::named("n"))],
        where_clause: None,
        span: None,
    })
}

fn sorted_return(columns: &[String], sort_keys: &[(String, bool)]) -> Query {
    let mut ret = ReturnClause::new(
        columns
            .iter()
            .map(|c| ReturnItem::new(Expression::prop("n", c.as_str())))
            .collect(),
    );
    ret.order_by = sort_keys
        .iter()
        .map(|(key, desc)| OrderByItem {
            expression: Expression::prop("n", key.as_str()),
            order: if *desc { SortOrder::Desc } else { SortOrder::Asc },
        })
        .collect();
    Query::single(vec![match_n(), Clause::Return(ret)])
}

fn literal_strategy() -> impl Strategy<Value = Expression> {
    prop_oneof![
        Just(Expression::Literal(Literal::Null)),
        any::<i64>().prop_map(Expression::int),
        prop::collection::vec(any::<i64>(), 0..5)
            .prop_map(|items| Expression::List(items.into_iter().map(Expression::int).collect())),
    ]
}

proptest! {
    #[test]
    fn test_compilation_is_deterministic(
        columns in prop::collection::btree_set("[a-e]", 1..4),
        sort_keys in prop::collection::vec(("[a-h]", any::<bool>()), 0..3),
    ) {
        let columns: Vec<String> = columns.into_iter().collect();
        let query = sorted_return(&columns, &sort_keys);
        let compiler = compiler();
        let first = compiler.compile(&query).unwrap();
        let second = compiler.compile(&query).unwrap();
        prop_assert!(!Arc::ptr_eq(&first.root, &second.root));
        prop_assert_eq!(first.root.fingerprint(), second.root.fingerprint());
        prop_assert_eq!(first.root.schema(), second.root.schema());
    }

    #[test]
    fn test_hidden_sort_fields_are_removed(
        columns in prop::collection::btree_set("[a-e]", 1..4),
        sort_keys in prop::collection::vec(("[a-h]", any::<bool>()), 1..4),
    ) {
        let columns: Vec<String> = columns.into_iter().collect();
        let query = sorted_return(&columns, &sort_keys);
        let compiled = compiler().compile(&query).unwrap();
        let names: Vec<String> = columns.iter().map(|c| format!("n.{c}")).collect();
        prop_assert_eq!(compiled.root.schema().names(), names.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_unwind_yields_element_type(value in literal_strategy()) {
        let query = Query::single(vec![
            Clause::Unwind(UnwindClause {
                expression: value.clone(),
                alias: "x".into(),
                span: None,
            }),
            Clause::Return(ReturnClause::new(vec![ReturnItem::new(Expression::var("x"))])),
        ]);
        let compiled = compiler().compile(&query).unwrap();
        let ty = &compiled.root.schema().fields()[0].ty;
        let expected = match &value {
            Expression::List(items) if items.is_empty() => LogicalType::Any,
            Expression::Literal(Literal::Null) => LogicalType::Any,
            _ => LogicalType::Int64,
        };
        prop_assert_eq!(ty, &expected);
    }

    #[test]
    fn test_unwind_over_rows_coerces_scalars(property in "[a-z]{1,6}") {
        let query = Query::single(vec![
            match_n(),
            Clause::Unwind(UnwindClause {
                expression: Expression::prop("n", property.as_str()),
                alias: "v".into(),
                span: None,
            }),
        ]);
        let compiled = compiler().compile(&query).unwrap();
        prop_assert_eq!(compiled.root.kind(), "Unwind");
        prop_assert_eq!(&compiled.root.schema().fields()[0].ty, &LogicalType::Any);
    }
}
