//! The compile entry point.

use crate::config::Config;
use crate::query::bridge;
use crate::query::cache::{CacheStats, PlanCache};
use polyplan_common::utils::error::Result;
use polyplan_core::algebra::{PlanRef, QueryKind};
use polyplan_core::catalog::Catalog;
use std::sync::Arc;

/// A compiled query: the plan root and what kind of statement it is.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// Root of the plan, in the configured target model.
    pub root: PlanRef,
    /// Select, insert, update, or delete.
    pub kind: QueryKind,
}

/// Compiles queries against one catalog.
///
/// Compiled plans are interned, so compiling the same query twice returns
/// the same plan tree.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use polyplan_adapters::query::cypher::ast::{Clause, Expression, MatchClause, NodePattern, Pattern, Query, ReturnClause, ReturnItem};
/// use polyplan_engine::{Config, MemoryCatalog, QueryCompiler};
///
/// let compiler = QueryCompiler::new(Arc::new(MemoryCatalog::with_default_graph()), Config::default());
/// let query = Query::single(vec![
///     Clause::Match(MatchClause {
///         optional: false,
///         patterns: vec![Pattern::Node(NodePattern::named("n").with_label("Person"))],
///         where_clause: None,
///         span: None,
///     }),
///     Clause::Return(ReturnClause::new(vec![ReturnItem::new(Expression::var("n"))])),
/// ]);
///
/// let compiled = compiler.compile(&query).unwrap();
/// assert_eq!(compiled.root.schema().to_string(), "[n: node]");
/// ```
pub struct QueryCompiler {
    catalog: Arc<dyn Catalog>,
    config: Config,
    cache: PlanCache,
}

impl QueryCompiler {
    /// Creates a compiler over `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>, config: Config) -> Self {
        let cache = PlanCache::new(config.plan_cache_capacity);
        Self {
            catalog,
            config,
            cache,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    /// Compiles a Cypher query.
    ///
    /// # Errors
    ///
    /// Returns the first translation error, tagged with the clause that
    /// raised it, or a validation error for the finished plan.
    #[cfg(feature = "cypher")]
    pub fn compile(
        &self,
        query: &polyplan_adapters::query::cypher::ast::Query,
    ) -> Result<CompiledQuery> {
        let span = tracing::debug_span!("compile", namespace = %self.config.namespace);
        let _enter = span.enter();
        let compiled =
            crate::query::cypher_translator::translate(query, self.catalog.as_ref(), &self.config)?;
        self.finish(compiled.root, compiled.kind)
    }

    /// Delivers a translated plan: converts it to the target model,
    /// validates it if configured, and interns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the model conversion or validation fails.
    pub fn finish(&self, root: PlanRef, kind: QueryKind) -> Result<CompiledQuery> {
        let root = bridge::to_model(root, self.config.target_model, kind)?;
        if self.config.validate {
            root.validate()?;
        }
        let root = self.cache.intern(root);
        tracing::debug!(
            kind = ?kind,
            nodes = root.node_count(),
            fingerprint = %root.digest(),
            "compiled"
        );
        Ok(CompiledQuery { root, kind })
    }

    /// Returns the plan cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops all interned plans.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl std::fmt::Debug for QueryCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCompiler")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, feature = "cypher"))]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use polyplan_adapters::query::cypher::ast;
    use polyplan_common::types::ModelTrait;
    use polyplan_core::algebra::PlanOp;

    fn match_return() -> ast::Query {
        ast::Query::single(vec![
            ast::Clause::Match(ast::MatchClause {
                optional: false,
                patterns: vec![ast::Pattern::Node(ast::NodePattern::named("n"))],
                where_clause: None,
                span: None,
            }),
            ast::Clause::Return(ast::ReturnClause::new(vec![ast::ReturnItem::new(
                ast::Expression::var("n"),
            )])),
        ])
    }

    fn compiler(config: Config) -> QueryCompiler {
        QueryCompiler::new(Arc::new(MemoryCatalog::with_default_graph()), config)
    }

    #[test]
    fn test_compile_interns_plans() {
        let compiler = compiler(Config::default());
        let a = compiler.compile(&match_return()).unwrap();
        let b = compiler.compile(&match_return()).unwrap();
        assert!(Arc::ptr_eq(&a.root, &b.root));
        let stats = compiler.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        compiler.clear_cache();
        assert_eq!(compiler.cache_stats().entries, 0);
    }

    #[test]
    fn test_compile_without_cache() {
        let compiler = compiler(Config::default().with_plan_cache_capacity(0));
        let a = compiler.compile(&match_return()).unwrap();
        let b = compiler.compile(&match_return()).unwrap();
        assert!(!Arc::ptr_eq(&a.root, &b.root));
        assert_eq!(a.root.fingerprint(), b.root.fingerprint());
    }

    #[test]
    fn test_compile_to_document_model() {
        let compiler = compiler(Config::default().with_target_model(ModelTrait::Document));
        let compiled = compiler.compile(&match_return()).unwrap();
        assert_eq!(compiled.root.model(), ModelTrait::Document);
        let PlanOp::Transform(t) = compiled.root.op() else {
            panic!("Expected Transform");
        };
        assert_eq!(t.out_model, ModelTrait::Document);
        assert_eq!(compiled.root.schema().to_string(), "[n: document]");
    }

    #[test]
    fn test_compile_error_is_clause_tagged() {
        let query = ast::Query::single(vec![ast::Clause::Return(ast::ReturnClause::new(vec![
            ast::ReturnItem::new(ast::Expression::var("missing")),
        ]))]);
        let err = compiler(Config::default()).compile(&query).unwrap_err();
        assert_eq!(err.clause_index(), Some(0));
        assert!(err.to_string().contains("RETURN"));
    }
}
