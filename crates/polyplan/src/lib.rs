//! # Polyplan
//!
//! A multi-model algebraic query IR, and a translator from Cypher clauses
//! to plans in it.
//!
//! Start with [`QueryCompiler`]: give it a [`Catalog`] and a [`Config`],
//! then compile clause ASTs from [`cypher`]. Every plan node carries a
//! [`ModelTrait`]; plans are delivered in the configured target model.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use polyplan::cypher::{Clause, CreateClause, NodePattern, Pattern, Query};
//! use polyplan::{Config, MemoryCatalog, QueryCompiler, QueryKind};
//!
//! let compiler = QueryCompiler::new(Arc::new(MemoryCatalog::with_default_graph()), Config::default());
//!
//! // CREATE (:Person)
//! let query = Query::single(vec![Clause::Create(CreateClause {
//!     patterns: vec![Pattern::Node(NodePattern::anonymous().with_label("Person"))],
//!     span: None,
//! })]);
//!
//! let compiled = compiler.compile(&query)?;
//! assert_eq!(compiled.kind, QueryKind::Insert);
//! println!("{}", compiled.root.explain());
//! # Ok::<(), polyplan::Error>(())
//! ```

// Re-export the compile API
pub use polyplan_engine::{CompiledQuery, Config, MemoryCatalog, QueryCompiler};

// Plan IR
pub use polyplan_core::algebra::{Expr, ExprRef, Operator, PlanNode, PlanOp, PlanRef, QueryKind, Schema};
pub use polyplan_core::catalog::{Catalog, EntityRef, NamespaceInfo};

// Values, types, and errors
pub use polyplan_common::types::{LogicalType, ModelTrait, NamespaceId, Value};
pub use polyplan_common::utils::error::{Error, Result};

/// The Cypher clause AST the compiler consumes.
#[cfg(feature = "cypher")]
pub mod cypher {
    pub use polyplan_adapters::query::cypher::ast::*;
}
