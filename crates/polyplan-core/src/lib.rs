//! # polyplan-core
//!
//! The algebra of Polyplan: schemas, typed expressions, and plan nodes.
//!
//! Plans are trees of immutable [`PlanNode`]s shared through [`PlanRef`]. Every
//! node derives its output schema and its structural fingerprint when it is
//! built, and checks that its data model agrees with its children's. This
//! crate depends only on `polyplan-common`.
//!
//! ## Modules
//!
//! - [`algebra`] - Schemas, expressions, and plan nodes
//! - [`catalog`] - Entity handles and the catalog lookup interface

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod algebra;
pub mod catalog;

// Re-export commonly used types
pub use algebra::{
    AggregateCall, AggregateFunction, Expr, ExprRef, Field, ModifyOperation, Operator, PlanNode,
    PlanOp, PlanRef, QueryKind, Schema, SortKey, SortOrder, StringMatch,
};
pub use catalog::{Catalog, EntityRef, NamespaceInfo};
