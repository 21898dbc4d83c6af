//! Plan algebra.
//!
//! - [`schema`]: named, typed fields
//! - [`expr`]: typed scalar expressions
//! - [`node`]: plan nodes and their operators

pub mod expr;
pub mod node;
pub mod schema;

pub use expr::{Expr, ExprRef, Operator, StringMatch};
pub use node::{
    AggregateCall, AggregateFunction, AggregateOp, CallOp, FilterOp, MatchOp, ModifyOp,
    ModifyOperation, PlanNode, PlanOp, PlanRef, ProjectOp, QueryKind, ScanOp, SortKey, SortOp,
    SortOrder, TransformOp, UnwindOp, ValuesOp,
};
pub use schema::{Field, Schema};
