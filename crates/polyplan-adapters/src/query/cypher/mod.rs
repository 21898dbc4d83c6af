//! Cypher (openCypher 9.0) clause AST.
//!
//! A [`ast::Query`] is an ordered list of clauses. The compiler walks the
//! clauses once, in order, and never looks back.

pub mod ast;

pub use ast::{Clause, Expression, Query, SingleQuery};
