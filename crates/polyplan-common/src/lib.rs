//! # polyplan-common
//!
//! Foundation layer for Polyplan: types, values, and errors.
//!
//! This crate provides the fundamental building blocks used by all other
//! Polyplan crates. It has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Core type definitions (LogicalType, Value, ModelTrait, ids)
//! - [`utils`] - Utility functions and helpers (hashing, errors)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use types::{
    EdgeDirection, EntityId, GraphEdge, GraphNode, GraphPath, LogicalType, ModelTrait,
    NamespaceId, PropertyMap, Value,
};
pub use utils::error::{Error, Result};
