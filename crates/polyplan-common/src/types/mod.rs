//! Core type definitions for Polyplan.
//!
//! This module contains the fundamental types shared by the algebra and the
//! translators:
//! - Identifier types ([`NamespaceId`], [`EntityId`])
//! - Value types ([`Value`], [`LogicalType`]) including graph literals
//! - The data-model tag attached to plan nodes ([`ModelTrait`])

mod id;
mod logical_type;
mod model;
mod value;

pub use id::{EntityId, NamespaceId};
pub use logical_type::LogicalType;
pub use model::ModelTrait;
pub use value::{EdgeDirection, GraphEdge, GraphNode, GraphPath, PropertyMap, Value};
