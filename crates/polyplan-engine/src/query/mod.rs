//! Query compilation pipeline.
//!
//! - **Translator**: walks Cypher clauses and builds a plan bottom-up
//! - **Context**: the stack, queue, and bindings the translator works on
//! - **Bridge**: substitution graphs and model conversion of finished plans
//! - **Cache**: interns structurally equal plans

pub mod bridge;
pub mod cache;
pub mod context;

#[cfg(feature = "cypher")]
pub mod cypher_translator;

pub use cache::{CacheStats, PlanCache};
pub use context::{BoundEdge, EndpointCase, GraphSource, TranslationContext};

#[cfg(feature = "cypher")]
pub use cypher_translator::translate as translate_cypher;
