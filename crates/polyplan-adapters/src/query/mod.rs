//! Query language syntax trees.

#[cfg(feature = "cypher")]
pub mod cypher;
