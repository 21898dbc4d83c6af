//! # polyplan-adapters
//!
//! Front-end layer for Polyplan: the syntax trees query-language parsers hand
//! to the compiler.
//!
//! Parsing itself happens outside this workspace. The trees here are
//! serde-(de)serializable so that an external parser, or a tool, can pass
//! them over as JSON.
//!
//! ## Modules
//!
//! - [`query`] - Query language syntax trees (Cypher)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod query;
