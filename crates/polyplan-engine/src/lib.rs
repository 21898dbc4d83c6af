//! # polyplan-engine
//!
//! The entry point for Polyplan: query translation, model bridging, plan
//! interning, and compilation.
//!
//! ## Modules
//!
//! - [`compiler`] - QueryCompiler, the compile entry point
//! - [`config`] - Configuration options
//! - [`query`] - Translation context, clause translators, bridging, caching
//! - [`catalog`] - In-memory catalog

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod query;

pub use catalog::MemoryCatalog;
pub use compiler::{CompiledQuery, QueryCompiler};
pub use config::Config;
