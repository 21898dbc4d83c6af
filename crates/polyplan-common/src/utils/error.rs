//! Error type shared by the algebra, the translators, and the compiler.

use crate::types::ModelTrait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for Polyplan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building plans or translating queries.
///
/// All of them are compile-time errors: nothing is retried and no partial
/// plan is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A catalog lookup found nothing.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// A variable was referenced that no earlier clause binds.
    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    /// The construct is recognized but not supported.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// An operator was applied to an input it cannot consume.
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// A procedure outside the allow-list was called.
    #[error("unsupported procedure: {0}")]
    UnsupportedProcedure(String),

    /// A modifying clause had nothing to modify.
    #[error("empty operation: {0}")]
    EmptyOperation(String),

    /// An expression or field has the wrong type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected type name.
        expected: String,
        /// Found type name.
        found: String,
    },

    /// A node's model differs from one of its children's.
    #[error("model mismatch: node is {parent} but child is {child}")]
    ModelMismatch {
        /// Model of the node being built.
        parent: ModelTrait,
        /// Model of the offending child.
        child: ModelTrait,
    },

    /// A plan node was built with inconsistent arguments.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// An error raised while translating one clause of a query.
    #[error("clause {index} ({clause}): {source}")]
    Clause {
        /// Zero-based position of the clause in the query.
        index: usize,
        /// Clause keyword, e.g. `MATCH`.
        clause: String,
        /// The underlying error.
        source: Box<Error>,
    },

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wraps this error with the position and kind of the clause that raised it.
    ///
    /// Errors that already carry a clause position are returned unchanged.
    #[must_use]
    pub fn at_clause(self, index: usize, clause: impl Into<String>) -> Self {
        match self {
            Self::Clause { .. } => self,
            other => Self::Clause {
                index,
                clause: clause.into(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, skipping clause wrappers.
    #[must_use]
    pub fn root(&self) -> &Error {
        match self {
            Self::Clause { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns the index of the clause that raised this error, if known.
    #[must_use]
    pub fn clause_index(&self) -> Option<usize> {
        match self {
            Self::Clause { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Shorthand for a type mismatch between two displayable types.
    pub fn type_mismatch(expected: impl fmt::Display, found: impl fmt::Display) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// A position range in query source text.
///
/// Parsers fill these in on AST nodes so that a clause index reported by
/// [`Error::clause_index`] can be mapped back to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// One-based line of `start`.
    pub line: u32,
    /// One-based column of `start`.
    pub column: u32,
}

impl SourceSpan {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
