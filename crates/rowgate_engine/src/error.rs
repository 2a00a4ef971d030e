//! Error types for the engine boundary.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur at the persistence-engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No row matched the given natural key.
    #[error("row not found in table {table}: {key}")]
    RowNotFound {
        /// Table that was searched.
        table: String,
        /// Rendered natural key.
        key: String,
    },

    /// A uniqueness or key constraint was violated. The store is left untouched.
    #[error("constraint violation: {message}")]
    ConstraintViolation {
        /// Description of the violated constraint.
        message: String,
    },

    /// The query text could not be parsed or has the wrong shape for the call.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Description of the problem.
        message: String,
    },

    /// The session (unit-of-work) has already been closed.
    #[error("session is closed")]
    SessionClosed,

    /// The statement has already been closed.
    #[error("statement is closed")]
    StatementClosed,

    /// The cursor has already been closed.
    #[error("cursor is closed")]
    CursorClosed,

    /// Engine-internal failure (connectivity loss, timeout, injected fault).
    #[error("engine failure: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Creates a row-not-found error.
    pub fn row_not_found(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::RowNotFound {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Creates a constraint violation error.
    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
        }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates an engine-internal failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for the recoverable row-absence condition.
    ///
    /// Absence is reportable, not fatal; callers use this to decide whether
    /// a failed operation taints the unit-of-work.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RowNotFound { .. })
    }
}
