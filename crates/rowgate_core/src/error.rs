//! Error types for RowGate core.

use rowgate_engine::EngineError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in RowGate core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Persistence-engine error.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// The requested entity is absent. Recoverable, not fatal.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity type name.
        entity: &'static str,
        /// Rendered natural key.
        key: String,
    },

    /// The broker's unit-of-work has already been released.
    ///
    /// Operations never silently reacquire a session; a released broker
    /// fails fast.
    #[error("broker has been released")]
    BrokerReleased,

    /// The result set has already been closed.
    #[error("result set is closed")]
    ResultSetClosed,

    /// A column required for row mapping is absent.
    #[error("{entity} row is missing field {field}")]
    MissingField {
        /// Entity type name.
        entity: &'static str,
        /// Missing column.
        field: &'static str,
    },

    /// A column has the wrong value type for row mapping.
    #[error("{entity} field {field}: expected {expected}, got {actual}")]
    FieldType {
        /// Entity type name.
        entity: &'static str,
        /// Offending column.
        field: &'static str,
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        actual: &'static str,
    },
}

impl CoreError {
    /// Creates a not-found error.
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Creates a missing-field mapping error.
    pub fn missing_field(entity: &'static str, field: &'static str) -> Self {
        Self::MissingField { entity, field }
    }

    /// Creates a wrong-type mapping error.
    pub fn field_type(
        entity: &'static str,
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        Self::FieldType {
            entity,
            field,
            expected,
            actual,
        }
    }

    /// Returns `true` for the recoverable absence conditions.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Engine(inner) => inner.is_not_found(),
            _ => false,
        }
    }
}
