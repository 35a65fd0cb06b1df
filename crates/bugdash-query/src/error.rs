//! Error types for query compilation.

use thiserror::Error;

/// A specialized Result type for query compilation operations.
pub type QueryResult<T> = Result<T, ConfigError>;

/// Errors raised for malformed query configurations.
///
/// These are caller bugs, not data problems: a shapeless rule node is
/// tolerated (it compiles to nothing), but an invalid group operator or a
/// contradictory config fails synchronously.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A group operator other than `AND` or `OR` was supplied.
    #[error("invalid group operator: {operator} (expected AND or OR)")]
    InvalidGroupOperator {
        /// The operator that was rejected.
        operator: String,
    },

    /// A query config contained both `rules` and `custom`.
    #[error("`rules` cannot be combined with `custom` in the same query config")]
    RulesCustomConflict,
}

impl ConfigError {
    /// Creates an invalid group operator error.
    pub fn invalid_group_operator(operator: impl Into<String>) -> Self {
        ConfigError::InvalidGroupOperator {
            operator: operator.into(),
        }
    }
}
