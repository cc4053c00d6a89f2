//! Error mapping for repository operations
//!
//! Translates `sqlx` failures into [`GatewayError`] with the operation and
//! entity in the message, and logs them once at the point of failure.

use std::fmt;

use gateway_core::GatewayError;
use sqlx::Error as SqlxError;
use tracing::error;

/// Operation context for repository operations
#[derive(Debug, Clone, Copy)]
pub enum RepositoryOperation {
    Create,
    Read,
    Update,
    Query,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryOperation::Create => write!(f, "create"),
            RepositoryOperation::Read => write!(f, "read"),
            RepositoryOperation::Update => write!(f, "update"),
            RepositoryOperation::Query => write!(f, "query"),
        }
    }
}

pub struct RepositoryErrorHelpers;

impl RepositoryErrorHelpers {
    /// Map a database error; unique-key violations become `Conflict`.
    pub fn database_error(
        operation: RepositoryOperation,
        entity: &str,
        error: SqlxError,
    ) -> GatewayError {
        if let SqlxError::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                let constraint = db_error.constraint().unwrap_or("unique key");
                error!(
                    %operation,
                    entity,
                    constraint,
                    "Duplicate key on {operation} of {entity}"
                );
                return GatewayError::Conflict(format!(
                    "{entity} already exists ({constraint})"
                ));
            }
        }

        match &error {
            SqlxError::PoolClosed | SqlxError::PoolTimedOut | SqlxError::Io(_) => {
                error!(%operation, entity, error = %error, "Database unavailable");
            }
            _ => error!(%operation, entity, error = %error, "Database operation failed"),
        }
        GatewayError::Database(error)
    }
}
