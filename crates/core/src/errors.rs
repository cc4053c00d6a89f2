use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway error type
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Circuit breaker {name} is OPEN - service unavailable")]
    CircuitOpen { name: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database operation error: {0}")]
    DatabaseOperation(String),

    #[error("Broker connection error: {0}")]
    BrokerConnection(String),

    #[error("Message queue error: {0}")]
    MessageQueue(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Notification not found: {id}")]
    NotificationNotFound { id: String },

    #[error("Circuit breaker not found: {name}")]
    BreakerNotFound { name: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`GatewayError`].
///
/// Breakers are configured with a set of kinds that count as failures, and the
/// dispatch protocol branches on the kind instead of on error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    CircuitOpen,
    Database,
    Connection,
    MessageQueue,
    Cache,
    Conflict,
    NotFound,
    Serialization,
    Configuration,
    Internal,
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Validation(_) => ErrorKind::Validation,
            GatewayError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            GatewayError::Database(_) | GatewayError::DatabaseOperation(_) => ErrorKind::Database,
            GatewayError::BrokerConnection(_) => ErrorKind::Connection,
            GatewayError::MessageQueue(_) => ErrorKind::MessageQueue,
            GatewayError::Cache(_) => ErrorKind::Cache,
            GatewayError::Conflict(_) => ErrorKind::Conflict,
            GatewayError::NotificationNotFound { .. } | GatewayError::BreakerNotFound { .. } => {
                ErrorKind::NotFound
            }
            GatewayError::Serialization(_) => ErrorKind::Serialization,
            GatewayError::Configuration(_) => ErrorKind::Configuration,
            GatewayError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        self.kind() == ErrorKind::CircuitOpen
    }

    /// Failure of a store, cache or broker as opposed to a policy decision
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Database | ErrorKind::Connection | ErrorKind::MessageQueue | ErrorKind::Cache
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn notification_not_found(id: impl Into<String>) -> Self {
        GatewayError::NotificationNotFound { id: id.into() }
    }

    pub fn breaker_not_found(name: impl Into<String>) -> Self {
        GatewayError::BreakerNotFound { name: name.into() }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}

/// Unified result type
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_classification() {
        let open = GatewayError::CircuitOpen {
            name: "database".to_string(),
        };
        assert_eq!(open.kind(), ErrorKind::CircuitOpen);
        assert!(open.is_circuit_open());
        assert!(!open.is_dependency_failure());

        let conn = GatewayError::BrokerConnection("connection reset".to_string());
        assert_eq!(conn.kind(), ErrorKind::Connection);
        assert!(conn.is_dependency_failure());

        assert!(GatewayError::breaker_not_found("nonexistent").is_not_found());
        assert!(GatewayError::notification_not_found("req-1").is_not_found());
    }

    #[test]
    fn test_error_kind_deserializes_from_config_names() {
        let kinds: Vec<ErrorKind> =
            serde_json::from_str(r#"["connection", "message_queue"]"#).unwrap();
        assert_eq!(kinds, vec![ErrorKind::Connection, ErrorKind::MessageQueue]);
    }

    #[test]
    fn test_circuit_open_message() {
        let err = GatewayError::CircuitOpen {
            name: "broker".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Circuit breaker broker is OPEN - service unavailable"
        );
    }
}
