use serde::{Deserialize, Serialize};

use crate::errors::{GatewayError, GatewayResult};

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    /// Apply pending migrations on startup
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/notifications".to_string(),
            max_connections: 10,
            min_connections: 1,
            connection_timeout_seconds: 30,
            idle_timeout_seconds: 600,
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    /// Validate database configuration
    pub fn validate(&self) -> GatewayResult<()> {
        if self.url.is_empty() {
            return Err(GatewayError::Configuration(
                "database url must not be empty".to_string(),
            ));
        }

        if !self.url.starts_with("postgresql://") && !self.url.starts_with("postgres://") {
            return Err(GatewayError::Configuration(
                "database url must be a PostgreSQL url".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(GatewayError::Configuration(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(GatewayError::Configuration(
                "min_connections must not exceed max_connections".to_string(),
            ));
        }

        if self.connection_timeout_seconds == 0 {
            return Err(GatewayError::Configuration(
                "connection_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
