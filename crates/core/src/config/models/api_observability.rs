use serde::{Deserialize, Serialize};

use crate::errors::{GatewayError, GatewayResult};
use crate::logging::LogFormat;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_address: String,
    pub cors_enabled: bool,
    pub cors_origins: Vec<String>,
    pub request_timeout_seconds: u64,
    /// Applies to `/api/v1/notifications`
    pub rate_limit: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
            request_timeout_seconds: 30,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> GatewayResult<()> {
        if self.bind_address.is_empty() {
            return Err(GatewayError::Configuration(
                "bind_address must not be empty".to_string(),
            ));
        }
        if !self.bind_address.contains(':') {
            return Err(GatewayError::Configuration(
                "bind_address must be in host:port form".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(GatewayError::Configuration(
                "request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        self.rate_limit.validate()
    }
}

/// Token bucket shared by every caller of the notification endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Sustained refill rate
    pub max_requests_per_minute: u32,
    /// Bucket capacity
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests_per_minute: 1000,
            burst_size: 100,
        }
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> GatewayResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.max_requests_per_minute == 0 {
            return Err(GatewayError::Configuration(
                "api.rate_limit.max_requests_per_minute must be greater than 0".to_string(),
            ));
        }
        if self.burst_size == 0 {
            return Err(GatewayError::Configuration(
                "api.rate_limit.burst_size must be greater than 0".to_string(),
            ));
        }
        if self.burst_size > self.max_requests_per_minute {
            return Err(GatewayError::Configuration(
                "api.rate_limit.burst_size must be less than or equal to max_requests_per_minute"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
    pub metrics_endpoint: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_endpoint: "/metrics".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ObservabilityConfig {
    pub fn validate(&self) -> GatewayResult<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(GatewayError::Configuration(format!(
                "invalid log level: {}, supported levels: {:?}",
                self.log_level, valid_log_levels
            )));
        }

        if !self.metrics_endpoint.starts_with('/') {
            return Err(GatewayError::Configuration(
                "metrics_endpoint must start with '/'".to_string(),
            ));
        }

        Ok(())
    }
}
