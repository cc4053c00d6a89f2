use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot};
use crate::errors::{GatewayError, GatewayResult};

/// Process-wide set of circuit breakers keyed by dependency name.
///
/// Constructed once at startup and shared (via `Arc`) by every component
/// that guards a dependency. Breakers are created lazily on first lookup and
/// are never removed.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the breaker registered under `name`, creating it with `config`
    /// if absent. The first registration wins; later configs are ignored.
    pub fn get_or_create(&self, name: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().get(name) {
            return Arc::clone(existing);
        }

        let mut breakers = self.breakers.write();
        let breaker = breakers.entry(name.to_string()).or_insert_with(|| {
            info!(
                breaker = name,
                failure_threshold = config.failure_threshold,
                recovery_timeout_ms = config.recovery_timeout_ms,
                "Registering circuit breaker"
            );
            Arc::new(CircuitBreaker::with_config(name, config))
        });
        Arc::clone(breaker)
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of every registered breaker, keyed by name
    pub fn snapshot_all(&self) -> BTreeMap<String, CircuitBreakerSnapshot> {
        self.breakers
            .read()
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.snapshot()))
            .collect()
    }

    pub fn reset(&self, name: &str) -> GatewayResult<()> {
        let breaker = self
            .get(name)
            .ok_or_else(|| GatewayError::breaker_not_found(name))?;
        breaker.reset();
        Ok(())
    }

    /// Reset every registered breaker to CLOSED
    pub fn reset_all(&self) {
        let breakers = self.breakers.read();
        for breaker in breakers.values() {
            breaker.reset();
        }
        info!(count = breakers.len(), "All circuit breakers reset");
    }
}
