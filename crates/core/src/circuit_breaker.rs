use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{ErrorKind, GatewayError, GatewayResult};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed - normal operation
    Closed,
    /// Circuit is open - calls are blocked
    Open,
    /// Circuit is half-open - a single trial call tests for recovery
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,
    /// Cooldown after the last failure before a trial call is allowed
    pub recovery_timeout_ms: u64,
    /// Error kinds that count as failures; `None` counts every error
    #[serde(default)]
    pub counted_errors: Option<Vec<ErrorKind>>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_ms: 60_000,
            counted_errors: None,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout_ms: recovery_timeout.as_millis() as u64,
            counted_errors: None,
        }
    }

    pub fn with_counted_errors(mut self, kinds: Vec<ErrorKind>) -> Self {
        self.counted_errors = Some(kinds);
        self
    }

    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.failure_threshold == 0 {
            return Err(GatewayError::Configuration(
                "failure_threshold must be greater than 0".to_string(),
            ));
        }
        if matches!(&self.counted_errors, Some(kinds) if kinds.is_empty()) {
            return Err(GatewayError::Configuration(
                "counted_errors must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }

    fn counts(&self, error: &GatewayError) -> bool {
        match &self.counted_errors {
            Some(kinds) => kinds.contains(&error.kind()),
            None => true,
        }
    }
}

/// Point-in-time view of a breaker, for observability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_state_change_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    last_state_change_at: Option<DateTime<Utc>>,
    trial_in_flight: bool,
    /// Bumped on every transition so late outcomes can be told apart
    generation: u64,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            last_failure_at: None,
            last_state_change_at: Some(Utc::now()),
            trial_in_flight: false,
            generation: 0,
        }
    }
}

/// Issued on admission and handed back with the outcome.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    generation: u64,
    trial: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Success,
    Failure,
    Ignored,
}

/// Circuit breaker guarding calls to one dependency.
///
/// Admission (check state, maybe move OPEN to HALF_OPEN, admit) and outcome
/// recording (update counters, maybe transition) each run as one critical
/// section under the breaker's lock. The guarded operation itself runs
/// outside the lock, so concurrent callers are never serialized on it.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Execute operation with circuit breaker protection
    ///
    /// Returns [`GatewayError::CircuitOpen`] without invoking `operation` when
    /// the call is rejected; otherwise the operation's own result is returned
    /// after its outcome has been recorded.
    pub async fn call<F, Fut, T>(&self, operation: F) -> GatewayResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let ticket = self.admit()?;
        let mut permit = TrialPermit {
            breaker: self,
            ticket,
            armed: ticket.trial,
        };

        let result = operation().await;

        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(error) if self.config.counts(error) => Outcome::Failure,
            Err(error) => {
                debug!(breaker = %self.name, error = %error, "Error not counted by circuit breaker");
                Outcome::Ignored
            }
        };
        permit.armed = false;
        self.record(ticket, outcome);

        result
    }

    fn admit(&self) -> GatewayResult<Ticket> {
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => Ok(Ticket {
                generation: inner.generation,
                trial: false,
            }),
            CircuitState::Open => {
                let cooled_down = inner
                    .last_failure
                    .map_or(true, |at| at.elapsed() >= self.config.recovery_timeout());
                if !cooled_down {
                    return Err(self.open_error());
                }
                self.transition(&mut inner, CircuitState::HalfOpen);
                inner.trial_in_flight = true;
                Ok(Ticket {
                    generation: inner.generation,
                    trial: true,
                })
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    return Err(self.open_error());
                }
                inner.trial_in_flight = true;
                Ok(Ticket {
                    generation: inner.generation,
                    trial: true,
                })
            }
        }
    }

    fn record(&self, ticket: Ticket, outcome: Outcome) {
        let mut inner = self.inner.lock();
        let current = ticket.generation == inner.generation;

        if ticket.trial && current {
            inner.trial_in_flight = false;
        }

        match outcome {
            Outcome::Ignored => {}
            Outcome::Success => match inner.state {
                CircuitState::Closed => inner.failure_count = 0,
                CircuitState::HalfOpen if ticket.trial && current => {
                    inner.failure_count = 0;
                    self.transition(&mut inner, CircuitState::Closed);
                    info!(breaker = %self.name, "Circuit breaker moving to CLOSED state - service recovered");
                }
                // A success admitted before the breaker tripped does not close it
                _ => {}
            },
            // Admitted under an earlier state: counted, but never drives a transition
            Outcome::Failure if !current => {
                if inner.state != CircuitState::Closed {
                    inner.failure_count = inner.failure_count.saturating_add(1);
                    inner.last_failure_at = Some(Utc::now());
                }
                debug!(
                    breaker = %self.name,
                    state = inner.state.as_str(),
                    "Late failure recorded without state change"
                );
            }
            Outcome::Failure => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                inner.last_failure = Some(Instant::now());
                inner.last_failure_at = Some(Utc::now());

                match inner.state {
                    CircuitState::Closed if inner.failure_count >= self.config.failure_threshold => {
                        self.transition(&mut inner, CircuitState::Open);
                        warn!(
                            breaker = %self.name,
                            failures = inner.failure_count,
                            "Circuit breaker moving to OPEN state - service failing"
                        );
                    }
                    CircuitState::HalfOpen if ticket.trial => {
                        inner.trial_in_flight = false;
                        self.transition(&mut inner, CircuitState::Open);
                        warn!(
                            breaker = %self.name,
                            failures = inner.failure_count,
                            "Circuit breaker trial failed - moving back to OPEN state"
                        );
                    }
                    _ => {}
                }
            }
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        if to == CircuitState::HalfOpen {
            warn!(breaker = %self.name, "Circuit breaker moving to HALF_OPEN state");
        }
        inner.state = to;
        inner.last_state_change_at = Some(Utc::now());
        inner.generation += 1;
        metrics::counter!(
            "gateway_circuit_breaker_transitions_total",
            "breaker" => self.name.clone(),
            "state" => to.as_str()
        )
        .increment(1);
    }

    fn open_error(&self) -> GatewayError {
        GatewayError::CircuitOpen {
            name: self.name.clone(),
        }
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let inner = self.inner.lock();
        CircuitBreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout_ms: self.config.recovery_timeout_ms,
            last_failure_at: inner.last_failure_at,
            last_state_change_at: inner.last_state_change_at,
        }
    }

    /// Reset circuit breaker to closed state, clearing counters and timestamps
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let generation = inner.generation + 1;
        *inner = BreakerInner {
            last_state_change_at: None,
            generation,
            ..BreakerInner::new()
        };
        info!(breaker = %self.name, "Circuit breaker manually reset");
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

/// Frees the HALF_OPEN trial slot if the guarded future is dropped mid-call.
struct TrialPermit<'a> {
    breaker: &'a CircuitBreaker,
    ticket: Ticket,
    armed: bool,
}

impl Drop for TrialPermit<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.breaker.inner.lock();
            if inner.generation == self.ticket.generation {
                inner.trial_in_flight = false;
            }
        }
    }
}
