//! LLM circuit breaker.
//!
//! Retries are left to the caller. After repeated failures the circuit
//! opens and calls fail fast, without touching the network, until the
//! reset window passes.

use super::LlmProvider;
use crate::{Error, Result};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Circuit breaker configuration for LLM calls.
#[derive(Debug, Clone)]
pub struct LlmResilienceConfig {
    /// Consecutive failures before opening the circuit.
    pub breaker_failure_threshold: u32,
    /// How long to keep the circuit open before half-open.
    pub breaker_reset_timeout_ms: u64,
    /// Maximum trial calls while half-open.
    pub breaker_half_open_max_calls: u32,
}

impl Default for LlmResilienceConfig {
    fn default() -> Self {
        Self {
            breaker_failure_threshold: 3,
            breaker_reset_timeout_ms: 60_000,
            breaker_half_open_max_calls: 1,
        }
    }
}

impl LlmResilienceConfig {
    /// Loads breaker settings from config file settings.
    #[must_use]
    pub fn from_config(config: &crate::config::LlmConfig) -> Self {
        Self {
            breaker_failure_threshold: config.breaker_failure_threshold.max(1),
            breaker_reset_timeout_ms: config.breaker_reset_ms,
            ..Self::default()
        }
    }
}

/// Circuit breaker state machine.
#[derive(Debug)]
enum BreakerState {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { attempts: u32 },
}

#[derive(Debug)]
struct CircuitBreaker {
    state: BreakerState,
    failure_threshold: u32,
    reset_timeout: Duration,
    half_open_max_calls: u32,
}

impl CircuitBreaker {
    fn new(config: &LlmResilienceConfig) -> Self {
        Self {
            state: BreakerState::Closed { failures: 0 },
            failure_threshold: config.breaker_failure_threshold.max(1),
            reset_timeout: Duration::from_millis(config.breaker_reset_timeout_ms),
            half_open_max_calls: config.breaker_half_open_max_calls.max(1),
        }
    }

    fn allow(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { opened_at } => {
                if opened_at.elapsed() >= self.reset_timeout {
                    self.state = BreakerState::HalfOpen { attempts: 1 };
                    true
                } else {
                    false
                }
            },
            BreakerState::HalfOpen { ref mut attempts } => {
                if *attempts >= self.half_open_max_calls {
                    false
                } else {
                    *attempts += 1;
                    true
                }
            },
        }
    }

    const fn on_success(&mut self) {
        self.state = BreakerState::Closed { failures: 0 };
    }

    fn on_failure(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { ref mut failures } => {
                *failures += 1;
                if *failures >= self.failure_threshold {
                    self.state = BreakerState::Open {
                        opened_at: Instant::now(),
                    };
                    return true;
                }
            },
            BreakerState::HalfOpen { .. } => {
                self.state = BreakerState::Open {
                    opened_at: Instant::now(),
                };
                return true;
            },
            BreakerState::Open { .. } => {},
        }
        false
    }

    const fn is_open(&self) -> bool {
        matches!(self.state, BreakerState::Open { .. })
    }
}

/// LLM provider wrapper with a circuit breaker.
pub struct ResilientLlmProvider<P: LlmProvider> {
    inner: P,
    breaker: Mutex<CircuitBreaker>,
}

impl<P: LlmProvider> ResilientLlmProvider<P> {
    /// Creates a new resilient LLM provider wrapper.
    #[must_use]
    pub fn new(inner: P, config: &LlmResilienceConfig) -> Self {
        Self {
            inner,
            breaker: Mutex::new(CircuitBreaker::new(config)),
        }
    }

    /// Whether the circuit is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.breaker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_open()
    }

    fn execute<F>(&self, operation: &'static str, call: F) -> Result<String>
    where
        F: FnOnce() -> Result<String>,
    {
        let provider: &'static str = self.inner.name();
        let span = tracing::info_span!(
            "llm.request",
            provider = provider,
            operation = operation,
            status = tracing::field::Empty,
        );
        let _enter = span.enter();

        let allowed = self
            .breaker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .allow();
        if !allowed {
            span.record("status", "circuit_open");
            metrics::counter!(
                "llm_circuit_breaker_rejections_total",
                "provider" => provider,
                "operation" => operation
            )
            .increment(1);
            return Err(Error::Transport {
                operation: format!("llm_{operation}"),
                cause: "circuit breaker open".to_string(),
            });
        }

        let started = Instant::now();
        let result = call();
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut breaker = self
            .breaker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match &result {
            Ok(_) => {
                breaker.on_success();
                span.record("status", "success");
                tracing::debug!(elapsed_ms, "LLM call succeeded");
            },
            Err(err) if counts_as_failure(err) => {
                if breaker.on_failure() {
                    metrics::counter!(
                        "llm_circuit_breaker_trips_total",
                        "provider" => provider,
                        "operation" => operation
                    )
                    .increment(1);
                    tracing::warn!(
                        "LLM circuit breaker opened for provider={provider} operation={operation}"
                    );
                }
                span.record("status", "error");
            },
            Err(_) => {
                span.record("status", "rejected");
            },
        }
        drop(breaker);

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!(
            "llm_requests_total",
            "provider" => provider,
            "operation" => operation,
            "status" => status
        )
        .increment(1);

        result
    }
}

impl<P: LlmProvider> LlmProvider for ResilientLlmProvider<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        self.execute("complete", || self.inner.complete(prompt))
    }

    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        self.execute("complete_with_system", || {
            self.inner.complete_with_system(system, user)
        })
    }

    fn complete_json(&self, system: &str, user: &str) -> Result<String> {
        self.execute("complete_json", || self.inner.complete_json(system, user))
    }
}

/// Only service-side failures count toward opening the circuit.
const fn counts_as_failure(err: &Error) -> bool {
    matches!(
        err,
        Error::Transport { .. } | Error::MalformedResponse { .. }
    )
}
