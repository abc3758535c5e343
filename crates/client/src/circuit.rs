//! Failure circuit guarding the network.
//!
//! The circuit opens once `threshold` consecutive exchanges fail. While open,
//! only allow-listed action kinds reach the network. The cooldown is checked
//! lazily against `tokio::time::Instant`: the first observation after it
//! elapses closes the circuit optimistically without clearing the failure
//! count, so one more failure reopens it with a fresh cooldown.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::types::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Time left before an open circuit is retried.
    pub cooldown_remaining: Option<Duration>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    cooldown_deadline: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                cooldown_deadline: None,
            }),
        }
    }

    /// Current state, applying an elapsed cooldown first.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        Self::expire(&mut inner);
        inner.state
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Whether a request of `kind` may reach the network now.
    pub fn allows(&self, kind: ActionKind) -> bool {
        kind.allowed_when_circuit_open() || !self.is_open()
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::Open {
            info!("circuit closed after successful exchange");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.cooldown_deadline = None;
    }

    /// Count a failure. Returns `true` if the circuit is open afterwards.
    pub fn record_failure(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        if inner.consecutive_failures >= self.threshold {
            if inner.state == CircuitState::Closed {
                warn!(
                    failures = inner.consecutive_failures,
                    cooldown_ms = self.cooldown.as_millis() as u64,
                    "circuit opened"
                );
            }
            inner.state = CircuitState::Open;
            inner.cooldown_deadline = Some(Instant::now() + self.cooldown);
        }
        inner.state == CircuitState::Open
    }

    /// Close and clear everything. Used by the safety reset paths.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::Open || inner.consecutive_failures > 0 {
            info!(
                failures = inner.consecutive_failures,
                "circuit reset"
            );
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.cooldown_deadline = None;
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let mut inner = self.inner.lock();
        Self::expire(&mut inner);
        CircuitSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            cooldown_remaining: inner
                .cooldown_deadline
                .filter(|_| inner.state == CircuitState::Open)
                .map(|d| d.saturating_duration_since(Instant::now())),
        }
    }

    fn expire(inner: &mut Inner) {
        if inner.state != CircuitState::Open {
            return;
        }
        if let Some(deadline) = inner.cooldown_deadline {
            if Instant::now() >= deadline {
                info!("circuit cooldown elapsed; next request goes live");
                inner.state = CircuitState::Closed;
                inner.cooldown_deadline = None;
            }
        }
    }
}
