//! Connection state machine.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::{RetryBudget, RetryPolicy};

/// Connection state of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection has been attempted, or it was closed on shutdown.
    Disconnected,
    /// The first connection attempt is in flight.
    Connecting,
    /// A connection is established and usable.
    Ready,
    /// The connection failed or dropped; retrying within the budget.
    Reconnecting,
    /// The retry budget is exhausted. Terminal for the process lifetime.
    Failed,
}

impl ConnectionState {
    /// Lowercase name used in logs and health output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }

    /// Numeric value for the state gauge.
    pub fn as_gauge(&self) -> f64 {
        match self {
            Self::Disconnected => 0.0,
            Self::Connecting => 1.0,
            Self::Ready => 2.0,
            Self::Reconnecting => 3.0,
            Self::Failed => 4.0,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connectivity events that drive the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection attempt is starting.
    Connect,
    /// The connection is established.
    Ready,
    /// A connection attempt failed or an established connection dropped.
    Error(String),
    /// The connection was closed deliberately.
    Closed,
}

/// Result of applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    /// Backoff to wait before the next attempt, when one is allowed.
    pub retry_in: Option<Duration>,
}

impl Transition {
    fn stay(state: ConnectionState) -> Self {
        Self {
            from: state,
            to: state,
            retry_in: None,
        }
    }

    /// Returns true if the state changed.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug)]
struct Inner {
    state: ConnectionState,
    budget: RetryBudget,
    last_error: Option<String>,
}

/// Owns the connection state and the retry budget.
///
/// [`handle`](Self::handle) is the only way to change state; everything else
/// is a read.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    inner: Mutex<Inner>,
}

impl ConnectionLifecycle {
    /// Creates a lifecycle in the `Disconnected` state.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                budget: RetryBudget::new(policy),
                last_error: None,
            }),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Returns the number of consecutive failed connection attempts.
    pub fn failed_attempts(&self) -> u32 {
        self.inner.lock().budget.attempts()
    }

    /// Returns the most recent error reason.
    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }

    /// Applies an event and returns the resulting transition.
    pub fn handle(&self, event: ConnectionEvent) -> Transition {
        use ConnectionState::*;

        let mut inner = self.inner.lock();
        let from = inner.state;

        let transition = match (from, event) {
            (Failed, _) => Transition::stay(Failed),

            (Disconnected, ConnectionEvent::Connect) => Transition {
                from,
                to: Connecting,
                retry_in: None,
            },
            (Connecting | Reconnecting | Ready, ConnectionEvent::Connect) => Transition::stay(from),

            (Connecting | Reconnecting | Disconnected, ConnectionEvent::Ready) => {
                inner.budget.reset();
                inner.last_error = None;
                Transition {
                    from,
                    to: Ready,
                    retry_in: None,
                }
            },
            (Ready, ConnectionEvent::Ready) => Transition::stay(Ready),

            // Un attempt fallido consume budget
            (Connecting | Reconnecting, ConnectionEvent::Error(reason)) => {
                inner.last_error = Some(reason);
                match inner.budget.record_failure() {
                    Some(delay) => Transition {
                        from,
                        to: Reconnecting,
                        retry_in: Some(delay),
                    },
                    None => Transition {
                        from,
                        to: Failed,
                        retry_in: None,
                    },
                }
            },
            // A dropped connection reconnects immediately; the next attempt is budgeted.
            (Ready, ConnectionEvent::Error(reason)) => {
                inner.last_error = Some(reason);
                Transition {
                    from,
                    to: Reconnecting,
                    retry_in: Some(Duration::ZERO),
                }
            },
            (Disconnected, ConnectionEvent::Error(reason)) => {
                inner.last_error = Some(reason);
                Transition::stay(Disconnected)
            },

            (_, ConnectionEvent::Closed) => Transition {
                from,
                to: Disconnected,
                retry_in: None,
            },
        };

        inner.state = transition.to;
        let attempts = inner.budget.attempts();
        let last_error = inner.last_error.clone();
        drop(inner);

        log_transition(&transition, attempts, last_error.as_deref());
        transition
    }
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

fn log_transition(transition: &Transition, attempts: u32, last_error: Option<&str>) {
    if !transition.changed() {
        debug!(state = %transition.to, "Connection state unchanged");
        return;
    }

    match transition.to {
        ConnectionState::Ready => info!(from = %transition.from, "Store connection ready"),
        ConnectionState::Reconnecting => warn!(
            from = %transition.from,
            attempts,
            retry_in_ms = transition.retry_in.map(|d| d.as_millis() as u64),
            error = last_error.unwrap_or("unknown"),
            "Store connection lost, reconnecting"
        ),
        ConnectionState::Failed => error!(
            attempts,
            error = last_error.unwrap_or("unknown"),
            "Store retry budget exhausted, caching disabled for this process"
        ),
        ConnectionState::Connecting => debug!("Connecting to store"),
        ConnectionState::Disconnected => info!(from = %transition.from, "Store connection closed"),
    }
}
