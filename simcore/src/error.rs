//! Error types. Configuration rejection is the only error surface exposed
//! to callers of [`crate::simulate_server`]; internal invariant violations
//! are bugs in this crate, not modeled outcomes, and are only ever produced
//! by debug assertions during development.

use thiserror::Error;

/// Rejects a [`ServerConfig`](crate::config::ServerConfig) before any
/// process is spawned.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("arrival rate must be positive, got {0}")]
    InvalidRate(f64),

    #[error("thread_count must be positive, got {0}")]
    InvalidThreadCount(i64),

    #[error("io_limit must be positive, got {0}")]
    InvalidIoLimit(i64),

    #[error("queue_limit must be non-negative, got {0}")]
    InvalidQueueLimit(i64),

    #[error("{field} must be non-negative, got {value}")]
    NegativeTime { field: &'static str, value: f64 },

    #[error("log-normal sigma must be positive, got {0}")]
    InvalidSigma(f64),

    #[error("burst_factor must be positive, got {0}")]
    InvalidBurstFactor(f64),

    #[error("burst_prob must be within [0, 1], got {0}")]
    InvalidBurstProb(f64),

    #[error("sim_duration_ms must be positive, got {0}")]
    InvalidDuration(f64),
}

/// Signals a violated internal invariant — `in_use` out of bounds,
/// `in_system` negative, an event scheduled in the past. These should never
/// surface from a valid workload; when they do, it is this crate's bug.
///
/// There is no `Result`-based path back to a caller for this error: a
/// violated invariant is checked with `assert!`/`debug_assert!` at the exact
/// point it would occur (`scheduler::EventScheduler::schedule`,
/// `resource::ResourceInner::try_admit` and `ResourceGuard::drop`,
/// `server::InSystemGuard`) and aborts there via its `Display` text, rather
/// than being propagated cooperatively like a [`ConfigError`] — propagating
/// it would mean continuing to run a simulation already known to be
/// corrupted.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}
