//! Configuration surface for a single simulation run.

use crate::error::ConfigError;

/// Service discipline under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// Thread-pool workers that hold their worker slot for the full
    /// request, including I/O wait.
    Sync,
    /// A single event-loop worker slot, released during I/O wait and
    /// reacquired after — concurrency during I/O comes entirely from
    /// `io_limit`, not from the worker count.
    Async,
}

/// Distribution family for CPU and I/O service times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CpuIoDist {
    Exponential,
    LogNormal { sigma: f64 },
}

/// Distribution family for request inter-arrival times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArrivalDist {
    Poisson,
    /// With probability `burst_prob`, draw the next gap at rate
    /// `rate_rps * burst_factor` instead of the base `rate_rps`.
    Bursty { burst_factor: f64, burst_prob: f64 },
}

/// All parameters needed to run one simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub mode: ServerMode,
    pub thread_count: i64,
    pub io_limit: i64,
    /// Extra slots beyond `worker_capacity()` a request may wait in before
    /// being dropped. `max_in_system = worker_capacity() + queue_limit`.
    pub queue_limit: i64,
    pub rate_rps: f64,
    pub arrival_dist: ArrivalDist,
    pub cpu_mean_ms: f64,
    pub cpu_dist: CpuIoDist,
    pub io_mean_ms: f64,
    pub io_dist: CpuIoDist,
    /// `<= 0` disables the per-request timeout race entirely: a request
    /// always either completes or is dropped on admission.
    pub timeout_ms: f64,
    pub warmup_ms: f64,
    pub sim_duration_ms: f64,
    pub seed: u64,
}

impl ServerConfig {
    /// Reject structurally invalid configurations before any process is
    /// spawned. Never panics; every rejection is a typed
    /// [`ConfigError`] variant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_count <= 0 {
            return Err(ConfigError::InvalidThreadCount(self.thread_count));
        }
        if self.io_limit <= 0 {
            return Err(ConfigError::InvalidIoLimit(self.io_limit));
        }
        if self.queue_limit < 0 {
            return Err(ConfigError::InvalidQueueLimit(self.queue_limit));
        }
        if self.rate_rps <= 0.0 {
            return Err(ConfigError::InvalidRate(self.rate_rps));
        }
        if self.cpu_mean_ms < 0.0 {
            return Err(ConfigError::NegativeTime {
                field: "cpu_mean_ms",
                value: self.cpu_mean_ms,
            });
        }
        if self.io_mean_ms < 0.0 {
            return Err(ConfigError::NegativeTime {
                field: "io_mean_ms",
                value: self.io_mean_ms,
            });
        }
        if self.warmup_ms < 0.0 {
            return Err(ConfigError::NegativeTime {
                field: "warmup_ms",
                value: self.warmup_ms,
            });
        }
        if self.sim_duration_ms <= 0.0 {
            return Err(ConfigError::InvalidDuration(self.sim_duration_ms));
        }
        for dist in [self.cpu_dist, self.io_dist] {
            if let CpuIoDist::LogNormal { sigma } = dist {
                if sigma <= 0.0 {
                    return Err(ConfigError::InvalidSigma(sigma));
                }
            }
        }
        if let ArrivalDist::Bursty {
            burst_factor,
            burst_prob,
        } = self.arrival_dist
        {
            if burst_factor <= 0.0 {
                return Err(ConfigError::InvalidBurstFactor(burst_factor));
            }
            if !(0.0..=1.0).contains(&burst_prob) {
                return Err(ConfigError::InvalidBurstProb(burst_prob));
            }
        }
        Ok(())
    }

    /// Number of concurrent worker slots: the full thread pool in sync
    /// mode, or exactly one event-loop slot in async mode.
    pub fn worker_capacity(&self) -> u64 {
        match self.mode {
            ServerMode::Sync => self.thread_count as u64,
            ServerMode::Async => 1,
        }
    }

    /// Number of concurrent I/O slots.
    pub fn io_capacity(&self) -> u64 {
        self.io_limit as u64
    }

    /// Admission ceiling: in-service workers plus the allowed queue depth.
    pub fn max_in_system(&self) -> u64 {
        self.worker_capacity() + self.queue_limit as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ServerConfig {
        ServerConfig {
            mode: ServerMode::Sync,
            thread_count: 4,
            io_limit: 8,
            queue_limit: 16,
            rate_rps: 100.0,
            arrival_dist: ArrivalDist::Poisson,
            cpu_mean_ms: 5.0,
            cpu_dist: CpuIoDist::Exponential,
            io_mean_ms: 10.0,
            io_dist: CpuIoDist::Exponential,
            timeout_ms: 500.0,
            warmup_ms: 0.0,
            sim_duration_ms: 10_000.0,
            seed: 1,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn zero_rate_is_rejected() {
        let mut cfg = base_config();
        cfg.rate_rps = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidRate(0.0)));
    }

    #[test]
    fn nonpositive_thread_count_is_rejected() {
        let mut cfg = base_config();
        cfg.thread_count = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidThreadCount(0)));
    }

    #[test]
    fn negative_sigma_is_rejected() {
        let mut cfg = base_config();
        cfg.cpu_dist = CpuIoDist::LogNormal { sigma: -1.0 };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidSigma(-1.0)));
    }

    #[test]
    fn nonpositive_burst_factor_is_rejected() {
        let mut cfg = base_config();
        cfg.arrival_dist = ArrivalDist::Bursty {
            burst_factor: 0.0,
            burst_prob: 0.1,
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidBurstFactor(0.0)));
    }

    #[test]
    fn out_of_range_burst_prob_is_rejected() {
        let mut cfg = base_config();
        cfg.arrival_dist = ArrivalDist::Bursty {
            burst_factor: 5.0,
            burst_prob: 1.5,
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidBurstProb(1.5)));
    }

    #[test]
    fn nonpositive_timeout_disables_the_timer_and_is_not_an_error() {
        let mut cfg = base_config();
        cfg.timeout_ms = 0.0;
        assert!(cfg.validate().is_ok());
        cfg.timeout_ms = -1.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn async_worker_capacity_is_always_one() {
        let mut cfg = base_config();
        cfg.mode = ServerMode::Async;
        cfg.thread_count = 16;
        assert_eq!(cfg.worker_capacity(), 1);
    }

    #[test]
    fn max_in_system_is_worker_capacity_plus_queue_limit() {
        let cfg = base_config();
        assert_eq!(cfg.max_in_system(), cfg.worker_capacity() + 16);
    }
}
