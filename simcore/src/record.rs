//! Per-request output record. Field shapes and the status encoding are
//! part of this crate's external contract — every field is always
//! populated, regardless of outcome.

/// Terminal outcome of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestStatus {
    Completed = 0,
    Timeout = 1,
    Dropped = 2,
}

#[cfg(feature = "serde")]
impl serde::Serialize for RequestStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

/// One row of simulation output: what happened to a single request.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RequestRecord {
    pub req_id: u64,
    pub arrival_time: f64,
    pub finish_time: f64,
    pub latency_ms: f64,
    pub status: RequestStatus,
}

impl RequestRecord {
    /// `(req_id, now, now, 0, dropped)` — a dropped arrival never begins
    /// service, so its finish time is its arrival time and its latency is
    /// zero.
    pub fn dropped(req_id: u64, now: f64) -> Self {
        Self {
            req_id,
            arrival_time: now,
            finish_time: now,
            latency_ms: 0.0,
            status: RequestStatus::Dropped,
        }
    }

    /// `latency_ms` is always exactly `timeout_ms`, the configured budget
    /// — not the elapsed wall-clock-analog time, which is redundant with
    /// it by construction (the timer fires at `arrival_time + timeout_ms`).
    pub fn timed_out(req_id: u64, arrival_time: f64, finish_time: f64, timeout_ms: f64) -> Self {
        Self {
            req_id,
            arrival_time,
            finish_time,
            latency_ms: timeout_ms,
            status: RequestStatus::Timeout,
        }
    }

    pub fn completed(req_id: u64, arrival_time: f64, finish_time: f64) -> Self {
        Self {
            req_id,
            arrival_time,
            finish_time,
            latency_ms: finish_time - arrival_time,
            status: RequestStatus::Completed,
        }
    }
}
