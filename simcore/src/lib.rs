//! Discrete-event simulation core: a virtual-time scheduler, a bounded
//! FIFO resource, a cooperative process abstraction, stochastic workload
//! samplers, and a web server model built from those four, comparing a
//! synchronous and an asynchronous service discipline.
//!
//! Everything here runs on a single thread against a virtual clock — there
//! is no wall-clock wait and no OS thread anywhere in this crate.

pub mod config;
pub mod engine;
pub mod error;
pub mod process;
pub mod record;
pub mod resource;
pub mod sampler;
pub mod scheduler;
mod server;

pub use config::{ArrivalDist, CpuIoDist, ServerConfig, ServerMode};
pub use engine::{sleep, Simulation};
pub use error::{ConfigError, EngineError};
pub use process::{race, spawn, ProcessHandle};
pub use record::{RequestRecord, RequestStatus};
pub use resource::{Acquire, Resource, ResourceGuard};
pub use scheduler::{CancelToken, Clock, EventScheduler, VirtualTime};
pub use server::simulate_server;
