//! The server model: arrival loop, admission control, and the sync/async
//! service disciplines, built entirely out of the scheduler, resource and
//! process primitives in the sibling modules.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::executor::LocalSpawner;
use futures::future::Either;
use futures::task::LocalSpawnExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use crate::config::{ArrivalDist, CpuIoDist, ServerConfig, ServerMode};
use crate::engine::{sleep, Simulation};
use crate::error::{ConfigError, EngineError};
use crate::process::{race, spawn};
use crate::record::RequestRecord;
use crate::resource::Resource;
use crate::sampler::{sample_cpu_split, sample_interarrival, sample_time};
use crate::scheduler::Clock;

#[derive(Clone)]
struct ServerContext {
    clock: Clock,
    spawner: LocalSpawner,
    workers: Resource,
    io: Resource,
    records: Rc<RefCell<Vec<RequestRecord>>>,
    rng: Rc<RefCell<StdRng>>,
    in_system: Rc<Cell<u64>>,
    mode: ServerMode,
    cpu_mean_ms: f64,
    cpu_dist: CpuIoDist,
    io_mean_ms: f64,
    io_dist: CpuIoDist,
    timeout_ms: f64,
    warmup_ms: f64,
    max_in_system: u64,
}

/// Decrements a shared in-system counter on every exit path, including one
/// cut short by the simulation ending while the request is still live.
struct InSystemGuard(Rc<Cell<u64>>);

impl InSystemGuard {
    /// `max_in_system` is only used for the debug-mode admission invariant
    /// below — the arrival loop has already checked admission before
    /// constructing this guard, so the assertion should never fire on a
    /// correct build.
    fn new(counter: Rc<Cell<u64>>, max_in_system: u64) -> Self {
        let next = counter.get() + 1;
        debug_assert!(
            next <= max_in_system,
            "{}",
            EngineError::Invariant(format!(
                "in_system {next} exceeded max_in_system {max_in_system} on admission"
            ))
        );
        counter.set(next);
        Self(counter)
    }
}

impl Drop for InSystemGuard {
    fn drop(&mut self) {
        let current = self.0.get();
        debug_assert!(
            current > 0,
            "{}",
            EngineError::Invariant(format!("in_system underflow: decrementing from {current}"))
        );
        self.0.set(current.saturating_sub(1));
    }
}

/// Runs a single request's service body for the configured discipline.
/// Returns once the request has fully completed. Dropping this future
/// (losing the race against the timeout) releases whatever resource guard
/// or timer it was suspended on at that instant.
async fn service_body(ctx: ServerContext, cpu_total: f64, split: f64, io_time: f64) {
    let cpu_pre = cpu_total * split;
    let cpu_post = cpu_total * (1.0 - split);

    match ctx.mode {
        ServerMode::Sync => {
            let _worker = ctx.workers.acquire().await;
            if cpu_pre > 0.0 {
                sleep(&ctx.clock, cpu_pre).await;
            }
            if io_time > 0.0 {
                let _io_slot = ctx.io.acquire().await;
                sleep(&ctx.clock, io_time).await;
            }
            if cpu_post > 0.0 {
                sleep(&ctx.clock, cpu_post).await;
            }
            // worker guard releases here, after I/O — the defining trait
            // of the sync discipline.
        }
        ServerMode::Async => {
            if cpu_pre > 0.0 {
                let _worker = ctx.workers.acquire().await;
                sleep(&ctx.clock, cpu_pre).await;
            }
            // worker released before I/O begins.
            if io_time > 0.0 {
                let _io_slot = ctx.io.acquire().await;
                sleep(&ctx.clock, io_time).await;
            }
            if cpu_post > 0.0 {
                let _worker = ctx.workers.acquire().await;
                sleep(&ctx.clock, cpu_post).await;
            }
        }
    }
}

/// Services one admitted request, racing it against its timeout (unless
/// disabled), and pushes exactly one [`RequestRecord`] for it, gated on
/// warmup.
///
/// The service body runs as its own spawned process (`crate::process::spawn`,
/// not a bare future): this is the "inner service sub-process" spec.md §4.5.3
/// describes racing against the timeout. When the timeout wins, the service
/// process is the race's losing branch and is dropped, which interrupts it —
/// tearing down whatever resource guard or timer it was suspended on exactly
/// as an explicit `ProcessHandle::interrupt()` call would (dropping the
/// handle *is* the interrupt; see `process.rs`).
async fn request_process(
    ctx: ServerContext,
    req_id: u64,
    arrival_time: f64,
    cpu_total: f64,
    split: f64,
    io_time: f64,
) {
    let service = spawn(
        &ctx.spawner,
        service_body(ctx.clone(), cpu_total, split, io_time),
    );

    let record = if ctx.timeout_ms > 0.0 {
        let timeout = Box::pin(sleep(&ctx.clock, ctx.timeout_ms));
        match race(service, timeout).await {
            Either::Left(_service_output) => {
                let finish_time = ctx.clock.borrow().now();
                trace!(req_id, finish_time, "request completed");
                RequestRecord::completed(req_id, arrival_time, finish_time)
            }
            Either::Right(()) => {
                let finish_time = ctx.clock.borrow().now();
                debug!(req_id, arrival_time, "request timed out");
                RequestRecord::timed_out(req_id, arrival_time, finish_time, ctx.timeout_ms)
            }
        }
    } else {
        service.await;
        let finish_time = ctx.clock.borrow().now();
        trace!(req_id, finish_time, "request completed (no timeout configured)");
        RequestRecord::completed(req_id, arrival_time, finish_time)
    };

    if arrival_time >= ctx.warmup_ms {
        ctx.records.borrow_mut().push(record);
    }
}

/// Generates arrivals for the run's whole duration, applying admission
/// control and spawning one [`request_process`] per admitted request.
/// Runs forever from its own point of view; `Simulation::run_until` is
/// what actually bounds it.
async fn arrival_loop(ctx: ServerContext, rate_rps: f64, arrival_dist: ArrivalDist) {
    let mut req_id: u64 = 0;

    loop {
        let gap = {
            let mut rng = ctx.rng.borrow_mut();
            sample_interarrival(&mut rng, arrival_dist, rate_rps)
        };
        sleep(&ctx.clock, gap).await;

        let arrival_time = ctx.clock.borrow().now();
        req_id += 1;
        let this_id = req_id;

        if ctx.in_system.get() >= ctx.max_in_system {
            debug!(req_id = this_id, arrival_time, "request dropped, at capacity");
            ctx.records
                .borrow_mut()
                .push(RequestRecord::dropped(this_id, arrival_time));
            continue;
        }

        let (cpu_total, split, io_time) = {
            let mut rng = ctx.rng.borrow_mut();
            let cpu_total = sample_time(&mut rng, ctx.cpu_dist, ctx.cpu_mean_ms);
            let split = sample_cpu_split(&mut rng);
            let io_time = sample_time(&mut rng, ctx.io_dist, ctx.io_mean_ms);
            (cpu_total, split, io_time)
        };

        let guard = InSystemGuard::new(ctx.in_system.clone(), ctx.max_in_system);
        let child_ctx = ctx.clone();
        let body = async move {
            let _guard = guard;
            request_process(child_ctx, this_id, arrival_time, cpu_total, split, io_time).await;
        };
        ctx.spawner
            .spawn_local(body)
            .expect("executor dropped while spawning request process");
    }
}

/// Runs one simulation to completion and returns every request's record,
/// in arrival order. Rejects a structurally invalid `cfg` without
/// spawning anything.
pub fn simulate_server(cfg: ServerConfig) -> Result<Vec<RequestRecord>, ConfigError> {
    cfg.validate()?;

    let mut sim = Simulation::new();
    let ctx = ServerContext {
        clock: sim.clock().clone(),
        spawner: sim.spawner().clone(),
        workers: Resource::new(cfg.worker_capacity()),
        io: Resource::new(cfg.io_capacity()),
        records: Rc::new(RefCell::new(Vec::new())),
        rng: Rc::new(RefCell::new(StdRng::seed_from_u64(cfg.seed))),
        in_system: Rc::new(Cell::new(0)),
        mode: cfg.mode,
        cpu_mean_ms: cfg.cpu_mean_ms,
        cpu_dist: cfg.cpu_dist,
        io_mean_ms: cfg.io_mean_ms,
        io_dist: cfg.io_dist,
        timeout_ms: cfg.timeout_ms,
        warmup_ms: cfg.warmup_ms,
        max_in_system: cfg.max_in_system(),
    };
    let records = ctx.records.clone();

    sim.spawn_detached(arrival_loop(ctx, cfg.rate_rps, cfg.arrival_dist));
    sim.run_until(cfg.sim_duration_ms);

    Ok(records.borrow().clone())
}
