//! Thin CLI wrapper around `simcore::simulate_server`. Runs exactly one
//! simulation and prints its records; it does not sweep parameters,
//! aggregate results, or render charts — that layer lives outside this
//! repository.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use simcore::{ArrivalDist, CpuIoDist, ServerConfig, ServerMode};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Sync,
    Async,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TimeDistArg {
    Exponential,
    LogNormal,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ArrivalDistArg {
    Poisson,
    Bursty,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

/// Discrete-event simulation of a sync vs. async web server.
#[derive(Debug, Parser)]
#[command(name = "sim-cli", version, about)]
struct Args {
    #[arg(long, value_enum, default_value = "sync")]
    mode: ModeArg,

    #[arg(long, default_value_t = 8)]
    thread_count: i64,

    #[arg(long, default_value_t = 16)]
    io_limit: i64,

    /// Extra slots beyond the worker capacity a request may queue in
    /// before being dropped.
    #[arg(long, default_value_t = 1000)]
    queue_limit: i64,

    #[arg(long, default_value_t = 100.0)]
    rate_rps: f64,

    #[arg(long, value_enum, default_value = "poisson")]
    arrival_dist: ArrivalDistArg,

    #[arg(long, default_value_t = 5.0)]
    burst_factor: f64,

    #[arg(long, default_value_t = 0.1)]
    burst_prob: f64,

    #[arg(long, default_value_t = 5.0)]
    cpu_mean_ms: f64,

    #[arg(long, value_enum, default_value = "exponential")]
    cpu_dist: TimeDistArg,

    #[arg(long, default_value_t = 1.0)]
    cpu_lognorm_sigma: f64,

    #[arg(long, default_value_t = 10.0)]
    io_mean_ms: f64,

    #[arg(long, value_enum, default_value = "exponential")]
    io_dist: TimeDistArg,

    #[arg(long, default_value_t = 1.0)]
    io_lognorm_sigma: f64,

    /// `<= 0` disables the per-request timeout race entirely.
    #[arg(long, default_value_t = 1000.0)]
    timeout_ms: f64,

    #[arg(long, default_value_t = 0.0)]
    warmup_ms: f64,

    #[arg(long, default_value_t = 60_000.0)]
    sim_duration_ms: f64,

    #[arg(long, default_value_t = 1)]
    seed: u64,

    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,
}

fn build_config(args: &Args) -> ServerConfig {
    let cpu_dist = match args.cpu_dist {
        TimeDistArg::Exponential => CpuIoDist::Exponential,
        TimeDistArg::LogNormal => CpuIoDist::LogNormal {
            sigma: args.cpu_lognorm_sigma,
        },
    };
    let io_dist = match args.io_dist {
        TimeDistArg::Exponential => CpuIoDist::Exponential,
        TimeDistArg::LogNormal => CpuIoDist::LogNormal {
            sigma: args.io_lognorm_sigma,
        },
    };
    let arrival_dist = match args.arrival_dist {
        ArrivalDistArg::Poisson => ArrivalDist::Poisson,
        ArrivalDistArg::Bursty => ArrivalDist::Bursty {
            burst_factor: args.burst_factor,
            burst_prob: args.burst_prob,
        },
    };
    ServerConfig {
        mode: match args.mode {
            ModeArg::Sync => ServerMode::Sync,
            ModeArg::Async => ServerMode::Async,
        },
        thread_count: args.thread_count,
        io_limit: args.io_limit,
        queue_limit: args.queue_limit,
        rate_rps: args.rate_rps,
        arrival_dist,
        cpu_mean_ms: args.cpu_mean_ms,
        cpu_dist,
        io_mean_ms: args.io_mean_ms,
        io_dist,
        timeout_ms: args.timeout_ms,
        warmup_ms: args.warmup_ms,
        sim_duration_ms: args.sim_duration_ms,
        seed: args.seed,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let cfg = build_config(&args);

    let records = simcore::simulate_server(cfg).context("invalid simulation configuration")?;

    match args.format {
        OutputFormat::Json => {
            for record in &records {
                println!("{}", serde_json::to_string(record)?);
            }
        }
        OutputFormat::Table => {
            println!(
                "{:>8} {:>12} {:>10} {:>12}",
                "req_id", "arrival_ms", "status", "latency_ms"
            );
            for record in &records {
                println!(
                    "{:>8} {:>12.3} {:>10?} {:>12.3}",
                    record.req_id, record.arrival_time, record.status, record.latency_ms
                );
            }
        }
    }

    Ok(())
}
