//! Stochastic workload samplers.
//!
//! One seeded `StdRng` drives every draw for a run. Draw order is fixed so
//! that two runs with the same seed and config produce bit-identical
//! traces: per request, CPU time, then the pre/post split fraction, then
//! I/O time; for arrivals, the next inter-arrival gap (and, for the bursty
//! distribution, the burst/base rate coin flip immediately before it).

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Exp, LogNormal};

use crate::config::{ArrivalDist, CpuIoDist};

/// Draw a service time in milliseconds from the configured distribution.
pub fn sample_time(rng: &mut StdRng, dist: CpuIoDist, mean_ms: f64) -> f64 {
    match dist {
        CpuIoDist::Exponential => {
            let rate = 1.0 / mean_ms;
            Exp::new(rate)
                .expect("validated config guarantees rate > 0")
                .sample(rng)
        }
        CpuIoDist::LogNormal { sigma } => {
            // Parameterize so the distribution's mean equals `mean_ms`:
            // for LogNormal(mu, sigma), mean = exp(mu + sigma^2/2).
            let mu = mean_ms.ln() - sigma * sigma / 2.0;
            LogNormal::new(mu, sigma)
                .expect("validated config guarantees finite mu/sigma")
                .sample(rng)
        }
    }
}

/// Draw the fraction of CPU time spent before the I/O wait (the remainder
/// runs after). Uniform over `[0, 1]`.
pub fn sample_cpu_split(rng: &mut StdRng) -> f64 {
    rng.gen_range(0.0..1.0)
}

fn exponential_gap_ms(rng: &mut StdRng, rate_rps: f64) -> f64 {
    let rate_per_ms = rate_rps / 1000.0;
    Exp::new(rate_per_ms)
        .expect("validated config guarantees rate_rps > 0")
        .sample(rng)
}

/// Draw the gap in milliseconds until the next arrival.
pub fn sample_interarrival(rng: &mut StdRng, dist: ArrivalDist, rate_rps: f64) -> f64 {
    match dist {
        ArrivalDist::Poisson => exponential_gap_ms(rng, rate_rps),
        ArrivalDist::Bursty {
            burst_factor,
            burst_prob,
        } => {
            let in_burst = rng.gen_bool(burst_prob);
            let rate = if in_burst {
                rate_rps * burst_factor
            } else {
                rate_rps
            };
            exponential_gap_ms(rng, rate)
        }
    }
}
