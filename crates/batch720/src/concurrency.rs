//! Concurrency planning
//!
//! Derives the admission ceiling (maximum number of simultaneously running
//! encode jobs) from the CPU core count and configuration.

use crate::config::Config;

/// Lowest accepted concurrency fraction
const MIN_FRACTION: f32 = 0.05;

/// Concurrency plan derived from configuration and system resources
#[derive(Debug, Clone, PartialEq)]
pub struct ConcurrencyPlan {
    /// Total logical CPU cores available
    pub total_cores: u32,
    /// Fraction of cores used, after clamping
    pub fraction: f32,
    /// Maximum number of concurrent encoding jobs
    pub max_concurrent_jobs: u32,
}

impl ConcurrencyPlan {
    /// Derive a concurrency plan from configuration
    ///
    /// - Detects CPU cores via num_cpus if not specified in config
    /// - Clamps `concurrency_fraction` to [0.05, 1.0]
    /// - `max_concurrent_jobs = ceil(cores * fraction)`, never below 1
    pub fn derive(cfg: &Config) -> Self {
        let total_cores = cfg
            .cpu
            .logical_cores
            .unwrap_or_else(|| num_cpus::get() as u32)
            .max(1);

        let fraction = clamp_fraction(cfg.cpu.concurrency_fraction);

        Self {
            total_cores,
            fraction,
            max_concurrent_jobs: admission_ceiling(total_cores, fraction),
        }
    }

    /// Replace the derived ceiling with an explicit job count (0 keeps the derived one)
    pub fn with_job_override(mut self, jobs: u32) -> Self {
        if jobs > 0 {
            self.max_concurrent_jobs = jobs;
        }
        self
    }
}

/// `ceil(cores * fraction)`, minimum 1
fn admission_ceiling(cores: u32, fraction: f32) -> u32 {
    // Snap away f32 representation error so 0.8 * 5 stays 4 rather than 4.0000001
    let raw = (cores as f64 * fraction as f64 * 1e3).round() / 1e3;
    (raw.ceil() as u32).max(1)
}

fn clamp_fraction(fraction: f32) -> f32 {
    if fraction.is_nan() {
        return 1.0;
    }
    fraction.clamp(MIN_FRACTION, 1.0)
}

/// Public function to derive a concurrency plan from configuration
pub fn derive_plan(cfg: &Config) -> ConcurrencyPlan {
    ConcurrencyPlan::derive(cfg)
}
