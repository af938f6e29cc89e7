//! Run-scoped configuration and counters, passed explicitly to the driver.

use std::time::{Duration, Instant};

use crate::completion::RetryPolicy;
use crate::models::RunStats;
use crate::progress::ProgressMode;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Options for one run. Built by each binary from its command line.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Flush after this many attempted units (0 = only at the end)
    pub flush_interval: usize,
    /// Upper bound for every wait on an external call
    pub timeout: Duration,
    pub progress: ProgressMode,
    pub retry: RetryPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            flush_interval: 50,
            timeout: DEFAULT_TIMEOUT,
            progress: ProgressMode::Bars,
            retry: RetryPolicy::sticky(),
        }
    }
}

/// State that lives exactly as long as one run.
#[derive(Debug)]
pub struct RunContext {
    pub config: RunConfig,
    pub stats: RunStats,
    started: Instant,
}

impl RunContext {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            stats: RunStats::default(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
