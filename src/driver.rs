//! The enrichment driver: one sequential loop shared by every pipeline.
//!
//! Each unit is either skipped or sent to the source once, ending as
//! `Skipped`, `Success` or `Failed(tag)` before the next unit starts. Per-unit failures are recorded, never propagated. Progress is
//! flushed every `flush_interval` attempted units, once at the end, and from
//! a drop guard if the loop unwinds.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info, trace, warn};

use crate::checkpoint::FlushPolicy;
use crate::context::RunContext;
use crate::error::PersistenceError;
use crate::models::{FailureTag, Outcome, RunStats, UnitState};
use crate::progress::{create_progress_bar, log_progress};
use crate::work_unit::WorkKey;

/// Progress summary cadence, in attempted units
const PROGRESS_EVERY: usize = 10;

/// Skip log cadence, in skipped units
const SKIP_LOG_EVERY: usize = 50;

/// Log-only progress line cadence, in finished units
const LOG_ONLY_INTERVAL: u64 = 100;

/// One pipeline the driver can run: where units come from, how completion is
/// decided, how a unit is fetched, and how results are applied and persisted.
pub trait EnrichmentTask {
    type Unit: WorkKey;
    type Value;

    /// Label for progress output
    fn phase(&self) -> &str;

    /// All units in stable (document) order
    fn units(&self) -> Vec<Self::Unit>;

    fn is_complete(&self, unit: &Self::Unit) -> bool;

    fn fetch(&mut self, unit: &Self::Unit) -> Outcome<Self::Value>;

    /// Record the outcome in the in-memory state owned by the task
    fn apply(&mut self, unit: &Self::Unit, outcome: Outcome<Self::Value>);

    /// Persist the complete current state
    fn flush(&mut self) -> Result<(), PersistenceError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitReport {
    pub key: String,
    pub state: UnitState,
}

#[derive(Debug)]
pub struct RunReport {
    pub stats: RunStats,
    pub units: Vec<UnitReport>,
    /// Set when the end-of-run flush failed; earlier progress may be on disk
    pub final_flush_error: Option<PersistenceError>,
}

impl RunReport {
    pub fn state_of(&self, key: &str) -> Option<UnitState> {
        self.units.iter().find(|u| u.key == key).map(|u| u.state)
    }
}

/// Flushes the task if the loop unwinds before the final flush.
struct FlushGuard<'t, T: EnrichmentTask> {
    task: &'t mut T,
    armed: bool,
}

impl<T: EnrichmentTask> Drop for FlushGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Run interrupted, saving progress");
        match self.task.flush() {
            Ok(()) => info!("Progress saved after interruption"),
            Err(e) => error!("Emergency save failed: {}", e),
        }
    }
}

/// Run `task` to completion.
pub fn run<T: EnrichmentTask>(task: &mut T, ctx: &mut RunContext) -> RunReport {
    let units = task.units();
    let total = units.len();
    let phase = task.phase().to_string();
    let mode = ctx.config.progress;
    let policy = FlushPolicy::every(ctx.config.flush_interval);

    ctx.stats.total = total;
    info!(
        phase = %phase,
        units = total,
        flush_interval = policy.interval(),
        "Starting run"
    );

    let pb = create_progress_bar(total as u64, &phase, mode);
    let mut guard = FlushGuard { task, armed: true };
    let mut reports = Vec::with_capacity(total);

    for (i, unit) in units.iter().enumerate() {
        let state = process_unit(&mut *guard.task, unit, &mut ctx.stats);

        if state.was_attempted() {
            let attempted = ctx.stats.attempted();
            if policy.is_due(attempted) {
                pb.suspend(|| flush_checked(&mut *guard.task, &mut ctx.stats, "Intermediate"));
            }
            if attempted % PROGRESS_EVERY == 0 {
                let stats = &ctx.stats;
                pb.suspend(|| {
                    info!(
                        "Progress: {:.1}% | Processed: {} | Errors: {} | Skipped: {}",
                        100.0 * stats.finished() as f64 / total as f64,
                        stats.processed,
                        stats.errors,
                        stats.skipped
                    )
                });
            }
        } else if ctx.stats.skipped % SKIP_LOG_EVERY == 0 {
            debug!("Skipped {} completed units", ctx.stats.skipped);
        }

        reports.push(UnitReport {
            key: unit.key().to_string(),
            state,
        });
        pb.inc(1);
        log_progress(mode, &phase, (i + 1) as u64, total as u64, LOG_ONLY_INTERVAL);
    }

    guard.armed = false;
    let final_flush_error = match guard.task.flush() {
        Ok(()) => {
            ctx.stats.flushes += 1;
            debug!("Final save complete");
            None
        }
        Err(e) => {
            ctx.stats.flush_failures += 1;
            error!("Final save failed: {}", e);
            Some(e)
        }
    };

    ctx.stats.elapsed_seconds = ctx.elapsed().as_secs_f64();
    pb.finish_with_message(format!(
        "{}: {} processed, {} skipped, {} errors",
        phase, ctx.stats.processed, ctx.stats.skipped, ctx.stats.errors
    ));

    RunReport {
        stats: ctx.stats.clone(),
        units: reports,
        final_flush_error,
    }
}

fn process_unit<T: EnrichmentTask>(task: &mut T, unit: &T::Unit, stats: &mut RunStats) -> UnitState {
    if task.is_complete(unit) {
        stats.skipped += 1;
        return UnitState::Skipped;
    }

    trace!(unit = unit.key(), "In flight");
    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| task.fetch(unit))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            error!(
                unit = unit.key(),
                "Source call panicked: {}",
                panic_message(payload.as_ref())
            );
            Outcome::Failure(FailureTag::UnknownError)
        }
    };

    let state = match outcome.failure_tag() {
        None => {
            stats.processed += 1;
            UnitState::Success
        }
        Some(tag) => {
            stats.record_failure(tag);
            debug!(unit = unit.key(), tag = %tag, "Unit failed");
            UnitState::Failed(tag)
        }
    };

    task.apply(unit, outcome);
    state
}

/// Intermediate flush: a failure is logged and left for the next flush point.
fn flush_checked<T: EnrichmentTask>(task: &mut T, stats: &mut RunStats, label: &str) {
    match task.flush() {
        Ok(()) => {
            stats.flushes += 1;
            info!("{} save after {} units", label, stats.attempted());
        }
        Err(e) => {
            stats.flush_failures += 1;
            error!("{} save failed, will retry at next flush: {}", label, e);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
