//! Play-count scraping with a resumable checkpoint.
//!
//! Each track id is looked up on its public track page. Results and failure
//! tags go into the checkpoint mapping; a key that is already present is
//! skipped (see [`RetryPolicy`] for the opt-in exception).

use std::time::Duration;
use tracing::{info, warn};

use crate::checkpoint::{CheckpointMap, CheckpointStore};
use crate::completion::RetryPolicy;
use crate::context::RunConfig;
use crate::driver::EnrichmentTask;
use crate::error::{PageError, PersistenceError};
use crate::models::{Artist, CheckpointValue, FailureTag, Outcome};
use crate::normalize::parse_count_text;
use crate::source::PageDriver;
use crate::work_unit::{track_units, WorkUnit};

pub const PLAYCOUNT_SELECTOR: &str = r#"[data-testid="playcount"]"#;

pub fn track_url(track_id: &str) -> String {
    format!("https://open.spotify.com/track/{}", track_id)
}

/// Load the track page and read its play counter.
///
/// Navigation failure is `LOAD_ERROR`, an expired wait is `TIMEOUT`, a
/// missing element or non-numeric text is `PARSE_ERROR`.
pub fn fetch_playcount<D: PageDriver + ?Sized>(
    driver: &mut D,
    track_id: &str,
    timeout: Duration,
) -> Outcome<u64> {
    if let Err(e) = driver.navigate(&track_url(track_id)) {
        warn!(track = track_id, "Page load failed: {}", e);
        return Outcome::Failure(FailureTag::LoadError);
    }

    let text = match driver.wait_for(PLAYCOUNT_SELECTOR, timeout) {
        Ok(text) => text,
        Err(PageError::Timeout { .. }) => {
            warn!(track = track_id, "Timed out waiting for play counter");
            return Outcome::Failure(FailureTag::Timeout);
        }
        Err(PageError::NoSuchElement(_)) => {
            warn!(track = track_id, "Play counter element missing");
            return Outcome::Failure(FailureTag::ParseError);
        }
        Err(e) => {
            warn!(track = track_id, "Unexpected page error: {}", e);
            return Outcome::Failure(FailureTag::UnknownError);
        }
    };

    match parse_count_text(&text) {
        Some(count) => {
            info!(track = track_id, "Play count: {}", count);
            Outcome::Success(count)
        }
        None => {
            warn!(track = track_id, "Unparseable play counter: {:?}", text);
            Outcome::Failure(FailureTag::ParseError)
        }
    }
}

/// Driver task: one unit per distinct track id, results into the checkpoint.
pub struct PlaycountTask<D> {
    units: Vec<WorkUnit>,
    counts: CheckpointMap,
    store: CheckpointStore,
    driver: D,
    retry: RetryPolicy,
    timeout: Duration,
    cached_at_start: usize,
}

impl<D: PageDriver> PlaycountTask<D> {
    /// Takes the retry policy and the counter wait from `config`.
    pub fn new(
        artists: &[Artist],
        store: CheckpointStore,
        counts: CheckpointMap,
        driver: D,
        config: &RunConfig,
    ) -> Self {
        let cached_at_start = counts.len();
        Self {
            units: track_units(artists),
            counts,
            store,
            driver,
            retry: config.retry.clone(),
            timeout: config.timeout,
            cached_at_start,
        }
    }

    pub fn counts(&self) -> &CheckpointMap {
        &self.counts
    }

    pub fn cached_at_start(&self) -> usize {
        self.cached_at_start
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_counts(self) -> CheckpointMap {
        self.counts
    }
}

impl<D: PageDriver> EnrichmentTask for PlaycountTask<D> {
    type Unit = WorkUnit;
    type Value = u64;

    fn phase(&self) -> &str {
        "Fetching play counts"
    }

    fn units(&self) -> Vec<WorkUnit> {
        self.units.clone()
    }

    fn is_complete(&self, unit: &WorkUnit) -> bool {
        self.retry.is_settled(self.counts.get(&unit.key))
    }

    fn fetch(&mut self, unit: &WorkUnit) -> Outcome<u64> {
        fetch_playcount(&mut self.driver, &unit.key, self.timeout)
    }

    fn apply(&mut self, unit: &WorkUnit, outcome: Outcome<u64>) {
        self.counts
            .insert(unit.key.clone(), CheckpointValue::from(outcome));
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        self.store.flush(&self.counts)
    }
}
