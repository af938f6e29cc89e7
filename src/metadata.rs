//! Dataset enrichment from a metadata source.
//!
//! The dataset is both the work list and the checkpoint: a track counts as
//! done once any enrichment key is present, and flushing rewrites the
//! whole output file.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::completion::{is_enriched, unit_is_complete};
use crate::dataset::save_dataset;
use crate::driver::EnrichmentTask;
use crate::error::PersistenceError;
use crate::models::{Artist, Outcome, SongRecord};
use crate::source::MetadataSource;
use crate::work_unit::{track_units, WorkUnit};

pub struct MetadataTask<S> {
    artists: Vec<Artist>,
    source: S,
    output: PathBuf,
}

impl<S: MetadataSource> MetadataTask<S> {
    pub fn new(artists: Vec<Artist>, source: S, output: impl Into<PathBuf>) -> Self {
        Self {
            artists,
            source,
            output: output.into(),
        }
    }

    pub fn artists(&self) -> &[Artist] {
        &self.artists
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_parts(self) -> (Vec<Artist>, S) {
        (self.artists, self.source)
    }
}

impl<S: MetadataSource> EnrichmentTask for MetadataTask<S> {
    type Unit = WorkUnit;
    type Value = SongRecord;

    fn phase(&self) -> &str {
        "Enriching tracks"
    }

    fn units(&self) -> Vec<WorkUnit> {
        track_units(&self.artists)
    }

    fn is_complete(&self, unit: &WorkUnit) -> bool {
        unit_is_complete(unit, &self.artists)
    }

    fn fetch(&mut self, unit: &WorkUnit) -> Outcome<SongRecord> {
        let query = unit.query(&self.artists);
        self.source.song_info(&query)
    }

    /// Failures leave the tracks untouched so a later run retries them.
    /// Copies of the id that are already enriched keep exactly what they have.
    fn apply(&mut self, unit: &WorkUnit, outcome: Outcome<SongRecord>) {
        let Outcome::Success(song) = outcome else {
            return;
        };
        let mut filled = 0;
        for loc in &unit.locations {
            let track = &mut self.artists[loc.artist].tracks[loc.track];
            if !is_enriched(track) {
                filled += track.merge_enrichment(&song);
            }
        }
        debug!(track = %unit.key, fields = filled, "Merged metadata");
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        save_dataset(&self.output, &self.artists)
    }
}
