//! Completion predicates: decide whether a unit can be skipped.
//!
//! Two policies are in use:
//!
//! - Dataset enrichment: a track is done as soon as *any* enrichment key is
//!   present, even with a `null` value. Partial matches are not re-queried.
//! - Checkpoint lookups: a key is done as soon as it is present in the
//!   checkpoint, whether it holds a value or a failure tag (sticky failures),
//!   unless the run opts into retrying specific tags.

use std::collections::BTreeSet;

use crate::models::{Artist, CheckpointValue, FailureTag, Track};
use crate::work_unit::WorkUnit;

/// Field names recognised as enrichment output.
pub const ENRICHMENT_FIELDS: [&str; 6] = [
    "language",
    "release_date",
    "album_name",
    "producer_artists",
    "writer_artists",
    "featured_artists",
];

pub fn is_enriched(track: &Track) -> bool {
    track
        .enrichment_fields()
        .iter()
        .any(|(_, slot)| slot.is_some())
}

/// A unit is complete when every occurrence of its track id is enriched.
pub fn unit_is_complete(unit: &WorkUnit, artists: &[Artist]) -> bool {
    unit.tracks(artists).all(is_enriched)
}

/// Which checkpoint entries count as settled.
///
/// The default is sticky: every present key is settled, failures included,
/// until the entry is removed from the file. Tags listed in `retry_tags` are
/// treated as not yet done.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    retry_tags: BTreeSet<FailureTag>,
}

impl RetryPolicy {
    pub fn sticky() -> Self {
        Self::default()
    }

    pub fn retrying(tags: impl IntoIterator<Item = FailureTag>) -> Self {
        Self {
            retry_tags: tags.into_iter().collect(),
        }
    }

    pub fn is_sticky(&self) -> bool {
        self.retry_tags.is_empty()
    }

    pub fn retry_tags(&self) -> impl Iterator<Item = FailureTag> + '_ {
        self.retry_tags.iter().copied()
    }

    pub fn is_settled(&self, entry: Option<&CheckpointValue>) -> bool {
        match entry {
            None => false,
            Some(value) => match value.failure_tag() {
                None => true,
                Some(tag) => !self.retry_tags.contains(&tag),
            },
        }
    }
}
