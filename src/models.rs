//! Core data models for the enrichment pipeline.
//!
//! This module contains the dataset records (artists and their tracks),
//! the checkpoint value and failure tag types, the uniform `Outcome` returned
//! by source clients, and per-run statistics.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::progress::format_duration;

// ============================================================================
// Dataset Models
// ============================================================================

/// Artist record as stored in the dataset file.
///
/// Keys this crate does not know about are kept in `extra` so a load/save
/// cycle never drops data written by other tools. Optional keys that were
/// absent on load stay absent on save.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<i32>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One enrichment slot. `None` means the key is absent, `Some(None)` means
/// the key is present with a JSON `null`.
pub type EnrichmentField = Option<Option<String>>;

/// Track record. `id` is the catalog-assigned id and the only identity used
/// for dedup and checkpoint keys.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<i32>,

    // Enrichment fields (additive-only, never overwritten once present)
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub language: EnrichmentField,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub release_date: EnrichmentField,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub album_name: EnrichmentField,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub producer_artists: EnrichmentField,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub writer_artists: EnrichmentField,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub featured_artists: EnrichmentField,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Any key that reaches the deserializer was present, `null` included.
fn present<'de, D>(deserializer: D) -> Result<EnrichmentField, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl Track {
    /// Enrichment slots paired with their on-disk names.
    pub fn enrichment_fields(&self) -> [(&'static str, &EnrichmentField); 6] {
        [
            ("language", &self.language),
            ("release_date", &self.release_date),
            ("album_name", &self.album_name),
            ("producer_artists", &self.producer_artists),
            ("writer_artists", &self.writer_artists),
            ("featured_artists", &self.featured_artists),
        ]
    }

    /// Fill every enrichment key that is still absent from `song`. Keys
    /// holding `null` count as present. Returns the number of keys set.
    pub fn merge_enrichment(&mut self, song: &SongRecord) -> usize {
        fn fill(slot: &mut EnrichmentField, value: &str) -> usize {
            if slot.is_some() {
                return 0;
            }
            *slot = Some(Some(value.to_string()));
            1
        }

        fill(&mut self.language, &song.language)
            + fill(&mut self.release_date, &song.release_date)
            + fill(&mut self.album_name, &song.album_name)
            + fill(&mut self.producer_artists, &song.producer_artists)
            + fill(&mut self.writer_artists, &song.writer_artists)
            + fill(&mut self.featured_artists, &song.featured_artists)
    }
}

/// Metadata returned by the lyrics/metadata API for one song.
/// Missing values are already replaced by [`NOT_AVAILABLE`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SongRecord {
    pub language: String,
    pub release_date: String,
    pub album_name: String,
    pub producer_artists: String,
    pub writer_artists: String,
    pub featured_artists: String,
}

/// Placeholder written for a field the metadata source did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

// ============================================================================
// Failure Tags and Outcomes
// ============================================================================

/// Classification of a failed work unit. Serialized as the upper-case tag
/// string in checkpoint files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureTag {
    /// Page navigation, network or HTTP status failure
    LoadError,
    /// Bounded wait expired
    Timeout,
    /// Expected element missing or payload malformed
    ParseError,
    /// Source answered but had no match for the query
    NotFound,
    UnknownError,
}

impl FailureTag {
    pub const ALL: [FailureTag; 5] = [
        FailureTag::LoadError,
        FailureTag::Timeout,
        FailureTag::ParseError,
        FailureTag::NotFound,
        FailureTag::UnknownError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FailureTag::LoadError => "LOAD_ERROR",
            FailureTag::Timeout => "TIMEOUT",
            FailureTag::ParseError => "PARSE_ERROR",
            FailureTag::NotFound => "NOT_FOUND",
            FailureTag::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for FailureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown failure tag '{0}' (expected one of LOAD_ERROR, TIMEOUT, PARSE_ERROR, NOT_FOUND, UNKNOWN_ERROR)")]
pub struct ParseFailureTagError(String);

impl FromStr for FailureTag {
    type Err = ParseFailureTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        FailureTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == wanted)
            .ok_or_else(|| ParseFailureTagError(s.to_string()))
    }
}

/// Uniform result of one source-client call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Success(T),
    Failure(FailureTag),
}

impl<T> Outcome<T> {
    pub fn failure_tag(&self) -> Option<FailureTag> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(tag) => Some(*tag),
        }
    }
}

/// Last known result for a checkpoint key: a count or a failure tag.
/// JSON form is a bare number or the tag string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckpointValue {
    Count(u64),
    Failed(FailureTag),
}

impl CheckpointValue {
    pub fn failure_tag(&self) -> Option<FailureTag> {
        match self {
            CheckpointValue::Count(_) => None,
            CheckpointValue::Failed(tag) => Some(*tag),
        }
    }
}

impl From<Outcome<u64>> for CheckpointValue {
    fn from(outcome: Outcome<u64>) -> Self {
        match outcome {
            Outcome::Success(count) => CheckpointValue::Count(count),
            Outcome::Failure(tag) => CheckpointValue::Failed(tag),
        }
    }
}

// ============================================================================
// Unit States
// ============================================================================

/// Terminal state of one unit after the driver has handled it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitState {
    Skipped,
    Success,
    Failed(FailureTag),
}

impl UnitState {
    /// True when the unit went through a source call.
    pub fn was_attempted(self) -> bool {
        matches!(self, UnitState::Success | UnitState::Failed(_))
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters for one run. Reset per invocation, never merged into the dataset.
#[derive(Default, Debug, Clone, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub failures_by_tag: BTreeMap<FailureTag, usize>,

    // Persistence
    pub flushes: usize,
    pub flush_failures: usize,

    // Timing
    pub elapsed_seconds: f64,
}

impl RunStats {
    pub fn record_failure(&mut self, tag: FailureTag) {
        self.errors += 1;
        *self.failures_by_tag.entry(tag).or_default() += 1;
    }

    /// Units that reached a source call (success or classified failure)
    pub fn attempted(&self) -> usize {
        self.processed + self.errors
    }

    /// Units that reached a terminal state so far
    pub fn finished(&self) -> usize {
        self.attempted() + self.skipped
    }

    /// Units per second over the whole run
    pub fn throughput(&self) -> f64 {
        if self.elapsed_seconds <= 0.0 {
            0.0
        } else {
            self.finished() as f64 / self.elapsed_seconds
        }
    }

    /// Print the end-of-run summary block to stdout.
    pub fn print_summary(&self, title: &str) {
        println!("\n{:=<60}", "");
        println!("{}", title);
        println!("  Units: {}", self.total);
        println!("  Skipped: {}", self.skipped);
        println!("  Processed: {}", self.processed);
        println!("  Errors: {}", self.errors);
        for (tag, count) in &self.failures_by_tag {
            println!("    {}: {}", tag, count);
        }
        println!(
            "  Flushes: {} ({} failed)",
            self.flushes, self.flush_failures
        );
        println!(
            "  Elapsed: {} ({:.2} units/sec)",
            format_duration(Duration::from_secs_f64(self.elapsed_seconds)),
            self.throughput()
        );
        println!("{:=<60}", "");
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song() -> SongRecord {
        SongRecord {
            language: "en".to_string(),
            release_date: "2001-05-01".to_string(),
            album_name: "Album".to_string(),
            producer_artists: "P1, P2".to_string(),
            writer_artists: "W".to_string(),
            featured_artists: NOT_AVAILABLE.to_string(),
        }
    }

    #[test]
    fn test_merge_fills_only_missing_fields() {
        let mut track = Track {
            id: "t1".to_string(),
            name: "Song".to_string(),
            album_name: Some(Some("Original Album".to_string())),
            release_date: Some(None),
            ..Default::default()
        };
        assert_eq!(track.merge_enrichment(&song()), 4);
        assert_eq!(track.album_name, Some(Some("Original Album".to_string())));
        assert_eq!(track.release_date, Some(None));
        assert_eq!(track.language, Some(Some("en".to_string())));

        // Second merge is a no-op
        assert_eq!(track.merge_enrichment(&song()), 0);
    }

    #[test]
    fn test_track_keeps_unknown_keys() {
        let json = r#"{"id":"t1","name":"Song","duration_ms":1000,"popularity":50,"isrc":"X1","language":"en"}"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.language, Some(Some("en".to_string())));
        assert_eq!(track.extra.get("isrc"), Some(&Value::from("X1")));

        let back = serde_json::to_value(&track).unwrap();
        assert_eq!(back["isrc"], "X1");
        assert_eq!(back["language"], "en");
        assert!(back.get("album_name").is_none());
    }

    #[test]
    fn test_null_and_missing_keys_round_trip_unchanged() {
        let json = r#"{"id":"t1","name":"Song","language":null,"isrc":"X1"}"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.language, Some(None));
        assert_eq!(track.album_name, None);
        assert_eq!(track.duration_ms, None);
        assert_eq!(track.popularity, None);

        let back = serde_json::to_value(&track).unwrap();
        assert_eq!(back, serde_json::from_str::<Value>(json).unwrap());

        let artist: Artist = serde_json::from_str(r#"{"id":"a1","name":"Band","tracks":[]}"#).unwrap();
        let back = serde_json::to_value(&artist).unwrap();
        assert!(back.get("genre").is_none());
        assert!(back.get("popularity").is_none());
    }

    #[test]
    fn test_checkpoint_value_json_forms() {
        let count: CheckpointValue = serde_json::from_str("12345").unwrap();
        assert_eq!(count, CheckpointValue::Count(12345));

        let tag: CheckpointValue = serde_json::from_str("\"TIMEOUT\"").unwrap();
        assert_eq!(tag, CheckpointValue::Failed(FailureTag::Timeout));

        assert!(serde_json::from_str::<CheckpointValue>("\"SOMETHING\"").is_err());
        assert!(serde_json::from_str::<CheckpointValue>("-4").is_err());
        assert!(serde_json::from_str::<CheckpointValue>("1.5").is_err());
    }

    #[test]
    fn test_failure_tag_from_str() {
        assert_eq!("timeout".parse::<FailureTag>().unwrap(), FailureTag::Timeout);
        assert_eq!(" LOAD_ERROR ".parse::<FailureTag>().unwrap(), FailureTag::LoadError);
        assert!("SLOW".parse::<FailureTag>().is_err());
        for tag in FailureTag::ALL {
            assert_eq!(tag.as_str().parse::<FailureTag>().unwrap(), tag);
        }
    }

    #[test]
    fn test_stats_counters() {
        let mut stats = RunStats::default();
        stats.processed = 3;
        stats.skipped = 2;
        stats.record_failure(FailureTag::Timeout);
        stats.record_failure(FailureTag::Timeout);
        stats.record_failure(FailureTag::NotFound);
        assert_eq!(stats.errors, 3);
        assert_eq!(stats.attempted(), 6);
        assert_eq!(stats.finished(), 8);
        assert_eq!(stats.failures_by_tag[&FailureTag::Timeout], 2);
        assert_eq!(stats.throughput(), 0.0);
    }
}
