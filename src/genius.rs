//! Genius API client (lyrics/metadata source).
//!
//! A lookup is two requests: a search for "{artist} {title}", then the song
//! endpoint for the first hit. Only the enrichment fields are kept.

use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::{FetchError, SetupError};
use crate::http::{build_agent, classify_error, decode_json};
use crate::models::{Outcome, SongRecord, NOT_AVAILABLE};
use crate::normalize::abbreviate;
use crate::source::MetadataSource;

const API_BASE: &str = "https://api.genius.com";

// ----------------------------------------------------------------------------
// Response types
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    result: HitResult,
}

#[derive(Debug, Deserialize)]
struct HitResult {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct SongResponse {
    response: SongBody,
}

#[derive(Debug, Deserialize)]
struct SongBody {
    song: Song,
}

#[derive(Debug, Deserialize)]
struct Song {
    language: Option<String>,
    release_date: Option<String>,
    album: Option<AlbumRef>,
    #[serde(default)]
    producer_artists: Vec<Credit>,
    #[serde(default)]
    writer_artists: Vec<Credit>,
    #[serde(default)]
    featured_artists: Vec<Credit>,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Credit {
    name: Option<String>,
}

fn join_credits(credits: &[Credit]) -> String {
    credits
        .iter()
        .map(|c| c.name.as_deref().unwrap_or(NOT_AVAILABLE))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<Song> for SongRecord {
    fn from(song: Song) -> Self {
        let or_na = |v: Option<String>| v.unwrap_or_else(|| NOT_AVAILABLE.to_string());
        SongRecord {
            language: or_na(song.language),
            release_date: or_na(song.release_date),
            album_name: or_na(song.album.and_then(|a| a.name)),
            producer_artists: join_credits(&song.producer_artists),
            writer_artists: join_credits(&song.writer_artists),
            featured_artists: join_credits(&song.featured_artists),
        }
    }
}

fn first_hit(search: SearchResponse) -> Result<u64, FetchError> {
    search
        .response
        .hits
        .first()
        .map(|hit| hit.result.id)
        .ok_or(FetchError::NotFound)
}

// ----------------------------------------------------------------------------
// Client
// ----------------------------------------------------------------------------

pub struct GeniusClient {
    agent: ureq::Agent,
    token: String,
    timeout: Duration,
}

impl GeniusClient {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self, SetupError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SetupError::Client(
                "Genius access token is empty".to_string(),
            ));
        }
        Ok(Self {
            agent: build_agent(timeout),
            token,
            timeout,
        })
    }

    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<ureq::Response, FetchError> {
        let mut request = self
            .agent
            .get(url)
            .set("Authorization", &format!("Bearer {}", self.token));
        for &(k, v) in params {
            request = request.query(k, v);
        }
        request.call().map_err(|e| classify_error(e, self.timeout))
    }

    /// Search, then fetch the first hit's song record.
    pub fn lookup(&self, query: &str) -> Result<SongRecord, FetchError> {
        let start = Instant::now();
        let label = abbreviate(query, 40);

        let response = self.get(&format!("{}/search", API_BASE), &[("q", query)])?;
        info!(
            "Search '{}' ({:.1}s) - status {}",
            label,
            start.elapsed().as_secs_f64(),
            response.status()
        );

        let song_id = match first_hit(decode_json(response, self.timeout)?) {
            Ok(id) => id,
            Err(e) => {
                warn!("Not found '{}'", label);
                return Err(e);
            }
        };

        let response = self.get(&format!("{}/songs/{}", API_BASE, song_id), &[])?;
        info!(
            "Track found ({:.1}s) - status {}",
            start.elapsed().as_secs_f64(),
            response.status()
        );

        let song: SongResponse = decode_json(response, self.timeout)?;
        Ok(song.response.song.into())
    }
}

impl MetadataSource for GeniusClient {
    fn song_info(&mut self, query: &str) -> Outcome<SongRecord> {
        let result = self.lookup(query);
        if let Err(e) = &result {
            if !matches!(e, FetchError::NotFound) {
                warn!("Lookup failed for '{}': {}", abbreviate(query, 40), e);
            }
        }
        result.into()
    }
}
