//! Capability traits for the external sources.
//!
//! The driver never talks to a network or a browser directly. Each source is
//! reached through one of these narrow traits so tests can inject fakes.

use std::time::Duration;

use crate::error::{FetchError, PageError};
use crate::models::{Outcome, SongRecord};

/// Lyrics/metadata API: free-text query in, song record or failure tag out.
/// "No match" must come back as [`crate::models::FailureTag::NotFound`],
/// distinct from transport failures.
pub trait MetadataSource {
    fn song_info(&mut self, query: &str) -> Outcome<SongRecord>;
}

/// Minimal page automation: load a URL, then wait (bounded) for an element
/// and return its text.
pub trait PageDriver {
    fn navigate(&mut self, url: &str) -> Result<(), PageError>;

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<String, PageError>;
}

/// Artist as listed by the catalog API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogArtist {
    pub id: String,
    pub name: String,
    /// Absent for artists reached through playlists
    pub popularity: Option<i32>,
}

/// Track as listed by the catalog API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    pub duration_ms: i64,
    /// Album track listings carry no popularity
    pub popularity: Option<i32>,
}

/// Catalog API used for artist and track discovery.
pub trait CatalogSource {
    fn search_artists(&mut self, genre: &str, limit: u32) -> Result<Vec<CatalogArtist>, FetchError>;

    /// Ids of the chart playlists for a market
    fn chart_playlists(&mut self, country: &str, limit: u32) -> Result<Vec<String>, FetchError>;

    /// First credited artist of each track in a playlist
    fn playlist_lead_artists(
        &mut self,
        playlist_id: &str,
        limit: u32,
    ) -> Result<Vec<CatalogArtist>, FetchError>;

    fn top_tracks(&mut self, artist_id: &str) -> Result<Vec<CatalogTrack>, FetchError>;

    /// Ids of the artist's albums and singles
    fn artist_albums(&mut self, artist_id: &str) -> Result<Vec<String>, FetchError>;

    fn album_tracks(&mut self, album_id: &str) -> Result<Vec<CatalogTrack>, FetchError>;
}

impl<T: MetadataSource + ?Sized> MetadataSource for &mut T {
    fn song_info(&mut self, query: &str) -> Outcome<SongRecord> {
        (**self).song_info(query)
    }
}

impl<T: PageDriver + ?Sized> PageDriver for &mut T {
    fn navigate(&mut self, url: &str) -> Result<(), PageError> {
        (**self).navigate(url)
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<String, PageError> {
        (**self).wait_for(selector, timeout)
    }
}
