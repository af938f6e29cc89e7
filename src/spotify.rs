//! Spotify Web API client (catalog source for artist and track discovery).
//!
//! Authenticates with the client-credentials flow and refreshes the token
//! shortly before it expires. Listings are read one page at a time; items
//! the API returns as `null` (removed playlists, local files) are dropped.

use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{FetchError, SetupError};
use crate::http::{build_agent, classify_error, decode_json};
use crate::source::{CatalogArtist, CatalogSource, CatalogTrack};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Market used for top-track listings
const TOP_TRACKS_MARKET: &str = "US";

/// Largest page the listing endpoints accept
const MAX_PAGE: u32 = 50;

/// Refresh this long before the token actually expires
const TOKEN_MARGIN: Duration = Duration::from_secs(30);

// ----------------------------------------------------------------------------
// Response types
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ArtistSearch {
    artists: Paging<Option<ArtistObject>>,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    id: Option<String>,
    name: String,
    popularity: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct CategoryPlaylists {
    playlists: Paging<Option<IdRef>>,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TopTracks {
    #[serde(default)]
    tracks: Vec<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    id: Option<String>,
    name: String,
    #[serde(default)]
    duration_ms: i64,
    popularity: Option<i32>,
    #[serde(default)]
    artists: Vec<ArtistObject>,
}

impl ArtistObject {
    fn into_catalog(self) -> Option<CatalogArtist> {
        Some(CatalogArtist {
            id: self.id?,
            name: self.name,
            popularity: self.popularity,
        })
    }
}

impl TrackObject {
    fn into_catalog(self) -> Option<CatalogTrack> {
        Some(CatalogTrack {
            id: self.id?,
            name: self.name,
            duration_ms: self.duration_ms,
            popularity: self.popularity,
        })
    }

    fn lead_artist(self) -> Option<CatalogArtist> {
        self.artists.into_iter().next()?.into_catalog()
    }
}

fn catalog_tracks(tracks: Vec<TrackObject>) -> Vec<CatalogTrack> {
    tracks.into_iter().filter_map(TrackObject::into_catalog).collect()
}

fn present_ids(refs: Vec<Option<IdRef>>) -> Vec<String> {
    refs.into_iter().flatten().filter_map(|r| r.id).collect()
}

// ----------------------------------------------------------------------------
// Client
// ----------------------------------------------------------------------------

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct SpotifyClient {
    agent: ureq::Agent,
    client_id: String,
    client_secret: String,
    timeout: Duration,
    token: Option<AccessToken>,
}

impl SpotifyClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SetupError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(SetupError::Client(
                "Spotify client id and secret are required".to_string(),
            ));
        }
        Ok(Self {
            agent: build_agent(timeout),
            client_id,
            client_secret,
            timeout,
            token: None,
        })
    }

    /// Fetch the first token eagerly so bad credentials fail at startup.
    pub fn authenticate(&mut self) -> Result<(), SetupError> {
        self.access_token()
            .map(|_| ())
            .map_err(|e| SetupError::Client(format!("Spotify authentication failed: {}", e)))
    }

    fn access_token(&mut self) -> Result<String, FetchError> {
        if let Some(token) = &self.token {
            if Instant::now() + TOKEN_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let start = Instant::now();
        let response = self
            .agent
            .post(TOKEN_URL)
            .send_form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .map_err(|e| classify_error(e, self.timeout))?;
        let token: TokenResponse = decode_json(response, self.timeout)?;
        info!(
            "Spotify token refreshed ({:.2}s), valid for {}s",
            start.elapsed().as_secs_f64(),
            token.expires_in
        );

        self.token = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: start + Duration::from_secs(token.expires_in),
        });
        Ok(token.access_token)
    }

    fn get<T: serde::de::DeserializeOwned>(
        &mut self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let token = self.access_token()?;
        let mut request = self
            .agent
            .get(&format!("{}{}", API_BASE, path))
            .set("Authorization", &format!("Bearer {}", token));
        for &(k, v) in params {
            request = request.query(k, v);
        }
        debug!("GET {}", path);
        let response = request.call().map_err(|e| classify_error(e, self.timeout))?;
        decode_json(response, self.timeout)
    }
}

impl CatalogSource for SpotifyClient {
    fn search_artists(&mut self, genre: &str, limit: u32) -> Result<Vec<CatalogArtist>, FetchError> {
        let query = format!("genre:\"{}\"", genre);
        let limit = limit.min(MAX_PAGE).to_string();
        let search: ArtistSearch = self.get(
            "/search",
            &[("q", query.as_str()), ("type", "artist"), ("limit", limit.as_str())],
        )?;
        Ok(search
            .artists
            .items
            .into_iter()
            .flatten()
            .filter_map(ArtistObject::into_catalog)
            .collect())
    }

    fn chart_playlists(&mut self, country: &str, limit: u32) -> Result<Vec<String>, FetchError> {
        let limit = limit.min(MAX_PAGE).to_string();
        let listing: CategoryPlaylists = self.get(
            "/browse/categories/toplists/playlists",
            &[("country", country), ("limit", limit.as_str())],
        )?;
        Ok(present_ids(listing.playlists.items))
    }

    fn playlist_lead_artists(
        &mut self,
        playlist_id: &str,
        limit: u32,
    ) -> Result<Vec<CatalogArtist>, FetchError> {
        let limit = limit.min(MAX_PAGE).to_string();
        let page: Paging<PlaylistItem> =
            self.get(&format!("/playlists/{}/tracks", playlist_id), &[("limit", limit.as_str())])?;
        Ok(page
            .items
            .into_iter()
            .filter_map(|item| item.track?.lead_artist())
            .collect())
    }

    fn top_tracks(&mut self, artist_id: &str) -> Result<Vec<CatalogTrack>, FetchError> {
        let top: TopTracks = self.get(
            &format!("/artists/{}/top-tracks", artist_id),
            &[("market", TOP_TRACKS_MARKET)],
        )?;
        Ok(catalog_tracks(top.tracks))
    }

    fn artist_albums(&mut self, artist_id: &str) -> Result<Vec<String>, FetchError> {
        let limit = MAX_PAGE.to_string();
        let page: Paging<Option<IdRef>> = self.get(
            &format!("/artists/{}/albums", artist_id),
            &[("include_groups", "album,single"), ("limit", limit.as_str())],
        )?;
        Ok(present_ids(page.items))
    }

    fn album_tracks(&mut self, album_id: &str) -> Result<Vec<CatalogTrack>, FetchError> {
        let limit = MAX_PAGE.to_string();
        let page: Paging<TrackObject> =
            self.get(&format!("/albums/{}/tracks", album_id), &[("limit", limit.as_str())])?;
        Ok(catalog_tracks(page.items))
    }
}
