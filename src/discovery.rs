//! Artist and track discovery: builds a fresh dataset from a catalog API.
//!
//! Artists come from genre searches and from the lead artists of each
//! market's chart playlists. Tracks per artist are the top tracks followed by
//! every album and single track not already listed.

use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::dataset::{count_tracks, save_dataset};
use crate::driver::EnrichmentTask;
use crate::error::{FetchError, PersistenceError};
use crate::models::{Artist, FailureTag, Outcome, Track};
use crate::progress::{create_progress_bar, ProgressMode};
use crate::source::{CatalogArtist, CatalogSource, CatalogTrack};
use crate::work_unit::{artist_units, ArtistUnit};

pub const DEFAULT_GENRES: [&str; 36] = [
    "pop", "rock", "hip hop", "electronic", "jazz", "classical", "reggae", "country", "r&b",
    "metal", "indie", "blues", "soul", "funk", "k-pop", "latin", "folk", "punk", "techno",
    "house", "disco", "dance", "alternative", "gospel", "world", "soundtrack", "ambient",
    "reggaeton", "trap", "edm", "dubstep", "synthwave", "emo", "grunge", "hardcore",
    "progressive",
];

pub const DEFAULT_COUNTRIES: [&str; 9] = ["US", "GB", "DE", "JP", "KR", "BR", "FR", "ES", "IT"];

/// Genre recorded for artists found through chart playlists
pub const CHART_GENRE: &str = "chart";

/// Popularity used where the catalog does not report one
pub const DEFAULT_POPULARITY: i32 = 70;

/// Page size for searches and playlist listings
const PAGE_LIMIT: u32 = 50;

fn new_artist(found: CatalogArtist, genre: &str, popularity: i32) -> Artist {
    Artist {
        id: found.id,
        name: found.name,
        genre: Some(genre.to_string()),
        popularity: Some(popularity),
        ..Default::default()
    }
}

impl From<CatalogTrack> for Track {
    fn from(t: CatalogTrack) -> Self {
        Track {
            id: t.id,
            name: t.name,
            duration_ms: Some(t.duration_ms),
            popularity: Some(t.popularity.unwrap_or(DEFAULT_POPULARITY)),
            ..Default::default()
        }
    }
}

/// Collect up to `limit` distinct artists. The first sighting of an artist id
/// wins; a failing genre, market or playlist is logged and skipped.
pub fn discover_artists<C: CatalogSource + ?Sized>(
    source: &mut C,
    genres: &[String],
    countries: &[String],
    limit: usize,
    mode: ProgressMode,
) -> Vec<Artist> {
    let mut artists: Vec<Artist> = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    info!(
        "Searching artists across {} genres and {} markets",
        genres.len(),
        countries.len()
    );

    let pb = create_progress_bar(genres.len() as u64, "Genres", mode);
    let mut from_genres = 0;
    for genre in genres {
        match source.search_artists(genre, PAGE_LIMIT) {
            Ok(found) => {
                debug!("Genre {}: {} artists", genre, found.len());
                for artist in found {
                    if seen.insert(artist.id.clone()) {
                        let popularity = artist.popularity.unwrap_or(DEFAULT_POPULARITY);
                        artists.push(new_artist(artist, genre, popularity));
                        from_genres += 1;
                    }
                }
            }
            Err(e) => pb.suspend(|| error!("Genre '{}' failed: {}", genre, e)),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    info!("Genres yielded {} unique artists", from_genres);

    let pb = create_progress_bar(countries.len() as u64, "Charts", mode);
    let mut from_charts = 0;
    for country in countries {
        let playlists = match source.chart_playlists(country, PAGE_LIMIT) {
            Ok(p) => p,
            Err(e) => {
                pb.suspend(|| error!("Charts for {} failed: {}", country, e));
                pb.inc(1);
                continue;
            }
        };
        debug!("Market {}: {} playlists", country, playlists.len());

        for playlist in &playlists {
            match source.playlist_lead_artists(playlist, PAGE_LIMIT) {
                Ok(found) => {
                    for artist in found {
                        if seen.insert(artist.id.clone()) {
                            artists.push(new_artist(artist, CHART_GENRE, DEFAULT_POPULARITY));
                            from_charts += 1;
                        }
                    }
                }
                Err(e) => pb.suspend(|| warn!("Playlist {} failed: {}", playlist, e)),
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    info!("Charts yielded {} unique artists", from_charts);
    info!("{} artists found before applying the limit", artists.len());

    artists.truncate(limit);
    artists
}

/// Top tracks plus album and single tracks, deduplicated by id.
///
/// A failing top-track or album listing fails the artist; a single failing
/// album is skipped.
pub fn collect_tracks<C: CatalogSource + ?Sized>(
    source: &mut C,
    artist_id: &str,
) -> Result<Vec<Track>, FetchError> {
    let top = source.top_tracks(artist_id)?;
    let albums = source.artist_albums(artist_id)?;

    let top_count = top.len();
    let mut seen: FxHashSet<String> = top.iter().map(|t| t.id.clone()).collect();
    let mut tracks: Vec<Track> = top.into_iter().map(Track::from).collect();

    for album in &albums {
        match source.album_tracks(album) {
            Ok(listed) => {
                for track in listed {
                    if seen.insert(track.id.clone()) {
                        tracks.push(track.into());
                    }
                }
            }
            Err(e) => warn!("Album {} of artist {} failed: {}", album, artist_id, e),
        }
    }

    debug!(
        "Artist {}: {} tracks (top: {}, albums: {})",
        artist_id,
        tracks.len(),
        top_count,
        tracks.len() - top_count
    );
    Ok(tracks)
}

/// Driver task filling each artist's track list.
pub struct CollectTask<C> {
    artists: Vec<Artist>,
    source: C,
    output: PathBuf,
}

impl<C: CatalogSource> CollectTask<C> {
    pub fn new(artists: Vec<Artist>, source: C, output: impl Into<PathBuf>) -> Self {
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

    pub fn track_count(&self) -> usize {
        count_tracks(&self.artists)
    }

    /// Average tracks per artist that has any
    pub fn average_tracks(&self) -> f64 {
        let filled = self.artists.iter().filter(|a| !a.tracks.is_empty()).count();
        if filled == 0 {
            0.0
        } else {
            self.track_count() as f64 / filled as f64
        }
    }

    pub fn into_artists(self) -> Vec<Artist> {
        self.artists
    }
}

impl<C: CatalogSource> EnrichmentTask for CollectTask<C> {
    type Unit = ArtistUnit;
    type Value = Vec<Track>;

    fn phase(&self) -> &str {
        "Collecting tracks"
    }

    fn units(&self) -> Vec<ArtistUnit> {
        artist_units(&self.artists)
    }

    fn is_complete(&self, unit: &ArtistUnit) -> bool {
        !self.artists[unit.index].tracks.is_empty()
    }

    fn fetch(&mut self, unit: &ArtistUnit) -> Outcome<Vec<Track>> {
        match collect_tracks(&mut self.source, &unit.key) {
            Ok(tracks) if tracks.is_empty() => {
                warn!("Artist {} has no tracks", unit.key);
                Outcome::Failure(FailureTag::NotFound)
            }
            Ok(tracks) => Outcome::Success(tracks),
            Err(e) => {
                error!("Artist {} failed: {}", unit.key, e);
                Outcome::Failure(e.tag())
            }
        }
    }

    fn apply(&mut self, unit: &ArtistUnit, outcome: Outcome<Vec<Track>>) {
        if let Outcome::Success(tracks) = outcome {
            self.artists[unit.index].tracks = tracks;
        }
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        info!("Saving dataset: {} tracks", self.track_count());
        save_dataset(&self.output, &self.artists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RunConfig, RunContext};
    use crate::dataset::load_dataset;
    use crate::driver;
    use crate::models::UnitState;
    use std::collections::HashMap;

    fn cat_artist(id: &str, popularity: Option<i32>) -> CatalogArtist {
        CatalogArtist {
            id: id.to_string(),
            name: format!("Name {}", id),
            popularity,
        }
    }

    fn cat_track(id: &str, popularity: Option<i32>) -> CatalogTrack {
        CatalogTrack {
            id: id.to_string(),
            name: format!("Song {}", id),
            duration_ms: 180_000,
            popularity,
        }
    }

    #[derive(Default)]
    struct FakeCatalog {
        genres: HashMap<String, Vec<CatalogArtist>>,
        charts: HashMap<String, Vec<String>>,
        playlists: HashMap<String, Vec<CatalogArtist>>,
        top: HashMap<String, Vec<CatalogTrack>>,
        albums: HashMap<String, Vec<String>>,
        album_tracks: HashMap<String, Vec<CatalogTrack>>,
        calls: usize,
    }

    fn missing(what: &str) -> FetchError {
        FetchError::Load(format!("no fixture for {}", what))
    }

    impl CatalogSource for FakeCatalog {
        fn search_artists(&mut self, genre: &str, _limit: u32) -> Result<Vec<CatalogArtist>, FetchError> {
            self.calls += 1;
            self.genres.get(genre).cloned().ok_or_else(|| missing(genre))
        }

        fn chart_playlists(&mut self, country: &str, _limit: u32) -> Result<Vec<String>, FetchError> {
            self.calls += 1;
            self.charts.get(country).cloned().ok_or_else(|| missing(country))
        }

        fn playlist_lead_artists(
            &mut self,
            playlist_id: &str,
            _limit: u32,
        ) -> Result<Vec<CatalogArtist>, FetchError> {
            self.calls += 1;
            self.playlists.get(playlist_id).cloned().ok_or_else(|| missing(playlist_id))
        }

        fn top_tracks(&mut self, artist_id: &str) -> Result<Vec<CatalogTrack>, FetchError> {
            self.calls += 1;
            self.top
                .get(artist_id)
                .cloned()
                .ok_or(FetchError::Timeout(std::time::Duration::from_secs(1)))
        }

        fn artist_albums(&mut self, artist_id: &str) -> Result<Vec<String>, FetchError> {
            self.calls += 1;
            Ok(self.albums.get(artist_id).cloned().unwrap_or_default())
        }

        fn album_tracks(&mut self, album_id: &str) -> Result<Vec<CatalogTrack>, FetchError> {
            self.calls += 1;
            self.album_tracks.get(album_id).cloned().ok_or_else(|| missing(album_id))
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_discover_dedups_and_labels() {
        let mut catalog = FakeCatalog::default();
        catalog.genres.insert(
            "pop".to_string(),
            vec![cat_artist("a1", Some(90)), cat_artist("a2", None)],
        );
        catalog
            .genres
            .insert("rock".to_string(), vec![cat_artist("a1", Some(90)), cat_artist("a3", Some(40))]);
        catalog.charts.insert("US".to_string(), strings(&["p1", "p2"]));
        catalog
            .playlists
            .insert("p1".to_string(), vec![cat_artist("a3", None), cat_artist("a4", None)]);
        // p2 and the "jazz" genre have no fixture and fail

        let artists = discover_artists(
            &mut catalog,
            &strings(&["pop", "jazz", "rock"]),
            &strings(&["US"]),
            100,
            ProgressMode::LogOnly,
        );

        let ids: Vec<&str> = artists.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3", "a4"]);
        assert_eq!(artists[0].genre.as_deref(), Some("pop"));
        assert_eq!(artists[1].popularity, Some(DEFAULT_POPULARITY));
        assert_eq!(artists[2].genre.as_deref(), Some("rock"));
        assert_eq!(artists[3].genre.as_deref(), Some(CHART_GENRE));
        assert_eq!(artists[3].popularity, Some(DEFAULT_POPULARITY));
    }

    #[test]
    fn test_discover_applies_limit() {
        let mut catalog = FakeCatalog::default();
        catalog.genres.insert(
            "pop".to_string(),
            (0..5).map(|i| cat_artist(&format!("a{}", i), Some(50))).collect(),
        );
        let artists =
            discover_artists(&mut catalog, &strings(&["pop"]), &[], 3, ProgressMode::LogOnly);
        assert_eq!(artists.len(), 3);
    }

    #[test]
    fn test_collect_tracks_merges_albums() {
        let mut catalog = FakeCatalog::default();
        catalog
            .top
            .insert("a1".to_string(), vec![cat_track("t1", Some(88)), cat_track("t2", Some(60))]);
        catalog.albums.insert("a1".to_string(), strings(&["al1", "broken", "al2"]));
        catalog
            .album_tracks
            .insert("al1".to_string(), vec![cat_track("t2", None), cat_track("t3", None)]);
        catalog.album_tracks.insert("al2".to_string(), vec![cat_track("t4", Some(12))]);

        let tracks = collect_tracks(&mut catalog, "a1").unwrap();
        let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3", "t4"]);
        assert_eq!(tracks[1].popularity, Some(60));
        assert_eq!(tracks[2].popularity, Some(DEFAULT_POPULARITY));
        assert_eq!(tracks[3].popularity, Some(12));
    }

    #[test]
    fn test_collect_task_resumes_and_tags_failures() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("artists_with_tracks.json");

        let mut catalog = FakeCatalog::default();
        catalog.top.insert("a2".to_string(), vec![cat_track("t5", Some(1))]);
        catalog.top.insert("a3".to_string(), vec![]);

        let mut done = new_artist(cat_artist("a1", Some(10)), "pop", 10);
        done.tracks = vec![cat_track("t0", Some(5)).into()];
        let artists = vec![
            done,
            new_artist(cat_artist("a2", None), "pop", 70),
            new_artist(cat_artist("a3", None), "pop", 70),
            new_artist(cat_artist("a4", None), "pop", 70),
        ];

        let mut task = CollectTask::new(artists, catalog, &output);
        let report = driver::run(&mut task, &mut RunContext::new(RunConfig::default()));

        assert_eq!(report.state_of("a1"), Some(UnitState::Skipped));
        assert_eq!(report.state_of("a2"), Some(UnitState::Success));
        assert_eq!(report.state_of("a3"), Some(UnitState::Failed(FailureTag::NotFound)));
        assert_eq!(report.state_of("a4"), Some(UnitState::Failed(FailureTag::Timeout)));
        assert_eq!(task.track_count(), 2);
        assert!((task.average_tracks() - 1.0).abs() < f64::EPSILON);

        let saved = load_dataset(&output).unwrap();
        assert_eq!(saved.len(), 4);
        assert_eq!(saved[1].tracks[0].id, "t5");
        assert!(saved[3].tracks.is_empty());
    }
}
