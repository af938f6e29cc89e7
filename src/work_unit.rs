//! Work-unit identity.
//!
//! A unit's key is the catalog-assigned id. Names and popularity are never
//! part of the key since sources normalize them differently; the artist and
//! track names are only used to build the query sent to a source.

use rustc_hash::FxHashMap;

use crate::models::{Artist, Track};
use crate::normalize::build_query;

/// Anything the driver can process: it only needs a stable key.
pub trait WorkKey {
    fn key(&self) -> &str;
}

/// Position of a track inside the dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackLocation {
    pub artist: usize,
    pub track: usize,
}

/// One distinct track id and every place in the dataset that carries it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkUnit {
    pub key: String,
    pub locations: Vec<TrackLocation>,
}

impl WorkUnit {
    /// First occurrence in document order
    pub fn primary(&self) -> TrackLocation {
        self.locations[0]
    }

    pub fn tracks<'a>(&'a self, artists: &'a [Artist]) -> impl Iterator<Item = &'a Track> + 'a {
        self.locations
            .iter()
            .map(move |loc| &artists[loc.artist].tracks[loc.track])
    }

    /// Query for the metadata source, built from the first occurrence.
    pub fn query(&self, artists: &[Artist]) -> String {
        let loc = self.primary();
        let artist = &artists[loc.artist];
        build_query(&artist.name, &artist.tracks[loc.track].name)
    }
}

impl WorkKey for WorkUnit {
    fn key(&self) -> &str {
        &self.key
    }
}

/// One unit per distinct track id, in document order (first occurrence wins
/// the position; later duplicates are folded into its `locations`).
pub fn track_units(artists: &[Artist]) -> Vec<WorkUnit> {
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut units: Vec<WorkUnit> = Vec::new();

    for (a, artist) in artists.iter().enumerate() {
        for (t, track) in artist.tracks.iter().enumerate() {
            let loc = TrackLocation { artist: a, track: t };
            match index.get(track.id.as_str()) {
                Some(&i) => units[i].locations.push(loc),
                None => {
                    index.insert(track.id.as_str(), units.len());
                    units.push(WorkUnit {
                        key: track.id.clone(),
                        locations: vec![loc],
                    });
                }
            }
        }
    }

    units
}

/// Every track id in document order, duplicates included.
pub fn track_ids(artists: &[Artist]) -> Vec<String> {
    artists
        .iter()
        .flat_map(|a| a.tracks.iter().map(|t| t.id.clone()))
        .collect()
}

/// Artist-level unit used by track collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtistUnit {
    pub key: String,
    pub index: usize,
}

impl WorkKey for ArtistUnit {
    fn key(&self) -> &str {
        &self.key
    }
}

pub fn artist_units(artists: &[Artist]) -> Vec<ArtistUnit> {
    artists
        .iter()
        .enumerate()
        .map(|(index, artist)| ArtistUnit {
            key: artist.id.clone(),
            index,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, name: &str) -> Track {
        Track {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn artist(id: &str, name: &str, tracks: Vec<Track>) -> Artist {
        Artist {
            id: id.to_string(),
            name: name.to_string(),
            tracks,
            ..Default::default()
        }
    }

    #[test]
    fn test_units_follow_document_order() {
        let artists = vec![
            artist("a1", "A", vec![track("t1", "One"), track("t2", "Two")]),
            artist("a2", "B", vec![track("t3", "Three")]),
        ];
        let keys: Vec<String> = track_units(&artists).into_iter().map(|u| u.key).collect();
        assert_eq!(keys, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_duplicate_ids_fold_into_one_unit() {
        let artists = vec![
            artist("a1", "A", vec![track("t1", "Duet (feat. B)")]),
            artist("a2", "B", vec![track("t2", "Other"), track("t1", "Duet")]),
        ];
        let units = track_units(&artists);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].key, "t1");
        assert_eq!(
            units[0].locations,
            vec![
                TrackLocation { artist: 0, track: 0 },
                TrackLocation { artist: 1, track: 1 },
            ]
        );
        assert_eq!(units[0].tracks(&artists).count(), 2);
        assert_eq!(track_ids(&artists), vec!["t1", "t2", "t1"]);
    }

    #[test]
    fn test_key_ignores_names_and_query_uses_them() {
        let artists = vec![artist("a1", "Daft Punk", vec![track("t9", "Aerodynamic (Live)")])];
        let unit = &track_units(&artists)[0];
        assert_eq!(unit.key(), "t9");
        assert_eq!(unit.query(&artists), "Daft Punk Aerodynamic");
    }

    #[test]
    fn test_artist_units() {
        let artists = vec![artist("a1", "A", vec![]), artist("a2", "B", vec![])];
        let units = artist_units(&artists);
        assert_eq!(units[1], ArtistUnit { key: "a2".to_string(), index: 1 });
    }
}
