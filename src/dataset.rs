//! Loading and saving the artist/track dataset file.

use std::path::Path;

use crate::error::{PersistenceError, SetupError};
use crate::models::Artist;
use crate::storage::{read_json, write_json_atomic};

/// Load the dataset. Unlike the checkpoint, a missing dataset is fatal.
pub fn load_dataset(path: &Path) -> Result<Vec<Artist>, SetupError> {
    read_json(path)?.ok_or_else(|| SetupError::MissingInput {
        path: path.to_path_buf(),
    })
}

pub fn save_dataset(path: &Path, artists: &[Artist]) -> Result<(), PersistenceError> {
    write_json_atomic(path, artists)
}

pub fn count_tracks(artists: &[Artist]) -> usize {
    artists.iter().map(|a| a.tracks.len()).sum()
}
