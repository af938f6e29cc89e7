//! Error taxonomy for the pipeline.
//!
//! - [`SetupError`] aborts a run before any unit is processed.
//! - [`FetchError`] is per-unit and always ends up as a [`FailureTag`].
//! - [`PersistenceError`] is logged and retried at the next flush point.
//! - [`PageError`] is what a [`crate::source::PageDriver`] reports.

use std::path::PathBuf;
use std::time::Duration;

use crate::models::{FailureTag, Outcome};

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("input file not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed content in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to initialise source client: {0}")]
    Client(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("no match found")]
    NotFound,

    #[error("request failed: {0}")]
    Load(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed payload: {0}")]
    Parse(String),

    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl FetchError {
    pub fn tag(&self) -> FailureTag {
        match self {
            FetchError::NotFound => FailureTag::NotFound,
            FetchError::Load(_) => FailureTag::LoadError,
            FetchError::Timeout(_) => FailureTag::Timeout,
            FetchError::Parse(_) => FailureTag::ParseError,
            FetchError::Unknown(_) => FailureTag::UnknownError,
        }
    }
}

impl<T> From<Result<T, FetchError>> for Outcome<T> {
    fn from(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(err.tag()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("element '{selector}' did not appear within {timeout:?}")]
    Timeout { selector: String, timeout: Duration },

    #[error("element '{0}' not found")]
    NoSuchElement(String),

    #[error("unsupported selector '{0}'")]
    InvalidSelector(String),

    #[error("{0}")]
    Other(String),
}
