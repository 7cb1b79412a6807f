// Error type for profile building and sequence generation.
//
// Per-file decode failures never reach this type: the aggregator logs and
// skips them. Everything here is either a caller mistake (unknown emotion,
// bad duration, broken profile) or an I/O failure on the cache, config, or
// output file, and is propagated unchanged.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MusicError {
    #[error("no profile for emotion '{0}'")]
    UnknownEmotion(String),

    #[error("profile for '{label}' is unusable: {reason}")]
    InvalidProfile { label: String, reason: String },

    #[error("duration must be a finite, non-negative number of seconds (got {0})")]
    InvalidDuration(f64),

    #[error("track '{0}' leaves a note sounding")]
    UnbalancedTrack(String),

    #[error("note name '{0}' is not in the pitch table")]
    UnknownNote(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cache document {path} is malformed: {source}")]
    CacheFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config file {path} is malformed: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl MusicError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MusicError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = MusicError> = std::result::Result<T, E>;
