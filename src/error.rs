use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while discovering or decoding media for the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more configured media directories are invalid or unreadable.
    #[error("invalid media directory: {0}")]
    BadDir(String),

    /// The scan completed but found nothing playable.
    #[error("no playable media found in {0}")]
    EmptyScan(String),

    /// A file could not be decoded into pixels.
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
