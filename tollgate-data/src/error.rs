//! Errors raised while loading catalog and tariff files.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Failure to load a JSON data file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON for the expected schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File being parsed.
        path: Utf8PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The file parsed but its content is inconsistent.
    #[error("invalid data in {origin}: {message}")]
    Invalid {
        /// File or source label.
        origin: String,
        /// What is wrong.
        message: String,
    },
}
