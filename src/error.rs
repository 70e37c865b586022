use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Anything that stops the pipeline. Per-record problems are logged and
/// skipped instead of surfacing here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not access '{}': {source}", path.display())]
    File { path: PathBuf, source: io::Error },
    #[error("error while writing output: {0}")]
    Io(#[from] io::Error),
    #[error("error during CSV processing: {0}")]
    Csv(#[from] csv::Error),
    #[error("product API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Usage(String),
    #[error("'{0}' is not a valid amount")]
    InvalidAmount(String),
}

impl Error {
    pub(crate) fn file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
