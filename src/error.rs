// src/error.rs

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistError {
    /// A query against the history store failed; `what` names the aggregation in progress
    #[error("failed to fetch {what}: {source}")]
    Store {
        what: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not open history database at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Date inputs are expected as YYYY-MM-DD
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("could not determine the home directory")]
    NoHomeDir,
}

pub type Result<T> = std::result::Result<T, HistError>;

/// Wraps a store error with the name of the aggregation that was running.
pub fn store_err(what: &'static str) -> impl FnOnce(rusqlite::Error) -> HistError {
    move |source| HistError::Store { what, source }
}
