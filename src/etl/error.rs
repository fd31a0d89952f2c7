use std::path::PathBuf;

use thiserror::Error;

/// Reasons a whole input file could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} contains no records", path.display())]
    Empty { path: PathBuf },
}

/// Reasons a single record could not be turned into rows.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}
