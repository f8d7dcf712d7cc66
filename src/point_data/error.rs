use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PointDataError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}: {detail}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        detail: String,
    },

    #[error("Failed to create point data directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to list point data directory '{0}'")]
    DirRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write point data file '{0}'")]
    ArtifactWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to read point data file '{0}'")]
    ArtifactRead(PathBuf, #[source] std::io::Error),

    #[error("Malformed point data document '{source_name}': {message}")]
    MalformedDocument {
        source_name: String,
        message: String,
    },

    #[error("More point files on disk ({downloaded}) than points requested ({requested})")]
    Inconsistent { requested: usize, downloaded: usize },

    #[error("{} point(s) still missing after retry: {:?}", missing.len(), missing)]
    Incomplete { missing: Vec<i64> },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
