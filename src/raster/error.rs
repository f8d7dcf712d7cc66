use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Failed to list raster directory '{0}'")]
    DirRead(PathBuf, #[source] std::io::Error),

    #[error("Could not open raster file '{path}': {message}")]
    Open { path: PathBuf, message: String },

    #[error("Raster file '{path}' has an unusable time axis: {message}")]
    TimeAxis { path: PathBuf, message: String },

    #[error("Failed to read band {band} of raster file '{path}': {message}")]
    BandRead {
        path: PathBuf,
        band: usize,
        message: String,
    },

    #[error("Raster dates are not strictly increasing: {previous} is followed by {next}")]
    UnorderedDates { previous: String, next: String },

    #[error("Series for location {id} has {found} values, the date axis has {expected}")]
    SeriesLength {
        id: i64,
        expected: usize,
        found: usize,
    },

    #[error("Failed to write value table '{0}'")]
    TableWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to read value table '{0}'")]
    TableRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to encode value table")]
    TableEncode(#[source] Box<bincode::error::EncodeError>),

    #[error("Failed to decode value table '{0}'")]
    TableDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to create raster directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("Failed to store downloaded raster '{0}'")]
    DownloadWrite(PathBuf, #[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
