use crate::point_data::PointDataError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FusionError {
    #[error("Failed to read point data file '{0}'")]
    PointRead(PathBuf, #[source] std::io::Error),

    #[error("Point data file could not be parsed")]
    PointParse(#[from] PointDataError),

    #[error("Failed to create output directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to write weather file '{0}'")]
    Write(PathBuf, #[source] std::io::Error),
}
