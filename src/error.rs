use crate::fusion::FusionError;
use crate::incremental::IncrementalError;
use crate::point_data::PointDataError;
use crate::raster::RasterError;
use crate::types::location::LocationError;
use crate::types::ordinal_date::DateError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DssatWeatherError {
    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Date(#[from] DateError),

    #[error(transparent)]
    PointData(#[from] PointDataError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error(transparent)]
    Incremental(#[from] IncrementalError),

    #[error("Failed to prepare working directory '{0}'")]
    WorkDir(PathBuf, #[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
