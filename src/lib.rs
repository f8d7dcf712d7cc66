//! Builds DSSAT daily weather (`.WTH`) files by fusing NASA POWER point series with
//! CHIRPS gridded precipitation, and extends previously built files incrementally.

mod config;
mod error;
mod http;
mod incremental;
mod pipeline;
mod precipitation;
mod types;
mod utils;

pub mod fusion;
pub mod point_data;
pub mod raster;

pub use config::{ExistingArtifacts, RunConfig, CHIRPS_BASE_URL, POWER_BASE_URL};
pub use error::DssatWeatherError;
pub use pipeline::{DssatWeather, RunContext, RunReport};

pub use incremental::{
    append_rows, continuation_start, last_record_date, merge_wth, select_historical, IncrementalError,
    MergeReport, Selection,
};
pub use precipitation::{merge_precipitation, preliminary_start, PrecipitationMerge};

pub use fusion::{FusedSeries, FusionError, FusionReport};
pub use point_data::{FetchReport, PointDataError, PointFetcher};
pub use raster::{ExtractionStrategy, RasterError, RasterExtractor, RasterOpener, RasterValueTable, NO_DATA};

pub use types::daily_record::{DailyRecord, PointSeries, Reading, SourceHeader, StationFields};
pub use types::location::{Location, LocationError, LocationTable, REQUIRED_COLUMNS};
pub use types::ordinal_date::{parse_calendar_date, DateError, DateRange, OrdinalDate};
