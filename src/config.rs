//! Run configuration. Every value can be overridden through the builder.

use crate::raster::ExtractionStrategy;
use bon::Builder;
use std::time::Duration;

pub const POWER_BASE_URL: &str = "https://power.larc.nasa.gov";
pub const CHIRPS_BASE_URL: &str = "https://data.chc.ucsb.edu";

/// What to do with a point artifact that is already on disk when a fetch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingArtifacts {
    /// Request every point again and replace its file.
    #[default]
    Overwrite,
    /// Only request points that have no file yet. Files from an earlier run survive
    /// the working-tree wipe, so they must cover the same period.
    SkipExisting,
}

/// Settings shared by every stage of a run.
///
/// # Examples
///
/// ```
/// use dssat_weather::{ExtractionStrategy, RunConfig};
/// use std::time::Duration;
///
/// let config = RunConfig::builder()
///     .workers(8)
///     .request_timeout(Duration::from_secs(120))
///     .raster_strategy(ExtractionStrategy::WholeGrid)
///     .build();
/// assert_eq!(config.workers, 8);
/// assert_eq!(config.connect_retries, 30);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct RunConfig {
    /// Concurrent point API requests.
    #[builder(default = 5)]
    pub workers: usize,
    /// Timeout of a single point API request.
    #[builder(default = Duration::from_secs(80))]
    pub request_timeout: Duration,
    /// Connection attempts retried per point request.
    #[builder(default = 30)]
    pub connect_retries: u32,
    /// Connection attempts retried per raster download.
    #[builder(default = 10)]
    pub raster_connect_retries: u32,
    /// Timeout of a single raster download.
    #[builder(default = Duration::from_secs(600))]
    pub raster_timeout: Duration,
    #[builder(into, default = POWER_BASE_URL.to_string())]
    pub power_base_url: String,
    #[builder(into, default = CHIRPS_BASE_URL.to_string())]
    pub chirps_base_url: String,
    /// Days behind today the point source needs before SRAD is published.
    #[builder(default = 4)]
    pub srad_latency_days: u64,
    #[builder(default)]
    pub raster_strategy: ExtractionStrategy,
    #[builder(default)]
    pub existing_artifacts: ExistingArtifacts,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
