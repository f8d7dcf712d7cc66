//! Samples a directory of daily rasters at every location.
//!
//! Two strategies produce the same table. The per-location strategy reopens every
//! file for every location and reads single pixels; it suits long series for a few
//! points. The whole-grid strategy reads each band once into memory and indexes all
//! locations at the same time; it suits short series for many points.

use crate::raster::dataset::{GeoTransform, RasterDataset, RasterOpener};
use crate::raster::error::RasterError;
use crate::raster::table::{RasterValueTable, NO_DATA};
use crate::types::location::Location;
use crate::types::ordinal_date::OrdinalDate;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const RASTER_EXTENSION: &str = "nc";

/// Runs longer than this many days use the per-location strategy under `Auto`.
pub const WHOLE_GRID_MAX_DAYS: i64 = 730;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionStrategy {
    PerLocation,
    WholeGrid,
    /// Whole-grid for runs of at most [`WHOLE_GRID_MAX_DAYS`] days, per-location otherwise.
    #[default]
    Auto,
}

impl ExtractionStrategy {
    /// The concrete strategy for a run covering `days` days.
    pub fn resolve(self, days: i64) -> ExtractionStrategy {
        match self {
            ExtractionStrategy::Auto if days <= WHOLE_GRID_MAX_DAYS => ExtractionStrategy::WholeGrid,
            ExtractionStrategy::Auto => ExtractionStrategy::PerLocation,
            concrete => concrete,
        }
    }
}

/// Raster files of `dir`, sorted by file name (which embeds the period).
pub fn list_raster_files(dir: &Path) -> Result<Vec<PathBuf>, RasterError> {
    let entries = std::fs::read_dir(dir).map_err(|e| RasterError::DirRead(dir.to_path_buf(), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| RasterError::DirRead(dir.to_path_buf(), e))?
            .path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(RASTER_EXTENSION) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// A band grid held in memory by the whole-grid strategy.
struct BandGrid {
    transform: GeoTransform,
    width: usize,
    height: usize,
    no_data: Option<f32>,
    cells: Vec<f32>,
}

pub struct RasterExtractor<'a> {
    opener: &'a dyn RasterOpener,
}

impl<'a> RasterExtractor<'a> {
    pub fn new(opener: &'a dyn RasterOpener) -> Self {
        Self { opener }
    }

    /// Samples every raster of `dir` at every location.
    ///
    /// Any file that fails to open aborts the extraction; no partial table is returned.
    pub fn extract(
        &self,
        dir: &Path,
        locations: &[Location],
        strategy: ExtractionStrategy,
    ) -> Result<RasterValueTable, RasterError> {
        let files = list_raster_files(dir)?;
        let started = Instant::now();
        info!(
            "Sampling {} raster file(s) from {} at {} location(s) ({:?})",
            files.len(),
            dir.display(),
            locations.len(),
            strategy
        );
        let table = match strategy {
            ExtractionStrategy::WholeGrid => self.whole_grid(&files, locations)?,
            ExtractionStrategy::PerLocation | ExtractionStrategy::Auto => {
                self.per_location(&files, locations)?
            }
        };
        info!(
            "Sampled {} dates in {:?}",
            table.dates().len(),
            started.elapsed()
        );
        Ok(table)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn RasterDataset>, RasterError> {
        self.opener.open(path)
    }

    fn band_dates(&self, path: &Path, dataset: &dyn RasterDataset) -> Result<Vec<OrdinalDate>, RasterError> {
        let axis = dataset.time_axis()?;
        if axis.offsets_days.len() != dataset.band_count() {
            return Err(RasterError::TimeAxis {
                path: path.to_path_buf(),
                message: format!(
                    "{} time values for {} bands",
                    axis.offsets_days.len(),
                    dataset.band_count()
                ),
            });
        }
        axis.band_dates().map_err(|message| RasterError::TimeAxis {
            path: path.to_path_buf(),
            message,
        })
    }

    fn per_location(
        &self,
        files: &[PathBuf],
        locations: &[Location],
    ) -> Result<RasterValueTable, RasterError> {
        // Every file is opened once up front so a bad file fails before any sampling.
        let mut dates = Vec::new();
        for path in files {
            let dataset = self.open(path)?;
            dates.extend(self.band_dates(path, dataset.as_ref())?);
        }
        let mut table = RasterValueTable::new(dates)?;

        for location in locations {
            let mut series = Vec::with_capacity(table.dates().len());
            for path in files {
                let dataset = self.open(path)?;
                let pixel = dataset.geo_transform().pixel_in(
                    location.longitude,
                    location.latitude,
                    dataset.width(),
                    dataset.height(),
                );
                for band in 0..dataset.band_count() {
                    let value = match pixel {
                        Some((px, py)) => sanitize(dataset.read_pixel(band, px, py)?, dataset.no_data()),
                        None => NO_DATA,
                    };
                    series.push(value);
                }
            }
            debug!("Sampled location {}", location.id);
            table.insert_series(location.id, series)?;
        }
        Ok(table)
    }

    fn whole_grid(
        &self,
        files: &[PathBuf],
        locations: &[Location],
    ) -> Result<RasterValueTable, RasterError> {
        let mut dates = Vec::new();
        let mut grids = Vec::new();
        for path in files {
            let file_started = Instant::now();
            let dataset = self.open(path)?;
            let band_dates = self.band_dates(path, dataset.as_ref())?;
            for (band, date) in band_dates.into_iter().enumerate() {
                grids.push(BandGrid {
                    transform: dataset.geo_transform(),
                    width: dataset.width(),
                    height: dataset.height(),
                    no_data: dataset.no_data(),
                    cells: dataset.read_band(band)?,
                });
                dates.push(date);
            }
            info!("Read {} in {:?}", path.display(), file_started.elapsed());
        }
        let mut table = RasterValueTable::new(dates)?;

        for location in locations {
            let series = grids
                .iter()
                .map(|grid| {
                    grid.transform
                        .pixel_in(location.longitude, location.latitude, grid.width, grid.height)
                        .and_then(|(px, py)| grid.cells.get(py * grid.width + px).copied())
                        .map_or(NO_DATA, |value| sanitize(value, grid.no_data))
                })
                .collect();
            table.insert_series(location.id, series)?;
        }
        Ok(table)
    }
}

fn sanitize(value: f32, no_data: Option<f32>) -> f32 {
    if value.is_nan() || no_data.is_some_and(|nd| value == nd) {
        NO_DATA
    } else {
        value
    }
}
