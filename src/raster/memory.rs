//! Rasters held entirely in memory, for tests and benchmarks.

use crate::raster::dataset::{GeoTransform, RasterDataset, RasterOpener, TimeAxis};
use crate::raster::error::RasterError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRaster {
    pub time_axis: TimeAxis,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
    pub no_data: Option<f32>,
    /// One row-major grid per band.
    pub bands: Vec<Vec<f32>>,
}

impl MemoryRaster {
    fn band(&self, band: usize) -> Result<&[f32], RasterError> {
        self.bands
            .get(band)
            .map(Vec::as_slice)
            .ok_or_else(|| RasterError::BandRead {
                path: PathBuf::from("<memory>"),
                band,
                message: format!("only {} bands", self.bands.len()),
            })
    }
}

impl RasterDataset for MemoryRaster {
    fn time_axis(&self) -> Result<TimeAxis, RasterError> {
        Ok(self.time_axis.clone())
    }

    fn geo_transform(&self) -> GeoTransform {
        self.transform
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn no_data(&self) -> Option<f32> {
        self.no_data
    }

    fn read_pixel(&self, band: usize, px: usize, py: usize) -> Result<f32, RasterError> {
        let grid = self.band(band)?;
        grid.get(py * self.width + px)
            .copied()
            .ok_or_else(|| RasterError::BandRead {
                path: PathBuf::from("<memory>"),
                band,
                message: format!("pixel ({}, {}) outside grid", px, py),
            })
    }

    fn read_band(&self, band: usize) -> Result<Vec<f32>, RasterError> {
        self.band(band).map(<[f32]>::to_vec)
    }
}

/// Serves [`MemoryRaster`]s by file name; any other file fails to open.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    rasters: HashMap<String, MemoryRaster>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: impl Into<String>, raster: MemoryRaster) {
        self.rasters.insert(file_name.into(), raster);
    }
}

impl RasterOpener for MemoryOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterDataset>, RasterError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        self.rasters
            .get(name)
            .cloned()
            .map(|r| Box::new(r) as Box<dyn RasterDataset>)
            .ok_or_else(|| RasterError::Open {
                path: path.to_path_buf(),
                message: "no such raster".to_string(),
            })
    }
}
