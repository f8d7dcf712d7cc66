//! The boundary between the extractor and whatever library reads raster files.

use crate::raster::error::RasterError;
use crate::types::ordinal_date::OrdinalDate;
use chrono::{Days, NaiveDate, NaiveDateTime};
use std::path::Path;

/// North-up affine transform from pixel to geographic coordinates, holding the
/// four non-rotation terms of a GDAL geotransform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Longitude of the outer edge of column 0.
    pub origin_x: f64,
    pub pixel_width: f64,
    /// Latitude of the outer edge of row 0.
    pub origin_y: f64,
    /// Negative for north-up rasters, positive when row 0 is the southern edge.
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Column and row containing `(longitude, latitude)`, truncated toward zero.
    pub fn pixel(&self, longitude: f64, latitude: f64) -> (i64, i64) {
        let px = ((longitude - self.origin_x) / self.pixel_width) as i64;
        let py = ((latitude - self.origin_y) / self.pixel_height) as i64;
        (px, py)
    }

    /// Like [`GeoTransform::pixel`], but `None` outside a `width` x `height` grid.
    pub fn pixel_in(&self, longitude: f64, latitude: f64, width: usize, height: usize) -> Option<(usize, usize)> {
        let x = (longitude - self.origin_x) / self.pixel_width;
        let y = (latitude - self.origin_y) / self.pixel_height;
        // Truncation would fold (-1, 0) onto column 0.
        if !(x >= 0.0 && y >= 0.0) {
            return None;
        }
        let (px, py) = (x as usize, y as usize);
        (px < width && py < height).then_some((px, py))
    }
}

/// Temporal axis of a raster file: an origin plus one day offset per band.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    pub origin: NaiveDateTime,
    pub offsets_days: Vec<i64>,
}

impl TimeAxis {
    /// Parses a CF `units` attribute such as `days since 1980-1-1 0:0:0`.
    pub fn from_units(units: &str, offsets_days: Vec<i64>) -> Result<Self, String> {
        let (unit, origin) = units
            .split_once(" since ")
            .ok_or_else(|| format!("expected '<unit> since <origin>', got '{}'", units))?;
        if !unit.trim().eq_ignore_ascii_case("days") {
            return Err(format!("unsupported time unit '{}'", unit.trim()));
        }
        let origin = origin.trim();
        let origin = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(origin, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(origin, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(|| format!("unparseable time origin '{}'", origin))?;
        Ok(Self {
            origin,
            offsets_days,
        })
    }

    /// The date of every band, in band order.
    pub fn band_dates(&self) -> Result<Vec<OrdinalDate>, String> {
        self.offsets_days
            .iter()
            .map(|offset| {
                let date = self.origin.date();
                let shifted = if *offset >= 0 {
                    date.checked_add_days(Days::new(offset.unsigned_abs()))
                } else {
                    date.checked_sub_days(Days::new(offset.unsigned_abs()))
                };
                shifted
                    .map(OrdinalDate::new)
                    .ok_or_else(|| format!("band offset {} overflows the calendar", offset))
            })
            .collect()
    }
}

/// One opened raster file with one band per day.
pub trait RasterDataset {
    fn time_axis(&self) -> Result<TimeAxis, RasterError>;

    fn geo_transform(&self) -> GeoTransform;

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn band_count(&self) -> usize;

    /// Value that marks a missing observation, if the file declares one.
    fn no_data(&self) -> Option<f32>;

    /// Raw value of one cell of a band (0-based).
    fn read_pixel(&self, band: usize, px: usize, py: usize) -> Result<f32, RasterError>;

    /// Every cell of a band, row-major with `width` values per row.
    fn read_band(&self, band: usize) -> Result<Vec<f32>, RasterError>;
}

/// Opens raster files by path.
pub trait RasterOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterDataset>, RasterError>;
}

/// Opener used when the crate is built without a raster backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedOpener;

impl RasterOpener for UnsupportedOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterDataset>, RasterError> {
        Err(RasterError::Open {
            path: path.to_path_buf(),
            message: "built without raster support, enable the `netcdf` feature".to_string(),
        })
    }
}

/// The opener for CHIRPS files available in this build.
pub fn default_opener() -> Box<dyn RasterOpener> {
    #[cfg(feature = "netcdf")]
    {
        Box::new(crate::raster::netcdf_file::NetCdfOpener::default())
    }
    #[cfg(not(feature = "netcdf"))]
    {
        Box::new(UnsupportedOpener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chirps_time_units() {
        let axis = TimeAxis::from_units("days since 1980-1-1 0:0:0", vec![15706, 15707]).unwrap();
        let dates = axis.band_dates().unwrap();
        assert_eq!(dates[0].to_string(), "2023001");
        assert_eq!(dates[1].to_string(), "2023002");
    }

    #[test]
    fn test_rejects_non_daily_units() {
        assert!(TimeAxis::from_units("hours since 1980-1-1 0:0:0", vec![]).is_err());
        assert!(TimeAxis::from_units("days after 1980", vec![]).is_err());
    }

    #[test]
    fn test_pixel_lookup() {
        let gt = GeoTransform {
            origin_x: -180.0,
            pixel_width: 0.05,
            origin_y: 50.0,
            pixel_height: -0.05,
        };
        assert_eq!(gt.pixel(-179.99, 49.99), (0, 0));
        assert_eq!(gt.pixel_in(-84.23, 10.51, 7200, 2000), Some((1915, 789)));
        assert_eq!(gt.pixel_in(-84.23, 60.0, 7200, 2000), None);
        assert_eq!(gt.pixel_in(-180.01, 10.0, 7200, 2000), None);
    }

    #[cfg(feature = "netcdf")]
    #[test]
    fn test_default_opener_reads_netcdf() {
        match default_opener().open(Path::new("/nonexistent/chirps.nc")) {
            Err(RasterError::Open { message, .. }) => assert!(!message.contains("built without raster support")),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("a missing file should not open"),
        }
    }
}
