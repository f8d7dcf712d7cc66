//! CHIRPS NetCDF reader built on the `netcdf` crate (requires libnetcdf).

use crate::raster::dataset::{GeoTransform, RasterDataset, RasterOpener, TimeAxis};
use crate::raster::error::RasterError;
use netcdf::AttributeValue;
use std::path::{Path, PathBuf};

const TIME_VARIABLE: &str = "time";
const LONGITUDE_VARIABLES: [&str; 2] = ["longitude", "lon"];
const LATITUDE_VARIABLES: [&str; 2] = ["latitude", "lat"];

/// Opens CHIRPS daily files holding a `(time, latitude, longitude)` variable.
#[derive(Debug, Clone)]
pub struct NetCdfOpener {
    pub data_variable: String,
}

impl Default for NetCdfOpener {
    fn default() -> Self {
        Self {
            data_variable: "precip".to_string(),
        }
    }
}

impl RasterOpener for NetCdfOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterDataset>, RasterError> {
        let open_error = |message: String| RasterError::Open {
            path: path.to_path_buf(),
            message,
        };
        let file = netcdf::open(path).map_err(|e| open_error(e.to_string()))?;

        let data = file
            .variable(&self.data_variable)
            .ok_or_else(|| open_error(format!("no '{}' variable", self.data_variable)))?;
        let dims: Vec<usize> = data.dimensions().iter().map(|d| d.len()).collect();
        let [band_count, height, width] = dims[..] else {
            return Err(open_error(format!(
                "'{}' has {} dimensions, expected 3",
                self.data_variable,
                dims.len()
            )));
        };
        let no_data = f32_attribute(&data, "_FillValue").or_else(|| f32_attribute(&data, "missing_value"));

        let longitudes = coordinate(&file, &LONGITUDE_VARIABLES).map_err(open_error)?;
        let latitudes = coordinate(&file, &LATITUDE_VARIABLES).map_err(open_error)?;
        let (origin_x, pixel_width) = edge_and_step(&longitudes).map_err(open_error)?;
        let (origin_y, pixel_height) = edge_and_step(&latitudes).map_err(open_error)?;

        let time_axis = read_time_axis(&file).map_err(|message| RasterError::TimeAxis {
            path: path.to_path_buf(),
            message,
        })?;

        Ok(Box::new(NetCdfDataset {
            path: path.to_path_buf(),
            data_variable: self.data_variable.clone(),
            time_axis,
            transform: GeoTransform {
                origin_x,
                pixel_width,
                origin_y,
                pixel_height,
            },
            width,
            height,
            band_count,
            no_data,
            file,
        }))
    }
}

pub struct NetCdfDataset {
    path: PathBuf,
    data_variable: String,
    time_axis: TimeAxis,
    transform: GeoTransform,
    width: usize,
    height: usize,
    band_count: usize,
    no_data: Option<f32>,
    file: netcdf::File,
}

impl NetCdfDataset {
    fn band_error(&self, band: usize, message: String) -> RasterError {
        RasterError::BandRead {
            path: self.path.clone(),
            band,
            message,
        }
    }

    fn data(&self, band: usize) -> Result<netcdf::Variable<'_>, RasterError> {
        self.file
            .variable(&self.data_variable)
            .ok_or_else(|| self.band_error(band, format!("no '{}' variable", self.data_variable)))
    }
}

impl RasterDataset for NetCdfDataset {
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
        self.band_count
    }

    fn no_data(&self) -> Option<f32> {
        self.no_data
    }

    fn read_pixel(&self, band: usize, px: usize, py: usize) -> Result<f32, RasterError> {
        self.data(band)?
            .get_value::<f32, _>([band, py, px])
            .map_err(|e| self.band_error(band, e.to_string()))
    }

    fn read_band(&self, band: usize) -> Result<Vec<f32>, RasterError> {
        self.data(band)?
            .get_values::<f32, _>((band, .., ..))
            .map_err(|e| self.band_error(band, e.to_string()))
    }
}

fn f32_attribute(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !var.attributes().any(|attr| attr.name() == name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    f32::try_from(value).ok()
}

fn coordinate(file: &netcdf::File, names: &[&str]) -> Result<Vec<f64>, String> {
    let var = names
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| format!("none of the coordinate variables {:?}", names))?;
    var.get_values::<f64, _>(..).map_err(|e| e.to_string())
}

/// Outer edge of the first cell and the signed cell size of a regular axis.
fn edge_and_step(centers: &[f64]) -> Result<(f64, f64), String> {
    match centers {
        [first, second, ..] => {
            let step = second - first;
            Ok((first - step / 2.0, step))
        }
        _ => Err(format!("coordinate axis has {} value(s)", centers.len())),
    }
}

fn read_time_axis(file: &netcdf::File) -> Result<TimeAxis, String> {
    let time = file
        .variable(TIME_VARIABLE)
        .ok_or_else(|| format!("no '{}' variable", TIME_VARIABLE))?;
    let units = match time.attribute_value("units") {
        Some(Ok(AttributeValue::Str(units))) => units,
        _ => return Err("time variable has no string 'units' attribute".to_string()),
    };
    let offsets = time
        .get_values::<f64, _>(..)
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|offset| offset.round() as i64)
        .collect();
    TimeAxis::from_units(&units, offsets)
}
