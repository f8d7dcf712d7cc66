//! The input point list: one row per output location, each tied to the NASA POWER
//! grid point (`nasapid`) it draws its meteorology from.

use log::{info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Columns the point list must carry, in the order they are documented.
pub const REQUIRED_COLUMNS: [&str; 6] = ["ID", "Latitude", "Longitude", "nasapid", "LatNP", "LonNP"];

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Failed to read point list '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("Point list '{path}' is missing required column(s): {}", missing.join(", "))]
    MissingColumns { path: PathBuf, missing: Vec<String> },

    #[error("Column '{column}' of point list '{path}' could not be read as a number")]
    ColumnType {
        path: PathBuf,
        column: String,
        #[source]
        source: PolarsError,
    },

    #[error("Row {row} of point list '{path}' has no value for '{column}'")]
    EmptyValue {
        path: PathBuf,
        row: usize,
        column: String,
    },

    #[error("Row {row} of point list '{path}' has coordinates out of range ({latitude}, {longitude})")]
    CoordinatesOutOfRange {
        path: PathBuf,
        row: usize,
        latitude: f64,
        longitude: f64,
    },

    #[error("Location ID {id} appears more than once in point list '{path}'")]
    DuplicateId { path: PathBuf, id: i64 },
}

/// A single location of the point list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Output identifier; the fused file is named `<id>.WTH`.
    pub id: i64,
    /// NASA POWER point identifier; several locations may share one.
    pub external_point_id: i64,
    /// Latitude of the location itself, used for raster sampling.
    pub latitude: f64,
    /// Longitude of the location itself, used for raster sampling.
    pub longitude: f64,
    /// Latitude sent to the point API (`LatNP`).
    pub point_latitude: f64,
    /// Longitude sent to the point API (`LonNP`).
    pub point_longitude: f64,
}

/// The validated point list, in input order.
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    locations: Vec<Location>,
}

impl LocationTable {
    pub fn new(locations: Vec<Location>) -> Self {
        Self { locations }
    }

    /// Reads and validates a point list CSV.
    ///
    /// Fails before any row is interpreted if a required column is absent, so a bad
    /// input never triggers network or disk work.
    pub fn from_csv(path: &Path) -> Result<Self, LocationError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(|e| LocationError::CsvRead(path.to_path_buf(), e))?
            .finish()
            .map_err(|e| LocationError::CsvRead(path.to_path_buf(), e))?;

        let present: HashSet<&str> = df.get_column_names().into_iter().map(|c| c.as_str()).collect();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !present.contains(*c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LocationError::MissingColumns {
                path: path.to_path_buf(),
                missing,
            });
        }

        let ids = int_column(&df, path, "ID")?;
        let point_ids = int_column(&df, path, "nasapid")?;
        let latitudes = float_column(&df, path, "Latitude")?;
        let longitudes = float_column(&df, path, "Longitude")?;
        let point_latitudes = float_column(&df, path, "LatNP")?;
        let point_longitudes = float_column(&df, path, "LonNP")?;

        let mut seen = HashSet::with_capacity(df.height());
        let mut locations = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let location = Location {
                id: required(path, row, "ID", ids[row])?,
                external_point_id: required(path, row, "nasapid", point_ids[row])?,
                latitude: required(path, row, "Latitude", latitudes[row])?,
                longitude: required(path, row, "Longitude", longitudes[row])?,
                point_latitude: required(path, row, "LatNP", point_latitudes[row])?,
                point_longitude: required(path, row, "LonNP", point_longitudes[row])?,
            };
            for (latitude, longitude) in [
                (location.latitude, location.longitude),
                (location.point_latitude, location.point_longitude),
            ] {
                if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                    return Err(LocationError::CoordinatesOutOfRange {
                        path: path.to_path_buf(),
                        row,
                        latitude,
                        longitude,
                    });
                }
            }
            if !seen.insert(location.id) {
                return Err(LocationError::DuplicateId {
                    path: path.to_path_buf(),
                    id: location.id,
                });
            }
            locations.push(location);
        }

        if locations.is_empty() {
            warn!("Point list {} contains no rows", path.display());
        }
        info!("Loaded {} locations from {}", locations.len(), path.display());
        Ok(Self { locations })
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Output identifiers in input order.
    pub fn ids(&self) -> Vec<i64> {
        self.locations.iter().map(|l| l.id).collect()
    }

    /// One location per distinct point API identifier, keeping the first row of each.
    pub fn distinct_points(&self) -> Vec<Location> {
        let mut seen = HashSet::new();
        self.locations
            .iter()
            .filter(|l| seen.insert(l.external_point_id))
            .cloned()
            .collect()
    }
}

fn required<T>(path: &Path, row: usize, column: &str, value: Option<T>) -> Result<T, LocationError> {
    value.ok_or_else(|| LocationError::EmptyValue {
        path: path.to_path_buf(),
        row,
        column: column.to_string(),
    })
}

fn float_column(df: &DataFrame, path: &Path, name: &str) -> Result<Vec<Option<f64>>, LocationError> {
    let type_error = |source| LocationError::ColumnType {
        path: path.to_path_buf(),
        column: name.to_string(),
        source,
    };
    let series = df
        .column(name)
        .map_err(type_error)?
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(type_error)?;
    let values = series.f64().map_err(type_error)?;
    Ok(values.into_iter().collect())
}

// Identifiers may be written as floats ("12.0"); they are truncated to integers.
fn int_column(df: &DataFrame, path: &Path, name: &str) -> Result<Vec<Option<i64>>, LocationError> {
    Ok(float_column(df, path, name)?
        .into_iter()
        .map(|v| v.filter(|f| f.is_finite()).map(|f| f as i64))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write csv");
        file.flush().expect("flush csv");
        file
    }

    #[test]
    fn test_loads_points_and_deduplicates_fetch_targets() {
        let file = write_csv(
            "ID,Latitude,Longitude,nasapid,LatNP,LonNP\n\
             1,10.5,-84.25,100,10.25,-84.25\n\
             2,10.6,-84.20,100,10.25,-84.25\n\
             3,11.0,-85.00,101.0,11.25,-85.25\n",
        );
        let table = LocationTable::from_csv(file.path()).expect("valid table");
        assert_eq!(table.len(), 3);
        assert_eq!(table.ids(), vec![1, 2, 3]);

        let points = table.distinct_points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].id, 1);
        assert_eq!(points[1].external_point_id, 101);
        assert_eq!(points[1].point_longitude, -85.25);
    }

    #[test]
    fn test_missing_column_is_reported_before_rows() {
        let file = write_csv("ID,Latitude,Longitude,nasapid\n1,10.5,-84.25,100\n");
        match LocationTable::from_csv(file.path()) {
            Err(LocationError::MissingColumns { missing, .. }) => {
                assert_eq!(missing, vec!["LatNP".to_string(), "LonNP".to_string()]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let file = write_csv(
            "ID,Latitude,Longitude,nasapid,LatNP,LonNP\n\
             7,10.5,-84.25,100,10.25,-84.25\n\
             7,10.6,-84.20,101,10.25,-84.25\n",
        );
        assert!(matches!(
            LocationTable::from_csv(file.path()),
            Err(LocationError::DuplicateId { id: 7, .. })
        ));
    }

    #[test]
    fn test_out_of_range_coordinates_are_rejected() {
        let file = write_csv(
            "ID,Latitude,Longitude,nasapid,LatNP,LonNP\n\
             1,95.0,-84.25,100,10.25,-84.25\n",
        );
        assert!(matches!(
            LocationTable::from_csv(file.path()),
            Err(LocationError::CoordinatesOutOfRange { row: 0, .. })
        ));
    }
}
