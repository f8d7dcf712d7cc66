//! Location x date table of sampled precipitation values.

use crate::raster::error::RasterError;
use crate::types::ordinal_date::OrdinalDate;
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Value stored where the raster has no observation for a cell and date.
pub const NO_DATA: f32 = -9999.0;

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Sampled raster values, one series per location over a shared date axis.
///
/// Every series has exactly one value per date; cells without an observation hold
/// [`NO_DATA`]. Dates are strictly increasing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RasterValueTable {
    dates: Vec<OrdinalDate>,
    values: BTreeMap<i64, Vec<f32>>,
}

impl RasterValueTable {
    /// An empty table over `dates`.
    pub fn new(dates: Vec<OrdinalDate>) -> Result<Self, RasterError> {
        if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(RasterError::UnorderedDates {
                previous: pair[0].to_string(),
                next: pair[1].to_string(),
            });
        }
        Ok(Self {
            dates,
            values: BTreeMap::new(),
        })
    }

    /// Adds or replaces the series of one location.
    pub fn insert_series(&mut self, id: i64, series: Vec<f32>) -> Result<(), RasterError> {
        if series.len() != self.dates.len() {
            return Err(RasterError::SeriesLength {
                id,
                expected: self.dates.len(),
                found: series.len(),
            });
        }
        self.values.insert(id, series);
        Ok(())
    }

    pub fn dates(&self) -> &[OrdinalDate] {
        &self.dates
    }

    pub fn first_date(&self) -> Option<OrdinalDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<OrdinalDate> {
        self.dates.last().copied()
    }

    pub fn location_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.values.keys().copied()
    }

    pub fn contains_location(&self, id: i64) -> bool {
        self.values.contains_key(&id)
    }

    pub fn series(&self, id: i64) -> Option<&[f32]> {
        self.values.get(&id).map(Vec::as_slice)
    }

    /// Index of `date` on the date axis.
    pub fn date_index(&self, date: OrdinalDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Value for a location and date; `None` when either is not in the table.
    pub fn value(&self, id: i64, date: OrdinalDate) -> Option<f32> {
        let index = self.date_index(date)?;
        self.values.get(&id).map(|series| series[index])
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Writes the table as bincode.
    pub fn save(&self, path: &Path) -> Result<(), RasterError> {
        let bytes = bincode::serde::encode_to_vec(self, BINCODE_CONFIG)
            .map_err(|e| RasterError::TableEncode(Box::new(e)))?;
        std::fs::write(path, &bytes).map_err(|e| RasterError::TableWrite(path.to_path_buf(), e))?;
        info!(
            "Wrote value table ({} locations x {} dates, {} bytes) to {}",
            self.values.len(),
            self.dates.len(),
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    /// Reads a table written by [`RasterValueTable::save`].
    pub fn load(path: &Path) -> Result<Self, RasterError> {
        let bytes = std::fs::read(path).map_err(|e| RasterError::TableRead(path.to_path_buf(), e))?;
        let (table, _): (RasterValueTable, usize) =
            bincode::serde::decode_from_slice(&bytes, BINCODE_CONFIG)
                .map_err(|e| RasterError::TableDecode(path.to_path_buf(), Box::new(e)))?;
        Ok(table)
    }
}
