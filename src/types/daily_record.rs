//! Daily weather records as read from the point source and written to WTH files.

use crate::types::ordinal_date::OrdinalDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single numeric cell of a daily record.
///
/// Values copied from the point source keep their original text so that unchanged
/// cells are written back byte for byte. Values produced by QC or substitution are
/// rendered with one decimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reading {
    Source { value: f64, text: String },
    Derived(f64),
}

impl Reading {
    /// Wraps a token from the point source. Unparseable tokens read as NaN.
    pub fn source(text: &str) -> Self {
        Reading::Source {
            value: text.trim().parse().unwrap_or(f64::NAN),
            text: text.to_string(),
        }
    }

    pub fn derived(value: f64) -> Self {
        Reading::Derived(value)
    }

    pub fn value(&self) -> f64 {
        match self {
            Reading::Source { value, .. } => *value,
            Reading::Derived(value) => *value,
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, Reading::Derived(_))
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Delegate padding so `{:>6}` works on the rendered text.
        match self {
            Reading::Source { text, .. } => f.pad(text),
            Reading::Derived(value) => f.pad(&format!("{:.1}", value)),
        }
    }
}

/// One day of weather in WTH column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: OrdinalDate,
    pub t2m: Reading,
    pub tmin: Reading,
    pub tmax: Reading,
    pub tdew: Reading,
    pub rhum: Reading,
    /// Precipitation as reported by the point source.
    pub rain2: Reading,
    pub wind: Reading,
    pub srad: Reading,
    /// Precipitation after raster substitution; equals `rain2` until fused.
    pub rain: Reading,
}

/// Station fields copied from the point source header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationFields {
    pub insi: String,
    pub elevation: String,
    pub tav: String,
    pub amp: String,
    pub refht: String,
    pub wndht: String,
}

/// The parts of a point source document carried into the fused output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHeader {
    /// First line of the document, without its line terminator.
    pub title: String,
    pub station: StationFields,
}

/// A meteorological series for one point, in date order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSeries {
    pub header: SourceHeader,
    pub records: Vec<DailyRecord>,
}

impl PointSeries {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<OrdinalDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<OrdinalDate> {
        self.records.last().map(|r| r.date)
    }
}
