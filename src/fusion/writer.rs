//! Fuses point series with sampled precipitation and writes one WTH file per location.

use crate::fusion::error::FusionError;
use crate::fusion::qc::repair_srad;
use crate::fusion::wth;
use crate::point_data::{artifact_path, parse_point_series};
use crate::raster::{RasterValueTable, NO_DATA};
use crate::types::daily_record::{DailyRecord, PointSeries, Reading, SourceHeader};
use crate::types::location::Location;
use crate::utils::round_decimals;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// The quality-controlled series of one location, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedSeries {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub header: SourceHeader,
    pub records: Vec<DailyRecord>,
    /// SRAD rule that cut the series short, if any.
    pub truncated_by: Option<&'static str>,
}

impl FusedSeries {
    pub fn render(&self) -> String {
        wth::render(&self.header, self.latitude, self.longitude, &self.records)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FusionOutcome {
    Fused(FusedSeries),
    /// SRAD was missing at the start of the series; nothing is written.
    Discarded { rule: &'static str },
}

/// Locations written, cut short or dropped by one fusion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FusionReport {
    pub written: Vec<i64>,
    /// Written, but ended early by an SRAD rule.
    pub truncated: Vec<i64>,
    /// No file written.
    pub discarded: Vec<i64>,
}

impl FusionReport {
    /// Locations whose output is shorter than their point series.
    pub fn qc_truncated(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.truncated.iter().chain(&self.discarded).copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Path of the fused WTH file for location `id` inside `dir`.
pub fn output_path(dir: &Path, id: i64) -> PathBuf {
    dir.join(format!("{}.WTH", id))
}

/// Raster precipitation for `record`, or its point RAIN when the table has no
/// observation for that location and date.
fn fused_rain(record: &DailyRecord, id: i64, precipitation: &RasterValueTable) -> Reading {
    match precipitation.value(id, record.date) {
        Some(value) if value != NO_DATA => Reading::derived(round_decimals(f64::from(value), 1)),
        _ => record.rain2.clone(),
    }
}

pub fn fuse(series: &PointSeries, location: &Location, precipitation: &RasterValueTable) -> FusionOutcome {
    let repair = repair_srad(&series.records);
    if repair.is_discarded() {
        return FusionOutcome::Discarded {
            rule: repair.stopped_by.unwrap_or_default(),
        };
    }
    let records = repair
        .records
        .into_iter()
        .map(|record| DailyRecord {
            rain: fused_rain(&record, location.id, precipitation),
            ..record
        })
        .collect();
    FusionOutcome::Fused(FusedSeries {
        id: location.id,
        latitude: location.latitude,
        longitude: location.longitude,
        header: series.header.clone(),
        records,
        truncated_by: repair.stopped_by,
    })
}

/// Reads the point file of `location` from `point_dir` and writes its fused file to `out_dir`.
pub fn fuse_location(
    location: &Location,
    point_dir: &Path,
    precipitation: &RasterValueTable,
    out_dir: &Path,
) -> Result<FusionOutcome, FusionError> {
    let source = artifact_path(point_dir, location.external_point_id);
    let text = std::fs::read_to_string(&source).map_err(|e| FusionError::PointRead(source.clone(), e))?;
    let series = parse_point_series(&text, &source.display().to_string())?;
    if !precipitation.contains_location(location.id) {
        debug!("Location {} not in precipitation table, keeping point RAIN", location.id);
    }

    let outcome = fuse(&series, location, precipitation);
    if let FusionOutcome::Fused(fused) = &outcome {
        let target = output_path(out_dir, location.id);
        std::fs::write(&target, fused.render()).map_err(|e| FusionError::Write(target.clone(), e))?;
    }
    Ok(outcome)
}

/// Fuses every location in table order.
pub fn fuse_all(
    locations: &[Location],
    point_dir: &Path,
    precipitation: &RasterValueTable,
    out_dir: &Path,
) -> Result<FusionReport, FusionError> {
    if out_dir.exists() {
        info!("Directory {} already exists. Data will be overwritten", out_dir.display());
    }
    std::fs::create_dir_all(out_dir).map_err(|e| FusionError::DirCreation(out_dir.to_path_buf(), e))?;

    let mut report = FusionReport::default();
    for location in locations {
        match fuse_location(location, point_dir, precipitation, out_dir)? {
            FusionOutcome::Fused(fused) => {
                if let Some(rule) = fused.truncated_by {
                    warn!(
                        "Location {} truncated at {} ({})",
                        location.id,
                        fused.records.last().map(|r| r.date.to_string()).unwrap_or_default(),
                        rule
                    );
                    report.truncated.push(location.id);
                }
                report.written.push(location.id);
            }
            FusionOutcome::Discarded { rule } => {
                warn!("Location {} has no usable SRAD at the start ({}), no file written", location.id, rule);
                report.discarded.push(location.id);
            }
        }
    }
    info!(
        "Wrote {} weather file(s) to {}",
        report.written.len(),
        out_dir.display()
    );
    Ok(report)
}
