//! Joins the corrected and preliminary precipitation tables into one series.
//!
//! The corrected product lags weeks behind real time; the preliminary product fills
//! the gap up to the requested end date.

use crate::raster::{RasterError, RasterValueTable, NO_DATA};
use crate::types::ordinal_date::{DateRange, OrdinalDate};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct PrecipitationMerge {
    pub table: RasterValueTable,
    /// The corrected table already covered the end date, or no preliminary table was given.
    pub skipped_preliminary: bool,
    /// Locations present in only one of the two tables. Their values on the dates of
    /// the table they are missing from are [`NO_DATA`].
    pub divergent_ids: Vec<i64>,
}

/// First day that must come from the preliminary product, or `None` when the
/// corrected table already reaches the end of `range`.
pub fn preliminary_start(corrected: &RasterValueTable, range: &DateRange) -> Option<NaiveDate> {
    let start = match corrected.last_date() {
        Some(last) => last.next()?.date(),
        None => range.start,
    };
    (start <= range.end).then_some(start)
}

/// Appends the preliminary dates strictly after the corrected table's last date.
///
/// Nothing is averaged or overwritten: each date's values come from exactly one table.
pub fn merge_precipitation(
    corrected: &RasterValueTable,
    preliminary: Option<&RasterValueTable>,
    end: OrdinalDate,
) -> Result<PrecipitationMerge, RasterError> {
    let preliminary = match preliminary {
        Some(table) if corrected.last_date().map_or(true, |last| last < end) => table,
        _ => {
            info!("Corrected precipitation covers the requested period, preliminary data not used");
            return Ok(PrecipitationMerge {
                table: corrected.clone(),
                skipped_preliminary: true,
                divergent_ids: Vec::new(),
            });
        }
    };

    let tail_start = match corrected.last_date() {
        Some(last) => preliminary.dates().partition_point(|d| *d <= last),
        None => 0,
    };
    let tail = &preliminary.dates()[tail_start..];
    let mut dates = corrected.dates().to_vec();
    dates.extend_from_slice(tail);

    let corrected_ids: BTreeSet<i64> = corrected.location_ids().collect();
    let preliminary_ids: BTreeSet<i64> = preliminary.location_ids().collect();
    let divergent_ids: Vec<i64> = corrected_ids
        .symmetric_difference(&preliminary_ids)
        .copied()
        .collect();
    if !divergent_ids.is_empty() {
        warn!(
            "Locations missing from one precipitation table, filled with no-data: {:?}",
            divergent_ids
        );
    }

    let mut table = RasterValueTable::new(dates)?;
    for id in corrected_ids.union(&preliminary_ids) {
        let mut series = match corrected.series(*id) {
            Some(values) => values.to_vec(),
            None => vec![NO_DATA; corrected.dates().len()],
        };
        match preliminary.series(*id) {
            Some(values) => series.extend_from_slice(&values[tail_start..]),
            None => series.extend(std::iter::repeat(NO_DATA).take(tail.len())),
        }
        table.insert_series(*id, series)?;
    }

    info!(
        "Merged precipitation: {} corrected + {} preliminary dates",
        corrected.dates().len(),
        tail.len()
    );
    Ok(PrecipitationMerge {
        table,
        skipped_preliminary: false,
        divergent_ids,
    })
}
