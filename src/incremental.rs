//! Extends previously built WTH files with newly fused days.

use crate::fusion::wth::HEADER_LINES;
use crate::fusion::output_path;
use crate::types::ordinal_date::OrdinalDate;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IncrementalError {
    #[error("Failed to list directory '{0}'")]
    DirRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to create directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to copy '{0}'")]
    Copy(PathBuf, #[source] std::io::Error),

    #[error("Failed to read weather file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to write weather file '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Weather file '{0}' has no daily records")]
    NoRecords(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub selected: Vec<i64>,
    /// Requested ids without a file in the historical directory.
    pub not_found: Vec<i64>,
    /// Files holding only a header, left out of the update.
    pub no_records: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub merged: Vec<i64>,
    /// Historical files with no new counterpart, left as they were.
    pub not_updated: Vec<i64>,
}

/// `<id>.WTH` files of `dir`, keyed by id.
fn wth_files(dir: &Path) -> Result<BTreeMap<i64, PathBuf>, IncrementalError> {
    let entries = std::fs::read_dir(dir).map_err(|e| IncrementalError::DirRead(dir.to_path_buf(), e))?;
    let mut files = BTreeMap::new();
    for entry in entries {
        let path = entry
            .map_err(|e| IncrementalError::DirRead(dir.to_path_buf(), e))?
            .path();
        if path.extension().and_then(|e| e.to_str()) != Some("WTH") {
            continue;
        }
        if let Some(id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<i64>().ok())
        {
            files.insert(id, path);
        }
    }
    Ok(files)
}

/// Copies the historical files of `ids` from `in_dir` into `out_dir`.
pub fn select_historical(ids: &[i64], in_dir: &Path, out_dir: &Path) -> Result<Selection, IncrementalError> {
    std::fs::create_dir_all(out_dir).map_err(|e| IncrementalError::DirCreation(out_dir.to_path_buf(), e))?;
    let mut selection = Selection::default();
    for &id in ids {
        let source = output_path(in_dir, id);
        if !source.is_file() {
            warn!("{}.WTH NOT FOUND", id);
            selection.not_found.push(id);
            continue;
        }
        let text = std::fs::read_to_string(&source).map_err(|e| IncrementalError::Read(source.clone(), e))?;
        if last_record_date(&text).is_none() {
            warn!("{}.WTH has no daily records and will not be updated", id);
            selection.no_records.push(id);
            continue;
        }
        std::fs::copy(&source, output_path(out_dir, id)).map_err(|e| IncrementalError::Copy(source.clone(), e))?;
        selection.selected.push(id);
    }
    info!(
        "Selected {} historical file(s), {} not found, {} without records",
        selection.selected.len(),
        selection.not_found.len(),
        selection.no_records.len()
    );
    Ok(selection)
}

/// Date of the first token of a WTH line, if it is a daily row.
fn row_date(line: &str) -> Option<OrdinalDate> {
    line.split_whitespace().next()?.parse().ok()
}

/// Date of the last daily row of a WTH document.
pub fn last_record_date(text: &str) -> Option<OrdinalDate> {
    text.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(row_date)
}

/// First day to fetch so that no file in `dir` is left with a gap: the day after the
/// earliest last record date. `None` when the directory holds no WTH files.
pub fn continuation_start(dir: &Path) -> Result<Option<NaiveDate>, IncrementalError> {
    let mut earliest: Option<OrdinalDate> = None;
    for path in wth_files(dir)?.into_values() {
        let text = std::fs::read_to_string(&path).map_err(|e| IncrementalError::Read(path.clone(), e))?;
        let last = last_record_date(&text).ok_or(IncrementalError::NoRecords(path))?;
        earliest = Some(earliest.map_or(last, |e| e.min(last)));
    }
    Ok(earliest.and_then(|date| date.next()).map(|date| date.date()))
}

/// `historical` followed by the daily rows of `update` dated after the historical
/// last record. Returns the text and the number of rows appended.
pub fn append_rows(historical: &str, update: &str) -> (String, usize) {
    let last = last_record_date(historical);
    let mut merged = historical.to_string();
    if !merged.is_empty() && !merged.ends_with('\n') {
        merged.push('\n');
    }
    let mut appended = 0;
    for line in update.lines().filter(|l| !l.trim().is_empty()).skip(HEADER_LINES) {
        if let (Some(last), Some(date)) = (last, row_date(line)) {
            if date <= last {
                continue;
            }
        }
        merged.push_str(line);
        merged.push('\n');
        appended += 1;
    }
    (merged, appended)
}

/// Writes every historical file of `historical_dir` to `out_dir`, extended with its
/// counterpart in `update_dir` when there is one.
pub fn merge_wth(historical_dir: &Path, update_dir: &Path, out_dir: &Path) -> Result<MergeReport, IncrementalError> {
    std::fs::create_dir_all(out_dir).map_err(|e| IncrementalError::DirCreation(out_dir.to_path_buf(), e))?;
    let updates = wth_files(update_dir)?;
    let mut report = MergeReport::default();

    for (id, historical_path) in wth_files(historical_dir)? {
        let Some(update_path) = updates.get(&id) else {
            warn!("The file {}.WTH will not be updated.", id);
            report.not_updated.push(id);
            continue;
        };
        let historical = std::fs::read_to_string(&historical_path)
            .map_err(|e| IncrementalError::Read(historical_path.clone(), e))?;
        let update = std::fs::read_to_string(update_path)
            .map_err(|e| IncrementalError::Read(update_path.clone(), e))?;

        let (merged, appended) = append_rows(&historical, &update);
        let target = output_path(out_dir, id);
        std::fs::write(&target, merged).map_err(|e| IncrementalError::Write(target.clone(), e))?;
        debug!("Appended {} day(s) to {}", appended, target.display());
        report.merged.push(id);
    }
    info!(
        "Updated {} file(s), {} left unchanged",
        report.merged.len(),
        report.not_updated.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::qc::tests::record;
    use crate::fusion::wth::render;
    use crate::types::daily_record::{SourceHeader, StationFields};

    fn header() -> SourceHeader {
        SourceHeader {
            title: "$WEATHER DATA : NASA POWER".to_string(),
            station: StationFields {
                insi: "NASA".to_string(),
                elevation: "12".to_string(),
                tav: "25.0".to_string(),
                amp: "3.0".to_string(),
                refht: "2.0".to_string(),
                wndht: "2.0".to_string(),
            },
        }
    }

    fn wth(days: std::ops::RangeInclusive<u32>) -> String {
        let records: Vec<_> = days.map(|d| record(d, "18.0")).collect();
        render(&header(), 10.0, -84.0, &records)
    }

    fn dates(text: &str) -> Vec<String> {
        text.lines()
            .filter_map(row_date)
            .map(|d| d.to_string())
            .collect()
    }

    #[test]
    fn test_continuation_has_no_gap_or_duplicate() {
        let (merged, appended) = append_rows(&wth(98..=100), &wth(101..=102));
        assert_eq!(appended, 2);
        assert_eq!(dates(&merged), ["2023098", "2023099", "2023100", "2023101", "2023102"]);
        assert!(merged.starts_with(&wth(98..=100)));
    }

    #[test]
    fn test_overlapping_rows_are_skipped() {
        let (merged, appended) = append_rows(&wth(98..=101), &wth(100..=102));
        assert_eq!(appended, 1);
        assert_eq!(dates(&merged), ["2023098", "2023099", "2023100", "2023101", "2023102"]);
    }

    #[test]
    fn test_last_record_date() {
        assert_eq!(last_record_date(&wth(1..=45)).unwrap().to_string(), "2023045");
        assert_eq!(last_record_date(&format!("{}\n\n", wth(1..=2))).unwrap().to_string(), "2023002");
        assert_eq!(last_record_date(&crate::fusion::wth::render_header(&header(), 1.0, 1.0)), None);
    }

    #[test]
    fn test_select_merge_and_continuation() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        let historical = dir.path().join("historical");
        let update = dir.path().join("update");
        let out = dir.path().join("out");
        std::fs::create_dir(&repo).unwrap();
        std::fs::create_dir(&update).unwrap();
        std::fs::write(output_path(&repo, 1), wth(90..=100)).unwrap();
        std::fs::write(output_path(&repo, 2), wth(90..=98)).unwrap();
        std::fs::write(output_path(&repo, 3), wth(90..=100)).unwrap();

        let selection = select_historical(&[1, 2, 4], &repo, &historical).unwrap();
        assert_eq!(selection.selected, [1, 2]);
        assert_eq!(selection.not_found, [4]);

        // The earliest last date decides.
        assert_eq!(
            continuation_start(&historical).unwrap(),
            NaiveDate::from_ymd_opt(2023, 4, 9)
        );

        std::fs::write(output_path(&update, 1), wth(99..=102)).unwrap();
        let report = merge_wth(&historical, &update, &out).unwrap();
        assert_eq!(report.merged, [1]);
        assert_eq!(report.not_updated, [2]);
        assert!(!output_path(&out, 2).exists());
        let merged = std::fs::read_to_string(output_path(&out, 1)).unwrap();
        assert_eq!(dates(&merged).last().unwrap(), "2023102");
        assert_eq!(dates(&merged).len(), 13);
    }

    #[test]
    fn test_header_only_file_is_not_selected() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        let historical = dir.path().join("historical");
        std::fs::create_dir(&repo).unwrap();
        std::fs::write(output_path(&repo, 1), wth(90..=100)).unwrap();
        std::fs::write(
            output_path(&repo, 2),
            crate::fusion::wth::render_header(&header(), 10.0, -84.0),
        )
        .unwrap();

        let selection = select_historical(&[1, 2], &repo, &historical).unwrap();
        assert_eq!(selection.selected, [1]);
        assert_eq!(selection.no_records, [2]);
        assert!(!output_path(&historical, 2).exists());
        assert_eq!(
            continuation_start(&historical).unwrap(),
            NaiveDate::from_ymd_opt(2023, 4, 11)
        );
    }

    #[test]
    fn test_empty_historical_directory_has_no_start() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(continuation_start(dir.path()).unwrap(), None);
    }
}
