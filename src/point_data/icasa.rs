//! Parser for the ICASA-format documents served by the point API.
//!
//! Blank lines are ignored. Among the remaining lines the station metadata sits on
//! line 12, the column header on line 13 and the daily rows follow.

use crate::point_data::error::PointDataError;
use crate::types::daily_record::{DailyRecord, PointSeries, Reading, SourceHeader, StationFields};
use crate::types::ordinal_date::OrdinalDate;

const STATION_LINE: usize = 11;
const FIRST_DATA_LINE: usize = 13;
const DATA_COLUMNS: usize = 9;

/// Parses a point document. `source_name` only labels errors.
pub fn parse_point_series(text: &str, source_name: &str) -> Result<PointSeries, PointDataError> {
    let malformed = |message: String| PointDataError::MalformedDocument {
        source_name: source_name.to_string(),
        message,
    };

    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < FIRST_DATA_LINE {
        return Err(malformed(format!(
            "expected at least {} header lines, found {}",
            FIRST_DATA_LINE,
            lines.len()
        )));
    }

    let station: Vec<&str> = lines[STATION_LINE].split_whitespace().collect();
    if station.len() < 8 {
        return Err(malformed(format!(
            "station line has {} fields, expected 8",
            station.len()
        )));
    }
    let header = SourceHeader {
        title: lines[0].to_string(),
        station: StationFields {
            insi: station[0].to_string(),
            elevation: station[3].to_string(),
            tav: station[4].to_string(),
            amp: station[5].to_string(),
            refht: station[6].to_string(),
            wndht: station[7].to_string(),
        },
    };

    let mut records = Vec::with_capacity(lines.len() - FIRST_DATA_LINE);
    let mut previous: Option<OrdinalDate> = None;
    for (offset, line) in lines[FIRST_DATA_LINE..].iter().enumerate() {
        let line_number = FIRST_DATA_LINE + offset + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < DATA_COLUMNS {
            return Err(malformed(format!(
                "data line {} has {} fields, expected {}",
                line_number,
                fields.len(),
                DATA_COLUMNS
            )));
        }
        let date: OrdinalDate = fields[0]
            .parse()
            .map_err(|e| malformed(format!("data line {}: {}", line_number, e)))?;
        if previous.is_some_and(|p| p >= date) {
            return Err(malformed(format!(
                "data line {}: date {} does not follow {}",
                line_number,
                date,
                previous.map(|p| p.to_string()).unwrap_or_default()
            )));
        }
        previous = Some(date);

        records.push(DailyRecord {
            date,
            t2m: Reading::source(fields[1]),
            tmin: Reading::source(fields[2]),
            tmax: Reading::source(fields[3]),
            tdew: Reading::source(fields[4]),
            rhum: Reading::source(fields[5]),
            rain2: Reading::source(fields[6]),
            wind: Reading::source(fields[7]),
            srad: Reading::source(fields[8]),
            rain: Reading::source(fields[6]),
        });
    }

    Ok(PointSeries { header, records })
}

/// Builds a syntactically valid point document, used by tests across the crate.
#[cfg(test)]
pub(crate) fn sample_document(rows: &[(&str, &str, &str)]) -> String {
    let mut doc = String::from("$WEATHER DATA : NASA POWER (lat 10.25, lon -84.25)\n");
    for i in 1..=9 {
        doc.push_str(&format!("! header line {}\n", i));
    }
    doc.push_str("@ INSI      WTHLAT    WTHLONG  WELEV   TAV   AMP  REFHT  WNDHT\n");
    doc.push_str("  NASA      10.250    -84.250   1034  21.4   2.1    2.0    2.0\n");
    doc.push_str("@YRDAY  T2M   TMIN  TMAX  TDEW  RH2M  RAIN  WIND  SRAD\n");
    for (date, rain, srad) in rows {
        doc.push_str(&format!(
            "{}  22.1  17.3  28.4  18.9  80.1  {}  2.3  {}\n",
            date, rain, srad
        ));
    }
    doc
}
