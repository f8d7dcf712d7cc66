//! Text layout of DSSAT WTH files.

use crate::types::daily_record::{DailyRecord, SourceHeader};
use crate::utils::{float_repr, round_decimals};
use std::fmt::Write;

/// Non-blank lines before the first daily row: title, station labels, station
/// values and column labels.
pub const HEADER_LINES: usize = 4;

fn station_line(fields: [&str; 8]) -> String {
    let [insi, lat, lon, elev, tav, amp, refht, wndht] = fields;
    format!(
        "{:>6} {:>9} {:>9} {:>7} {:>5} {:>5} {:>5} {:>5}",
        insi, lat, lon, elev, tav, amp, refht, wndht
    )
}

fn row_line(fields: [&dyn std::fmt::Display; 10]) -> String {
    let [date, t2m, tmin, tmax, tdew, rhum, rain2, wind, srad, rain] = fields;
    format!(
        "{:>7} {:>5} {:>5} {:>5} {:>5} {:>5} {:>6} {:>6} {:>6} {:>6}",
        date, t2m, tmin, tmax, tdew, rhum, rain2, wind, srad, rain
    )
}

/// Header block for a location at `latitude`, `longitude`.
pub fn render_header(header: &SourceHeader, latitude: f64, longitude: f64) -> String {
    let station = &header.station;
    let lat = float_repr(round_decimals(latitude, 5));
    let lon = float_repr(round_decimals(longitude, 5));
    let mut text = String::new();
    text.push_str(&header.title);
    text.push_str("\n\n\n");
    text.push_str(&station_line([
        "@ INSI", "LAT", "LONG", "ELEV", "TAV", "AMP", "REFHT", "WNDHT",
    ]));
    text.push('\n');
    text.push_str(&station_line([
        &station.insi,
        &lat,
        &lon,
        &station.elevation,
        &station.tav,
        &station.amp,
        &station.refht,
        &station.wndht,
    ]));
    text.push_str("\n\n");
    text.push_str(&row_line([
        &"@  DATE", &"T2M", &"TMIN", &"TMAX", &"TDEW", &"RHUM", &"RAIN2", &"WIND", &"SRAD", &"RAIN",
    ]));
    text.push('\n');
    text
}

pub fn render_record(record: &DailyRecord) -> String {
    row_line([
        &record.date,
        &record.t2m,
        &record.tmin,
        &record.tmax,
        &record.tdew,
        &record.rhum,
        &record.rain2,
        &record.wind,
        &record.srad,
        &record.rain,
    ])
}

/// A complete WTH document.
pub fn render(header: &SourceHeader, latitude: f64, longitude: f64, records: &[DailyRecord]) -> String {
    let mut text = render_header(header, latitude, longitude);
    for record in records {
        // Writing to a String cannot fail.
        let _ = writeln!(text, "{}", render_record(record));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::qc::tests::record;
    use crate::types::daily_record::{Reading, StationFields};

    fn header() -> SourceHeader {
        SourceHeader {
            title: "$WEATHER DATA : NASA POWER".to_string(),
            station: StationFields {
                insi: "NASA".to_string(),
                elevation: "1034".to_string(),
                tav: "21.4".to_string(),
                amp: "2.1".to_string(),
                refht: "2.0".to_string(),
                wndht: "2.0".to_string(),
            },
        }
    }

    #[test]
    fn test_document_layout() {
        let mut second = record(101, "-99");
        second.srad = Reading::derived(11.0);
        second.rain = Reading::derived(5.3);
        let text = render(&header(), 10.123456, -84.2, &[record(100, "18.5"), second]);

        let expected = concat!(
            "$WEATHER DATA : NASA POWER\n",
            "\n",
            "\n",
            "@ INSI       LAT      LONG    ELEV   TAV   AMP REFHT WNDHT\n",
            "  NASA  10.12346     -84.2    1034  21.4   2.1   2.0   2.0\n",
            "\n",
            "@  DATE   T2M  TMIN  TMAX  TDEW  RHUM  RAIN2   WIND   SRAD   RAIN\n",
            "2023100  22.1  17.3  28.4  18.9  80.1    1.2    2.3   18.5    1.2\n",
            "2023101  22.1  17.3  28.4  18.9  80.1    1.2    2.3   11.0    5.3\n",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_header_has_fixed_line_count() {
        let text = render_header(&header(), 1.0, 2.0);
        assert_eq!(text.lines().filter(|l| !l.trim().is_empty()).count(), HEADER_LINES);
        assert!(text.contains("       1.0       2.0"));
    }
}
