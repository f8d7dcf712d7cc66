//! Gap filling for solar radiation.
//!
//! Each missing SRAD value is matched against [`SRAD_RULES`] top to bottom and the
//! first rule that applies decides what is written. Neighbour values always come from
//! the unrepaired source series.

use crate::types::daily_record::{DailyRecord, Reading};
use crate::utils::round_decimals;

/// Sentinels the point source uses for SRAD it could not compute.
const MISSING_SRAD: [f64; 2] = [-99.0, -3596.4];

pub fn is_missing_srad(value: f64) -> bool {
    value.is_nan() || MISSING_SRAD.contains(&value)
}

/// What a rule does with the record it matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SradAction {
    /// Emit nothing for the whole series.
    Discard,
    /// Copy the previous source value and stop after this record.
    PreviousThenStop,
    /// `v(i-1) + (v(i+2) - v(i-1)) / 3`
    FirstOfGap,
    /// `v(i-2) + 2 (v(i+1) - v(i-2)) / 3`
    SecondOfGap,
    Previous,
    Next,
    /// `(v(i-1) + v(i+1)) / 2`
    Average,
}

/// Position of a missing record within its series.
#[derive(Debug, Clone, Copy)]
pub struct Gap<'a> {
    pub index: usize,
    pub missing: &'a [bool],
}

impl Gap<'_> {
    fn len(&self) -> usize {
        self.missing.len()
    }

    fn missing_at(&self, offset: isize) -> bool {
        self.index
            .checked_add_signed(offset)
            .and_then(|i| self.missing.get(i))
            .copied()
            .unwrap_or(false)
    }
}

pub struct SradRule {
    pub name: &'static str,
    pub applies: fn(&Gap) -> bool,
    pub action: SradAction,
}

pub const SRAD_RULES: [SradRule; 10] = [
    SradRule {
        name: "single missing record",
        applies: |g| g.len() == 1,
        action: SradAction::Discard,
    },
    SradRule {
        name: "first three records missing",
        applies: |g| g.index == 0 && g.missing_at(1) && g.missing_at(2),
        action: SradAction::Discard,
    },
    SradRule {
        name: "first two records missing",
        applies: |g| g.index == 0 && g.missing_at(1),
        action: SradAction::Discard,
    },
    SradRule {
        name: "three consecutive missing",
        applies: |g| g.missing_at(1) && g.missing_at(2),
        action: SradAction::PreviousThenStop,
    },
    SradRule {
        name: "last two records missing",
        applies: |g| g.missing_at(1) && g.index + 2 == g.len(),
        action: SradAction::PreviousThenStop,
    },
    SradRule {
        name: "first of two missing",
        applies: |g| g.missing_at(1),
        action: SradAction::FirstOfGap,
    },
    SradRule {
        name: "second of two missing",
        applies: |g| g.missing_at(-1),
        action: SradAction::SecondOfGap,
    },
    SradRule {
        name: "last record missing",
        applies: |g| g.index + 1 == g.len(),
        action: SradAction::Previous,
    },
    SradRule {
        name: "first record missing",
        applies: |g| g.index == 0,
        action: SradAction::Next,
    },
    SradRule {
        name: "single gap",
        applies: |_| true,
        action: SradAction::Average,
    },
];

/// Result of repairing one series.
#[derive(Debug, Clone, PartialEq)]
pub struct SradRepair {
    /// Records to emit, SRAD filled in. Empty when the series was discarded.
    pub records: Vec<DailyRecord>,
    /// Name of the rule that ended the series early, if any.
    pub stopped_by: Option<&'static str>,
}

impl SradRepair {
    pub fn is_discarded(&self) -> bool {
        self.records.is_empty() && self.stopped_by.is_some()
    }
}

/// Fills every missing SRAD value of `records`, truncating where a rule says so.
pub fn repair_srad(records: &[DailyRecord]) -> SradRepair {
    let missing: Vec<bool> = records.iter().map(|r| is_missing_srad(r.srad.value())).collect();
    let source = |i: usize| &records[i].srad;
    let value = |i: usize| records[i].srad.value();

    let mut repaired = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        if !missing[index] {
            repaired.push(record.clone());
            continue;
        }
        let gap = Gap {
            index,
            missing: &missing,
        };
        // The last rule always applies.
        let Some(rule) = SRAD_RULES.iter().find(|rule| (rule.applies)(&gap)) else {
            break;
        };

        let srad = match rule.action {
            SradAction::Discard => {
                return SradRepair {
                    records: Vec::new(),
                    stopped_by: Some(rule.name),
                }
            }
            SradAction::PreviousThenStop | SradAction::Previous => source(index - 1).clone(),
            SradAction::Next => source(index + 1).clone(),
            SradAction::FirstOfGap => {
                let (before, after) = (value(index - 1), value(index + 2));
                Reading::derived(round_decimals(before + (after - before) / 3.0, 1))
            }
            SradAction::SecondOfGap => {
                let (before, after) = (value(index - 2), value(index + 1));
                Reading::derived(round_decimals(before + 2.0 * (after - before) / 3.0, 1))
            }
            SradAction::Average => {
                Reading::derived(round_decimals((value(index - 1) + value(index + 1)) / 2.0, 1))
            }
        };
        repaired.push(DailyRecord {
            srad,
            ..record.clone()
        });
        if rule.action == SradAction::PreviousThenStop {
            return SradRepair {
                records: repaired,
                stopped_by: Some(rule.name),
            };
        }
    }
    SradRepair {
        records: repaired,
        stopped_by: None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::ordinal_date::OrdinalDate;

    pub(crate) fn record(day: u32, srad: &str) -> DailyRecord {
        let r = |t: &str| Reading::source(t);
        DailyRecord {
            date: OrdinalDate::from_yo(2023, day).unwrap(),
            t2m: r("22.1"),
            tmin: r("17.3"),
            tmax: r("28.4"),
            tdew: r("18.9"),
            rhum: r("80.1"),
            rain2: r("1.2"),
            wind: r("2.3"),
            srad: r(srad),
            rain: r("1.2"),
        }
    }

    fn series(srad: &[&str]) -> Vec<DailyRecord> {
        srad.iter()
            .enumerate()
            .map(|(i, s)| record(100 + i as u32, s))
            .collect()
    }

    fn rendered(repair: &SradRepair) -> Vec<String> {
        repair.records.iter().map(|r| r.srad.to_string()).collect()
    }

    #[test]
    fn test_missing_markers() {
        for text in ["nan", "NaN", "-99", "-99.0", "-3596.4"] {
            assert!(is_missing_srad(Reading::source(text).value()), "{}", text);
        }
        assert!(!is_missing_srad(0.0));
        assert!(!is_missing_srad(-9.9));
    }

    #[test]
    fn test_single_gap_is_averaged() {
        let repair = repair_srad(&series(&["10", "-99", "12"]));
        assert_eq!(rendered(&repair), ["10", "11.0", "12"]);
        assert_eq!(repair.stopped_by, None);
    }

    #[test]
    fn test_two_day_gap_is_interpolated() {
        let repair = repair_srad(&series(&["10", "-99", "-99", "16"]));
        assert_eq!(rendered(&repair), ["10", "12.0", "14.0", "16"]);
    }

    #[test]
    fn test_three_missing_at_start_discards_series() {
        let repair = repair_srad(&series(&["-99", "-99", "-99", "16", "17"]));
        assert!(repair.is_discarded());
        assert_eq!(repair.stopped_by, Some("first three records missing"));

        let repair = repair_srad(&series(&["-99", "nan", "16"]));
        assert!(repair.is_discarded());
        assert_eq!(repair.stopped_by, Some("first two records missing"));

        assert!(repair_srad(&series(&["-3596.4"])).is_discarded());
    }

    #[test]
    fn test_run_of_three_stops_after_copy() {
        let repair = repair_srad(&series(&["10.5", "11", "-99", "-99", "-99", "16"]));
        assert_eq!(rendered(&repair), ["10.5", "11", "11"]);
        assert_eq!(repair.stopped_by, Some("three consecutive missing"));
    }

    #[test]
    fn test_trailing_pair_stops_after_copy() {
        let repair = repair_srad(&series(&["10", "11.25", "-99", "-99"]));
        assert_eq!(rendered(&repair), ["10", "11.25", "11.25"]);
        assert_eq!(repair.stopped_by, Some("last two records missing"));
    }

    #[test]
    fn test_edges_copy_their_neighbour() {
        let repair = repair_srad(&series(&["-99", "13.40", "12", "-99"]));
        assert_eq!(rendered(&repair), ["13.40", "13.40", "12", "12"]);
        assert!(!repair.records[0].srad.is_derived());
    }

    #[test]
    fn test_repair_is_idempotent() {
        let once = repair_srad(&series(&["-99", "9", "10", "-99", "12", "-99", "-99", "18", "-99"]));
        assert_eq!(
            rendered(&once),
            ["9", "9", "10", "11.0", "12", "14.0", "16.0", "18", "18"]
        );
        let twice = repair_srad(&once.records);
        assert_eq!(twice, SradRepair { records: once.records.clone(), stopped_by: None });
    }
}
