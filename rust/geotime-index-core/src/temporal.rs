//! Temporal binning for the time dimension.
//!
//! Time is not indexed on a single unbounded axis. Instead every timestamp is
//! assigned to a calendar *bin* (a minute, hour, day, week, month, year or
//! decade, all in UTC), and only the offset of the timestamp within its bin is
//! discretized by the space-filling curve. The bin itself becomes part of the
//! insertion ID, in front of the curve index, so rows from the same bin stay
//! contiguous in key order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use geotime_common::{Result, error::Error};
use serde::{Deserialize, Serialize};

const MINUTE_MILLIS: i64 = 60_000;
const HOUR_MILLIS: i64 = 60 * MINUTE_MILLIS;
const DAY_MILLIS: i64 = 24 * HOUR_MILLIS;
const WEEK_MILLIS: i64 = 7 * DAY_MILLIS;

/// Upper bound on the number of bins a single time range may be split into.
pub const MAX_BINS_PER_RANGE: usize = 1 << 16;

/// The time-binning unit (periodicity) of a time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Unit {
    Minute,
    Hour,
    Day,
    /// ISO weeks, starting on Monday.
    Week,
    Month,
    Year,
    /// Ten-year bins starting at years divisible by ten.
    Decade,
}

impl Unit {
    pub const ALL: [Unit; 7] = [
        Unit::Minute,
        Unit::Hour,
        Unit::Day,
        Unit::Week,
        Unit::Month,
        Unit::Year,
        Unit::Decade,
    ];

    /// Canonical (upper-case) name, as used in index names.
    pub fn name(self) -> &'static str {
        match self {
            Unit::Minute => "MINUTE",
            Unit::Hour => "HOUR",
            Unit::Day => "DAY",
            Unit::Week => "WEEK",
            Unit::Month => "MONTH",
            Unit::Year => "YEAR",
            Unit::Decade => "DECADE",
        }
    }

    /// Returns the bin containing the given instant (milliseconds since the Unix epoch).
    pub fn bin_of(self, millis: i64) -> Result<TemporalBin> {
        let fixed = |len: i64| {
            let start = millis.div_euclid(len) * len;
            Ok(TemporalBin {
                start,
                end: start + len,
            })
        };
        match self {
            Unit::Minute => fixed(MINUTE_MILLIS),
            Unit::Hour => fixed(HOUR_MILLIS),
            Unit::Day => fixed(DAY_MILLIS),
            Unit::Week => {
                // 1970-01-01 was a Thursday; shift so that bins start on Monday.
                let day = millis.div_euclid(DAY_MILLIS);
                let start = (day - (day + 3).rem_euclid(7)) * DAY_MILLIS;
                Ok(TemporalBin {
                    start,
                    end: start + WEEK_MILLIS,
                })
            }
            Unit::Month => {
                let date = to_datetime(millis)?;
                let (year, month) = (date.year(), date.month());
                let (next_year, next_month) = if month == 12 {
                    (year + 1, 1)
                } else {
                    (year, month + 1)
                };
                Ok(TemporalBin {
                    start: month_start(year, month)?,
                    end: month_start(next_year, next_month)?,
                })
            }
            Unit::Year => {
                let year = to_datetime(millis)?.year();
                Ok(TemporalBin {
                    start: month_start(year, 1)?,
                    end: month_start(year + 1, 1)?,
                })
            }
            Unit::Decade => {
                let year = to_datetime(millis)?.year();
                let first = year - year.rem_euclid(10);
                Ok(TemporalBin {
                    start: month_start(first, 1)?,
                    end: month_start(first + 10, 1)?,
                })
            }
        }
    }

    /// Splits the closed range `[start, end]` into per-bin pieces.
    ///
    /// Each returned pair is the bin and the part of the range inside it, still in
    /// absolute milliseconds. `end` landing exactly on a bin edge belongs to the
    /// following bin.
    pub fn split(self, start: i64, end: i64) -> Result<Vec<(TemporalBin, i64, i64)>> {
        geotime_common::verify_arg!(time_range, start <= end);
        let mut pieces = Vec::new();
        let mut bin = self.bin_of(start)?;
        let mut from = start;
        loop {
            if pieces.len() == MAX_BINS_PER_RANGE {
                return Err(Error::invalid_arg(
                    "time_range",
                    format!(
                        "range spans more than {MAX_BINS_PER_RANGE} {} bins",
                        self.name().to_lowercase()
                    ),
                ));
            }
            let to = end.min(bin.end);
            pieces.push((bin, from, to));
            if end < bin.end {
                return Ok(pieces);
            }
            from = bin.end;
            bin = self.bin_of(bin.end)?;
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Unit::ALL
            .into_iter()
            .find(|unit| unit.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::unknown_variant("Unit", s, Unit::ALL.map(Unit::name)))
    }
}

impl TryFrom<String> for Unit {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Unit> for &'static str {
    fn from(unit: Unit) -> Self {
        unit.name()
    }
}

/// A half-open calendar interval `[start, end)` in milliseconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemporalBin {
    pub start: i64,
    pub end: i64,
}

impl TemporalBin {
    /// Length of the bin in milliseconds.
    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Order-preserving 8-byte key for the bin (sign-flipped big-endian start).
    pub fn id(&self) -> [u8; 8] {
        ((self.start as u64) ^ (1u64 << 63)).to_be_bytes()
    }
}

fn to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| Error::invalid_arg("millis", format!("{millis} is out of range")))
}

fn month_start(year: i32, month: u32) -> Result<i64> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| Error::invalid_arg("year", format!("{year}-{month:02} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn millis(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn test_year_bin_of_leap_year() {
        let bin = Unit::Year.bin_of(millis(2012, 4, 3, 13, 30, 23)).unwrap();
        assert_eq!(bin.start, millis(2012, 1, 1, 0, 0, 0));
        assert_eq!(bin.end, millis(2013, 1, 1, 0, 0, 0));
        assert_eq!(bin.len(), 366 * DAY_MILLIS);
    }

    #[test]
    fn test_week_starts_on_monday() {
        // 2024-05-16 is a Thursday.
        let bin = Unit::Week.bin_of(millis(2024, 5, 16, 8, 0, 0)).unwrap();
        assert_eq!(bin.start, millis(2024, 5, 13, 0, 0, 0));
        assert_eq!(bin.len(), WEEK_MILLIS);
    }

    #[test]
    fn test_month_and_decade_bins() {
        let bin = Unit::Month.bin_of(millis(2023, 12, 31, 23, 59, 59)).unwrap();
        assert_eq!(bin.start, millis(2023, 12, 1, 0, 0, 0));
        assert_eq!(bin.end, millis(2024, 1, 1, 0, 0, 0));

        let bin = Unit::Decade.bin_of(millis(1987, 6, 1, 0, 0, 0)).unwrap();
        assert_eq!(bin.start, millis(1980, 1, 1, 0, 0, 0));
        assert_eq!(bin.end, millis(1990, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_bins_before_epoch() {
        let bin = Unit::Day.bin_of(-1).unwrap();
        assert_eq!(bin.start, -DAY_MILLIS);
        assert_eq!(bin.end, 0);
        assert!(TemporalBin { start: -DAY_MILLIS, end: 0 }.id() < TemporalBin { start: 0, end: DAY_MILLIS }.id());
    }

    #[test]
    fn test_split_across_bins() {
        let start = millis(2019, 12, 31, 22, 0, 0);
        let end = millis(2020, 1, 1, 2, 0, 0);
        let pieces = Unit::Year.split(start, end).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].1, start);
        assert_eq!(pieces[0].2, millis(2020, 1, 1, 0, 0, 0));
        assert_eq!(pieces[1].1, millis(2020, 1, 1, 0, 0, 0));
        assert_eq!(pieces[1].2, end);

        assert_eq!(Unit::Hour.split(start, start).unwrap().len(), 1);
        assert!(Unit::Hour.split(end, start).is_err());
    }

    #[test]
    fn test_split_rejects_excessive_bins() {
        let err = Unit::Minute
            .split(0, (MAX_BINS_PER_RANGE as i64 + 1) * MINUTE_MILLIS)
            .unwrap_err();
        assert!(err.to_string().contains("minute bins"));
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("year".parse::<Unit>().unwrap(), Unit::Year);
        assert_eq!("Decade".parse::<Unit>().unwrap(), Unit::Decade);
        let err = "fortnight".parse::<Unit>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "value 'fortnight' can not be converted to Unit, available values are: \
             minute, hour, day, week, month, year, decade"
        );
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Unit::Month).unwrap(), "\"MONTH\"");
        assert_eq!(serde_json::from_str::<Unit>("\"hour\"").unwrap(), Unit::Hour);
        assert!(serde_json::from_str::<Unit>("\"eon\"").is_err());
    }
}
