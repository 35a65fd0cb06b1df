//! Iteration calendar for fixed-length development cycles.
//!
//! An *iteration* is a fixed-length development cycle labelled
//! `"<major>.<minor>"` (e.g. `60.4`). This crate builds a bidirectional
//! date↔iteration table — an [`IterationLookup`] — and answers calendar
//! queries over it through [`IterationCalendar`].
//!
//! A lookup can be built two ways:
//! - [`generate_lookup`]: deterministic synthetic generation from a
//!   hand-maintained release pattern table and an epoch date;
//! - [`parse_iteration_strings`]: best-effort parsing of free-text,
//!   locale-variant date ranges scraped from the bug tracker's
//!   iteration-field metadata, including year inference.
//!
//! A built lookup is an immutable snapshot: a refresh builds a whole new
//! table and replaces the old one, never mutating in place. The calendar
//! holds its table behind an `Arc`, so concurrent readers always see a
//! consistent snapshot.
//!
//! # Example
//!
//! ```
//! use bugdash_iterations::{generate_lookup, IterationCalendar, ReleasePattern};
//! use chrono::NaiveDate;
//!
//! let lookup = generate_lookup(
//!     &[ReleasePattern::new(60, vec![2, 2, 2, 2])],
//!     NaiveDate::from_ymd_opt(2018, 1, 15).unwrap(),
//!     62,
//! );
//! let calendar = IterationCalendar::new(lookup);
//!
//! let date = NaiveDate::from_ymd_opt(2018, 1, 28).unwrap();
//! let iteration = calendar.iteration_for_date(date).unwrap();
//! assert_eq!(iteration.number, "60.1");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod calendar;
mod generate;
mod parse;

pub use calendar::{work_days, Iteration, IterationCalendar};
pub use generate::{generate_lookup, ReleasePattern};
pub use parse::{parse_iteration_strings, Override, ParseConfig};

/// An iteration id parse failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid iteration id: {value} (expected <major>.<minor>)")]
pub struct VersionParseError {
    /// The rejected input.
    pub value: String,
}

/// An iteration id, `"<major>.<minor>"`.
///
/// Ordering is numeric by major then minor, so `60.10` sorts after `60.2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// The release-train number.
    pub major: u32,
    /// The ordinal position of the iteration within the release.
    pub minor: u32,
}

impl Version {
    /// Creates a version from its parts.
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    /// Parses strictly `<digits>.<digits>`; anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reject = || VersionParseError {
            value: s.to_string(),
        };

        let (major, minor) = s.split_once('.').ok_or_else(reject)?;
        if major.is_empty()
            || minor.is_empty()
            || !major.bytes().all(|b| b.is_ascii_digit())
            || !minor.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(reject());
        }
        Ok(Self {
            major: major.parse().map_err(|_| reject())?,
            minor: minor.parse().map_err(|_| reject())?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// The date span of one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationEntry {
    /// First day of the iteration (always a Monday).
    pub start_date: NaiveDate,
    /// Last day of the iteration.
    pub end_date: NaiveDate,
    /// Length in whole weeks.
    pub weeks: u32,
}

/// A bidirectional date↔iteration lookup table.
///
/// `by_date` maps the Monday of every week an iteration spans to its id;
/// `by_version_string` maps ids to their date spans;
/// `ordered_version_strings` lists ids in strictly chronological order.
///
/// Field names serialize in camelCase: this structure ships to dashboard
/// clients over a JSON endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationLookup {
    /// Monday-of-week → iteration id.
    pub by_date: BTreeMap<NaiveDate, String>,
    /// Iteration id → date span.
    pub by_version_string: BTreeMap<String, IterationEntry>,
    /// Iteration ids in chronological order.
    pub ordered_version_strings: Vec<String>,
}

impl IterationLookup {
    /// Records one iteration: every Monday it spans, its date span, and its
    /// position in the chronological order.
    pub(crate) fn insert_iteration(
        &mut self,
        version: &str,
        start: NaiveDate,
        end: NaiveDate,
        weeks: u32,
    ) {
        for week in 0..weeks {
            self.by_date
                .insert(start + Duration::weeks(i64::from(week)), version.to_string());
        }
        self.by_version_string.insert(
            version.to_string(),
            IterationEntry {
                start_date: start,
                end_date: end,
                weeks,
            },
        );
        self.ordered_version_strings.push(version.to_string());
    }

    /// Returns true if the table holds no iterations.
    pub fn is_empty(&self) -> bool {
        self.ordered_version_strings.is_empty()
    }
}

/// The Monday of the week containing `date`.
pub(crate) fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// The Sunday ending the week containing `date`.
pub(crate) fn sunday_of(date: NaiveDate) -> NaiveDate {
    monday_of(date) + Duration::days(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_version_parse() {
        assert_eq!("60.4".parse::<Version>().unwrap(), Version::new(60, 4));
        assert_eq!("7.12".parse::<Version>().unwrap(), Version::new(7, 12));
    }

    #[test]
    fn test_version_parse_rejects_malformed() {
        for input in ["60", "60.", ".4", "60.4.1", "60.x", "+60.4", "60. 4", ""] {
            assert!(input.parse::<Version>().is_err(), "accepted {:?}", input);
        }
    }

    #[test]
    fn test_version_ordering_is_numeric() {
        assert!(Version::new(60, 10) > Version::new(60, 2));
        assert!(Version::new(59, 4) < Version::new(60, 1));
    }

    #[test]
    fn test_version_display_roundtrip() {
        let version = Version::new(60, 4);
        assert_eq!(version.to_string().parse::<Version>().unwrap(), version);
    }

    #[test]
    fn test_monday_of_week() {
        // 2018-04-04 is a Wednesday.
        assert_eq!(monday_of(date(2018, 4, 4)), date(2018, 4, 2));
        assert_eq!(monday_of(date(2018, 4, 2)), date(2018, 4, 2));
        // Sunday belongs to the week started the previous Monday.
        assert_eq!(monday_of(date(2018, 4, 8)), date(2018, 4, 2));
    }

    #[test]
    fn test_sunday_of_week() {
        assert_eq!(sunday_of(date(2018, 4, 4)), date(2018, 4, 8));
        assert_eq!(sunday_of(date(2018, 4, 8)), date(2018, 4, 8));
    }

    #[test]
    fn test_insert_iteration_populates_all_mondays() {
        let mut lookup = IterationLookup::default();
        lookup.insert_iteration("60.1", date(2018, 1, 15), date(2018, 1, 28), 2);

        assert_eq!(lookup.by_date.len(), 2);
        assert_eq!(lookup.by_date[&date(2018, 1, 15)], "60.1");
        assert_eq!(lookup.by_date[&date(2018, 1, 22)], "60.1");
        assert_eq!(lookup.ordered_version_strings, vec!["60.1"]);
    }
}
