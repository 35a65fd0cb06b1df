//! Best-effort parsing of free-text iteration ranges.
//!
//! The bug tracker's iteration-field metadata yields strings like
//! `"60.4 - Feb 26 - Mar 11"` or `"66.2 - Febr. 11 - 24"`: no year, month
//! tokens of varying length, the end month omitted when it matches the
//! start. This parser reconstructs full dates from that text, inferring
//! years from month regressions and snapping ranges to whole Monday–Sunday
//! weeks.
//!
//! The parser is heuristic by design. Entries that fail the grammar or
//! produce a non-positive week count are dropped silently; the only hard
//! contract is idempotence — re-parsing the canonical strings derived from
//! a produced table reproduces the same date mapping.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{monday_of, sunday_of, IterationLookup, Version};

/// Splits `"60.4 - Feb 26 - Mar 11"` into the id and the literal range text.
static VERSION_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+\.\d+)\s*-\s*(.+?)\s*$").unwrap());

/// The range grammar: start month and day, optional end month, end day.
static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+)\.?\s+(\d{1,2})\s*-\s*(?:([A-Za-z]+)\.?\s+)?(\d{1,2})$").unwrap()
});

/// A manual patch applied during table construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    /// The iteration id being patched.
    pub iteration: String,
    /// The replacement range text; `None` deletes the iteration.
    pub range: Option<String>,
}

impl Override {
    /// Creates an override replacing an iteration's range text.
    pub fn replace(iteration: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            iteration: iteration.into(),
            range: Some(range.into()),
        }
    }

    /// Creates an override deleting an iteration.
    pub fn delete(iteration: impl Into<String>) -> Self {
        Self {
            iteration: iteration.into(),
            range: None,
        }
    }
}

/// Configuration for [`parse_iteration_strings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseConfig {
    /// Entries below this version are discarded before parsing.
    pub min_version: Version,
    /// The calendar year of the first retained iteration's start date.
    /// The raw strings carry no year; everything after the first entry is
    /// inferred from month regressions.
    pub start_year: i32,
    /// Manual patches, applied after de-duplication.
    pub overrides: Vec<Override>,
}

impl ParseConfig {
    /// Creates a config with no overrides.
    pub fn new(min_version: Version, start_year: i32) -> Self {
        Self {
            min_version,
            start_year,
            overrides: Vec::new(),
        }
    }

    /// Adds manual overrides.
    pub fn with_overrides(mut self, overrides: Vec<Override>) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Parses raw iteration label+range strings into an [`IterationLookup`].
///
/// Processing steps:
/// 1. split id from range text, discard ids below `min_version`;
/// 2. de-duplicate by literal range text (later entries win), then by id,
///    then apply manual overrides (`None` deletes);
/// 3. parse each range: normalize month tokens, infer the year (a start
///    month earlier than the previous iteration's means a wrap past
///    December), snap the start to its Monday and push whole weeks forward
///    until it clears the previous iteration's end, snap the end to its
///    Sunday (a literal Monday end means the previous Sunday);
/// 4. `weeks = ceil(days / 7)`; entries with unparseable dates or a
///    non-positive span are dropped silently.
pub fn parse_iteration_strings<S: AsRef<str>>(
    raw_iterations: &[S],
    config: &ParseConfig,
) -> IterationLookup {
    // Version floor.
    let mut candidates: Vec<(String, String)> = Vec::new();
    for line in raw_iterations {
        let Some(caps) = VERSION_RANGE_RE.captures(line.as_ref()) else {
            continue;
        };
        let Ok(version) = caps[1].parse::<Version>() else {
            continue;
        };
        if version < config.min_version {
            continue;
        }
        candidates.push((caps[1].to_string(), caps[2].to_string()));
    }

    // De-duplicate by literal range text; later entries override earlier
    // ones in place.
    let mut range_order: Vec<String> = Vec::new();
    let mut version_for_range: HashMap<String, String> = HashMap::new();
    for (version, range) in candidates {
        if !version_for_range.contains_key(&range) {
            range_order.push(range.clone());
        }
        version_for_range.insert(range, version);
    }

    // De-duplicate by id, keeping first position.
    let mut version_order: Vec<String> = Vec::new();
    let mut range_for_version: HashMap<String, String> = HashMap::new();
    for range in &range_order {
        let version = version_for_range[range].clone();
        if !range_for_version.contains_key(&version) {
            version_order.push(version.clone());
        }
        range_for_version.insert(version, range.clone());
    }

    // Manual overrides.
    for patch in &config.overrides {
        match &patch.range {
            None => {
                range_for_version.remove(&patch.iteration);
                version_order.retain(|v| v != &patch.iteration);
            }
            Some(range) => {
                if !range_for_version.contains_key(&patch.iteration) {
                    version_order.push(patch.iteration.clone());
                }
                range_for_version.insert(patch.iteration.clone(), range.clone());
            }
        }
    }

    let mut lookup = IterationLookup::default();
    let mut year = config.start_year;
    let mut prev_start_month: Option<u32> = None;
    let mut prev_end: Option<NaiveDate> = None;

    for version in &version_order {
        let range = &range_for_version[version];
        let Some(caps) = RANGE_RE.captures(range) else {
            continue;
        };
        let Some(start_month) = month_number(&caps[1]) else {
            continue;
        };
        let Ok(start_day) = caps[2].parse::<u32>() else {
            continue;
        };
        let end_month = match caps.get(3) {
            Some(token) => match month_number(token.as_str()) {
                Some(month) => month,
                None => continue,
            },
            None => start_month,
        };
        let Ok(end_day) = caps[4].parse::<u32>() else {
            continue;
        };

        // A start month earlier than the previous iteration's start month
        // means the list wrapped past December.
        if let Some(prev) = prev_start_month {
            if start_month < prev {
                year += 1;
            }
        }
        prev_start_month = Some(start_month);

        let Some(literal_start) = NaiveDate::from_ymd_opt(year, start_month, start_day) else {
            continue;
        };
        let mut start = monday_of(literal_start);
        if let Some(prev) = prev_end {
            while start <= prev {
                start = start + Duration::weeks(1);
            }
        }

        // An end month earlier than the start month rolls into the next
        // calendar year (e.g. "Dec 17 - Jan 13").
        let end_year = if end_month < start_month { year + 1 } else { year };
        let Some(literal_end) = NaiveDate::from_ymd_opt(end_year, end_month, end_day) else {
            continue;
        };
        let end = if literal_end.weekday() == Weekday::Mon {
            literal_end - Duration::days(1)
        } else {
            sunday_of(literal_end)
        };

        let days = (end - start).num_days();
        if days <= 0 {
            continue;
        }
        let weeks = (days + 6) / 7;

        lookup.insert_iteration(version, start, end, weeks as u32);
        prev_end = Some(end);
    }

    lookup
}

/// Maps a month token to its number, tolerating full names and trailing
/// periods (`"Febr."`, `"Sept"`, `"March"`). Only the first three letters
/// are significant.
fn month_number(token: &str) -> Option<u32> {
    let mut abbrev: String = token
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect();
    abbrev.make_ascii_lowercase();
    match abbrev.as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config() -> ParseConfig {
        ParseConfig::new(Version::new(60, 1), 2018)
    }

    fn parse(lines: &[&str]) -> IterationLookup {
        parse_iteration_strings(lines, &config())
    }

    #[test]
    fn test_parse_basic_ranges() {
        let lookup = parse(&["60.1 - Jan 15 - 28", "60.2 - Jan 29 - Feb 11"]);

        assert_eq!(lookup.ordered_version_strings, vec!["60.1", "60.2"]);
        let first = &lookup.by_version_string["60.1"];
        assert_eq!(first.start_date, date(2018, 1, 15));
        assert_eq!(first.end_date, date(2018, 1, 28));
        assert_eq!(first.weeks, 2);
        assert_eq!(lookup.by_date[&date(2018, 1, 22)], "60.1");
        assert_eq!(lookup.by_date[&date(2018, 2, 5)], "60.2");
    }

    #[test]
    fn test_month_token_variants() {
        // Four-letter and full-month tokens from the source system.
        let lookup = parse(&["60.1 - Janu. 15 - 28", "60.2 - January 29 - February 11"]);

        assert_eq!(
            lookup.by_version_string["60.1"].start_date,
            date(2018, 1, 15)
        );
        assert_eq!(
            lookup.by_version_string["60.2"].end_date,
            date(2018, 2, 11)
        );
    }

    #[test]
    fn test_version_floor_discards_old_entries() {
        let lookup = parse(&["59.4 - Jan 1 - 14", "60.1 - Jan 15 - 28"]);
        assert_eq!(lookup.ordered_version_strings, vec!["60.1"]);
    }

    #[test]
    fn test_year_wraps_on_month_regression() {
        let lookup = parse(&["60.1 - Dec 17 - 30", "60.2 - Jan 7 - 20"]);

        assert_eq!(
            lookup.by_version_string["60.1"].start_date,
            date(2018, 12, 17)
        );
        assert_eq!(
            lookup.by_version_string["60.2"].start_date,
            date(2019, 1, 7)
        );
    }

    #[test]
    fn test_range_spanning_new_year() {
        let lookup = parse(&["60.1 - Dec 17 - Jan 13"]);
        let entry = &lookup.by_version_string["60.1"];

        assert_eq!(entry.start_date, date(2018, 12, 17));
        assert_eq!(entry.end_date, date(2019, 1, 13));
        assert_eq!(entry.weeks, 4);
    }

    #[test]
    fn test_start_snaps_to_monday() {
        // 2018-01-17 is a Wednesday.
        let lookup = parse(&["60.1 - Jan 17 - 28"]);
        assert_eq!(
            lookup.by_version_string["60.1"].start_date,
            date(2018, 1, 15)
        );
    }

    #[test]
    fn test_overlapping_start_pushed_forward() {
        // 60.2's literal start falls inside 60.1; its Monday snap would
        // overlap, so it is pushed forward a whole week.
        let lookup = parse(&["60.1 - Jan 15 - 28", "60.2 - Jan 24 - Feb 11"]);

        assert_eq!(
            lookup.by_version_string["60.2"].start_date,
            date(2018, 1, 29)
        );
    }

    #[test]
    fn test_monday_end_becomes_previous_sunday() {
        // 2018-01-29 is a Monday.
        let lookup = parse(&["60.1 - Jan 15 - 29"]);
        assert_eq!(
            lookup.by_version_string["60.1"].end_date,
            date(2018, 1, 28)
        );
    }

    #[test]
    fn test_midweek_end_snaps_to_sunday() {
        // 2018-01-25 is a Thursday; the week ends Sunday the 28th.
        let lookup = parse(&["60.1 - Jan 15 - 25"]);
        assert_eq!(
            lookup.by_version_string["60.1"].end_date,
            date(2018, 1, 28)
        );
    }

    #[test]
    fn test_duplicate_range_text_later_entry_wins() {
        let lookup = parse(&["60.1 - Jan 15 - 28", "60.2 - Jan 15 - 28"]);

        assert_eq!(lookup.ordered_version_strings, vec!["60.2"]);
        assert_eq!(lookup.by_date[&date(2018, 1, 15)], "60.2");
    }

    #[test]
    fn test_duplicate_id_later_range_wins() {
        let lookup = parse(&["60.1 - Jan 15 - 28", "60.1 - Jan 15 - Feb 11"]);

        assert_eq!(lookup.ordered_version_strings, vec!["60.1"]);
        assert_eq!(lookup.by_version_string["60.1"].weeks, 4);
    }

    #[test]
    fn test_override_replaces_range() {
        let config = config().with_overrides(vec![Override::replace("60.1", "Jan 15 - Feb 11")]);
        let lookup = parse_iteration_strings(&["60.1 - Jan 15 - 28"], &config);

        assert_eq!(lookup.by_version_string["60.1"].weeks, 4);
    }

    #[test]
    fn test_override_deletes_iteration() {
        let config = config().with_overrides(vec![Override::delete("60.1")]);
        let lookup =
            parse_iteration_strings(&["60.1 - Jan 15 - 28", "60.2 - Jan 29 - Feb 11"], &config);

        assert_eq!(lookup.ordered_version_strings, vec!["60.2"]);
        assert!(!lookup.by_date.contains_key(&date(2018, 1, 15)));
    }

    #[test]
    fn test_malformed_entries_dropped_silently() {
        let lookup = parse(&[
            "garbage",
            "60.1 - Jan 15 - 28",
            "60.2 - Xyz 29 - Feb 11",
            "60.3 - Feb 31 - 40",
        ]);

        assert_eq!(lookup.ordered_version_strings, vec!["60.1"]);
    }

    #[test]
    fn test_non_positive_span_dropped() {
        // End before start after snapping: no entry.
        let lookup = parse(&["60.1 - Jan 22 - 28", "60.2 - Jan 29 - 15"]);
        assert_eq!(lookup.ordered_version_strings, vec!["60.1"]);
    }
}
