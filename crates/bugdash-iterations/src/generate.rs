//! Deterministic table generation from a release pattern table.

use chrono::{Duration, NaiveDate};

use crate::IterationLookup;

/// One block of the hand-maintained reference-release table.
///
/// A block applies from `start_version` until the next block's start. Its
/// `weeks_per_minor` list gives the length in weeks of each minor iteration
/// within one major release; the list length fixes the number of minors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePattern {
    /// First major version this block applies to.
    pub start_version: u32,
    /// Week count of each minor iteration, in order.
    pub weeks_per_minor: Vec<u32>,
}

impl ReleasePattern {
    /// Creates a pattern block.
    pub fn new(start_version: u32, weeks_per_minor: Vec<u32>) -> Self {
        Self {
            start_version,
            weeks_per_minor,
        }
    }
}

/// Generates an [`IterationLookup`] by walking forward from `epoch`
/// week-by-week, assigning `"<major>.<minor>"` labels.
///
/// The first block's `start_version` is the first major generated; the
/// active block switches whenever the running major reaches the next
/// block's `start_version`; generation stops at `end_version` (exclusive).
/// Each iteration ends `weeks * 7 - 1` days after it starts, and first-seen
/// order is chronological order.
///
/// Blocks are assumed to be sorted by `start_version`. An empty pattern
/// table yields an empty lookup.
pub fn generate_lookup(
    patterns: &[ReleasePattern],
    epoch: NaiveDate,
    end_version: u32,
) -> IterationLookup {
    let mut lookup = IterationLookup::default();
    let Some(first) = patterns.first() else {
        return lookup;
    };

    let mut cursor = epoch;
    let mut block = 0;
    let mut major = first.start_version;
    while major < end_version {
        while block + 1 < patterns.len() && major >= patterns[block + 1].start_version {
            block += 1;
        }
        for (minor, &weeks) in patterns[block].weeks_per_minor.iter().enumerate() {
            if weeks == 0 {
                continue;
            }
            let version = format!("{}.{}", major, minor + 1);
            let end = cursor + Duration::days(i64::from(weeks) * 7 - 1);
            lookup.insert_iteration(&version, cursor, end, weeks);
            cursor = end + Duration::days(1);
        }
        major += 1;
    }
    lookup
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn two_week_table() -> IterationLookup {
        generate_lookup(
            &[ReleasePattern::new(60, vec![2, 2, 2, 2])],
            date(2018, 1, 15),
            62,
        )
    }

    #[test]
    fn test_first_iteration_spans_from_epoch() {
        let lookup = two_week_table();
        let entry = &lookup.by_version_string["60.1"];

        assert_eq!(entry.start_date, date(2018, 1, 15));
        assert_eq!(entry.end_date, date(2018, 1, 28));
        assert_eq!(entry.weeks, 2);
    }

    #[test]
    fn test_major_rolls_over_after_last_minor() {
        let lookup = two_week_table();

        assert_eq!(
            lookup.ordered_version_strings,
            vec!["60.1", "60.2", "60.3", "60.4", "61.1", "61.2", "61.3", "61.4"]
        );
        // 60.x covers 8 weeks from the epoch, so 61.1 starts 2018-03-12.
        assert_eq!(
            lookup.by_version_string["61.1"].start_date,
            date(2018, 3, 12)
        );
    }

    #[test]
    fn test_end_version_is_exclusive() {
        let lookup = two_week_table();
        assert!(!lookup.by_version_string.contains_key("62.1"));
    }

    #[test]
    fn test_every_monday_is_mapped() {
        let lookup = two_week_table();

        assert_eq!(lookup.by_date[&date(2018, 1, 15)], "60.1");
        assert_eq!(lookup.by_date[&date(2018, 1, 22)], "60.1");
        assert_eq!(lookup.by_date[&date(2018, 1, 29)], "60.2");
        // 16 weeks of two-week iterations.
        assert_eq!(lookup.by_date.len(), 16);
    }

    #[test]
    fn test_pattern_block_switch() {
        let lookup = generate_lookup(
            &[
                ReleasePattern::new(60, vec![2, 2, 2, 2]),
                ReleasePattern::new(62, vec![1, 1]),
            ],
            date(2018, 1, 15),
            63,
        );

        // 60 and 61 use the first block (8 weeks each), 62 the second.
        assert_eq!(
            lookup.by_version_string["62.1"].start_date,
            date(2018, 5, 7)
        );
        assert_eq!(lookup.by_version_string["62.1"].weeks, 1);
        assert_eq!(
            lookup.by_version_string["62.2"].start_date,
            date(2018, 5, 14)
        );
        assert!(!lookup.by_version_string.contains_key("62.3"));
    }

    #[test]
    fn test_empty_pattern_table() {
        let lookup = generate_lookup(&[], date(2018, 1, 15), 62);
        assert!(lookup.is_empty());
    }

    #[test]
    fn test_ordered_versions_are_chronological() {
        let lookup = two_week_table();
        let starts: Vec<_> = lookup
            .ordered_version_strings
            .iter()
            .map(|v| lookup.by_version_string[v].start_date)
            .collect();
        let mut sorted = starts.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(starts, sorted);
    }
}
