//! Read-only calendar queries over a built iteration table.

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};

use crate::{monday_of, IterationEntry, IterationLookup};

/// A resolved iteration: its id plus the dates it spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iteration {
    /// The iteration id, `"<major>.<minor>"`.
    pub number: String,
    /// First day of the iteration.
    pub start_date: NaiveDate,
    /// Last day of the iteration.
    pub end_date: NaiveDate,
    /// Length in whole weeks.
    pub weeks: u32,
}

/// A query façade over an immutable [`IterationLookup`] snapshot.
///
/// All queries are pure reads; misses are `None`, never errors. The table
/// lives behind an `Arc`: cloning the calendar is cheap, and refreshing
/// means building a new table and constructing a new calendar around it —
/// readers holding the old one keep a consistent snapshot.
///
/// Methods that default to "today" have an explicit-date variant so tests
/// and reports can pin the clock.
#[derive(Debug, Clone)]
pub struct IterationCalendar {
    lookup: Arc<IterationLookup>,
}

impl IterationCalendar {
    /// Wraps a built lookup table.
    pub fn new(lookup: IterationLookup) -> Self {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    /// Wraps an already-shared lookup table.
    pub fn from_shared(lookup: Arc<IterationLookup>) -> Self {
        Self { lookup }
    }

    /// The underlying table.
    pub fn lookup(&self) -> &IterationLookup {
        &self.lookup
    }

    /// A shared handle to the underlying snapshot, e.g. for the JSON
    /// endpoint that ships the table to clients.
    pub fn snapshot(&self) -> Arc<IterationLookup> {
        Arc::clone(&self.lookup)
    }

    /// The iteration containing `date`, or `None` outside the table's
    /// horizon. The lookup is by the Monday of `date`'s week.
    pub fn iteration_for_date(&self, date: NaiveDate) -> Option<Iteration> {
        let number = self.lookup.by_date.get(&monday_of(date))?;
        self.resolve(number)
    }

    /// The iteration containing the local date.
    pub fn current_iteration(&self) -> Option<Iteration> {
        self.iteration_for_date(Local::now().date_naive())
    }

    /// The chronologically last iteration in the table.
    pub fn latest_iteration(&self) -> Option<Iteration> {
        let number = self.lookup.ordered_version_strings.last()?;
        self.resolve(number)
    }

    /// The iteration `diff` positions away from the one containing `date`.
    ///
    /// Stepping is by list position in the chronological order, not by
    /// numeric id arithmetic, so it crosses major-version boundaries
    /// (`60.4 + 1 → 61.1`). Offsets past either end of the table, or a base
    /// date outside the horizon, return `None`.
    pub fn adjacent_iteration(&self, diff: i64, date: NaiveDate) -> Option<Iteration> {
        let base = self.lookup.by_date.get(&monday_of(date))?;
        let ordered = &self.lookup.ordered_version_strings;
        let position = ordered.iter().position(|v| v == base)? as i64;
        let number = ordered.get(usize::try_from(position + diff).ok()?)?;
        self.resolve(number)
    }

    /// The date span recorded for an iteration id, or `None` if the id is
    /// absent from the table.
    pub fn dates_for_iteration(&self, number: &str) -> Option<&IterationEntry> {
        self.lookup.by_version_string.get(number)
    }

    fn resolve(&self, number: &str) -> Option<Iteration> {
        let entry = self.lookup.by_version_string.get(number)?;
        Some(Iteration {
            number: number.to_string(),
            start_date: entry.start_date,
            end_date: entry.end_date,
            weeks: entry.weeks,
        })
    }
}

/// Counts Monday–Friday work days between two dates.
///
/// Difference-style: the start day itself is excluded, the end day is
/// included, so `work_days(d, d) == 0` and adjacent weekdays count 1. A
/// `start` after `end` yields a negative count; nothing is clamped.
pub fn work_days(start: NaiveDate, end: NaiveDate) -> i64 {
    let full_weeks = (monday_of(end) - monday_of(start)).num_days() / 7;
    full_weeks * 5 - workdays_through(start) + workdays_through(end)
}

/// Work days from the Monday of `date`'s week through `date`, inclusive.
/// Saturated at 5 for weekend dates.
fn workdays_through(date: NaiveDate) -> i64 {
    (i64::from(date.weekday().num_days_from_monday()) + 1).min(5)
}
