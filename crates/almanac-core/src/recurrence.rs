//! Occurrence matching and expansion.
//!
//! The matcher decides whether a single calendar date is a valid occurrence
//! of a rule anchored at a task's base date. The expander runs the matcher
//! over a query window, day by day, projecting the base task onto every
//! matching date. Windows are bounded (a calendar view asks for weeks or
//! months at a time), so the linear scan is the simplest correct approach.
//!
//! Everything here is pure computation over immutable inputs: no I/O, no
//! shared state, safe to call concurrently from however many reactive query
//! pipelines the host application runs.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::models::Task;
use crate::rule::{Frequency, RecurrenceRule, Weekday, LAST_DAY_OF_MONTH};

/// Upper bound on how far ahead the open-ended scans look. Eight years is
/// past the sparsest expressible rule (BYMONTHDAY=29 in February fires every
/// leap year).
const SCAN_HORIZON_DAYS: i64 = 8 * 366;

impl RecurrenceRule {
    /// Whether `candidate` is a valid occurrence of this rule anchored at
    /// `anchor`.
    ///
    /// Interval divisibility counts from the anchor, so the anchor itself is
    /// an occurrence whenever it independently passes the by-day/by-month
    /// filters. It is not forced in when it does not, mirroring RRULE
    /// semantics where DTSTART is not pushed into BYDAY.
    pub fn matches(&self, anchor: NaiveDate, candidate: NaiveDate) -> bool {
        if candidate < anchor {
            return false;
        }
        if let Some(until) = self.until {
            if candidate > until {
                return false;
            }
        }
        if self.ex_dates.contains(&candidate) {
            return false;
        }
        match self.frequency {
            Frequency::Daily => {
                let days = candidate.signed_duration_since(anchor).num_days();
                days % i64::from(self.interval) == 0
            }
            Frequency::Weekly => {
                if !self.by_day.contains(&Weekday::from_date(candidate)) {
                    return false;
                }
                let weeks = week_start(candidate)
                    .signed_duration_since(week_start(anchor))
                    .num_days()
                    / 7;
                weeks % i64::from(self.interval) == 0
            }
            Frequency::Monthly => {
                let month_ok =
                    self.by_month.is_empty() || self.by_month.contains(&candidate.month());
                let day_ok = self.by_month_day.contains(&(candidate.day() as i8))
                    || (self.by_month_day.contains(&LAST_DAY_OF_MONTH)
                        && is_last_day_of_month(candidate));
                month_ok && day_ok
            }
        }
    }
}

/// Monday of the ISO week containing `date`. Weekly interval arithmetic
/// compares week starts, not raw day deltas, so a Wednesday anchor and the
/// following Monday still land in adjacent weeks.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

/// Expands a recurring base task into concrete occurrences.
///
/// Holds the base task and its parsed rule; every generation method is
/// re-callable and returns a fresh, finite sequence.
#[derive(Debug, Clone)]
pub struct RecurrenceExpander {
    base: Task,
    rule: RecurrenceRule,
}

impl RecurrenceExpander {
    pub fn new(base: Task, rule: RecurrenceRule) -> Self {
        Self { base, rule }
    }

    /// Builds an expander from a task's stored rule string. `None` when the
    /// task has no rule or the rule fails to parse (fail-open: such tasks
    /// are treated as non-recurring).
    pub fn for_task(task: &Task) -> Option<Self> {
        let rule = RecurrenceRule::parse(task.rrule.as_deref()?)?;
        Some(Self::new(task.clone(), rule))
    }

    pub fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    pub fn base(&self) -> &Task {
        &self.base
    }

    /// Lazy iterator over occurrences inside the half-open window
    /// `[window_start, window_end)`. Dates ascend; the scan starts at the
    /// later of the anchor date and the window start.
    pub fn occurrences(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Occurrences<'_> {
        Occurrences {
            expander: self,
            cursor: self.base.anchor_date().max(window_start.date()),
            end: window_end.date(),
        }
    }

    /// Collecting convenience over [`occurrences`](Self::occurrences).
    pub fn occurrences_between(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Vec<Task> {
        self.occurrences(window_start, window_end).collect()
    }

    /// First occurrence strictly after the given point in time, or `None`
    /// when the series has ended (or produces nothing within the scan
    /// horizon).
    pub fn next_occurrence_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let anchor = self.base.anchor_date();
        let time = self.base.date.time();
        let mut date = anchor.max(after.date());
        let horizon = date
            .checked_add_signed(Duration::days(SCAN_HORIZON_DAYS))
            .unwrap_or(NaiveDate::MAX);
        while date <= horizon {
            if let Some(until) = self.rule.until {
                if date > until {
                    return None;
                }
            }
            if self.rule.matches(anchor, date) {
                let occurrence = date.and_time(time);
                if occurrence > after {
                    return Some(occurrence);
                }
            }
            date = date.succ_opt()?;
        }
        None
    }

    /// Up to `count` upcoming occurrences from the given point in time, for
    /// preview surfaces ("repeats Mon, Wed; next on ...").
    pub fn preview_occurrences(&self, from: NaiveDateTime, count: usize) -> Vec<Task> {
        let end = from
            .checked_add_signed(Duration::days(SCAN_HORIZON_DAYS))
            .unwrap_or(NaiveDateTime::MAX);
        self.occurrences(from, end).take(count).collect()
    }
}

/// Iterator behind [`RecurrenceExpander::occurrences`]. Stateless beyond its
/// own cursor; obtaining a new one restarts the scan.
#[derive(Debug)]
pub struct Occurrences<'a> {
    expander: &'a RecurrenceExpander,
    cursor: NaiveDate,
    end: NaiveDate,
}

impl Iterator for Occurrences<'_> {
    type Item = Task;

    fn next(&mut self) -> Option<Task> {
        while self.cursor < self.end {
            let date = self.cursor;
            self.cursor = date.succ_opt()?;
            // Dates ascend, so past `until` nothing further can match.
            if let Some(until) = self.expander.rule.until {
                if date > until {
                    return None;
                }
            }
            if self
                .expander
                .rule
                .matches(self.expander.base.anchor_date(), date)
            {
                return Some(self.expander.base.occurrence_on(date));
            }
        }
        None
    }
}
