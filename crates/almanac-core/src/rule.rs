//! The encoded recurrence rule and its codec.
//!
//! Rules travel as a single text column on the task record, a
//! semicolon-separated list of `KEY=VALUE` tokens modeled after the
//! iCalendar RRULE grammar:
//!
//! ```text
//! FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE,FR;UNTIL=20241231;EXDATE=20240101
//! ```
//!
//! Parsing is strict but fail-open at the boundary: [`RecurrenceRule::parse`]
//! returns `None` for anything it does not fully understand, and callers
//! treat such tasks as non-recurring. Serialization via [`Display`] emits a
//! canonical form; [`add_ex_date`] is the one mutation applied to a stored
//! rule string and works without re-serializing the rest of the rule.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::RuleParseError;

/// How often a rule repeats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "DAILY"),
            Frequency::Weekly => write!(f, "WEEKLY"),
            Frequency::Monthly => write!(f, "MONTHLY"),
        }
    }
}

impl FromStr for Frequency {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            _ => Err(RuleParseError::UnknownFrequency(s.to_string())),
        }
    }
}

/// ISO weekday, ordered Monday first so `BYDAY` sets serialize in ISO order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weekday::Monday => write!(f, "MO"),
            Weekday::Tuesday => write!(f, "TU"),
            Weekday::Wednesday => write!(f, "WE"),
            Weekday::Thursday => write!(f, "TH"),
            Weekday::Friday => write!(f, "FR"),
            Weekday::Saturday => write!(f, "SA"),
            Weekday::Sunday => write!(f, "SU"),
        }
    }
}

impl FromStr for Weekday {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MO" => Ok(Weekday::Monday),
            "TU" => Ok(Weekday::Tuesday),
            "WE" => Ok(Weekday::Wednesday),
            "TH" => Ok(Weekday::Thursday),
            "FR" => Ok(Weekday::Friday),
            "SA" => Ok(Weekday::Saturday),
            "SU" => Ok(Weekday::Sunday),
            _ => Err(RuleParseError::InvalidWeekday(s.to_string())),
        }
    }
}

/// Day-of-month sentinel: "the last calendar day of the month".
pub const LAST_DAY_OF_MONTH: i8 = -1;

/// Parsed, structured recurrence specification. Immutable value; the only
/// mutation a stored rule ever sees is [`add_ex_date`] on its encoded form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Every Nth frequency unit, counted from the anchor. Always >= 1.
    pub interval: u32,
    /// Weekdays a WEEKLY rule fires on. Non-empty for WEEKLY rules.
    pub by_day: BTreeSet<Weekday>,
    /// Months a MONTHLY rule fires in. Empty means every month.
    pub by_month: BTreeSet<u32>,
    /// Days of month (1..=31) or [`LAST_DAY_OF_MONTH`]. Non-empty for
    /// MONTHLY rules.
    pub by_month_day: BTreeSet<i8>,
    /// Last valid occurrence date, inclusive.
    pub until: Option<NaiveDate>,
    /// Dates excluded even though they match the pattern.
    pub ex_dates: BTreeSet<NaiveDate>,
}

impl RecurrenceRule {
    /// A daily rule firing every `interval` days.
    pub fn daily(interval: u32) -> Self {
        Self {
            frequency: Frequency::Daily,
            interval,
            by_day: BTreeSet::new(),
            by_month: BTreeSet::new(),
            by_month_day: BTreeSet::new(),
            until: None,
            ex_dates: BTreeSet::new(),
        }
    }

    /// A weekly rule firing on the given weekdays every `interval` weeks.
    pub fn weekly(interval: u32, days: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            frequency: Frequency::Weekly,
            by_day: days.into_iter().collect(),
            ..Self::daily(interval)
        }
    }

    /// A monthly rule firing on the given days of month, every month.
    pub fn monthly(interval: u32, days: impl IntoIterator<Item = i8>) -> Self {
        Self {
            frequency: Frequency::Monthly,
            by_month_day: days.into_iter().collect(),
            ..Self::daily(interval)
        }
    }

    /// Fail-open parse: any rule string this module cannot fully understand
    /// comes back as `None`, and the caller treats the task as
    /// non-recurring. Use [`str::parse`] when the failure cause matters.
    pub fn parse(encoded: &str) -> Option<Self> {
        encoded.parse().ok()
    }
}

impl FromStr for RecurrenceRule {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut frequency = None;
        let mut interval = 1u32;
        let mut by_day = BTreeSet::new();
        let mut by_month = BTreeSet::new();
        let mut by_month_day = BTreeSet::new();
        let mut until = None;
        let mut ex_dates = BTreeSet::new();

        for token in s.split(';').filter(|t| !t.is_empty()) {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| RuleParseError::MalformedToken(token.to_string()))?;
            match key {
                "FREQ" => frequency = Some(value.parse()?),
                "INTERVAL" => {
                    interval = value
                        .parse()
                        .map_err(|_| RuleParseError::InvalidInterval(value.to_string()))?;
                    if interval < 1 {
                        return Err(RuleParseError::InvalidInterval(value.to_string()));
                    }
                }
                "BYDAY" => {
                    for day in value.split(',') {
                        by_day.insert(day.parse()?);
                    }
                }
                "BYMONTH" => {
                    for month in value.split(',') {
                        let month: u32 = month
                            .parse()
                            .map_err(|_| RuleParseError::InvalidMonth(month.to_string()))?;
                        if !(1..=12).contains(&month) {
                            return Err(RuleParseError::InvalidMonth(month.to_string()));
                        }
                        by_month.insert(month);
                    }
                }
                "BYMONTHDAY" => {
                    for day in value.split(',') {
                        let parsed: i8 = day
                            .parse()
                            .map_err(|_| RuleParseError::InvalidMonthDay(day.to_string()))?;
                        if parsed != LAST_DAY_OF_MONTH && !(1..=31).contains(&parsed) {
                            return Err(RuleParseError::InvalidMonthDay(day.to_string()));
                        }
                        by_month_day.insert(parsed);
                    }
                }
                "UNTIL" => until = Some(parse_compact_date(value)?),
                // Persisted data may carry either repeated EXDATE tokens or a
                // single comma-joined one; accept both.
                "EXDATE" => {
                    for date in value.split(',') {
                        ex_dates.insert(parse_compact_date(date)?);
                    }
                }
                _ => return Err(RuleParseError::UnknownKey(key.to_string())),
            }
        }

        let frequency = frequency.ok_or(RuleParseError::MissingFrequency)?;
        if frequency == Frequency::Weekly && by_day.is_empty() {
            return Err(RuleParseError::MissingByDay);
        }
        if frequency == Frequency::Monthly && by_month_day.is_empty() {
            return Err(RuleParseError::MissingByMonthDay);
        }
        // A complete 1..=12 set carries no constraint; normalize to empty.
        if by_month.len() == 12 {
            by_month.clear();
        }

        Ok(Self {
            frequency,
            interval,
            by_day,
            by_month,
            by_month_day,
            until,
            ex_dates,
        })
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency)?;
        if self.interval > 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        if !self.by_day.is_empty() {
            write!(f, ";BYDAY=")?;
            for (i, day) in self.by_day.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{day}")?;
            }
        }
        if !self.by_month.is_empty() {
            write!(f, ";BYMONTH=")?;
            for (i, month) in self.by_month.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{month}")?;
            }
        }
        if !self.by_month_day.is_empty() {
            write!(f, ";BYMONTHDAY=")?;
            for (i, day) in self.by_month_day.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{day}")?;
            }
        }
        if let Some(until) = self.until {
            write!(f, ";UNTIL={}", until.format("%Y%m%d"))?;
        }
        // One token per exclusion, matching what add_ex_date appends.
        for date in &self.ex_dates {
            write!(f, ";EXDATE={}", date.format("%Y%m%d"))?;
        }
        Ok(())
    }
}

/// Appends an exclusion date to an encoded rule string.
///
/// This is the one persisted mutation a rule undergoes ("delete this
/// occurrence"), so it is deliberately a pure string-to-string transform:
/// total, never failing, and idempotent. All other rule components pass
/// through untouched, including strings this module would refuse to parse.
pub fn add_ex_date(encoded: &str, date: NaiveDate) -> String {
    let formatted = date.format("%Y%m%d").to_string();
    let already_present = encoded
        .split(';')
        .filter_map(|token| token.split_once('='))
        .filter(|(key, _)| *key == "EXDATE")
        .flat_map(|(_, value)| value.split(','))
        .any(|value| value == formatted);
    if already_present {
        encoded.to_string()
    } else {
        format!("{encoded};EXDATE={formatted}")
    }
}

fn parse_compact_date(value: &str) -> Result<NaiveDate, RuleParseError> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RuleParseError::InvalidDate(value.to_string()));
    }
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .map_err(|_| RuleParseError::InvalidDate(value.to_string()))
}
