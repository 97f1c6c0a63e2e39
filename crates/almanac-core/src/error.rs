use thiserror::Error;

/// Why an encoded recurrence rule failed to parse.
///
/// Callers that only care about "recurring or not" should go through
/// [`RecurrenceRule::parse`](crate::rule::RecurrenceRule::parse), which
/// collapses every variant into `None` (the fail-open policy: a rule that
/// cannot be understood is treated as absent, and the task shows up as a
/// single non-recurring instance instead of crashing or disappearing).
#[derive(Error, Debug, PartialEq)]
pub enum RuleParseError {
    #[error("Missing FREQ component")]
    MissingFrequency,

    #[error("Unknown frequency: {0}")]
    UnknownFrequency(String),

    #[error("Unknown component: {0}")]
    UnknownKey(String),

    #[error("Malformed component (expected KEY=VALUE): {0}")]
    MalformedToken(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid weekday token: {0}")]
    InvalidWeekday(String),

    #[error("Month out of range: {0}")]
    InvalidMonth(String),

    #[error("Day of month out of range: {0}")]
    InvalidMonthDay(String),

    #[error("Invalid date (expected YYYYMMDD): {0}")]
    InvalidDate(String),

    #[error("WEEKLY rule requires a non-empty BYDAY")]
    MissingByDay,

    #[error("MONTHLY rule requires a non-empty BYMONTHDAY")]
    MissingByMonthDay,
}
