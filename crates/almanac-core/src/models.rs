use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scheduled task as stored by the organizer.
///
/// Only the fields the recurrence core consumes are modeled here; the host
/// application carries additional columns (reminders, locations, images)
/// that travel through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    pub title: String,
    /// Anchor date/time: the first (base) occurrence of the task.
    pub date: NaiveDateTime,
    /// Optional end of the base occurrence; duration is preserved when
    /// occurrences are projected onto later dates.
    pub end_date: Option<NaiveDateTime>,
    pub all_day: bool,
    /// Encoded recurrence rule. `None` means the task does not repeat.
    pub rrule: Option<String>,
    /// Hides the base row without stopping occurrence generation.
    pub deleted: bool,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7(),
            title: String::new(),
            date: Utc::now().naive_utc(),
            end_date: None,
            all_day: false,
            rrule: None,
            deleted: false,
        }
    }
}

impl Task {
    /// Anchor date without the time-of-day component.
    pub fn anchor_date(&self) -> NaiveDate {
        self.date.date()
    }

    /// Projects this task onto a different occurrence date.
    ///
    /// The time-of-day is kept from the base task, and `end_date` is shifted
    /// by the same whole-day delta so the duration is unchanged. The id is
    /// kept as well: occurrences are computed views, not separate rows, and
    /// a logical instance is identified by `(id, date)`.
    pub fn occurrence_on(&self, date: NaiveDate) -> Task {
        let day_delta = date.signed_duration_since(self.anchor_date());
        Task {
            date: date.and_time(self.date.time()),
            end_date: self.end_date.map(|end| end + day_delta),
            ..self.clone()
        }
    }

    /// Identity key of a logical occurrence instance.
    pub fn occurrence_key(&self) -> (Uuid, NaiveDateTime) {
        (self.id, self.date)
    }
}
