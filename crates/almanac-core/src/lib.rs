//! # Almanac Core Library
//!
//! The recurrence engine behind the Almanac organizer: a pure-computation
//! core that parses the compact RRULE encoding stored on task rows, expands
//! recurring tasks into concrete occurrences over a query window, and merges
//! those occurrences with directly-stored rows.
//!
//! ## Features
//!
//! - **RRULE Codec**: strict parser and canonical serializer for the
//!   `FREQ`/`INTERVAL`/`BYDAY`/`BYMONTH`/`BYMONTHDAY`/`UNTIL`/`EXDATE`
//!   grammar, with a fail-open boundary (an unreadable rule means
//!   "non-recurring", never a crash)
//! - **Occurrence Expansion**: daily, weekly, and monthly rules including
//!   the last-day-of-month sentinel, anchored interval arithmetic, and
//!   inclusive `UNTIL` cutoffs
//! - **Exclusion Dates**: "delete this occurrence" is a single idempotent
//!   string append, no occurrence-deletion table required
//! - **Window Merging**: de-duplicated, date-sorted union of stored rows
//!   and generated occurrences for a half-open query window
//! - **Pure Functions**: no I/O and no shared mutable state; every entry
//!   point is safe to call concurrently from reactive query pipelines
//!
//! ## Core Modules
//!
//! - [`models`]: the task record and its occurrence projection
//! - [`rule`]: the [`RecurrenceRule`](rule::RecurrenceRule) value and codec
//! - [`recurrence`]: occurrence matching and expansion
//! - [`window`]: the range-query merge entry point
//! - [`error`]: parse-failure detail for diagnostics
//!
//! ## Example Usage
//!
//! ```rust
//! use almanac_core::{models::Task, recurrence::RecurrenceExpander, window::merge_window};
//! use chrono::NaiveDate;
//!
//! let base = Task {
//!     title: "Standup".to_string(),
//!     date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap(),
//!     rrule: Some("FREQ=WEEKLY;BYDAY=MO,WE,FR".to_string()),
//!     ..Default::default()
//! };
//!
//! let window_start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let window_end = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
//!
//! let occurrences = merge_window(&[base.clone()], &[base], window_start, window_end);
//! assert_eq!(occurrences.len(), 6);
//! ```

pub mod error;
pub mod models;
pub mod recurrence;
pub mod rule;
pub mod window;
