//! Merging stored task rows with generated occurrences for a query window.
//!
//! The repository layer answers a date-range query with two fetches: the
//! rows whose own date column falls inside the window, and every recurring
//! base task whose anchor is not past the window end (a superset, since a
//! rule can fire inside the window even when its anchor is outside it).
//! [`merge_window`] turns those two lists into the final occurrence list.
//!
//! Deletion of recurring tasks is driven entirely by rule mutation, with no
//! separate occurrence table:
//!
//! - delete one occurrence: [`add_ex_date`](crate::rule::add_ex_date) with
//!   that occurrence's date, `deleted` stays false;
//! - delete only the base occurrence: `add_ex_date` with the anchor date
//!   and `deleted = true` (the base row hides itself, later dates still
//!   generate);
//! - delete the whole series: drop the row outright.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::models::Task;
use crate::recurrence::RecurrenceExpander;
use crate::rule::RecurrenceRule;

/// Produces the occurrence list for the half-open window
/// `[window_start, window_end)`, ascending by date, with no `(id, date)`
/// pair appearing twice.
pub fn merge_window(
    stored_in_range: &[Task],
    recurring_candidates: &[Task],
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> Vec<Task> {
    let mut merged = Vec::with_capacity(stored_in_range.len());

    // Stored rows first. A recurring row is re-validated against its own
    // rule: an anchor that was excluded via EXDATE, or that never satisfied
    // the by-filters, must not show up as a standalone row.
    for task in stored_in_range {
        let keep = match task.rrule.as_deref().and_then(RecurrenceRule::parse) {
            // Unparseable rules fall open to "non-recurring".
            None => !task.deleted,
            Some(rule) => !task.deleted && rule.matches(task.anchor_date(), task.anchor_date()),
        };
        if keep {
            merged.push(task.clone());
        }
    }

    let mut covered: HashSet<_> = merged.iter().map(Task::occurrence_key).collect();

    // Deleted base tasks still seed generation: `deleted` hides the row
    // itself, not the series. The anchor occurrence only disappears once its
    // date is also in EXDATE.
    for candidate in recurring_candidates {
        let Some(expander) = RecurrenceExpander::for_task(candidate) else {
            continue;
        };
        for occurrence in expander.occurrences(window_start, window_end) {
            if covered.insert(occurrence.occurrence_key()) {
                merged.push(occurrence);
            }
        }
    }

    merged.sort_by_key(|task| task.date);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::add_ex_date;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn plain_task(title: &str, at: NaiveDateTime) -> Task {
        Task {
            title: title.to_string(),
            date: at,
            ..Default::default()
        }
    }

    fn recurring_task(title: &str, at: NaiveDateTime, rrule: &str) -> Task {
        Task {
            rrule: Some(rrule.to_string()),
            ..plain_task(title, at)
        }
    }

    fn window() -> (NaiveDateTime, NaiveDateTime) {
        (dt(2024, 1, 1, 0), dt(2024, 1, 15, 0))
    }

    #[test]
    fn merges_and_sorts_by_date() {
        let (start, end) = window();
        let stored = vec![plain_task("dentist", dt(2024, 1, 9, 14))];
        let recurring = vec![recurring_task("standup", dt(2024, 1, 8, 9), "FREQ=DAILY;INTERVAL=2")];

        let merged = merge_window(&stored, &recurring, start, end);
        let dates: Vec<_> = merged.iter().map(|t| t.date).collect();
        assert_eq!(
            dates,
            vec![dt(2024, 1, 8, 9), dt(2024, 1, 9, 14), dt(2024, 1, 10, 9), dt(2024, 1, 12, 9), dt(2024, 1, 14, 9)],
        );
    }

    #[test]
    fn no_occurrence_key_appears_twice() {
        let (start, end) = window();
        // The base row is both stored in range and a recurring candidate;
        // its anchor occurrence must appear exactly once.
        let base = recurring_task("standup", dt(2024, 1, 3, 9), "FREQ=DAILY;INTERVAL=3");
        let merged = merge_window(
            std::slice::from_ref(&base),
            std::slice::from_ref(&base),
            start,
            end,
        );

        let mut keys: Vec<_> = merged.iter().map(Task::occurrence_key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), merged.len());
        assert_eq!(
            merged.iter().map(|t| t.date).collect::<Vec<_>>(),
            vec![dt(2024, 1, 3, 9), dt(2024, 1, 6, 9), dt(2024, 1, 9, 9), dt(2024, 1, 12, 9)],
        );
    }

    #[test]
    fn deleted_plain_task_is_hidden() {
        let (start, end) = window();
        let mut task = plain_task("cancelled", dt(2024, 1, 5, 10));
        task.deleted = true;
        assert!(merge_window(&[task], &[], start, end).is_empty());
    }

    #[test]
    fn unparseable_rule_falls_open_to_single_instance() {
        let (start, end) = window();
        let task = recurring_task("odd", dt(2024, 1, 5, 10), "FREQ=EVERY_FULL_MOON");
        let merged = merge_window(std::slice::from_ref(&task), std::slice::from_ref(&task), start, end);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].date, dt(2024, 1, 5, 10));
    }

    #[test]
    fn anchor_outside_window_still_generates_inside() {
        let (start, end) = window();
        let candidate = recurring_task("weekly", dt(2023, 12, 4, 18), "FREQ=WEEKLY;BYDAY=MO");
        let merged = merge_window(&[], &[candidate], start, end);
        assert_eq!(
            merged.iter().map(|t| t.date).collect::<Vec<_>>(),
            vec![dt(2024, 1, 1, 18), dt(2024, 1, 8, 18)],
        );
    }

    #[test]
    fn delete_one_occurrence_via_ex_date() {
        let (start, end) = window();
        let mut base = recurring_task("standup", dt(2024, 1, 1, 9), "FREQ=DAILY;INTERVAL=3");
        base.rrule = Some(add_ex_date(base.rrule.as_deref().unwrap(), date(2024, 1, 4)));

        let merged = merge_window(std::slice::from_ref(&base), std::slice::from_ref(&base), start, end);
        let dates: Vec<_> = merged.iter().map(Task::anchor_date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 1), date(2024, 1, 7), date(2024, 1, 10), date(2024, 1, 13)],
        );
    }

    #[test]
    fn delete_base_occurrence_keeps_future_ones() {
        let (start, end) = window();
        let mut base = recurring_task("standup", dt(2024, 1, 1, 9), "FREQ=DAILY;INTERVAL=3");
        // "Delete only this (the base) occurrence": exclude the anchor date
        // and hide the row.
        base.rrule = Some(add_ex_date(base.rrule.as_deref().unwrap(), date(2024, 1, 1)));
        base.deleted = true;

        let merged = merge_window(std::slice::from_ref(&base), std::slice::from_ref(&base), start, end);
        let dates: Vec<_> = merged.iter().map(Task::anchor_date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 4), date(2024, 1, 7), date(2024, 1, 10), date(2024, 1, 13)],
        );
    }

    #[test]
    fn deleted_recurring_base_without_ex_date_still_generates_anchor() {
        let (start, end) = window();
        let mut base = recurring_task("standup", dt(2024, 1, 1, 9), "FREQ=DAILY;INTERVAL=7");
        base.deleted = true;

        // The row itself is hidden, but generation is unaffected: without an
        // EXDATE the anchor date reappears as a generated occurrence.
        let merged = merge_window(std::slice::from_ref(&base), std::slice::from_ref(&base), start, end);
        let dates: Vec<_> = merged.iter().map(Task::anchor_date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 8)]);
    }

    #[test]
    fn stored_anchor_failing_its_own_by_filters_is_dropped() {
        let (start, end) = window();
        // Anchor is Wednesday Jan 3 but the rule fires on Mondays only.
        let base = recurring_task("weekly", dt(2024, 1, 3, 9), "FREQ=WEEKLY;BYDAY=MO");
        let merged = merge_window(std::slice::from_ref(&base), std::slice::from_ref(&base), start, end);
        let dates: Vec<_> = merged.iter().map(Task::anchor_date).collect();
        assert_eq!(dates, vec![date(2024, 1, 8)]);
    }

    #[test]
    fn occurrences_keep_base_id_and_title() {
        let (start, end) = window();
        let base = recurring_task("standup", dt(2024, 1, 1, 9), "FREQ=WEEKLY;BYDAY=MO");
        let merged = merge_window(&[], std::slice::from_ref(&base), start, end);
        assert!(merged.iter().all(|t| t.id == base.id && t.title == "standup"));
    }
}
