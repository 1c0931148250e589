//! Timesheet computation.
//!
//! Walks working days backward from today's work-start anchor, looks up the
//! day-local tickets for each day, and turns them into rounded, capped hours.
//!
//! # Rules
//!
//! - Hours are rounded to the nearest quarter hour.
//! - A single task of at least `working / 2 + lunch` hours has lunch deducted.
//! - Task durations and the daily sum are capped at `working` hours.
//! - Weekends are skipped; days without tasks are not reported.

use serde::{Deserialize, Serialize};

use crate::date::{
    Clock, DayKey, Period, Periodic, add_days, add_hours, date_start, intersect, is_working_day,
    work_anchor,
};
use crate::prepare::prepare;
use crate::record::{DayRecord, Meeting, Task, Ticket};
use crate::types::{Error, Result};

const HOURS_PER_DAY: f64 = 24.0;

/// Length of the working day and its allowances, in hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hours {
    /// Hours in a full working day; also the cap for any task or day.
    pub working: f64,
    /// Lunch break deducted from long tasks.
    pub lunch: f64,
    /// Hours of interruptions tolerated per day.
    pub interrupts: f64,
}

impl Default for Hours {
    fn default() -> Self {
        Self {
            working: 8.0,
            lunch: 1.0,
            interrupts: 2.0,
        }
    }
}

impl Hours {
    /// Task length from which lunch is deducted.
    pub fn lunch_threshold(&self) -> f64 {
        self.working / 2.0 + self.lunch
    }

    /// Included hours that survive the interruption allowance.
    pub fn focus_budget(&self) -> f64 {
        self.working - self.interrupts
    }

    pub fn cap(&self, hours: f64) -> f64 {
        hours.min(self.working)
    }

    /// Checks that the values describe a working day.
    ///
    /// All values must be finite, `working` must lie in `(0, 24]`, and `lunch`
    /// and `interrupts` in `[0, working]`.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field, reason| Err(Error::InvalidHours { field, reason });
        let values = [
            ("working", self.working),
            ("lunch", self.lunch),
            ("interrupts", self.interrupts),
        ];
        for (field, value) in values {
            if !value.is_finite() {
                return invalid(field, "must be a finite number");
            }
        }
        if self.working <= 0.0 || self.working > HOURS_PER_DAY {
            return invalid("working", "must be more than 0 and at most 24");
        }
        for &(field, value) in &values[1..] {
            if !(0.0..=self.working).contains(&value) {
                return invalid(field, "must be between 0 and the working hours");
            }
        }
        Ok(())
    }
}

/// How `exclude` hours are derived for a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcludePolicy {
    /// Deduct included hours beyond `working - interrupts`.
    #[default]
    InterruptBudget,
    /// Never deduct anything.
    None,
}

impl ExcludePolicy {
    pub fn exclude(self, include: f64, hours: &Hours) -> f64 {
        match self {
            Self::InterruptBudget => (include - hours.focus_budget()).max(0.0),
            Self::None => 0.0,
        }
    }
}

/// Parameters of a timesheet computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimesheetConfig {
    pub hours: Hours,
    pub exclude_policy: ExcludePolicy,
}

/// Rounds hours to the nearest quarter hour.
pub fn round_quarter(hours: f64) -> f64 {
    (hours * 4.0).round() / 4.0
}

/// Hours booked for one contributing interval.
pub fn duration(interval: Period, hours: &Hours) -> f64 {
    let mut booked = round_quarter(interval.hours());
    if booked >= hours.lunch_threshold() {
        booked -= hours.lunch;
    }
    hours.cap(booked)
}

/// The part of a ticket that counts towards a day.
///
/// A ticket lying wholly within the day counts in full; anything else counts
/// only where it overlaps the day's working window.
fn contributing_interval(ticket: Period, window: Period) -> Option<Period> {
    if ticket.is_single_day() && date_start(ticket.from) == date_start(window.from) {
        Some(ticket)
    } else {
        intersect(ticket, window)
    }
}

/// Computes the timesheet for the last `compute_days` calendar days, today
/// included, most recent day first.
///
/// Only tickets and meetings touching the lookback window are considered.
/// Fails when the hours are invalid, when any ticket or meeting ends before
/// it starts, or when the lookback reaches past the representable dates.
pub fn compute<C: Clock + ?Sized>(
    tickets: &[Ticket],
    meetings: &[Meeting],
    compute_days: u32,
    config: &TimesheetConfig,
    clock: &C,
) -> Result<Vec<DayRecord>> {
    if compute_days == 0 {
        return Ok(Vec::new());
    }

    let hours = &config.hours;
    hours.validate()?;

    let now = clock.now();
    let since = add_days(1 - i64::from(compute_days), date_start(now))?;
    let ticket_buckets = prepare(tickets, since)?;
    let meeting_buckets = prepare(meetings, since)?;

    let work_start = work_anchor(now);
    let today = Period {
        from: work_start,
        to: add_hours(hours.working + hours.lunch, work_start)?,
    };

    let mut timesheet = Vec::new();
    for day in 0..i64::from(compute_days) {
        let window = Period {
            from: add_days(-day, today.from)?,
            to: add_days(-day, today.to)?,
        };
        let key = DayKey::of(window.from);
        if !is_working_day(window.from) {
            tracing::trace!(%key, "skipping non-working day");
            continue;
        }

        let includes = ticket_buckets.get(key);
        let excludes = meeting_buckets.get(key);

        let tasks: Vec<Task> = includes
            .iter()
            .filter_map(|ticket| {
                let interval = contributing_interval(ticket.period(), window)?;
                Some(Task {
                    activity_id: ticket.activity_id.clone(),
                    duration: duration(interval, hours),
                    from: interval.from,
                    to: interval.to,
                })
            })
            .collect();

        if tasks.is_empty() {
            tracing::trace!(%key, meetings = excludes.len(), "no tracked activity");
            continue;
        }

        let include = hours.cap(round_quarter(tasks.iter().map(|t| t.duration).sum()));
        let exclude = config.exclude_policy.exclude(include, hours);
        tracing::debug!(
            %key,
            tasks = tasks.len(),
            meetings = excludes.len(),
            include,
            exclude,
            "computed day"
        );

        timesheet.push(DayRecord {
            date: window.from,
            total: include - exclude,
            include,
            exclude,
            tasks,
        });
    }

    Ok(timesheet)
}

#[cfg(test)]
#[expect(
    clippy::float_cmp,
    reason = "quarter-hour values are exact in binary floating point"
)]
mod tests {
    use super::*;
    use crate::date::{FixedClock, parse};
    use crate::types::ActivityId;
    use chrono::{DateTime, Utc};

    fn at(s: &str) -> DateTime<Utc> {
        parse(s).unwrap()
    }

    fn period(from: &str, to: &str) -> Period {
        Period::new(at(from), at(to)).unwrap()
    }

    fn ticket(key: &str, from: &str, to: &str) -> Ticket {
        Ticket {
            activity_id: ActivityId::new(key).unwrap(),
            from: at(from),
            to: at(to),
        }
    }

    fn meeting(title: &str, from: &str, to: &str) -> Meeting {
        Meeting {
            title: title.to_string(),
            from: at(from),
            to: at(to),
        }
    }

    /// Wednesday 2020-03-04, mid-morning.
    fn wednesday() -> FixedClock {
        FixedClock(at("2020-03-04T11:00:00Z"))
    }

    fn no_exclude() -> TimesheetConfig {
        TimesheetConfig {
            exclude_policy: ExcludePolicy::None,
            ..TimesheetConfig::default()
        }
    }

    // ========== Duration Rules ==========

    #[test]
    fn test_round_quarter() {
        assert_eq!(round_quarter(0.11), 0.0);
        assert_eq!(round_quarter(0.125), 0.25);
        assert_eq!(round_quarter(0.13), 0.25);
        assert_eq!(round_quarter(2.62), 2.5);
        assert_eq!(round_quarter(2.63), 2.75);
        assert_eq!(round_quarter(8.0), 8.0);
    }

    #[test]
    fn test_duration_full_day_deducts_lunch() {
        let hours = Hours::default();
        assert_eq!(duration(period("2020-03-02T09:00:00Z", "2020-03-02T17:00:00Z"), &hours), 7.0);
    }

    #[test]
    fn test_duration_lunch_threshold_is_inclusive() {
        let hours = Hours::default();
        assert_eq!(duration(period("2020-03-02T09:00:00Z", "2020-03-02T14:00:00Z"), &hours), 4.0);
        assert_eq!(
            duration(period("2020-03-02T09:00:00Z", "2020-03-02T13:45:00Z"), &hours),
            4.75
        );
    }

    #[test]
    fn test_duration_capped_at_working_day() {
        let hours = Hours::default();
        assert_eq!(duration(period("2020-03-02T00:00:00Z", "2020-03-02T23:59:59Z"), &hours), 8.0);
    }

    #[test]
    fn test_duration_short_interval_rounds_to_zero() {
        let hours = Hours::default();
        assert_eq!(duration(period("2020-03-02T09:00:00Z", "2020-03-02T09:07:00Z"), &hours), 0.0);
        assert_eq!(
            duration(period("2020-03-02T09:00:00Z", "2020-03-02T09:08:00Z"), &hours),
            0.25
        );
    }

    #[test]
    fn test_duration_custom_hours() {
        let hours = Hours {
            working: 7.5,
            lunch: 0.5,
            interrupts: 1.0,
        };
        // threshold 4.25h
        assert_eq!(duration(period("2020-03-02T09:00:00Z", "2020-03-02T13:15:00Z"), &hours), 3.75);
        assert_eq!(duration(period("2020-03-02T08:00:00Z", "2020-03-02T18:00:00Z"), &hours), 7.5);
    }

    #[test]
    fn test_default_hours_are_valid() {
        assert!(Hours::default().validate().is_ok());
        let edge = Hours {
            working: 24.0,
            lunch: 24.0,
            interrupts: 0.0,
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_hours_validate_rejects_unusable_values() {
        let defaults = Hours::default();
        let cases = [
            (Hours { working: f64::NAN, ..defaults }, "working"),
            (Hours { lunch: f64::INFINITY, ..defaults }, "lunch"),
            (Hours { interrupts: f64::NAN, ..defaults }, "interrupts"),
            (Hours { working: 0.0, ..defaults }, "working"),
            (Hours { working: -8.0, ..defaults }, "working"),
            (Hours { working: 1e300, ..defaults }, "working"),
            (Hours { lunch: -1.0, ..defaults }, "lunch"),
            (Hours { lunch: 9.0, ..defaults }, "lunch"),
            (Hours { interrupts: -0.5, ..defaults }, "interrupts"),
            (Hours { interrupts: 8.5, ..defaults }, "interrupts"),
        ];
        for (hours, expected) in cases {
            let err = hours.validate().unwrap_err();
            assert!(
                matches!(err, Error::InvalidHours { field, .. } if field == expected),
                "{hours:?}: {err}"
            );
        }
    }

    // ========== Exclude Policy ==========

    #[test]
    fn test_interrupt_budget_excludes_hours_beyond_focus_budget() {
        let hours = Hours::default();
        assert_eq!(ExcludePolicy::InterruptBudget.exclude(8.0, &hours), 2.0);
        assert_eq!(ExcludePolicy::InterruptBudget.exclude(6.5, &hours), 0.5);
        assert_eq!(ExcludePolicy::InterruptBudget.exclude(6.0, &hours), 0.0);
        assert_eq!(ExcludePolicy::InterruptBudget.exclude(3.0, &hours), 0.0);
    }

    #[test]
    fn test_exclude_none_policy_never_deducts() {
        let hours = Hours::default();
        assert_eq!(ExcludePolicy::None.exclude(8.0, &hours), 0.0);
    }

    // ========== Compute ==========

    #[test]
    fn test_compute_single_full_day_ticket() {
        let tickets = [ticket("PRJ-1", "2020-03-02T09:00:00Z", "2020-03-02T17:00:00Z")];
        let sheet = compute(&tickets, &[], 3, &TimesheetConfig::default(), &wednesday()).unwrap();

        assert_eq!(sheet.len(), 1);
        let day = &sheet[0];
        assert_eq!(day.date, at("2020-03-02T08:30:00Z"));
        assert_eq!(day.tasks.len(), 1);
        assert_eq!(day.tasks[0].duration, 7.0);
        assert_eq!(day.tasks[0].from, at("2020-03-02T09:00:00Z"));
        assert_eq!(day.tasks[0].to, at("2020-03-02T17:00:00Z"));
        assert_eq!(day.include, 7.0);
        // interrupt budget: 7 - (8 - 2)
        assert_eq!(day.exclude, 1.0);
        assert_eq!(day.total, 6.0);
    }

    #[test]
    fn test_compute_single_full_day_ticket_without_exclude() {
        let tickets = [ticket("PRJ-1", "2020-03-02T09:00:00Z", "2020-03-02T17:00:00Z")];
        let sheet = compute(&tickets, &[], 3, &no_exclude(), &wednesday()).unwrap();

        assert_eq!(sheet[0].include, 7.0);
        assert_eq!(sheet[0].exclude, 0.0);
        assert_eq!(sheet[0].total, 7.0);
    }

    #[test]
    fn test_compute_orders_days_most_recent_first() {
        let tickets = [
            ticket("PRJ-1", "2020-03-02T09:00:00Z", "2020-03-02T10:00:00Z"),
            ticket("PRJ-2", "2020-03-04T09:00:00Z", "2020-03-04T10:00:00Z"),
            ticket("PRJ-3", "2020-03-03T09:00:00Z", "2020-03-03T10:00:00Z"),
        ];
        let sheet = compute(&tickets, &[], 3, &TimesheetConfig::default(), &wednesday()).unwrap();

        let dates: Vec<_> = sheet.iter().map(|d| d.date).collect();
        assert_eq!(
            dates,
            vec![
                at("2020-03-04T08:30:00Z"),
                at("2020-03-03T08:30:00Z"),
                at("2020-03-02T08:30:00Z"),
            ]
        );
        assert_eq!(sheet[0].tasks[0].activity_id.as_str(), "PRJ-2");
    }

    #[test]
    fn test_compute_splits_multi_day_ticket() {
        let tickets = [ticket("PRJ-9", "2020-03-02T14:15:00Z", "2020-03-04T10:45:00Z")];
        let sheet = compute(&tickets, &[], 3, &no_exclude(), &wednesday()).unwrap();

        assert_eq!(sheet.len(), 3);
        let segments: Vec<_> = sheet.iter().map(|d| (d.tasks[0].from, d.tasks[0].to)).collect();
        assert_eq!(
            segments,
            vec![
                (at("2020-03-04T00:00:00Z"), at("2020-03-04T10:45:00Z")),
                (at("2020-03-03T00:00:00Z"), at("2020-03-03T23:59:59Z")),
                (at("2020-03-02T14:15:00Z"), at("2020-03-02T23:59:59Z")),
            ]
        );
        for day in &sheet {
            assert_eq!(day.include, 8.0, "{}", day.date);
        }
    }

    #[test]
    fn test_compute_sums_and_caps_daily_include() {
        let tickets = [
            ticket("PRJ-1", "2020-03-03T09:00:00Z", "2020-03-03T11:00:00Z"),
            ticket("PRJ-2", "2020-03-03T11:00:00Z", "2020-03-03T14:00:00Z"),
        ];
        let sheet = compute(&tickets, &[], 3, &TimesheetConfig::default(), &wednesday()).unwrap();
        assert_eq!(sheet[0].include, 5.0);
        assert_eq!(sheet[0].exclude, 0.0);
        assert_eq!(sheet[0].total, 5.0);

        let tickets = [
            ticket("PRJ-1", "2020-03-03T06:00:00Z", "2020-03-03T10:30:00Z"),
            ticket("PRJ-2", "2020-03-03T10:30:00Z", "2020-03-03T15:00:00Z"),
            ticket("PRJ-3", "2020-03-03T15:00:00Z", "2020-03-03T18:00:00Z"),
        ];
        let sheet = compute(&tickets, &[], 3, &TimesheetConfig::default(), &wednesday()).unwrap();
        let durations: Vec<_> = sheet[0].tasks.iter().map(|t| t.duration).collect();
        assert_eq!(durations, vec![4.5, 4.5, 3.0]);
        assert_eq!(sheet[0].include, 8.0);
        assert_eq!(sheet[0].exclude, 2.0);
        assert_eq!(sheet[0].total, 6.0);
    }

    #[test]
    fn test_compute_skips_weekends() {
        // Monday 2020-03-09; the lookback covers Sat 7th and Sun 8th
        let clock = FixedClock(at("2020-03-09T10:00:00Z"));
        let tickets = [
            ticket("PRJ-1", "2020-03-07T10:00:00Z", "2020-03-07T12:00:00Z"),
            ticket("PRJ-2", "2020-03-08T10:00:00Z", "2020-03-08T12:00:00Z"),
            ticket("PRJ-3", "2020-03-09T09:00:00Z", "2020-03-09T10:00:00Z"),
        ];
        let sheet = compute(&tickets, &[], 3, &TimesheetConfig::default(), &clock).unwrap();

        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet[0].date, at("2020-03-09T08:30:00Z"));
        assert_eq!(sheet[0].tasks[0].activity_id.as_str(), "PRJ-3");
    }

    #[test]
    fn test_compute_ignores_tickets_before_lookback() {
        let tickets = [
            ticket("OLD-1", "2020-02-27T09:00:00Z", "2020-02-27T17:00:00Z"),
            ticket("PRJ-1", "2020-03-04T09:00:00Z", "2020-03-04T10:00:00Z"),
        ];
        let sheet = compute(&tickets, &[], 3, &TimesheetConfig::default(), &wednesday()).unwrap();

        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet[0].tasks[0].activity_id.as_str(), "PRJ-1");
    }

    #[test]
    fn test_compute_clips_ticket_started_before_lookback() {
        let tickets = [ticket("PRJ-1", "2020-02-20T09:00:00Z", "2020-03-02T10:00:00Z")];
        let sheet = compute(&tickets, &[], 3, &TimesheetConfig::default(), &wednesday()).unwrap();

        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet[0].tasks[0].from, at("2020-03-02T00:00:00Z"));
        assert_eq!(sheet[0].tasks[0].duration, 8.0);
    }

    #[test]
    fn test_compute_single_day_includes_today_only() {
        let tickets = [
            ticket("PRJ-1", "2020-03-03T09:00:00Z", "2020-03-03T10:00:00Z"),
            ticket("PRJ-2", "2020-03-04T09:00:00Z", "2020-03-04T10:00:00Z"),
        ];
        let sheet = compute(&tickets, &[], 1, &TimesheetConfig::default(), &wednesday()).unwrap();

        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet[0].tasks[0].activity_id.as_str(), "PRJ-2");
    }

    #[test]
    fn test_compute_zero_days_is_empty() {
        let tickets = [ticket("PRJ-1", "2020-03-04T09:00:00Z", "2020-03-04T10:00:00Z")];
        let sheet = compute(&tickets, &[], 0, &TimesheetConfig::default(), &wednesday()).unwrap();
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_compute_empty_inputs() {
        let sheet = compute(&[], &[], 10, &TimesheetConfig::default(), &wednesday()).unwrap();
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_compute_meetings_alone_produce_no_days() {
        let meetings = [meeting("Planning", "2020-03-04T09:00:00Z", "2020-03-04T12:00:00Z")];
        let sheet = compute(&[], &meetings, 3, &TimesheetConfig::default(), &wednesday()).unwrap();
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_compute_exclude_does_not_depend_on_meeting_hours() {
        // Both exclude variants derive from included hours only; meetings on
        // the day leave the record unchanged.
        let tickets = [ticket("PRJ-1", "2020-03-04T08:00:00Z", "2020-03-04T16:00:00Z")];
        let meetings = [meeting("Planning", "2020-03-04T09:00:00Z", "2020-03-04T12:00:00Z")];
        for config in [TimesheetConfig::default(), no_exclude()] {
            let with = compute(&tickets, &meetings, 3, &config, &wednesday()).unwrap();
            let without = compute(&tickets, &[], 3, &config, &wednesday()).unwrap();
            assert_eq!(with, without, "{:?}", config.exclude_policy);
        }
    }

    #[test]
    fn test_compute_rejects_reversed_meeting() {
        let meetings = [meeting("Broken", "2020-03-04T12:00:00Z", "2020-03-04T09:00:00Z")];
        let err = compute(&[], &meetings, 3, &TimesheetConfig::default(), &wednesday()).unwrap_err();
        assert!(matches!(err, Error::InvalidPeriod { .. }));
    }

    #[test]
    fn test_compute_rejects_invalid_hours() {
        let tickets = [ticket("PRJ-1", "2020-03-04T09:00:00Z", "2020-03-04T17:00:00Z")];
        for working in [-8.0, 1e300, f64::NAN] {
            let config = TimesheetConfig {
                hours: Hours {
                    working,
                    ..Hours::default()
                },
                ..TimesheetConfig::default()
            };
            let err = compute(&tickets, &[], 3, &config, &wednesday()).unwrap_err();
            assert!(matches!(err, Error::InvalidHours { field: "working", .. }), "{err}");
        }
    }

    #[test]
    fn test_compute_lookback_beyond_calendar_range_fails() {
        let tickets = [ticket("PRJ-1", "2020-03-04T09:00:00Z", "2020-03-04T10:00:00Z")];
        for days in [200_000_000, u32::MAX] {
            let err = compute(&tickets, &[], days, &TimesheetConfig::default(), &wednesday())
                .unwrap_err();
            assert!(matches!(err, Error::OutOfRange { .. }), "{days}: {err}");
        }
    }

    #[test]
    fn test_compute_is_deterministic() {
        let tickets = [
            ticket("PRJ-1", "2020-03-02T14:15:00Z", "2020-03-04T10:45:00Z"),
            ticket("PRJ-2", "2020-03-03T09:00:00Z", "2020-03-03T11:00:00Z"),
        ];
        let first = compute(&tickets, &[], 5, &TimesheetConfig::default(), &wednesday()).unwrap();
        let second = compute(&tickets, &[], 5, &TimesheetConfig::default(), &wednesday()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_contributing_interval_clips_foreign_day_to_window() {
        let window = period("2020-03-03T08:30:00Z", "2020-03-03T17:30:00Z");
        let long = period("2020-03-02T10:00:00Z", "2020-03-03T12:00:00Z");
        assert_eq!(
            contributing_interval(long, window),
            Some(period("2020-03-03T08:30:00Z", "2020-03-03T12:00:00Z"))
        );
        let elsewhere = period("2020-03-05T10:00:00Z", "2020-03-05T12:00:00Z");
        assert_eq!(contributing_interval(elsewhere, window), None);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: TimesheetConfig =
            serde_json::from_str(r#"{"hours": {"working": 7.5}, "exclude_policy": "none"}"#).unwrap();
        assert_eq!(config.hours.working, 7.5);
        assert_eq!(config.hours.lunch, 1.0);
        assert_eq!(config.exclude_policy, ExcludePolicy::None);
    }
}
