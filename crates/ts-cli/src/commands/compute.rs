//! Compute command: builds the timesheet from an activity file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_core::date::{add_hours, work_anchor};
use ts_core::{
    Clock, DayRecord, FixedClock, IssueHistory, Meeting, SystemClock, Ticket, active_tickets,
};

use crate::Config;
use crate::commands::report;

/// Raw activity fetched from the tracker and the calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityLog {
    /// Ticket intervals that are already resolved.
    pub tickets: Vec<Ticket>,
    /// Issues whose intervals are replayed from their changelog.
    pub issues: Vec<IssueHistory>,
    pub meetings: Vec<Meeting>,
}

/// Options of a single compute run.
#[derive(Debug, Clone)]
pub struct ComputeArgs {
    pub input: PathBuf,
    /// Overrides the configured lookback.
    pub days: Option<u32>,
    /// Overrides the wall clock.
    pub now: Option<DateTime<Utc>>,
    /// Overrides the configured account.
    pub account: Option<String>,
    pub json: bool,
}

/// Reads an activity file.
pub fn load_activity(path: &Path) -> Result<ActivityLog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Tickets to account for: the resolved ones plus those replayed from issues.
fn collect_tickets(
    log: &ActivityLog,
    config: &Config,
    account: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<Ticket>> {
    let mut tickets = log.tickets.clone();
    if log.issues.is_empty() {
        return Ok(tickets);
    }

    let Some(account) = account else {
        tracing::warn!(
            issues = log.issues.len(),
            "no account configured; skipping issue histories"
        );
        return Ok(tickets);
    };

    let hours = config.hours;
    hours.validate().context("invalid hours configuration")?;
    let until = add_hours(hours.working + hours.lunch, work_anchor(now))
        .context("failed to resolve end of working day")?;
    tickets.extend(active_tickets(
        &log.issues,
        account,
        &config.in_progress_statuses,
        until,
    ));
    Ok(tickets)
}

/// Computes the timesheet for an activity log.
pub fn build_timesheet<C: Clock>(
    log: &ActivityLog,
    config: &Config,
    args: &ComputeArgs,
    clock: &C,
) -> Result<Vec<DayRecord>> {
    let account = args.account.as_deref().or(config.account_id.as_deref());
    let tickets = collect_tickets(log, config, account, clock.now())?;
    let days = args.days.unwrap_or(config.compute_days);

    tracing::debug!(
        tickets = tickets.len(),
        meetings = log.meetings.len(),
        days,
        "computing timesheet"
    );
    ts_core::compute(&tickets, &log.meetings, days, &config.timesheet(), clock)
        .context("failed to compute timesheet")
}

/// The instant a run computes for: the `--now` override, or a single reading
/// of `clock`.
fn freeze<C: Clock>(now: Option<DateTime<Utc>>, clock: &C) -> FixedClock {
    FixedClock(now.unwrap_or_else(|| clock.now()))
}

/// Runs the compute command.
pub fn run(config: &Config, args: &ComputeArgs) -> Result<()> {
    let log = load_activity(&args.input)?;
    let clock = freeze(args.now, &SystemClock);
    let days = build_timesheet(&log, config, args, &clock)?;
    let generated_at = clock.now();

    if args.json {
        let output = report::format_timesheet_json(&days, generated_at)?;
        println!("{output}");
    } else {
        let output = report::format_timesheet(&days);
        print!("{output}");
    }

    Ok(())
}

#[cfg(test)]
#[expect(
    clippy::float_cmp,
    reason = "quarter-hour values are exact in binary floating point"
)]
mod tests {
    use super::*;

    const LOG: &str = r#"{
        "tickets": [
            {"activity_id": "PRJ-1", "from": "2020-03-02T09:00:00Z", "to": "2020-03-02T17:00:00Z"}
        ],
        "issues": [
            {
                "key": "PRJ-2",
                "marked": true,
                "created": "2020-03-01T09:00:00Z",
                "changes": [
                    {"at": "2020-03-04T09:00:00Z", "field": "assignee", "to": "acc-1"},
                    {"at": "2020-03-04T09:00:00Z", "field": "status", "to": "3"}
                ]
            }
        ],
        "meetings": [
            {"title": "Standup", "from": "2020-03-03T09:00:00Z", "to": "2020-03-03T09:15:00Z"}
        ]
    }"#;

    fn log() -> ActivityLog {
        serde_json::from_str(LOG).unwrap()
    }

    fn args(account: Option<&str>) -> ComputeArgs {
        ComputeArgs {
            input: PathBuf::from("unused.json"),
            days: Some(3),
            now: None,
            account: account.map(str::to_string),
            json: false,
        }
    }

    fn wednesday() -> FixedClock {
        FixedClock("2020-03-04T11:00:00Z".parse().unwrap())
    }

    #[test]
    fn test_activity_log_lists_are_optional() {
        let log: ActivityLog = serde_json::from_str("{}").unwrap();
        assert_eq!(log, ActivityLog::default());
    }

    #[test]
    fn test_issues_skipped_without_account() {
        let days = build_timesheet(&log(), &Config::default(), &args(None), &wednesday()).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].tasks[0].activity_id.as_str(), "PRJ-1");
    }

    #[test]
    fn test_issues_replayed_for_account() {
        let days =
            build_timesheet(&log(), &Config::default(), &args(Some("acc-1")), &wednesday())
                .unwrap();
        assert_eq!(days.len(), 2);
        let today = &days[0];
        assert_eq!(today.tasks[0].activity_id.as_str(), "PRJ-2");
        // open until the end of today's working window: 09:00 -> 17:30
        assert_eq!(today.tasks[0].to, "2020-03-04T17:30:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(today.tasks[0].duration, 7.5);
    }

    #[test]
    fn test_config_account_used_when_flag_absent() {
        let config = Config {
            account_id: Some("acc-1".to_string()),
            ..Config::default()
        };
        let days = build_timesheet(&log(), &config, &args(None), &wednesday()).unwrap();
        assert_eq!(days.len(), 2);
    }

    #[test]
    fn test_days_flag_overrides_config() {
        let mut one_day = args(Some("acc-1"));
        one_day.days = Some(1);
        let days = build_timesheet(&log(), &Config::default(), &one_day, &wednesday()).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].tasks[0].activity_id.as_str(), "PRJ-2");
    }

    #[test]
    fn test_unmarked_issues_are_not_booked() {
        let mut log = log();
        log.issues[0].marked = false;
        let days =
            build_timesheet(&log, &Config::default(), &args(Some("acc-1")), &wednesday()).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].tasks[0].activity_id.as_str(), "PRJ-1");
    }

    #[test]
    fn test_invalid_hours_fail_issue_replay() {
        let config = Config {
            hours: ts_core::Hours {
                working: 1e300,
                ..ts_core::Hours::default()
            },
            ..Config::default()
        };
        let err = build_timesheet(&log(), &config, &args(Some("acc-1")), &wednesday()).unwrap_err();
        assert!(format!("{err:#}").contains("hours.working"), "{err:#}");
    }

    #[test]
    fn test_freeze_prefers_override() {
        let now: DateTime<Utc> = "2020-03-02T08:00:00Z".parse().unwrap();
        assert_eq!(freeze(Some(now), &wednesday()), FixedClock(now));
    }

    #[test]
    fn test_freeze_reads_clock_once() {
        struct Counting(std::cell::Cell<u32>);
        impl Clock for Counting {
            fn now(&self) -> DateTime<Utc> {
                self.0.set(self.0.get() + 1);
                wednesday().now()
            }
        }

        let clock = Counting(std::cell::Cell::new(0));
        let frozen = freeze(None, &clock);
        assert_eq!(frozen.now(), frozen.now());
        assert_eq!(frozen, wednesday());
        assert_eq!(clock.0.get(), 1);
    }

    #[test]
    fn test_load_activity_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_activity(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
