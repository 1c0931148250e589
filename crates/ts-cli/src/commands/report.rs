//! Rendering of computed timesheets.
//!
//! Two output formats: a human-readable block per day (most recent first)
//! and pretty-printed JSON of the day records.

use std::fmt::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_core::DayRecord;

// ========== Hours Formatting ==========

/// Formats hours with two decimals, e.g. "7.75h".
pub fn format_hours(hours: f64) -> String {
    format!("{hours:.2}h")
}

// ========== Human-Readable Output ==========

/// Formats the human-readable timesheet.
pub fn format_timesheet(days: &[DayRecord]) -> String {
    let mut output = String::new();

    if days.is_empty() {
        writeln!(output, "No tracked activity in the lookback window.").unwrap();
        writeln!(output).unwrap();
        writeln!(
            output,
            "Hint: widen --days or check the input file's date range."
        )
        .unwrap();
        return output;
    }

    let total: f64 = days.iter().map(|d| d.total).sum();
    let day_word = if days.len() == 1 { "day" } else { "days" };
    writeln!(
        output,
        "TIMESHEET: {} {day_word}, {} total",
        days.len(),
        format_hours(total)
    )
    .unwrap();

    for day in days {
        writeln!(output).unwrap();
        writeln!(
            output,
            "{}  {:>7}  (include {}, exclude {})",
            day.date.format("%a %Y-%m-%d"),
            format_hours(day.total),
            format_hours(day.include),
            format_hours(day.exclude)
        )
        .unwrap();
        for task in &day.tasks {
            writeln!(
                output,
                "  {:<12}{:>7}  {}-{}",
                task.activity_id.as_str(),
                format_hours(task.duration),
                task.from.format("%H:%M"),
                task.to.format("%H:%M")
            )
            .unwrap();
        }
    }

    output
}

// ========== JSON Output ==========

/// JSON timesheet structure.
#[derive(Debug, Serialize)]
pub struct JsonTimesheet<'a> {
    pub generated_at: String,
    pub total: f64,
    pub days: &'a [DayRecord],
}

/// Formats the timesheet as JSON.
pub fn format_timesheet_json(days: &[DayRecord], generated_at: DateTime<Utc>) -> Result<String> {
    let report = JsonTimesheet {
        generated_at: generated_at.to_rfc3339(),
        total: days.iter().map(|d| d.total).sum(),
        days,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use insta::assert_snapshot;
    use ts_core::{ActivityId, Task};

    fn at(h: u32, m: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, day, h, m, 0).unwrap()
    }

    fn task(key: &str, duration: f64, from: DateTime<Utc>, to: DateTime<Utc>) -> Task {
        Task {
            activity_id: ActivityId::new(key).unwrap(),
            duration,
            from,
            to,
        }
    }

    fn sample() -> Vec<DayRecord> {
        vec![
            DayRecord {
                date: at(8, 30, 4),
                total: 6.0,
                include: 8.0,
                exclude: 2.0,
                tasks: vec![task("PRJ-9", 8.0, at(0, 0, 4), at(10, 45, 4))],
            },
            DayRecord {
                date: at(8, 30, 2),
                total: 5.0,
                include: 5.0,
                exclude: 0.0,
                tasks: vec![
                    task("PRJ-1", 2.0, at(9, 0, 2), at(11, 0, 2)),
                    task("PRJ-2", 3.0, at(11, 0, 2), at(14, 0, 2)),
                ],
            },
        ]
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(7.75), "7.75h");
        assert_eq!(format_hours(0.0), "0.00h");
        assert_eq!(format_hours(8.0), "8.00h");
    }

    #[test]
    fn test_timesheet_empty() {
        let output = format_timesheet(&[]);
        assert!(output.starts_with("No tracked activity"));
        assert!(output.contains("Hint:"));
    }

    #[test]
    fn test_timesheet_two_days() {
        let output = format_timesheet(&sample());
        assert_snapshot!(output, @r"
TIMESHEET: 2 days, 11.00h total

Wed 2020-03-04    6.00h  (include 8.00h, exclude 2.00h)
  PRJ-9         8.00h  00:00-10:45

Mon 2020-03-02    5.00h  (include 5.00h, exclude 0.00h)
  PRJ-1         2.00h  09:00-11:00
  PRJ-2         3.00h  11:00-14:00
");
    }

    #[test]
    fn test_timesheet_single_day_header() {
        let days = &sample()[..1];
        let output = format_timesheet(days);
        assert!(output.starts_with("TIMESHEET: 1 day, 6.00h total"));
    }

    #[test]
    fn test_timesheet_json() {
        let output = format_timesheet_json(&sample(), at(11, 0, 4)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["generated_at"], "2020-03-04T11:00:00+00:00");
        assert_eq!(value["total"], 11.0);
        assert_eq!(value["days"].as_array().unwrap().len(), 2);
        assert_eq!(
            value["days"][0],
            serde_json::json!({
                "date": "2020-03-04T08:30:00Z",
                "total": 6.0,
                "include": 8.0,
                "exclude": 2.0,
                "tasks": [{
                    "activity_id": "PRJ-9",
                    "duration": 8.0,
                    "from": "2020-03-04T00:00:00Z",
                    "to": "2020-03-04T10:45:00Z"
                }]
            })
        );
    }
}
