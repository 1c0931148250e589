//! Input and output records of the timesheet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::date::{Period, Periodic};
use crate::types::ActivityId;

/// A span of time spent on a tracked activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// The issue key the time is booked against.
    #[serde(alias = "issue")]
    pub activity_id: ActivityId,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Periodic for Ticket {
    fn period(&self) -> Period {
        Period {
            from: self.from,
            to: self.to,
        }
    }

    fn with_period(&self, period: Period) -> Self {
        Self {
            activity_id: self.activity_id.clone(),
            from: period.from,
            to: period.to,
        }
    }
}

/// A calendar event occupying part of a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub title: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Periodic for Meeting {
    fn period(&self) -> Period {
        Period {
            from: self.from,
            to: self.to,
        }
    }

    fn with_period(&self, period: Period) -> Self {
        Self {
            title: self.title.clone(),
            from: period.from,
            to: period.to,
        }
    }
}

/// Hours booked against one activity on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub activity_id: ActivityId,
    /// Rounded to a quarter hour, lunch deducted, capped at the working day.
    pub duration: f64,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// One working day of the timesheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    /// Start of the day's working window.
    pub date: DateTime<Utc>,
    /// Hours reported: `include - exclude`.
    pub total: f64,
    /// Sum of task durations, capped at the working day.
    pub include: f64,
    /// Hours deducted for interruptions.
    pub exclude: f64,
    pub tasks: Vec<Task>,
}
