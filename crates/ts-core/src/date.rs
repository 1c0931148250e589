//! Interval arithmetic over UTC timestamps.
//!
//! All calendar operations (day boundaries, weekdays, day keys) are computed
//! in UTC regardless of the host's local time zone.

use std::fmt;

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday,
};
use serde::{Deserialize, Serialize};

use crate::types::{Error, Result};

/// Hour of the nominal start of a working day (UTC).
pub const WORK_START_HOUR: u32 = 8;

/// Minute of the nominal start of a working day (UTC).
pub const WORK_START_MINUTE: u32 = 30;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Millisecond shifts at or beyond this cannot be converted to `i64` exactly.
const MAX_SHIFT_MS: f64 = 9.0e18;

const WORK_START: NaiveTime =
    match NaiveTime::from_hms_opt(WORK_START_HOUR, WORK_START_MINUTE, 0) {
        Some(time) => time,
        None => panic!("work start is not a valid time of day"),
    };

/// Source of the current instant.
///
/// Compute takes a clock instead of reading the wall clock so that a run can
/// be replayed against a fixed "now".
pub trait Clock {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        now()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parses an ISO-8601 timestamp.
///
/// Accepts RFC 3339 with an offset, a date-time without offset (read as UTC),
/// and a bare date (UTC midnight).
pub fn parse(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(Error::InvalidTimestamp {
        input: text.to_string(),
    })
}

/// Returns the current instant from the wall clock.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// UTC midnight of the timestamp's calendar day.
pub fn date_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// The work-start anchor (08:30 UTC) on the timestamp's calendar day.
pub fn work_anchor(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(WORK_START).and_utc()
}

fn shift(
    ts: DateTime<Utc>,
    delta: Option<Duration>,
    offset: impl FnOnce() -> String,
) -> Result<DateTime<Utc>> {
    delta
        .and_then(|delta| ts.checked_add_signed(delta))
        .ok_or_else(|| Error::OutOfRange {
            base: ts,
            offset: offset(),
        })
}

/// Shifts a timestamp by whole days.
pub fn add_days(days: i64, ts: DateTime<Utc>) -> Result<DateTime<Utc>> {
    shift(ts, Duration::try_days(days), || format!("{days} days"))
}

/// Adds a possibly fractional number of hours, at millisecond precision.
#[allow(clippy::cast_possible_truncation)]
pub fn add_hours(hours: f64, ts: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let delta = hours
        .is_finite()
        .then(|| (hours * MS_PER_HOUR).round())
        .filter(|ms| ms.abs() < MAX_SHIFT_MS)
        .and_then(|ms| Duration::try_milliseconds(ms as i64));
    shift(ts, delta, || format!("{hours} hours"))
}

pub fn add_seconds(seconds: i64, ts: DateTime<Utc>) -> Result<DateTime<Utc>> {
    shift(ts, Duration::try_seconds(seconds), || format!("{seconds} seconds"))
}

/// True for Monday through Friday in the UTC calendar.
pub fn is_working_day(ts: DateTime<Utc>) -> bool {
    !matches!(ts.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The UTC calendar day a timestamp falls on, used to group periods by day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// The day key of a timestamp.
    pub fn of(ts: DateTime<Utc>) -> Self {
        Self(ts.date_naive())
    }

    pub const fn date(self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// A closed time range `[from, to]` with `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Period {
    /// Creates a period, rejecting one that ends before it starts.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        let period = Self { from, to };
        period.validate()?;
        Ok(period)
    }

    /// Checks the `from <= to` invariant.
    pub fn validate(&self) -> Result<()> {
        if self.from > self.to {
            return Err(Error::InvalidPeriod {
                from: self.from,
                to: self.to,
            });
        }
        Ok(())
    }

    pub fn length(&self) -> Duration {
        self.to - self.from
    }

    /// Length in fractional hours.
    #[allow(clippy::cast_precision_loss)]
    pub fn hours(&self) -> f64 {
        self.length().num_milliseconds() as f64 / MS_PER_HOUR
    }

    /// True when both ends fall on the same UTC calendar day.
    pub fn is_single_day(&self) -> bool {
        date_start(self.from) == date_start(self.to)
    }
}

/// Overlap of two periods, or `None` when they do not touch.
///
/// Periods sharing a single instant overlap in that instant.
pub fn intersect(a: Period, b: Period) -> Option<Period> {
    if a.from <= b.to && b.from <= a.to {
        Some(Period {
            from: a.from.max(b.from),
            to: a.to.min(b.to),
        })
    } else {
        None
    }
}

/// A record that carries a period.
///
/// Splitting and clipping produce new records with a replaced period and the
/// rest of the payload unchanged.
pub trait Periodic: Clone {
    fn period(&self) -> Period;

    #[must_use]
    fn with_period(&self, period: Period) -> Self;
}

impl Periodic for Period {
    fn period(&self) -> Period {
        *self
    }

    fn with_period(&self, period: Period) -> Self {
        period
    }
}
