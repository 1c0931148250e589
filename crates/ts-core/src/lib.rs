//! Core timesheet logic.
//!
//! This crate turns time-bounded tickets and meetings into per-day totals:
//! - Interval arithmetic over UTC days (`date`)
//! - Day-aligned splitting and lookback preparation (`split`, `prepare`)
//! - Rounded, capped daily hours (`timesheet`)
//! - Ticket intervals replayed from issue changelogs (`history`)
//!
//! Everything here is pure: no I/O, and the current time comes from a [`Clock`].

pub mod date;
pub mod history;
mod prepare;
mod record;
mod split;
mod timesheet;
mod types;

pub use date::{Clock, DayKey, FixedClock, Period, Periodic, SystemClock, intersect};
pub use history::{
    Change, IssueHistory, TicketState, TrackedField, active_tickets, marked_keys, reconstruct,
};
pub use prepare::{DayBuckets, prepare};
pub use record::{DayRecord, Meeting, Task, Ticket};
pub use split::split_by_date;
pub use timesheet::{
    ExcludePolicy, Hours, TimesheetConfig, compute, duration, round_quarter,
};
pub use types::{ActivityId, Error, Result};
