//! Clipping, splitting and day-grouping of periods against a lookback horizon.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::date::{DayKey, Periodic};
use crate::split::split_by_date;
use crate::types::Result;

/// Day-local records grouped by the UTC day they start on.
///
/// Within a day, records are ordered by start time; records with equal start
/// times keep their input order.
#[derive(Debug, Clone, PartialEq)]
pub struct DayBuckets<T> {
    days: BTreeMap<DayKey, Vec<T>>,
}

impl<T> DayBuckets<T> {
    /// Records for a day, empty when nothing happened that day.
    pub fn get(&self, day: DayKey) -> &[T] {
        self.days.get(&day).map_or(&[][..], Vec::as_slice)
    }

    /// Days that have at least one record, ascending.
    pub fn days(&self) -> impl Iterator<Item = DayKey> + '_ {
        self.days.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DayKey, &[T])> {
        self.days.iter().map(|(day, items)| (*day, items.as_slice()))
    }

    /// Number of non-empty days.
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl<T> Default for DayBuckets<T> {
    fn default() -> Self {
        Self {
            days: BTreeMap::new(),
        }
    }
}

/// Builds the day index for a list of records.
///
/// Records ending before `since` are dropped; records starting before it are
/// clipped to start at `since`. Survivors are split into day-local segments,
/// sorted by start time and grouped by day.
pub fn prepare<T: Periodic>(items: &[T], since: DateTime<Utc>) -> Result<DayBuckets<T>> {
    let mut segments = Vec::with_capacity(items.len());
    let mut dropped = 0_usize;

    for item in items {
        let mut period = item.period();
        period.validate()?;

        if period.to < since {
            dropped += 1;
            continue;
        }
        if period.from < since {
            period.from = since;
            segments.extend(split_by_date(&item.with_period(period))?);
        } else {
            segments.extend(split_by_date(item)?);
        }
    }

    segments.sort_by_key(|it| it.period().from);

    let mut buckets = DayBuckets::default();
    for segment in segments {
        let day = DayKey::of(segment.period().from);
        buckets.days.entry(day).or_default().push(segment);
    }

    tracing::debug!(
        input = items.len(),
        dropped,
        days = buckets.len(),
        %since,
        "prepared day buckets"
    );
    Ok(buckets)
}
