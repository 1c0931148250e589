//! Day-aligned partitioning of periods.

use crate::date::{Periodic, add_days, add_seconds, date_start};
use crate::types::Result;

/// Splits a record into consecutive segments that each lie within one UTC day.
///
/// A record whose period starts and ends on the same day comes back as a
/// single, unchanged element. Otherwise the first segment runs from `from` to
/// one second before the next midnight (or `from` itself when it already lies
/// in that last second), every whole day in between becomes a
/// `00:00:00..23:59:59` segment, and the last segment runs from the midnight
/// of `to`'s day to `to`. A `to` of exactly midnight yields a last segment of
/// zero length at that instant.
pub fn split_by_date<T: Periodic>(item: &T) -> Result<Vec<T>> {
    let period = item.period();
    period.validate()?;

    let start = date_start(period.from);
    let end = date_start(period.to);
    if start == end {
        return Ok(vec![item.clone()]);
    }

    let days = (end - start).num_days();
    let mut segments = Vec::with_capacity(usize::try_from(days + 1).unwrap_or_default());

    // A start inside the day's last second keeps a zero-length first segment
    let mut first = period;
    first.to = add_seconds(-1, add_days(1, start)?)?.max(period.from);
    segments.push(item.with_period(first));

    for day in 1..days {
        let mut middle = period;
        middle.from = add_days(day, start)?;
        middle.to = add_seconds(-1, add_days(day + 1, start)?)?;
        segments.push(item.with_period(middle));
    }

    let mut last = period;
    last.from = end;
    segments.push(item.with_period(last));

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::{Period, parse};
    use crate::record::Ticket;
    use crate::types::{ActivityId, Error};

    fn period(from: &str, to: &str) -> Period {
        Period::new(parse(from).unwrap(), parse(to).unwrap()).unwrap()
    }

    #[test]
    fn test_split_three_days() {
        let actual =
            split_by_date(&period("2020-03-02T14:15:00Z", "2020-03-04T10:45:00Z")).unwrap();
        let expected = vec![
            period("2020-03-02T14:15:00Z", "2020-03-02T23:59:59Z"),
            period("2020-03-03T00:00:00Z", "2020-03-03T23:59:59Z"),
            period("2020-03-04T00:00:00Z", "2020-03-04T10:45:00Z"),
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_split_same_day_is_identity() {
        let p = period("2020-03-02T14:15:00Z", "2020-03-02T23:59:59Z");
        assert_eq!(split_by_date(&p).unwrap(), vec![p]);
    }

    #[test]
    fn test_split_two_days_has_no_middle() {
        let actual =
            split_by_date(&period("2020-03-02T22:00:00Z", "2020-03-03T01:00:00Z")).unwrap();
        assert_eq!(
            actual,
            vec![
                period("2020-03-02T22:00:00Z", "2020-03-02T23:59:59Z"),
                period("2020-03-03T00:00:00Z", "2020-03-03T01:00:00Z"),
            ]
        );
    }

    #[test]
    fn test_split_ending_at_midnight_keeps_zero_length_tail() {
        let actual =
            split_by_date(&period("2020-03-02T14:00:00Z", "2020-03-03T00:00:00Z")).unwrap();
        assert_eq!(
            actual,
            vec![
                period("2020-03-02T14:00:00Z", "2020-03-02T23:59:59Z"),
                period("2020-03-03T00:00:00Z", "2020-03-03T00:00:00Z"),
            ]
        );
    }

    #[test]
    fn test_split_starting_in_last_second_keeps_valid_first_segment() {
        let actual =
            split_by_date(&period("2020-03-02T23:59:59.500Z", "2020-03-03T10:00:00Z")).unwrap();
        assert_eq!(
            actual,
            vec![
                period("2020-03-02T23:59:59.500Z", "2020-03-02T23:59:59.500Z"),
                period("2020-03-03T00:00:00Z", "2020-03-03T10:00:00Z"),
            ]
        );
        for segment in &actual {
            assert!(segment.validate().is_ok(), "{segment:?}");
        }
    }

    #[test]
    fn test_split_across_month_end() {
        let actual =
            split_by_date(&period("2020-02-28T12:00:00Z", "2020-03-01T06:00:00Z")).unwrap();
        assert_eq!(actual.len(), 3);
        assert_eq!(actual[1], period("2020-02-29T00:00:00Z", "2020-02-29T23:59:59Z"));
    }

    #[test]
    fn test_split_replicates_payload() {
        let ticket = Ticket {
            activity_id: ActivityId::new("PRJ-42").unwrap(),
            from: parse("2020-03-02T14:15:00Z").unwrap(),
            to: parse("2020-03-04T10:45:00Z").unwrap(),
        };
        let actual = split_by_date(&ticket).unwrap();
        assert_eq!(actual.len(), 3);
        assert!(actual.iter().all(|t| t.activity_id == ticket.activity_id));
        assert_eq!(actual[0].from, ticket.from);
        assert_eq!(actual[2].to, ticket.to);
    }

    #[test]
    fn test_split_rejects_reversed_period() {
        let reversed = Period {
            from: parse("2020-03-04T00:00:00Z").unwrap(),
            to: parse("2020-03-02T00:00:00Z").unwrap(),
        };
        let err = split_by_date(&reversed).unwrap_err();
        assert!(matches!(err, Error::InvalidPeriod { .. }));
    }
}
