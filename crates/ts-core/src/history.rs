//! Reconstruction of ticket assignment and status intervals from an issue's
//! changelog.
//!
//! An issue starts unassigned with no status at its creation time. Every
//! change to a tracked field opens a new state snapshot at the time of the
//! change, which closes the previous one. Only snapshots of marked issues that
//! match an account and a set of statuses become tickets.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::iter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Ticket;
use crate::types::ActivityId;

/// Issue fields whose changes open a new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedField {
    Status,
    Assignee,
}

impl TrackedField {
    /// Maps a changelog field name, ignoring fields that are not tracked.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "status" => Some(Self::Status),
            "assignee" => Some(Self::Assignee),
            _ => None,
        }
    }
}

/// One field change in an issue's changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub at: DateTime<Utc>,
    pub field: String,
    /// New value of the field (status id or account id), `None` when cleared.
    #[serde(default)]
    pub to: Option<String>,
}

/// An issue with its full changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueHistory {
    pub key: ActivityId,
    /// Parent issue (epic or story) of a sub-task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ActivityId>,
    /// Whether the issue carries the R&D hours marking.
    #[serde(default)]
    pub marked: bool,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

/// The assignee and status of an issue over one interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketState {
    pub activity_id: ActivityId,
    pub assignee: Option<String>,
    pub status: Option<String>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Snapshot {
    assignee: Option<String>,
    status: Option<String>,
    from: DateTime<Utc>,
}

impl Snapshot {
    /// The snapshot following a change, or `None` when the value is unchanged.
    fn after(&self, field: TrackedField, change: &Change) -> Option<Self> {
        let current = match field {
            TrackedField::Status => &self.status,
            TrackedField::Assignee => &self.assignee,
        };
        if *current == change.to {
            return None;
        }
        let mut next = Self {
            from: change.at,
            ..self.clone()
        };
        match field {
            TrackedField::Status => next.status.clone_from(&change.to),
            TrackedField::Assignee => next.assignee.clone_from(&change.to),
        }
        Some(next)
    }
}

/// Replays an issue's changelog into consecutive state intervals.
///
/// Changes are applied in chronological order; the last state stays open
/// until `until`.
pub fn reconstruct(history: &IssueHistory, until: DateTime<Utc>) -> Vec<TicketState> {
    let mut changes: Vec<&Change> = history.changes.iter().collect();
    changes.sort_by_key(|change| change.at);

    let initial = Snapshot {
        assignee: None,
        status: None,
        from: history.created,
    };
    let snapshots = changes.into_iter().fold(vec![initial], |mut acc, change| {
        let next = TrackedField::from_name(&change.field)
            .zip(acc.last())
            .and_then(|(field, last)| last.after(field, change));
        acc.extend(next);
        acc
    });

    let ends = snapshots
        .iter()
        .skip(1)
        .map(|snapshot| snapshot.from)
        .chain(iter::once(until));

    snapshots
        .iter()
        .zip(ends)
        .map(|(snapshot, to)| TicketState {
            activity_id: history.key.clone(),
            assignee: snapshot.assignee.clone(),
            status: snapshot.status.clone(),
            from: snapshot.from,
            to,
        })
        .collect()
}

/// Keys of the issues whose hours count: marked issues and the issues whose
/// parent is marked.
pub fn marked_keys(histories: &[IssueHistory]) -> BTreeSet<&ActivityId> {
    let marked: BTreeSet<&ActivityId> = histories
        .iter()
        .filter(|history| history.marked)
        .map(|history| &history.key)
        .collect();
    histories
        .iter()
        .filter(|history| {
            history.marked
                || history
                    .parent
                    .as_ref()
                    .is_some_and(|parent| marked.contains(parent))
        })
        .map(|history| &history.key)
        .collect()
}

/// Tickets for the intervals in which a marked issue was assigned to
/// `account` and in one of `statuses`, latest-ending first.
///
/// Unmarked issues are skipped unless their parent is marked. States that
/// would end before they start (changes recorded after `until`) are left out.
pub fn active_tickets(
    histories: &[IssueHistory],
    account: &str,
    statuses: &[String],
    until: DateTime<Utc>,
) -> Vec<Ticket> {
    let marked = marked_keys(histories);
    let mut tickets: Vec<Ticket> = histories
        .iter()
        .filter(|history| marked.contains(&history.key))
        .flat_map(|history| reconstruct(history, until))
        .filter(|state| state.assignee.as_deref() == Some(account))
        .filter(|state| {
            state
                .status
                .as_ref()
                .is_some_and(|status| statuses.contains(status))
        })
        .filter(|state| state.from <= state.to)
        .map(|state| Ticket {
            activity_id: state.activity_id,
            from: state.from,
            to: state.to,
        })
        .collect();
    tickets.sort_by_key(|ticket| Reverse(ticket.to));

    tracing::debug!(
        issues = histories.len(),
        marked = marked.len(),
        tickets = tickets.len(),
        "reconstructed active tickets"
    );
    tickets
}
