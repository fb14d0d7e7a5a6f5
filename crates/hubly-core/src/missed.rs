//! Missed-chat detection
//!
//! A chat is missed when the customer's first message has gone unanswered by
//! staff for at least the configured threshold while the ticket is unresolved.
//! The predicate here is pure; persisting the flag is the job of
//! [`HelpDesk::reconcile_missed`](crate::HelpDesk::reconcile_missed), which
//! only ever raises it. Clearing belongs to staff replies and resolution.

use chrono::{DateTime, Duration, Utc};

use crate::ticket::Ticket;

/// Whether `ticket` counts as missed at `now`
pub fn is_missed(ticket: &Ticket, threshold_seconds: u32, now: DateTime<Utc>) -> bool {
    let Some(first_message_at) = ticket.first_message_at else {
        return false;
    };
    if ticket.first_response_at.is_some() {
        return false;
    }
    if ticket.status.is_resolved() {
        return false;
    }
    now - first_message_at >= Duration::seconds(i64::from(threshold_seconds))
}

/// Whether the stored flag must be raised: the predicate holds and the flag
/// is not already set
pub fn needs_flag(ticket: &Ticket, threshold_seconds: u32, now: DateTime<Utc>) -> bool {
    !ticket.is_missed && is_missed(ticket, threshold_seconds, now)
}
