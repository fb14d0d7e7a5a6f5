//! Ticket struct and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{TicketSource, TicketStatus};
use crate::error::{HublyError, Result};
use crate::message::{Message, SenderType};
use crate::staff::StaffId;

/// Snippets longer than this are cut down
pub const SNIPPET_MAX_CHARS: usize = 80;
/// Characters kept when a snippet is cut, before the ellipsis
pub const SNIPPET_KEEP_CHARS: usize = 77;

/// Unique identifier for a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub Uuid);

impl TicketId {
    /// Create a new random ticket ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a ticket ID from a string; malformed ids are unknown tickets
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| HublyError::ticket_not_found(s))
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Format a sequence number as a human-readable ticket number (`HUB-0001`)
pub fn format_ticket_number(sequence: u64) -> String {
    format!("HUB-{:04}", sequence)
}

/// Customer details captured by the widget; a snapshot, not a live reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Customer {
    /// All three fields are required
    pub fn new(name: &str, phone: &str, email: &str) -> Result<Self> {
        let (name, phone, email) = (name.trim(), phone.trim(), email.trim());
        if name.is_empty() || phone.is_empty() || email.is_empty() {
            return Err(HublyError::InvalidInput(
                "name, phone and email are required".to_string(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        })
    }
}

/// A support ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    /// `HUB-%04d`; stable once assigned
    pub ticket_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub source: TicketSource,
    pub assigned_to: StaffId,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// First customer message; set at most once
    pub first_message_at: Option<DateTime<Utc>>,
    /// First human staff reply; set at most once
    pub first_response_at: Option<DateTime<Utc>>,
    pub is_missed: bool,
    pub missed_at: Option<DateTime<Utc>>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_snippet: Option<String>,
    pub last_message_from: Option<SenderType>,
    /// Row version for compare-and-swap writes
    pub version: u64,
}

impl Ticket {
    /// Open a new ticket for a customer
    pub fn open(
        ticket_number: String,
        customer: Customer,
        assigned_to: StaffId,
        source: TicketSource,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TicketId::new(),
            ticket_number,
            customer_name: customer.name,
            customer_email: customer.email,
            customer_phone: customer.phone,
            source,
            assigned_to,
            status: TicketStatus::Open,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            first_message_at: None,
            first_response_at: None,
            is_missed: false,
            missed_at: None,
            last_message_at: None,
            last_message_snippet: None,
            last_message_from: None,
            version: 0,
        }
    }

    /// Apply a customer message: capture the first-message time once
    pub fn record_customer_message(&mut self, message: &Message) {
        if self.first_message_at.is_none() {
            self.first_message_at = Some(message.created_at);
        }
        self.record_last_message(message);
    }

    /// Apply a human staff reply: capture the first-response time once and
    /// cancel any missed flag
    pub fn record_staff_reply(&mut self, message: &Message) {
        if self.first_response_at.is_none() {
            self.first_response_at = Some(message.created_at);
        }
        self.clear_missed();
        self.record_last_message(message);
    }

    /// Apply an automated greeting; it is not a human reply
    pub fn record_greeting(&mut self, message: &Message) {
        self.record_last_message(message);
    }

    fn record_last_message(&mut self, message: &Message) {
        self.last_message_at = Some(message.created_at);
        self.last_message_snippet = Some(snippet(&message.text));
        self.last_message_from = Some(message.sender_type);
        self.updated_at = message.created_at;
    }

    /// Move to a new status
    pub fn set_status(&mut self, new_status: TicketStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(&new_status) {
            return Err(HublyError::InvalidInput(format!(
                "Invalid status transition from {} to {}",
                self.status, new_status
            )));
        }
        self.status = new_status;
        if new_status.is_resolved() {
            self.resolved_at = Some(now);
            self.clear_missed();
        } else {
            self.resolved_at = None;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Point the ticket at another staff member
    pub fn assign(&mut self, staff_id: StaffId, now: DateTime<Utc>) {
        self.assigned_to = staff_id;
        self.updated_at = now;
    }

    /// Raise the missed flag; returns false if it was already set
    pub fn mark_missed(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_missed {
            return false;
        }
        self.is_missed = true;
        self.missed_at = Some(now);
        true
    }

    /// Drop the missed flag and its timestamp
    pub fn clear_missed(&mut self) {
        self.is_missed = false;
        self.missed_at = None;
    }

    /// `is_missed` implies an unanswered first message on an unresolved ticket
    pub fn missed_flag_consistent(&self) -> bool {
        !self.is_missed
            || (self.first_message_at.is_some()
                && self.first_response_at.is_none()
                && !self.status.is_resolved())
    }
}

/// Cut a message down for the ticket list
pub fn snippet(text: &str) -> String {
    if text.chars().count() > SNIPPET_MAX_CHARS {
        let kept: String = text.chars().take(SNIPPET_KEEP_CHARS).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
