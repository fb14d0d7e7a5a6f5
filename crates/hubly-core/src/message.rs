//! Chat messages attached to tickets
//!
//! Messages are append-only: created once by the widget (customer) or by a
//! staff action (agent), never updated or deleted.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HublyError, Result};
use crate::staff::StaffId;
use crate::ticket::TicketId;

/// Unique identifier for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    Customer,
    Agent,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Customer => "customer",
            SenderType::Agent => "agent",
        }
    }
}

impl FromStr for SenderType {
    type Err = HublyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "customer" => Ok(SenderType::Customer),
            "agent" => Ok(SenderType::Agent),
            other => Err(HublyError::InvalidInput(format!(
                "Invalid sender type: {}",
                other
            ))),
        }
    }
}

/// A message on a ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub ticket_id: TicketId,
    pub text: String,
    pub sender_type: SenderType,
    /// Staff author; only ever set on agent messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<StaffId>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A message typed by the customer in the widget
    pub fn customer(ticket_id: TicketId, text: &str, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            id: MessageId::new(),
            ticket_id,
            text: clean_text(text)?,
            sender_type: SenderType::Customer,
            sender: None,
            created_at: now,
        })
    }

    /// A reply written by a staff member
    pub fn staff(
        ticket_id: TicketId,
        staff_id: StaffId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id: MessageId::new(),
            ticket_id,
            text: clean_text(text)?,
            sender_type: SenderType::Agent,
            sender: Some(staff_id),
            created_at: now,
        })
    }

    /// An automated greeting posted when a chat starts
    pub(crate) fn greeting(ticket_id: TicketId, text: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            ticket_id,
            text: text.to_string(),
            sender_type: SenderType::Agent,
            sender: None,
            created_at: now,
        }
    }
}

/// Trim message text, rejecting empty input
pub fn clean_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(HublyError::InvalidInput("text is required".to_string()));
    }
    Ok(trimmed.to_string())
}
