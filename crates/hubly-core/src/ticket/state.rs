//! Ticket status machine
//!
//! Every status may move to every other status:
//! ```text
//! Open ⇄ InProgress ⇄ Resolved
//!   ⇡________________________⇣
//! ```
//! Entering `Resolved` stamps `resolved_at` and clears the missed flag;
//! leaving it clears `resolved_at`. First-message and first-response
//! timestamps are never reset on reopen.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HublyError;

/// The status of a support ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    /// Waiting for staff attention
    #[default]
    Open,
    /// A staff member is working on it
    InProgress,
    /// Closed out; soft-terminal
    Resolved,
}

impl TicketStatus {
    /// All statuses, in display order
    pub const ALL: [TicketStatus; 3] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
    ];

    /// Check if a status transition is valid
    pub fn can_transition_to(&self, _target: &TicketStatus) -> bool {
        true
    }

    /// Get valid next states from current state
    pub fn valid_transitions(&self) -> Vec<TicketStatus> {
        Self::ALL
            .iter()
            .copied()
            .filter(|s| self.can_transition_to(s))
            .collect()
    }

    /// Resolved tickets are never counted as missed
    pub fn is_resolved(&self) -> bool {
        matches!(self, TicketStatus::Resolved)
    }

    /// Wire/storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = HublyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in-progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            other => Err(HublyError::InvalidInput(format!("Invalid status: {}", other))),
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a ticket came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketSource {
    /// Public chat widget
    #[default]
    Widget,
    /// Entered by staff
    Manual,
    Other,
}

impl TicketSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketSource::Widget => "widget",
            TicketSource::Manual => "manual",
            TicketSource::Other => "other",
        }
    }
}

impl FromStr for TicketSource {
    type Err = HublyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "widget" => Ok(TicketSource::Widget),
            "manual" => Ok(TicketSource::Manual),
            "other" => Ok(TicketSource::Other),
            other => Err(HublyError::InvalidInput(format!("Invalid source: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_transition_is_permitted() {
        for from in TicketStatus::ALL {
            for to in TicketStatus::ALL {
                assert!(from.can_transition_to(&to), "{} -> {}", from, to);
            }
            assert_eq!(from.valid_transitions().len(), 3);
        }
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("open".parse::<TicketStatus>().unwrap(), TicketStatus::Open);
        assert_eq!(
            "in-progress".parse::<TicketStatus>().unwrap(),
            TicketStatus::InProgress
        );
        assert_eq!(
            "resolved".parse::<TicketStatus>().unwrap(),
            TicketStatus::Resolved
        );
        assert!(matches!(
            "closed".parse::<TicketStatus>(),
            Err(HublyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }
}
