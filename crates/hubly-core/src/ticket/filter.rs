//! Ticket list filters

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HublyError;
use crate::ticket::Ticket;

/// Status filter for the ticket list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Resolved,
    /// Anything that is not resolved (open or in-progress)
    Unresolved,
}

impl FromStr for StatusFilter {
    type Err = HublyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(StatusFilter::All),
            "resolved" => Ok(StatusFilter::Resolved),
            "unresolved" => Ok(StatusFilter::Unresolved),
            other => Err(HublyError::InvalidInput(format!(
                "Invalid status filter: {}",
                other
            ))),
        }
    }
}

/// Filters applied on top of the viewer's visibility scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: StatusFilter,
    /// Case-insensitive substring over customer name, email, phone and
    /// ticket number
    pub search: Option<String>,
}

impl TicketFilter {
    /// Build a filter from raw query values; blank search terms are ignored
    pub fn parse(status: Option<&str>, search: Option<&str>) -> crate::Result<Self> {
        let status = match status {
            Some(s) => s.trim().parse()?,
            None => StatusFilter::All,
        };
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(Self { status, search })
    }

    /// Whether the search term occurs in the ticket's customer name, email,
    /// phone or number, ignoring case
    ///
    /// Folding uses Unicode lowercase on both sides; SQLite's `lower()` only
    /// folds ASCII.
    pub fn matches_search(&self, ticket: &Ticket) -> bool {
        let Some(search) = &self.search else {
            return true;
        };
        let needle = search.to_lowercase();
        [
            &ticket.customer_name,
            &ticket.customer_email,
            &ticket.customer_phone,
            &ticket.ticket_number,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}
