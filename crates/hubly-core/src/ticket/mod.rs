//! Support tickets
//!
//! A ticket is one customer conversation. It is opened by the public chat
//! widget, mutated by message ingestion, assignment and status changes, and
//! never physically deleted.

mod filter;
mod state;
#[allow(clippy::module_inception)]
mod ticket;

pub use filter::{StatusFilter, TicketFilter};
pub use state::{TicketSource, TicketStatus};
pub use ticket::{
    format_ticket_number, snippet, Customer, Ticket, TicketId, SNIPPET_KEEP_CHARS,
    SNIPPET_MAX_CHARS,
};
