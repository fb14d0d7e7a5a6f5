//! Hubly Core - ticket lifecycle and analytics for a customer-support desk
//!
//! This crate provides the core functionality behind the hubly chat widget and
//! staff dashboard:
//!
//! - **Ticket**: customer conversations with status (open → in-progress → resolved)
//!   and first-message/first-response bookkeeping
//! - **Message**: append-only customer and staff messages on a ticket
//! - **Missed**: the pure missed-chat predicate
//! - **Assignment**: ticket ownership, bulk reassignment and list visibility
//! - **Lifecycle**: [`HelpDesk`], the controller every widget and staff action goes through
//! - **Analytics**: ten-week missed-chat trend, reply time and resolution rate
//! - **Staff**: roster entries with a single administrator
//! - **Settings**: the widget settings record, including the missed-chat threshold
//! - **Persistence**: SQLite storage with versioned ticket writes
//! - **Config**: server, storage and desk configuration
//!
//! # Concurrency
//!
//! Requests are independent and short-lived. Races are settled in storage, not
//! with application locks:
//! - ticket numbers come from an atomic counter inside the creating transaction
//! - every ticket write is a compare-and-swap on a row version, retried on loss
//! - the missed flag is raised by a conditional update that re-checks the predicate
//! - removing staff reassigns their tickets and deletes the row in one transaction

pub mod analytics;
pub mod assignment;
pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod message;
pub mod missed;
pub mod persistence;
mod roster;
pub mod settings;
pub mod staff;
pub mod ticket;

pub use analytics::{compute_overview, Overview, WeekBucket};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AdminBootstrap, DatabaseConfig, DeskConfig, HublyConfig, ServerConfig};
pub use error::{HublyError, PersistenceError, Result, StaffError};
pub use lifecycle::{HelpDesk, GREETINGS};
pub use message::{Message, MessageId, SenderType};
pub use persistence::{Repository, Schema};
pub use settings::{ChatbotSettings, ChatbotSettingsUpdate};
pub use staff::{NewStaff, Staff, StaffId, StaffRole};
pub use ticket::{
    Customer, StatusFilter, Ticket, TicketFilter, TicketId, TicketSource, TicketStatus,
};

/// Returns the version of hubly-core
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
