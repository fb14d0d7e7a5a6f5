//! Error types for hubly-core

use thiserror::Error;

/// Result type alias for hubly operations
pub type Result<T> = std::result::Result<T, HublyError>;

/// Main error type for hubly operations
#[derive(Error, Debug)]
pub enum HublyError {
    /// Missing or empty required field, or a value outside an enumerated set
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown ticket or staff id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or unrecognized identity
    #[error("Unauthorized")]
    Unauthorized,

    /// Identity lacks the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// No administrator exists to own a new ticket
    #[error("No staff available: create an administrator first")]
    NoStaffAvailable,

    /// More than one administrator was found
    #[error("Expected a single administrator, found {0}")]
    MultipleAdministrators(usize),

    /// A versioned write kept losing to concurrent writers
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Staff roster errors
    #[error("Staff error: {0}")]
    Staff(#[from] StaffError),

    /// Persistence-related errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Staff roster errors
#[derive(Error, Debug)]
pub enum StaffError {
    /// A second administrator was requested
    #[error("An administrator already exists")]
    AdministratorExists,

    /// The administrator row is permanent
    #[error("The administrator cannot be removed")]
    CannotRemoveAdministrator,

    /// Email addresses are unique across staff
    #[error("Email already exists: {0}")]
    EmailTaken(String),
}

/// Persistence-specific errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    SchemaVersionMismatch { expected: u32, actual: u32 },
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::Database(err.to_string())
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for HublyError {
    fn from(err: rusqlite::Error) -> Self {
        HublyError::Persistence(PersistenceError::Database(err.to_string()))
    }
}

impl From<serde_json::Error> for HublyError {
    fn from(err: serde_json::Error) -> Self {
        HublyError::Persistence(PersistenceError::Serialization(err.to_string()))
    }
}

impl HublyError {
    /// Shorthand for a not-found ticket
    pub fn ticket_not_found(id: impl std::fmt::Display) -> Self {
        HublyError::NotFound(format!("Ticket {}", id))
    }

    /// Shorthand for a not-found staff member
    pub fn staff_not_found(id: impl std::fmt::Display) -> Self {
        HublyError::NotFound(format!("Staff {}", id))
    }
}
