//! Staff roster entries
//!
//! Staff are the identities tickets are assigned to. Exactly one staff member
//! holds the administrator role; it owns every new ticket and inherits the
//! tickets of removed members.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HublyError, Result};

/// Unique identifier for a staff member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(pub Uuid);

impl StaffId {
    /// Create a new random staff ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a staff ID from a string
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| HublyError::staff_not_found(s))
    }
}

impl Default for StaffId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StaffId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a staff member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    /// The single owner of the desk
    Admin,
    /// Regular teammate
    #[default]
    Member,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Member => "member",
        }
    }
}

impl FromStr for StaffRole {
    type Err = HublyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "admin" => Ok(StaffRole::Admin),
            "member" => Ok(StaffRole::Member),
            other => Err(HublyError::InvalidInput(format!("Invalid role: {}", other))),
        }
    }
}

/// A staff member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: StaffId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: StaffRole,
    /// Bearer token; never serialized to clients
    #[serde(skip_serializing, default)]
    pub auth_token: String,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a staff member
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaff {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl Staff {
    /// Build a staff record from validated input
    pub fn new(input: NewStaff, role: StaffRole, now: DateTime<Utc>) -> Result<Self> {
        let first_name = input.first_name.trim().to_string();
        let last_name = input.last_name.trim().to_string();
        let email = input.email.trim().to_lowercase();

        if first_name.is_empty() || last_name.is_empty() || email.is_empty() {
            return Err(HublyError::InvalidInput(
                "firstName, lastName and email are required".to_string(),
            ));
        }

        let id = StaffId::new();
        Ok(Self {
            id,
            first_name,
            last_name,
            email,
            phone: input.phone.trim().to_string(),
            role,
            auth_token: generate_staff_token(&id),
            created_at: now,
        })
    }

    /// Check if this staff member is the administrator
    pub fn is_admin(&self) -> bool {
        self.role == StaffRole::Admin
    }
}

/// Generate a new staff bearer token
pub fn generate_staff_token(id: &StaffId) -> String {
    format!("hubly-{}-{}", id.0.simple(), Uuid::new_v4().simple())
}

/// Validate a staff token format
pub fn validate_token_format(token: &str) -> bool {
    token.starts_with("hubly-") && token.len() > 40
}

#[cfg(test)]
pub(crate) fn sample_input(tag: &str) -> NewStaff {
    NewStaff {
        first_name: tag.to_string(),
        last_name: "Tester".to_string(),
        email: format!("{}@example.com", tag),
        phone: String::new(),
    }
}
