//! Chat widget settings
//!
//! A single mutable record. The desk only depends on
//! `missed_chat_threshold_seconds`; the rest configures the widget's look and
//! copy. The record is read from storage on every detection or aggregation
//! call, so an update takes effect on the next read.

use serde::{Deserialize, Serialize};

use crate::error::{HublyError, Result};

/// Default missed-chat threshold (10 minutes)
pub const DEFAULT_MISSED_CHAT_THRESHOLD_SECONDS: u32 = 600;

/// Widget settings record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatbotSettings {
    pub header_color: String,
    pub background_color: String,
    pub message_line1: String,
    pub message_line2: String,
    pub intro_name_label: String,
    pub intro_phone_label: String,
    pub intro_email_label: String,
    pub intro_submit_label: String,
    pub welcome_message: String,
    pub missed_chat_threshold_seconds: u32,
}

impl Default for ChatbotSettings {
    fn default() -> Self {
        Self {
            header_color: "#33475B".to_string(),
            background_color: "#ffffff".to_string(),
            message_line1: "How can I help you?".to_string(),
            message_line2: "Ask me anything!".to_string(),
            intro_name_label: "Your name".to_string(),
            intro_phone_label: "Your phone".to_string(),
            intro_email_label: "Your email".to_string(),
            intro_submit_label: "Thank You!".to_string(),
            welcome_message:
                "Want to chat about Hubly? I'm a chatbot here to help you find your way."
                    .to_string(),
            missed_chat_threshold_seconds: DEFAULT_MISSED_CHAT_THRESHOLD_SECONDS,
        }
    }
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatbotSettingsUpdate {
    pub header_color: Option<String>,
    pub background_color: Option<String>,
    pub message_line1: Option<String>,
    pub message_line2: Option<String>,
    pub intro_name_label: Option<String>,
    pub intro_phone_label: Option<String>,
    pub intro_email_label: Option<String>,
    pub intro_submit_label: Option<String>,
    pub welcome_message: Option<String>,
    pub missed_chat_threshold_seconds: Option<u32>,
}

impl ChatbotSettings {
    /// Settings seeded with a configured threshold
    pub fn with_threshold(threshold_seconds: u32) -> Self {
        Self {
            missed_chat_threshold_seconds: threshold_seconds,
            ..Self::default()
        }
    }

    /// Apply a partial update, validating the result
    pub fn apply(&mut self, update: ChatbotSettingsUpdate) -> Result<()> {
        let mut next = self.clone();
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(v) = update.$field { next.$field = v; })*
            };
        }
        merge!(
            header_color,
            background_color,
            message_line1,
            message_line2,
            intro_name_label,
            intro_phone_label,
            intro_email_label,
            intro_submit_label,
            welcome_message,
            missed_chat_threshold_seconds
        );
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// The threshold must be a positive number of seconds
    pub fn validate(&self) -> Result<()> {
        if self.missed_chat_threshold_seconds == 0 {
            return Err(HublyError::InvalidInput(
                "missedChatThresholdSeconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
