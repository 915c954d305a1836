//! Stored record types

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpamError};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(SpamError::InvalidInput(format!("unknown role '{}'", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// Channel a classified message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Email,
    Sms,
    Social,
}

impl MessageType {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            "social" => Ok(Self::Social),
            other => Err(SpamError::InvalidInput(format!("unknown message type '{}'", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Social => "social",
        }
    }
}

/// A user account (password hash never leaves the store)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: String,
    pub created_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// User fields embedded in message listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRef {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// One recorded classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMessage {
    pub id: i64,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub is_spam: bool,
    pub confidence: f64,
    pub created_at: String,
    pub user: UserRef,
}

/// Optional filters for message listings
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFilter {
    pub is_spam: Option<bool>,
    pub message_type: Option<MessageType>,
}

/// Message counts per channel
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessagesByType {
    pub email: i64,
    pub sms: i64,
    pub social: i64,
}

/// Aggregate classification history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageStats {
    pub total: i64,
    pub spam: i64,
    pub ham: i64,
    pub by_type: MessagesByType,
    pub recent: Vec<StoredMessage>,
}
