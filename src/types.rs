//! Core data types for Texnote
//!
//! Notes as stored by the notes backend, plus the session and auth-event
//! types pushed by the identity provider.

use chrono::{DateTime, Local, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for notes
///
/// Wraps a UUID so note IDs cannot be confused with user IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub Uuid);

impl NoteId {
    /// Create a new random note ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a note ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Older rows carry the source here instead of `content`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latex_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Editable LaTeX source of this note
    pub fn body(&self) -> &str {
        if !self.content.is_empty() {
            return &self.content;
        }
        self.latex_content.as_deref().unwrap_or("")
    }

    /// `updated_at` in local time, for listings
    pub fn display_date(&self) -> String {
        self.updated_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}

/// Payload for creating a note
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub latex_content: String,
}

impl NewNote {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            title: title.into(),
            latex_content: content.clone(),
            content,
        }
    }
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NoteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latex_content: Option<String>,
}

impl NoteUpdate {
    /// Update title and body together, writing the body to both columns
    pub fn title_and_body(title: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            title: Some(title.into()),
            latex_content: Some(body.clone()),
            content: Some(body),
        }
    }
}

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Opaque bearer credential
///
/// Cheap to clone; never printed by `Debug`.
#[derive(Clone)]
pub struct BearerToken(Arc<SecretString>);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::new(SecretString::new(token.into().into())))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// An authenticated session
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub access_token: BearerToken,
    pub refresh_token: Option<BearerToken>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(user: User, access_token: BearerToken) -> Self {
        Self {
            user,
            access_token,
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Whether the access token has passed its expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

/// Auth state change pushed by the identity provider
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
}
