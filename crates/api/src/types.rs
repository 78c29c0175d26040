use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of leading characters kept when a session token is shown in a header.
pub const SESSION_ID_PREVIEW_LEN: usize = 8;

/// Opaque server-issued session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a token exactly as the server issued it.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether the token has no visible characters. Such a token never
    /// identifies a usable session.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns the abbreviated form shown next to the connection status.
    pub fn short(&self) -> String {
        let preview = self
            .0
            .chars()
            .take(SESSION_ID_PREVIEW_LEN)
            .collect::<String>();
        format!("{preview}...")
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Body of `POST /chat/create`; serializes to `{}` without a user id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateSessionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Answer to session creation. Only the token is relied upon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedSession {
    pub session_id: SessionId,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `POST /chat/message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendMessageRequest<'a> {
    pub session_id: &'a SessionId,
    pub message: &'a str,
}

/// Bot answer to one user message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BotReply {
    pub response: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub should_escalate: bool,
}

/// Body of `POST /chat/escalate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscalateRequest<'a> {
    pub session_id: &'a SessionId,
    pub reason: &'a str,
}

/// Server confirmation of a hand-off, with the summary shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EscalationReceipt {
    pub summary: String,
    #[serde(default)]
    pub escalated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    /// The backend reports `ok` when it is ready to take sessions.
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// One stored message as reported by the history endpoint.
///
/// Roles are kept as raw strings because the backend also records `system`
/// and `assistant` turns that the chat transcript never produces.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversationHistory {
    pub session_id: SessionId,
    pub status: String,
    #[serde(default)]
    pub messages: Vec<HistoryEntry>,
}
