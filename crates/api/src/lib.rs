#![deny(unsafe_code)]

//! Client side of the support-bot REST API.

mod client;
mod http;
mod types;

pub use client::{ApiError, ApiResult, SupportApi};
pub use http::{DEFAULT_API_BASE_URL, HttpSupportClient};
pub use types::{
    BotReply, ConversationHistory, CreateSessionRequest, CreatedSession, EscalateRequest,
    EscalationReceipt, HealthStatus, HistoryEntry, SESSION_ID_PREVIEW_LEN, SendMessageRequest,
    SessionId,
};
