use futures::future::BoxFuture;
use snafu::Snafu;

use super::types::{
    BotReply, ConversationHistory, CreatedSession, EscalationReceipt, HealthStatus, SessionId,
};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {url} failed on `{stage}`: {source}"))]
    Transport {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("{url} returned status {status} on `{stage}`: {body}"))]
    Status {
        stage: &'static str,
        url: String,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to decode response from {url} on `{stage}`: {source}"))]
    Decode {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
}

impl ApiError {
    /// Name of the step that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::BuildClient { stage, .. }
            | Self::Transport { stage, .. }
            | Self::Status { stage, .. }
            | Self::Decode { stage, .. } => stage,
        }
    }

    /// HTTP status when the server answered with a non-success code.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::BuildClient { .. } | Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }
}

/// Remote support-bot service consumed by the chat controller.
pub trait SupportApi: Send + Sync {
    /// Opens a new server-side session, optionally tagged with a user id.
    fn create_session<'a>(&'a self, user_id: Option<&'a str>)
    -> BoxFuture<'a, ApiResult<CreatedSession>>;

    /// Sends one user message and returns the bot answer with its confidence.
    fn send_message<'a>(
        &'a self,
        session_id: &'a SessionId,
        message: &'a str,
    ) -> BoxFuture<'a, ApiResult<BotReply>>;

    /// Hands the session to a human agent and returns the conversation summary.
    fn escalate<'a>(
        &'a self,
        session_id: &'a SessionId,
        reason: &'a str,
    ) -> BoxFuture<'a, ApiResult<EscalationReceipt>>;

    fn health(&self) -> BoxFuture<'_, ApiResult<HealthStatus>>;

    /// Stored transcript of a session, including turns from other clients.
    fn history<'a>(&'a self, session_id: &'a SessionId)
    -> BoxFuture<'a, ApiResult<ConversationHistory>>;

    /// Deletes a session and everything stored for it.
    fn close_session<'a>(&'a self, session_id: &'a SessionId) -> BoxFuture<'a, ApiResult<()>>;
}
