use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::ResultExt;

use super::client::{
    ApiResult, BuildClientSnafu, DecodeSnafu, StatusSnafu, SupportApi, TransportSnafu,
};
use super::types::{
    BotReply, ConversationHistory, CreateSessionRequest, CreatedSession, EscalateRequest,
    EscalationReceipt, HealthStatus, SendMessageRequest, SessionId,
};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8002/api";

const CREATE_SESSION_PATH: &str = "/chat/create";
const SEND_MESSAGE_PATH: &str = "/chat/message";
const ESCALATE_PATH: &str = "/chat/escalate";
const HEALTH_PATH: &str = "/health";
const HISTORY_PATH: &str = "/chat/history";
const SESSION_PATH: &str = "/chat";

/// `SupportApi` over HTTP/JSON.
///
/// No authentication, retry or timeout is applied; any non-2xx status is a failure
/// regardless of the body.
#[derive(Debug, Clone)]
pub struct HttpSupportClient {
    client: Client,
    base_url: String,
}

impl HttpSupportClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let client = Client::builder().build().context(BuildClientSnafu {
            stage: "http-client-new",
        })?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Path of a per-session resource. The id is one percent-encoded segment, so
    /// reserved characters in it cannot change the route.
    fn session_path(prefix: &str, session_id: &SessionId) -> String {
        format!("{prefix}/{}", urlencoding::encode(session_id.as_str()))
    }

    async fn post_json<B, T>(&self, stage: &'static str, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, stage, "posting request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .context(TransportSnafu {
                stage,
                url: url.clone(),
            })?;

        Self::decode(stage, url, response).await
    }

    async fn get_json<T>(&self, stage: &'static str, path: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, stage, "fetching resource");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context(TransportSnafu {
                stage,
                url: url.clone(),
            })?;

        Self::decode(stage, url, response).await
    }

    async fn delete(&self, stage: &'static str, path: &str) -> ApiResult<()> {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, stage, "deleting resource");

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .context(TransportSnafu {
                stage,
                url: url.clone(),
            })?;

        // 204 carries no body, so nothing is decoded on success.
        Self::ensure_success(stage, &url, response).await?;
        Ok(())
    }

    async fn decode<T>(stage: &'static str, url: String, response: Response) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let response = Self::ensure_success(stage, &url, response).await?;
        response.json::<T>().await.context(DecodeSnafu { stage, url })
    }

    async fn ensure_success(
        stage: &'static str,
        url: &str,
        response: Response,
    ) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // The body is only kept for diagnostics; error payloads are never interpreted.
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            url = %url,
            status = status.as_u16(),
            stage,
            "support api rejected request"
        );
        StatusSnafu {
            stage,
            url,
            status: status.as_u16(),
            body,
        }
        .fail()
    }
}

impl SupportApi for HttpSupportClient {
    fn create_session<'a>(
        &'a self,
        user_id: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<CreatedSession>> {
        async move {
            let request = CreateSessionRequest {
                user_id: user_id.map(str::to_string),
            };
            self.post_json("create-session", CREATE_SESSION_PATH, &request)
                .await
        }
        .boxed()
    }

    fn send_message<'a>(
        &'a self,
        session_id: &'a SessionId,
        message: &'a str,
    ) -> BoxFuture<'a, ApiResult<BotReply>> {
        async move {
            let request = SendMessageRequest {
                session_id,
                message,
            };
            self.post_json("send-message", SEND_MESSAGE_PATH, &request)
                .await
        }
        .boxed()
    }

    fn escalate<'a>(
        &'a self,
        session_id: &'a SessionId,
        reason: &'a str,
    ) -> BoxFuture<'a, ApiResult<EscalationReceipt>> {
        async move {
            let request = EscalateRequest { session_id, reason };
            self.post_json("escalate", ESCALATE_PATH, &request).await
        }
        .boxed()
    }

    fn health(&self) -> BoxFuture<'_, ApiResult<HealthStatus>> {
        self.get_json("health", HEALTH_PATH).boxed()
    }

    fn history<'a>(
        &'a self,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, ApiResult<ConversationHistory>> {
        async move {
            let path = Self::session_path(HISTORY_PATH, session_id);
            self.get_json("history", &path).await
        }
        .boxed()
    }

    fn close_session<'a>(&'a self, session_id: &'a SessionId) -> BoxFuture<'a, ApiResult<()>> {
        async move {
            let path = Self::session_path(SESSION_PATH, session_id);
            self.delete("close-session", &path).await
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = HttpSupportClient::with_client(Client::new(), " http://support.local/api/ ");
        assert_eq!(client.base_url(), "http://support.local/api");
        assert_eq!(
            client.endpoint(CREATE_SESSION_PATH),
            "http://support.local/api/chat/create"
        );
    }

    #[test]
    fn session_ids_stay_in_one_path_segment() {
        let path = HttpSupportClient::session_path(HISTORY_PATH, &SessionId::new("a/b?x#y"));
        assert_eq!(path, "/chat/history/a%2Fb%3Fx%23y");

        let plain = HttpSupportClient::session_path(SESSION_PATH, &SessionId::new("9b1d-4bad"));
        assert_eq!(plain, "/chat/9b1d-4bad");
    }
}
