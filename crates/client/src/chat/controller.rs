use std::cell::{Ref, RefCell};

use supportdesk_api::{SessionId, SupportApi};

use super::events::ChatAction;
use super::message::{ConnectionStatus, Message, StatusTransition};
use super::view::{ChatView, TypingHandle};

pub const WELCOME_MESSAGE: &str = "Hello! I'm here to help you. How can I assist you today?";
pub const SEND_FAILURE_MESSAGE: &str =
    "Sorry, I encountered an error. Please try again or contact support.";
pub const ESCALATION_FAILURE_ALERT: &str = "Failed to escalate. Please try again.";
pub const DEFAULT_ESCALATION_REASON: &str = "User requested human agent";

/// Bot-voiced notice shown once a human agent takes over.
pub fn escalation_notice(summary: &str) -> String {
    format!(
        "I've escalated your case to a human agent. Here's a summary of our conversation:\n\n{summary}\n\nA support agent will be with you shortly."
    )
}

pub fn connection_failure_alert(server: &str) -> String {
    format!("Failed to connect to server. Please make sure the backend is running on {server}")
}

/// Per-controller knobs taken from settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub user_id: Option<String>,
    pub escalation_reason: String,
    /// Server named in the connection failure alert.
    pub server_label: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            user_id: None,
            escalation_reason: DEFAULT_ESCALATION_REASON.to_string(),
            server_label: supportdesk_api::DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct ClientState {
    session_id: Option<SessionId>,
    status: ConnectionStatus,
    waiting: bool,
    /// Bumped by every session creation; completions from older generations are stale.
    generation: u64,
    next_typing_handle: u64,
}

impl ClientState {
    fn transition(&mut self, transition: StatusTransition) -> bool {
        match self.status.apply(transition) {
            Ok(next) => {
                self.status = next;
                true
            }
            Err(rejection) => {
                tracing::warn!(
                    current = ?self.status,
                    transition = ?transition,
                    rejection = ?rejection,
                    "rejected connection status transition"
                );
                false
            }
        }
    }
}

/// Owns one conversation with the support service and mirrors it into a view.
///
/// Methods take `&self` and are meant to be interleaved on a single thread: state
/// lives in `RefCell`s that are never borrowed across an await point.
pub struct ChatController<A, V> {
    api: A,
    view: RefCell<V>,
    state: RefCell<ClientState>,
    options: SessionOptions,
}

impl<A, V> ChatController<A, V>
where
    A: SupportApi,
    V: ChatView,
{
    pub fn new(api: A, view: V, options: SessionOptions) -> Self {
        Self {
            api,
            view: RefCell::new(view),
            state: RefCell::new(ClientState::default()),
            options,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn view(&self) -> Ref<'_, V> {
        self.view.borrow()
    }

    pub fn into_view(self) -> V {
        self.view.into_inner()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.state.borrow().session_id.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.borrow().status
    }

    pub fn is_waiting(&self) -> bool {
        self.state.borrow().waiting
    }

    pub async fn dispatch(&self, action: ChatAction) {
        match action {
            ChatAction::Submit(text) => self.send_message(&text).await,
            ChatAction::NewSession => self.create_session().await,
            ChatAction::Escalate { reason } => self.escalate(reason.as_deref()).await,
        }
    }

    /// Starts a fresh session, abandoning the current one client-side.
    pub async fn create_session(&self) {
        let generation = {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.session_id = None;
            state.waiting = false;
            state.transition(StatusTransition::Connect);
            state.generation
        };

        {
            let mut view = self.view.borrow_mut();
            view.set_status(ConnectionStatus::Connecting);
            view.set_session_label(None);
            view.set_input_enabled(false);
        }

        tracing::info!(generation, "creating support session");
        let result = self
            .api
            .create_session(self.options.user_id.as_deref())
            .await;

        let mut state = self.state.borrow_mut();
        if state.generation != generation {
            tracing::debug!(generation, "discarding stale session creation result");
            return;
        }

        let created = match result {
            Ok(created) if !created.session_id.is_blank() => created,
            Ok(_) => {
                drop(state);
                tracing::error!("support api issued a blank session token");
                self.fail_session_creation();
                return;
            }
            Err(error) => {
                drop(state);
                tracing::error!(
                    error = %error,
                    stage = error.stage(),
                    "failed to create support session"
                );
                self.fail_session_creation();
                return;
            }
        };

        state.transition(StatusTransition::Established);
        let status = state.status;
        let label = created.session_id.short();
        tracing::info!(session_id = %created.session_id, "support session created");
        state.session_id = Some(created.session_id);
        drop(state);

        let mut view = self.view.borrow_mut();
        view.set_session_label(Some(&label));
        view.set_status(status);
        view.clear_transcript();
        view.append_message(&Message::bot(WELCOME_MESSAGE));
        view.set_escalation_visible(false);
        view.set_input_enabled(true);
        view.focus_input();
    }

    fn fail_session_creation(&self) {
        let status = {
            let mut state = self.state.borrow_mut();
            state.transition(StatusTransition::Failed);
            state.status
        };

        let mut view = self.view.borrow_mut();
        view.set_status(status);
        view.alert(&connection_failure_alert(&self.options.server_label));
    }

    /// Sends one user message. Silently ignored while waiting, without a live session,
    /// after escalation, or when the text is blank.
    pub async fn send_message(&self, text: &str) {
        let text = text.trim();
        let (session_id, generation, handle) = {
            let mut state = self.state.borrow_mut();
            if state.waiting || text.is_empty() || !state.status.accepts_messages() {
                return;
            }
            let Some(session_id) = state.session_id.clone() else {
                return;
            };
            state.waiting = true;
            state.next_typing_handle += 1;
            (
                session_id,
                state.generation,
                TypingHandle::new(state.next_typing_handle),
            )
        };

        {
            let mut view = self.view.borrow_mut();
            view.append_message(&Message::user(text));
            view.clear_input();
            view.show_typing(handle);
            view.set_input_enabled(false);
        }

        let _cleanup = ExchangeCleanup {
            state: &self.state,
            view: &self.view,
            generation,
            handle,
        };

        let result = self.api.send_message(&session_id, text).await;

        let still_connected = {
            let state = self.state.borrow();
            if state.generation != generation {
                tracing::debug!(session_id = %session_id, "discarding reply for replaced session");
                return;
            }
            state.status.accepts_messages()
        };

        let mut view = self.view.borrow_mut();
        view.remove_typing(handle);
        match result {
            Ok(reply) => {
                tracing::debug!(
                    session_id = %session_id,
                    confidence = reply.confidence_score,
                    should_escalate = reply.should_escalate,
                    "received bot reply"
                );
                view.append_message(&Message::bot_scored(
                    reply.response,
                    reply.confidence_score,
                ));
                if reply.should_escalate && still_connected {
                    view.set_escalation_visible(true);
                }
            }
            Err(error) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %error,
                    stage = error.stage(),
                    "failed to send message"
                );
                view.append_message(&Message::bot_scored(SEND_FAILURE_MESSAGE, 0.0));
            }
        }
    }

    /// Hands the conversation to a human agent. Terminal for the session on success.
    pub async fn escalate(&self, reason: Option<&str>) {
        let reason = reason
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .unwrap_or(self.options.escalation_reason.as_str());

        let (session_id, generation) = {
            let state = self.state.borrow();
            if state.status == ConnectionStatus::Escalated {
                return;
            }
            let Some(session_id) = state.session_id.clone() else {
                return;
            };
            (session_id, state.generation)
        };

        tracing::info!(session_id = %session_id, reason, "escalating to a human agent");
        let result = self.api.escalate(&session_id, reason).await;

        let mut state = self.state.borrow_mut();
        if state.generation != generation {
            tracing::debug!(session_id = %session_id, "discarding escalation for replaced session");
            return;
        }

        match result {
            Ok(receipt) => {
                if !state.transition(StatusTransition::Escalate) {
                    return;
                }
                let status = state.status;
                drop(state);

                let mut view = self.view.borrow_mut();
                view.append_message(&Message::bot(escalation_notice(&receipt.summary)));
                view.set_escalation_visible(false);
                view.set_status(status);
                view.set_input_enabled(false);
            }
            Err(error) => {
                drop(state);
                tracing::error!(
                    session_id = %session_id,
                    error = %error,
                    stage = error.stage(),
                    "failed to escalate conversation"
                );
                self.view.borrow_mut().alert(ESCALATION_FAILURE_ALERT);
            }
        }
    }
}

/// Releases the in-flight guard when a message exchange ends, including when its
/// future is dropped before completion.
struct ExchangeCleanup<'a, V>
where
    V: ChatView,
{
    state: &'a RefCell<ClientState>,
    view: &'a RefCell<V>,
    generation: u64,
    handle: TypingHandle,
}

impl<V> Drop for ExchangeCleanup<'_, V>
where
    V: ChatView,
{
    fn drop(&mut self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        // A newer session already reset the guard and owns the input state.
        if state.generation != self.generation {
            return;
        }
        state.waiting = false;
        let reopen_input = state.status.accepts_messages();
        drop(state);

        let Ok(mut view) = self.view.try_borrow_mut() else {
            return;
        };
        // Already gone after a completed exchange; still shown when the future was dropped.
        view.remove_typing(self.handle);
        if reopen_input {
            view.set_input_enabled(true);
            view.focus_input();
        }
    }
}
