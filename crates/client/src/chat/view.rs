use super::message::{ConnectionStatus, Message};

/// Identity of one typing placeholder.
///
/// Placeholders are removed by handle so a late removal never touches an entry
/// that was inserted afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypingHandle(u64);

impl TypingHandle {
    /// Creates a handle from a controller-issued counter value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Render seam between the chat controller and whatever displays the conversation.
pub trait ChatView {
    /// Drops every message and typing placeholder.
    fn clear_transcript(&mut self);
    /// Appends one entry at the end of the transcript.
    fn append_message(&mut self, message: &Message);
    /// Shows the "bot is typing" placeholder identified by `handle`.
    fn show_typing(&mut self, handle: TypingHandle);
    /// Must be a no-op for handles that are unknown or already removed.
    fn remove_typing(&mut self, handle: TypingHandle);
    /// Shows or hides the offer to talk to a human agent.
    fn set_escalation_visible(&mut self, visible: bool);
    fn set_status(&mut self, status: ConnectionStatus);
    /// Abbreviated session token next to the status, or nothing while connecting.
    fn set_session_label(&mut self, label: Option<&str>);
    /// Enables or disables both the text input and the send action.
    fn set_input_enabled(&mut self, enabled: bool);
    fn clear_input(&mut self);
    /// Moves focus to the input. Ignored while input is disabled.
    fn focus_input(&mut self);
    /// Blocking notice the user has to acknowledge.
    fn alert(&mut self, message: &str);
}

impl<A, B> ChatView for (A, B)
where
    A: ChatView,
    B: ChatView,
{
    fn clear_transcript(&mut self) {
        self.0.clear_transcript();
        self.1.clear_transcript();
    }

    fn append_message(&mut self, message: &Message) {
        self.0.append_message(message);
        self.1.append_message(message);
    }

    fn show_typing(&mut self, handle: TypingHandle) {
        self.0.show_typing(handle);
        self.1.show_typing(handle);
    }

    fn remove_typing(&mut self, handle: TypingHandle) {
        self.0.remove_typing(handle);
        self.1.remove_typing(handle);
    }

    fn set_escalation_visible(&mut self, visible: bool) {
        self.0.set_escalation_visible(visible);
        self.1.set_escalation_visible(visible);
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        self.0.set_status(status);
        self.1.set_status(status);
    }

    fn set_session_label(&mut self, label: Option<&str>) {
        self.0.set_session_label(label);
        self.1.set_session_label(label);
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.0.set_input_enabled(enabled);
        self.1.set_input_enabled(enabled);
    }

    fn clear_input(&mut self) {
        self.0.clear_input();
        self.1.clear_input();
    }

    fn focus_input(&mut self) {
        self.0.focus_input();
        self.1.focus_input();
    }

    fn alert(&mut self, message: &str) {
        self.0.alert(message);
        self.1.alert(message);
    }
}
