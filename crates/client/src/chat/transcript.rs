use super::message::{ConnectionStatus, Message};
use super::render::{escape_html, render_message_html, render_typing_html};
use super::view::{ChatView, TypingHandle};

const DOCUMENT_TITLE: &str = "Support Chat Transcript";
const ESCALATION_BANNER_TEXT: &str =
    "It looks like you may need more help. Would you like to talk to a human agent?";

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    Message(Message),
    Typing(TypingHandle),
}

/// In-memory view that keeps the widget state a browser page would show.
#[derive(Debug, Clone, Default)]
pub struct HtmlTranscript {
    entries: Vec<TranscriptEntry>,
    status: ConnectionStatus,
    session_label: Option<String>,
    escalation_visible: bool,
    input_enabled: bool,
    input_focused: bool,
    alerts: Vec<String>,
}

impl HtmlTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|entry| match entry {
            TranscriptEntry::Message(message) => Some(message),
            TranscriptEntry::Typing(_) => None,
        })
    }

    pub fn typing_handles(&self) -> Vec<TypingHandle> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Typing(handle) => Some(*handle),
                TranscriptEntry::Message(_) => None,
            })
            .collect()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn session_label(&self) -> Option<&str> {
        self.session_label.as_deref()
    }

    pub fn escalation_visible(&self) -> bool {
        self.escalation_visible
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn input_focused(&self) -> bool {
        self.input_focused
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    /// Markup of every transcript entry in insertion order.
    pub fn fragments(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| match entry {
                TranscriptEntry::Message(message) => render_message_html(message),
                TranscriptEntry::Typing(handle) => render_typing_html(*handle),
            })
            .collect()
    }

    /// Standalone page with the header, escalation banner and transcript.
    pub fn to_document(&self) -> String {
        let session = self
            .session_label
            .as_deref()
            .map(escape_html)
            .unwrap_or_else(|| "-".to_string());
        let banner_style = if self.escalation_visible {
            "block"
        } else {
            "none"
        };

        let mut document = String::new();
        document.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        document.push_str("<meta charset=\"utf-8\">\n");
        document.push_str(&format!("<title>{DOCUMENT_TITLE}</title>\n"));
        document.push_str("</head>\n<body>\n<div class=\"chat-container\">\n");
        document.push_str(&format!(
            "<div class=\"chat-header\"><span id=\"sessionId\">{session}</span> <span id=\"status\" class=\"status\">{}</span></div>\n",
            self.status.label()
        ));
        document.push_str(&format!(
            "<div id=\"escalationBanner\" class=\"escalation-banner\" style=\"display: {banner_style}\">{ESCALATION_BANNER_TEXT}</div>\n"
        ));
        document.push_str("<div id=\"chatMessages\" class=\"chat-messages\">\n");
        for fragment in self.fragments() {
            document.push_str(&fragment);
            document.push('\n');
        }
        document.push_str("</div>\n</div>\n</body>\n</html>\n");
        document
    }
}

impl ChatView for HtmlTranscript {
    fn clear_transcript(&mut self) {
        self.entries.clear();
    }

    fn append_message(&mut self, message: &Message) {
        self.entries.push(TranscriptEntry::Message(message.clone()));
    }

    fn show_typing(&mut self, handle: TypingHandle) {
        self.entries.push(TranscriptEntry::Typing(handle));
    }

    fn remove_typing(&mut self, handle: TypingHandle) {
        self.entries
            .retain(|entry| !matches!(entry, TranscriptEntry::Typing(existing) if *existing == handle));
    }

    fn set_escalation_visible(&mut self, visible: bool) {
        self.escalation_visible = visible;
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    fn set_session_label(&mut self, label: Option<&str>) {
        self.session_label = label.map(str::to_string);
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
        if !enabled {
            self.input_focused = false;
        }
    }

    fn clear_input(&mut self) {}

    fn focus_input(&mut self) {
        self.input_focused = self.input_enabled;
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}
