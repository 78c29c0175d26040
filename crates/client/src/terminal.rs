use std::collections::BTreeSet;
use std::io::{self, Stdout, Write};

use colored::Colorize;

use crate::chat::render::render_message_terminal;
use crate::chat::{ChatView, ConnectionStatus, Message, TypingHandle};

pub const HELP_TEXT: &str = "\
Commands:
  /new               start a new session
  /escalate [reason] talk to a human agent
  /session           show the current session id
  /help              show this help
  /quit              leave the chat
End a line with \\ to continue the message on the next line.";

/// Line-oriented view for interactive terminals.
///
/// Terminals cannot retract printed lines, so the typing notice is printed once while
/// any placeholder is pending and the placeholders are only tracked afterwards.
pub struct TerminalView<W = Stdout> {
    out: W,
    status: ConnectionStatus,
    escalation_visible: bool,
    input_enabled: bool,
    typing: BTreeSet<TypingHandle>,
}

impl TerminalView<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W> TerminalView<W>
where
    W: Write,
{
    pub fn new(out: W) -> Self {
        Self {
            out,
            status: ConnectionStatus::Disconnected,
            escalation_visible: false,
            input_enabled: false,
            typing: BTreeSet::new(),
        }
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Whether a typing placeholder is still pending.
    pub fn is_typing(&self) -> bool {
        !self.typing.is_empty()
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn print_line(&mut self, line: impl AsRef<str>) {
        if let Err(error) = writeln!(self.out, "{}", line.as_ref()).and_then(|()| self.out.flush())
        {
            tracing::warn!(error = %error, "failed to write to terminal");
        }
    }
}

impl<W> ChatView for TerminalView<W>
where
    W: Write,
{
    fn clear_transcript(&mut self) {
        self.typing.clear();
        self.print_line("── new conversation ──".dimmed().to_string());
    }

    fn append_message(&mut self, message: &Message) {
        self.print_line(render_message_terminal(message));
    }

    fn show_typing(&mut self, handle: TypingHandle) {
        let already_announced = !self.typing.is_empty();
        self.typing.insert(handle);
        if !already_announced {
            self.print_line("Support Bot is typing...".dimmed().italic().to_string());
        }
    }

    fn remove_typing(&mut self, handle: TypingHandle) {
        self.typing.remove(&handle);
    }

    fn set_escalation_visible(&mut self, visible: bool) {
        if visible && !self.escalation_visible {
            self.print_line(
                "Need more help? Type /escalate to talk to a human agent."
                    .yellow()
                    .bold()
                    .to_string(),
            );
        }
        self.escalation_visible = visible;
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if status == self.status {
            return;
        }
        self.status = status;
        let label = match status {
            ConnectionStatus::Connected => status.label().green(),
            ConnectionStatus::Connecting => status.label().normal(),
            ConnectionStatus::Disconnected => status.label().red(),
            ConnectionStatus::Escalated => status.label().magenta(),
        };
        self.print_line(format!("{} {label}", "status:".dimmed()));
    }

    fn set_session_label(&mut self, label: Option<&str>) {
        if let Some(label) = label {
            self.print_line(format!("{} {label}", "session:".dimmed()));
        }
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        if !enabled && self.input_enabled && self.status == ConnectionStatus::Escalated {
            self.print_line(
                "This conversation is now handled by a human agent. Type /new to start over."
                    .dimmed()
                    .to_string(),
            );
        }
        self.input_enabled = enabled;
    }

    fn clear_input(&mut self) {}

    fn focus_input(&mut self) {}

    fn alert(&mut self, message: &str) {
        self.print_line(format!("{} {message}", "!".red().bold()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(view: TerminalView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn status_lines_are_printed_only_on_change() {
        colored::control::set_override(false);
        let mut view = TerminalView::new(Vec::new());
        view.set_status(ConnectionStatus::Connecting);
        view.set_status(ConnectionStatus::Connecting);
        view.set_status(ConnectionStatus::Connected);

        assert_eq!(
            output(view),
            "status: Connecting...\nstatus: Connected\n"
        );
    }

    #[test]
    fn typing_notice_is_printed_once_while_pending() {
        colored::control::set_override(false);
        let mut view = TerminalView::new(Vec::new());
        view.show_typing(TypingHandle::new(1));
        view.show_typing(TypingHandle::new(2));
        view.remove_typing(TypingHandle::new(1));
        assert!(view.is_typing());
        view.remove_typing(TypingHandle::new(2));
        assert!(!view.is_typing());
        view.show_typing(TypingHandle::new(3));

        assert_eq!(output(view).matches("Support Bot is typing...").count(), 2);
    }

    #[test]
    fn escalation_hint_is_not_repeated() {
        colored::control::set_override(false);
        let mut view = TerminalView::new(Vec::new());
        view.set_escalation_visible(true);
        view.set_escalation_visible(true);
        view.alert("Failed to escalate. Please try again.");

        let printed = output(view);
        assert_eq!(printed.matches("/escalate").count(), 1);
        assert!(printed.ends_with("! Failed to escalate. Please try again.\n"));
    }
}
