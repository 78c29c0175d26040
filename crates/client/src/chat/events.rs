/// User intent the controller acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    Submit(String),
    NewSession,
    Escalate { reason: Option<String> },
}

/// One complete line of terminal input, after continuation lines were joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Chat(ChatAction),
    ShowSession,
    Help,
    Quit,
    Unknown(String),
}

impl InputCommand {
    fn parse_slash(line: &str) -> Self {
        let (name, argument) = match line.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (line, ""),
        };

        match name {
            "/new" => Self::Chat(ChatAction::NewSession),
            "/escalate" => Self::Chat(ChatAction::Escalate {
                reason: (!argument.is_empty()).then(|| argument.to_string()),
            }),
            "/session" => Self::ShowSession,
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Joins terminal lines into messages.
///
/// A line ending in `\` continues on the next line, which is the terminal stand-in for
/// Shift+Enter. Slash commands are only recognized on the first line of an entry.
#[derive(Debug, Default)]
pub struct InputComposer {
    pending: Vec<String>,
}

impl InputComposer {
    pub fn is_continuing(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn push_line(&mut self, line: &str) -> Option<InputCommand> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(partial) = line.strip_suffix('\\') {
            self.pending.push(partial.to_string());
            return None;
        }

        if self.pending.is_empty() && line.trim_start().starts_with('/') {
            return Some(InputCommand::parse_slash(line.trim()));
        }

        self.pending.push(line.to_string());
        let text = self.pending.join("\n");
        self.pending.clear();
        Some(InputCommand::Chat(ChatAction::Submit(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_commands_are_parsed_with_arguments() {
        let mut composer = InputComposer::default();
        assert_eq!(
            composer.push_line("/new"),
            Some(InputCommand::Chat(ChatAction::NewSession))
        );
        assert_eq!(
            composer.push_line("/escalate  billing dispute "),
            Some(InputCommand::Chat(ChatAction::Escalate {
                reason: Some("billing dispute".to_string())
            }))
        );
        assert_eq!(
            composer.push_line("/escalate"),
            Some(InputCommand::Chat(ChatAction::Escalate { reason: None }))
        );
        assert_eq!(composer.push_line("/quit"), Some(InputCommand::Quit));
        assert_eq!(
            composer.push_line("/bogus x"),
            Some(InputCommand::Unknown("/bogus".to_string()))
        );
    }

    #[test]
    fn trailing_backslash_continues_the_message() {
        let mut composer = InputComposer::default();
        assert_eq!(composer.push_line("first line\\"), None);
        assert!(composer.is_continuing());
        // Commands are plain text inside a continued message.
        assert_eq!(composer.push_line("/new\\"), None);
        assert_eq!(
            composer.push_line("last"),
            Some(InputCommand::Chat(ChatAction::Submit(
                "first line\n/new\nlast".to_string()
            )))
        );
        assert!(!composer.is_continuing());
    }

    #[test]
    fn plain_text_is_submitted_verbatim() {
        let mut composer = InputComposer::default();
        assert_eq!(
            composer.push_line("  hello  \r"),
            Some(InputCommand::Chat(ChatAction::Submit("  hello  ".to_string())))
        );
    }
}
