/// Session controller driving the support API and the view.
pub mod controller;
/// Input contracts for the chat front end.
pub mod events;
/// Domain entities and the connection state machine.
pub mod message;
pub mod render;
pub mod transcript;
pub mod view;

pub use controller::{
    ChatController, DEFAULT_ESCALATION_REASON, ESCALATION_FAILURE_ALERT, SEND_FAILURE_MESSAGE,
    SessionOptions, WELCOME_MESSAGE, connection_failure_alert, escalation_notice,
};
pub use events::{ChatAction, InputCommand, InputComposer};
pub use message::{
    ConfidenceBand, ConnectionStatus, Message, Role, StatusTransition, StatusTransitionRejection,
    StatusTransitionResult,
};
pub use transcript::{HtmlTranscript, TranscriptEntry};
pub use view::{ChatView, TypingHandle};
