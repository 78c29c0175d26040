#![deny(unsafe_code)]

/// Support chat client.
///
/// The controller talks to the support-bot API and mirrors the conversation into any
/// `ChatView`; an HTML transcript and a terminal view ship with the crate.
pub mod chat;
/// Settings persistence and layering.
pub mod settings;
pub mod terminal;
