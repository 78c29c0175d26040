//! Turns transcript entries into display fragments.
//!
//! Message text is always HTML-escaped before the markdown pass runs, so markup
//! produced here can only come from the `**bold**` and newline substitutions.

use std::fmt::Display;
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone};
use colored::{ColoredString, Colorize};
use regex::{Captures, Regex};

use super::message::{ConfidenceBand, Message, Role};
use super::view::TypingHandle;

static BOLD_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold span pattern is valid"));

/// Escapes text so it can be placed inside element content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Applies the supported markdown subset to already-escaped text.
fn apply_markdown(escaped: &str) -> String {
    BOLD_SPAN
        .replace_all(escaped, "<strong>$1</strong>")
        .replace('\n', "<br>")
}

/// Escapes first, then formats. The order must not change.
pub fn render_content(text: &str) -> String {
    apply_markdown(&escape_html(text))
}

/// Hour and minute on a 12-hour clock, e.g. `3:07 PM`.
pub fn format_time<Tz>(timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp.format("%-I:%M %p").to_string()
}

fn confidence_badge_html(message: &Message) -> String {
    match (message.confidence_band(), message.confidence_percent()) {
        (Some(band), Some(percent)) => format!(
            r#"<span class="confidence-score {}">{percent}% confident</span>"#,
            band.as_str()
        ),
        _ => String::new(),
    }
}

pub fn render_message_html(message: &Message) -> String {
    format!(
        concat!(
            r#"<div class="message {role}-message">"#,
            r#"<div class="message-content">"#,
            r#"<strong>{name}:</strong>{badge}"#,
            r#"<p>{content}</p>"#,
            r#"</div>"#,
            r#"<span class="timestamp">{time}</span>"#,
            r#"</div>"#,
        ),
        role = message.role.as_str(),
        name = message.role.display_name(),
        badge = confidence_badge_html(message),
        content = render_content(&message.content),
        time = format_time(&message.timestamp),
    )
}

pub fn render_typing_html(handle: TypingHandle) -> String {
    format!(
        concat!(
            r#"<div class="message bot-message" data-typing="{handle}">"#,
            r#"<div class="message-content">"#,
            r#"<div class="typing-indicator"><span></span><span></span><span></span></div>"#,
            r#"</div>"#,
            r#"</div>"#,
        ),
        handle = handle.raw(),
    )
}

fn band_colored(band: ConfidenceBand, text: String) -> ColoredString {
    match band {
        ConfidenceBand::High => text.green(),
        ConfidenceBand::Medium => text.yellow(),
        ConfidenceBand::Low => text.red(),
    }
}

/// Terminal rendition: no escaping is needed, bold spans become bold text.
pub fn render_message_terminal(message: &Message) -> String {
    let name = match message.role {
        Role::User => message.role.display_name().cyan().bold(),
        Role::Bot => message.role.display_name().green().bold(),
    };
    let badge = match (message.confidence_band(), message.confidence_percent()) {
        (Some(band), Some(percent)) => {
            format!(" {}", band_colored(band, format!("({percent}% confident)")))
        }
        _ => String::new(),
    };
    let content = BOLD_SPAN.replace_all(&message.content, |captures: &Captures<'_>| {
        captures[1].bold().to_string()
    });

    format!(
        "{} {name}{badge}: {content}",
        format!("[{}]", format_time(&message.timestamp)).dimmed()
    )
}
