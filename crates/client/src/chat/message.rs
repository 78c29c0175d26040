use chrono::{DateTime, Local};

/// Chat speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// Name shown in front of every transcript entry.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Bot => "Support Bot",
        }
    }

    /// Token used in markup class names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

/// Qualitative label for a bot confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    /// Lowest score rendered as high confidence.
    pub const HIGH_THRESHOLD: f64 = 0.8;
    /// Lowest score rendered as medium confidence.
    pub const MEDIUM_THRESHOLD: f64 = 0.6;

    /// Bands a score; anything that is not at least medium (NaN included) is low.
    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            Self::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Class name used for the badge color.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// One transcript entry. Timestamps are taken on the client when the entry is created.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub confidence: Option<f64>,
    pub timestamp: DateTime<Local>,
}

impl Message {
    pub fn new(
        role: Role,
        content: impl Into<String>,
        confidence: Option<f64>,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            role,
            content: content.into(),
            confidence,
            timestamp,
        }
    }

    /// User entry stamped with the current local time.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, None, Local::now())
    }

    /// Bot entry without a score, used for welcome and escalation notices.
    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(Role::Bot, content, None, Local::now())
    }

    /// Bot answer carrying the server's confidence score.
    pub fn bot_scored(content: impl Into<String>, confidence: f64) -> Self {
        Self::new(Role::Bot, content, Some(confidence), Local::now())
    }

    /// Band of the score, if the entry has one.
    pub fn confidence_band(&self) -> Option<ConfidenceBand> {
        self.confidence.map(ConfidenceBand::from_score)
    }

    /// Whole-number percentage shown in the confidence badge.
    pub fn confidence_percent(&self) -> Option<i64> {
        self.confidence.map(|score| (score * 100.0).round() as i64)
    }
}

/// Connection lifecycle of the single active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Escalated,
}

impl ConnectionStatus {
    /// Text shown in the header status indicator.
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Escalated => "Escalated to Human Agent",
        }
    }

    /// Only a connected session takes user messages; escalation closes input for good.
    pub fn accepts_messages(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Applies one transition deterministically.
    ///
    /// `Connect` is legal from every state because starting a new session always
    /// replaces the previous one, escalated or not.
    pub fn apply(self, transition: StatusTransition) -> StatusTransitionResult {
        match transition {
            StatusTransition::Connect => Ok(Self::Connecting),
            StatusTransition::Established => match self {
                Self::Connecting => Ok(Self::Connected),
                other => Err(StatusTransitionRejection::NotConnecting { current: other }),
            },
            StatusTransition::Failed => match self {
                Self::Connecting => Ok(Self::Disconnected),
                other => Err(StatusTransitionRejection::NotConnecting { current: other }),
            },
            StatusTransition::Escalate => match self {
                Self::Connected => Ok(Self::Escalated),
                Self::Escalated => Err(StatusTransitionRejection::AlreadyEscalated),
                other => Err(StatusTransitionRejection::NotConnected { current: other }),
            },
        }
    }
}

/// State transition input for the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTransition {
    Connect,
    Established,
    Failed,
    Escalate,
}

/// Rejection reason for illegal connection transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTransitionRejection {
    NotConnecting { current: ConnectionStatus },
    NotConnected { current: ConnectionStatus },
    AlreadyEscalated,
}

pub type StatusTransitionResult = Result<ConnectionStatus, StatusTransitionRejection>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_bands_follow_thresholds() {
        assert_eq!(ConfidenceBand::from_score(1.0), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.8), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.7999), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.6), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.5999), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::from_score(0.0), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::from_score(f64::NAN), ConfidenceBand::Low);
    }

    #[test]
    fn confidence_percent_rounds_half_up() {
        assert_eq!(Message::bot_scored("a", 0.125).confidence_percent(), Some(13));
        assert_eq!(Message::bot_scored("a", 0.856).confidence_percent(), Some(86));
        assert_eq!(Message::bot_scored("a", 0.0).confidence_percent(), Some(0));
        assert_eq!(Message::bot("a").confidence_percent(), None);
    }

    #[test]
    fn escalation_is_only_reachable_from_connected() {
        let connected = ConnectionStatus::Connecting
            .apply(StatusTransition::Established)
            .unwrap();
        assert_eq!(connected, ConnectionStatus::Connected);

        let escalated = connected.apply(StatusTransition::Escalate).unwrap();
        assert_eq!(escalated, ConnectionStatus::Escalated);
        assert_eq!(
            escalated.apply(StatusTransition::Escalate),
            Err(StatusTransitionRejection::AlreadyEscalated)
        );
        assert_eq!(
            ConnectionStatus::Disconnected.apply(StatusTransition::Escalate),
            Err(StatusTransitionRejection::NotConnected {
                current: ConnectionStatus::Disconnected
            })
        );
    }

    #[test]
    fn new_session_restarts_from_any_state() {
        for status in [
            ConnectionStatus::Disconnected,
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Escalated,
        ] {
            assert_eq!(
                status.apply(StatusTransition::Connect),
                Ok(ConnectionStatus::Connecting)
            );
        }

        assert_eq!(
            ConnectionStatus::Connected.apply(StatusTransition::Failed),
            Err(StatusTransitionRejection::NotConnecting {
                current: ConnectionStatus::Connected
            })
        );
    }
}
