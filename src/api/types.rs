//! Operator WebSocket message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::runtime::{ConferenceEvent, StateSnapshot};
use crate::timer::TimerReading;

/// Messages an operator console sends.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    LoadAgenda { agenda: Value },
    RequestToken,
    StartConference,
    SidebandConnect,
    Pause,
    Resume,
    NextSession,
    ToggleInteract,
    OverrideMessage { text: String },
}

/// Messages pushed to operator consoles.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    AgendaLoaded {
        summary: Value,
    },
    TokenReady {
        token: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        expires_at: Option<DateTime<Utc>>,
    },
    StateUpdate {
        state: StateSnapshot,
    },
    TimerTick {
        timer: TimerReading,
    },
    ModeratorStatus {
        vocalizing: bool,
    },
    Transcript {
        text: String,
        is_final: bool,
    },
    Error {
        message: String,
    },
    ConferenceEnded,
}

impl From<ConferenceEvent> for ServerMessage {
    fn from(event: ConferenceEvent) -> Self {
        match event {
            ConferenceEvent::AgendaLoaded { summary } => Self::AgendaLoaded { summary },
            ConferenceEvent::TokenReady { token, expires_at } => {
                Self::TokenReady { token, expires_at }
            }
            ConferenceEvent::StateUpdate { snapshot } => Self::StateUpdate { state: snapshot },
            ConferenceEvent::TimerTick { reading } => Self::TimerTick { timer: reading },
            ConferenceEvent::ModeratorStatus { vocalizing } => {
                Self::ModeratorStatus { vocalizing }
            }
            ConferenceEvent::Transcript { text, is_final } => Self::Transcript { text, is_final },
            ConferenceEvent::Error { message } => Self::Error { message },
            ConferenceEvent::ConferenceEnded => Self::ConferenceEnded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_parse_screaming_snake_tags() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "OVERRIDE_MESSAGE",
            "text": "welcome back",
        }))
        .unwrap();
        assert!(matches!(msg, ClientMessage::OverrideMessage { text } if text == "welcome back"));

        let msg: ClientMessage = serde_json::from_value(json!({"type": "NEXT_SESSION"})).unwrap();
        assert!(matches!(msg, ClientMessage::NextSession));
    }

    #[test]
    fn unknown_client_message_type_fails_to_parse() {
        assert!(serde_json::from_value::<ClientMessage>(json!({"type": "REBOOT"})).is_err());
    }

    #[test]
    fn server_messages_tag_with_type() {
        let value = serde_json::to_value(ServerMessage::ModeratorStatus { vocalizing: true })
            .unwrap();
        assert_eq!(value["type"], "MODERATOR_STATUS");
        assert_eq!(value["vocalizing"], true);

        let value = serde_json::to_value(ServerMessage::ConferenceEnded).unwrap();
        assert_eq!(value["type"], "CONFERENCE_ENDED");
    }
}
