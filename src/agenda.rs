//! Session catalog: the ordered, immutable list of conference sessions.
//!
//! Loaded once per conference (from the operator's `LOAD_AGENDA` payload or a
//! JSON file) and shared read-only with the orchestration core, which only
//! reads by index/length.

use crate::error::AgendaError;
use crate::state_machine::ConferenceContext;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

/// Kind of a scheduled session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Opening,
    Keynote,
    Talk,
    Panel,
    Break,
    Qa,
    Closing,
}

impl SessionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Opening => "opening",
            SessionType::Keynote => "keynote",
            SessionType::Talk => "talk",
            SessionType::Panel => "panel",
            SessionType::Break => "break",
            SessionType::Qa => "qa",
            SessionType::Closing => "closing",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speaker metadata attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerInfo {
    pub name: String,
    pub title: String,
    pub organization: String,
    pub talk_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation_hint: Option<String>,
}

/// One immutable entry of the session catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub title: String,
    /// Planned duration in seconds.
    pub duration_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<SpeakerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panelists: Option<Vec<SpeakerInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SessionDescriptor {
    pub fn speaker_name(&self) -> Option<&str> {
        self.speaker.as_ref().map(|s| s.name.as_str())
    }
}

/// The full conference agenda: metadata plus the ordered session list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agenda {
    pub id: String,
    pub title: String,
    pub date: String,
    pub venue: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_voice")]
    pub moderator_voice: String,
    pub sessions: Vec<SessionDescriptor>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_voice() -> String {
    "coral".to_string()
}

impl Agenda {
    /// Parse and validate an agenda from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, AgendaError> {
        let agenda: Agenda = serde_json::from_value(value)?;
        agenda.validate()?;
        Ok(agenda)
    }

    /// Load an agenda from a JSON file on disk.
    #[allow(dead_code)] // operator UIs load over the wire; kept for scripted setups
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AgendaError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let agenda: Agenda = serde_json::from_str(&raw)?;
        agenda.validate()?;
        Ok(agenda)
    }

    fn validate(&self) -> Result<(), AgendaError> {
        if self.sessions.is_empty() {
            return Err(AgendaError::Empty);
        }
        if let Some(s) = self.sessions.iter().find(|s| s.duration_secs == 0) {
            return Err(AgendaError::ZeroDuration {
                session_id: s.id.clone(),
            });
        }
        Ok(())
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session(&self, index: usize) -> Option<&SessionDescriptor> {
        self.sessions.get(index)
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.sessions.iter().map(|s| s.duration_secs).sum()
    }

    /// Summary payload sent to the operator UI after a successful load.
    pub fn summary(&self) -> Value {
        json!({
            "title": self.title,
            "total_sessions": self.sessions.len(),
            "total_duration_secs": self.total_duration_secs(),
            "sessions": self
                .sessions
                .iter()
                .map(|s| {
                    json!({
                        "id": s.id,
                        "type": s.session_type,
                        "title": s.title,
                        "duration_secs": s.duration_secs,
                        "speaker_name": s.speaker_name(),
                    })
                })
                .collect::<Vec<_>>(),
        })
    }

    /// Formatted info about the current or next session, for the agent's
    /// `get_session_info` tool.
    pub fn session_info(&self, context: &ConferenceContext, which: SessionQuery) -> Option<Value> {
        let index = match which {
            SessionQuery::Current => context.session_index,
            SessionQuery::Next => context.session_index + 1,
        };
        let session = self.session(index)?;

        let mut obj = serde_json::Map::new();
        obj.insert("session_index".to_string(), json!(index));
        obj.insert("session_id".to_string(), json!(session.id));
        obj.insert("type".to_string(), json!(session.session_type));
        obj.insert("title".to_string(), json!(session.title));
        obj.insert("duration_secs".to_string(), json!(session.duration_secs));
        if let Some(speaker) = &session.speaker {
            obj.insert(
                "speaker".to_string(),
                serde_json::to_value(speaker).unwrap_or(Value::Null),
            );
        }
        if let Some(panelists) = &session.panelists {
            obj.insert(
                "panelists".to_string(),
                serde_json::to_value(panelists).unwrap_or(Value::Null),
            );
        }
        if let Some(notes) = &session.notes {
            obj.insert("notes".to_string(), Value::String(notes.clone()));
        }
        if let Some(description) = &session.description {
            obj.insert("description".to_string(), Value::String(description.clone()));
        }
        Some(Value::Object(obj))
    }

    /// Time-remaining report for the agent's `check_time_remaining` tool.
    #[allow(clippy::cast_precision_loss)]
    pub fn time_remaining(&self, context: &ConferenceContext) -> Option<Value> {
        let session = self.session(context.session_index)?;
        let total = session.duration_secs as f64;
        let elapsed = context.elapsed_seconds;
        let remaining = (total - elapsed).max(0.0);
        let progress = if total > 0.0 {
            (elapsed / total).min(1.0)
        } else {
            1.0
        };

        Some(json!({
            "session_title": session.title,
            "total_seconds": total.round(),
            "elapsed_seconds": elapsed.round(),
            "remaining_seconds": remaining.round(),
            "remaining_minutes": (remaining / 60.0 * 10.0).round() / 10.0,
            "progress_percent": (progress * 1000.0).round() / 10.0,
        }))
    }
}

/// Which session a catalog query targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionQuery {
    #[default]
    Current,
    Next,
}
