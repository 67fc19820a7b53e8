//! Trait abstractions for runtime I/O.
//!
//! These traits enable testing the executor with mock implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::agenda::SessionDescriptor;
use crate::error::{SendError, TokenError};
use crate::state_machine::{ConferenceContext, ConferencePhase};
use crate::tools::ToolDefinition;

/// Outbound link to the realtime voice agent.
#[async_trait]
pub trait AgentLink: Send + Sync {
    /// Advertise the callable tools for this session.
    async fn register_tools(&self, tools: &[ToolDefinition]) -> Result<(), SendError>;

    /// Replace the agent's system instructions.
    async fn update_instructions(&self, instructions: &str) -> Result<(), SendError>;

    /// Ask the agent to speak the given cue now.
    async fn trigger_speech(&self, cue: &str) -> Result<(), SendError>;

    /// Return the result of a tool invocation, echoing its correlation id.
    async fn send_tool_result(&self, id: &str, result: &Value) -> Result<(), SendError>;
}

/// Builds the agent's instructions and spoken cues from conference state.
pub trait PromptBuilder: Send + Sync {
    /// Full system instructions for the current state.
    fn instructions(&self, context: &ConferenceContext) -> String;

    /// One-shot speaking cue for entering `phase`.
    fn cue(&self, context: &ConferenceContext, phase: ConferencePhase) -> String;
}

/// A short-lived credential for the voice-agent session.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Mints ephemeral voice-agent tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self) -> Result<IssuedToken, TokenError>;
}

/// Production prompt builder. Instructions are regenerated from scratch on
/// every state change so the agent never sees stale session facts.
pub struct ModeratorPromptBuilder;

impl ModeratorPromptBuilder {
    fn session_line(context: &ConferenceContext) -> String {
        match context.current_session() {
            Some(session) => {
                let mut line = format!(
                    "Current session: \"{}\" ({}, {} minutes).",
                    session.title,
                    session.session_type,
                    session.duration_secs / 60,
                );
                if let Some(name) = session.speaker_name() {
                    line.push_str(&format!(" Speaker: {name}."));
                }
                line
            }
            None => "No session is currently active.".to_string(),
        }
    }

    fn next_line(context: &ConferenceContext) -> String {
        match context.next_session() {
            Some(session) => format!("Up next: \"{}\".", session.title),
            None => "This is the final item on the agenda.".to_string(),
        }
    }
}

impl PromptBuilder for ModeratorPromptBuilder {
    fn instructions(&self, context: &ConferenceContext) -> String {
        let mut parts = vec![
            format!(
                "You are the live moderator for \"{}\".",
                context.agenda.title
            ),
            format!("Conference phase: {}.", context.phase),
            Self::session_line(context),
            Self::next_line(context),
        ];
        if context.interacting {
            parts.push(
                "Interaction mode is ON: engage the speaker conversationally and respond to \
                 audience questions."
                    .to_string(),
            );
        } else {
            parts.push(
                "Interaction mode is OFF: stay silent while a session is in progress unless a \
                 cue asks you to speak."
                    .to_string(),
            );
        }
        if context.phase.is_timed() {
            if let Some(remaining) = context.remaining_seconds() {
                parts.push(format!(
                    "Roughly {:.0} minutes remain in the current slot.",
                    (remaining / 60.0).ceil()
                ));
            }
        }
        parts.join("\n")
    }

    fn cue(&self, context: &ConferenceContext, phase: ConferencePhase) -> String {
        let title = context
            .current_session()
            .map_or_else(|| "the next session".to_string(), |s| format!("\"{}\"", s.title));
        match phase {
            ConferencePhase::Opening => format!(
                "Welcome the audience and open \"{}\".",
                context.agenda.title
            ),
            ConferencePhase::IntroducingSpeaker => {
                let speaker = context
                    .current_session()
                    .and_then(SessionDescriptor::speaker_name)
                    .unwrap_or("the presenter");
                format!("Introduce {speaker} and their session {title}.")
            }
            ConferencePhase::TimeWarning => {
                "Politely let the speaker know their time is almost up.".to_string()
            }
            ConferencePhase::ThankingSpeaker => {
                "Thank the speaker warmly and wrap up the session.".to_string()
            }
            ConferencePhase::BreakAnnouncement => {
                format!("Announce the break {title} and tell attendees when to return.")
            }
            ConferencePhase::BreakEnding => {
                "Call attendees back from the break; the program is resuming.".to_string()
            }
            ConferencePhase::Closing => {
                "Deliver the closing remarks and thank everyone for attending.".to_string()
            }
            _ => format!("Moderate the conference; current phase is {phase}."),
        }
    }
}
