//! Error taxonomy for the orchestration core.
//!
//! Every externally reachable malformed input maps to a typed error value;
//! internal invariant violations are programmer-error assertions instead.

use crate::state_machine::{ConferencePhase, Trigger};
use thiserror::Error;

/// Errors produced by the transition executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The trigger is not valid from the current phase. Context is unchanged.
    #[error("trigger {trigger} is not valid from phase {phase}")]
    InvalidTransition {
        trigger: Trigger,
        phase: ConferencePhase,
    },

    /// The conference reached its terminal phase; all further input is rejected.
    #[error("conference has ended")]
    ConferenceEnded,
}

/// Errors produced by tool dispatch. Reported back to the agent as a tool
/// failure; never a phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// A send to an external collaborator failed. The conference stays in its
/// current phase; the caller owns retry policy.
#[derive(Debug, Clone, Error)]
#[error("external send failed: {0}")]
pub struct SendError(pub String);

impl SendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failures while minting a voice-agent session token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No token endpoint is configured for this deployment.
    #[error("token issuing is not configured")]
    Disabled,

    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token response was malformed: {0}")]
    Malformed(String),
}

/// Agenda loading/validation failures.
#[derive(Debug, Error)]
pub enum AgendaError {
    #[error("agenda contains no sessions")]
    Empty,

    #[error("session {session_id} has zero duration")]
    ZeroDuration { session_id: String },

    #[error("failed to parse agenda: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read agenda file: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error surfaced to an operator command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Agenda(#[from] AgendaError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error("no agenda loaded")]
    NoAgenda,
}
