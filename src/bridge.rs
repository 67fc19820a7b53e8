//! Translation between external event sources and machine triggers.
//!
//! The voice agent and the timer both speak in their own vocabulary; this
//! module maps those vocabularies onto [`Trigger`]s. Mapping is phase
//! contextual: the same signal means different things depending on where the
//! conference currently is, and signals with no meaning in the current phase
//! map to nothing at all.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state_machine::{ConferencePhase, Trigger};
use crate::timer::TimerSignal;

/// Signals arriving from the voice-agent link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentSignal {
    /// The agent finished speaking its current utterance.
    TurnComplete,
    SpeechStarted,
    SpeechStopped,
    Transcript {
        text: String,
        #[serde(default)]
        is_final: bool,
    },
    ToolInvocation {
        id: String,
        name: String,
        #[serde(default)]
        args: Value,
    },
}

/// Trigger fired when the agent reports a completed turn, if the current
/// phase is one whose scripted utterance gates advancement. Silent phases
/// and `Interacting` absorb turn completions without effect.
pub fn trigger_for_turn_complete(phase: ConferencePhase) -> Option<Trigger> {
    match phase {
        ConferencePhase::Opening => Some(Trigger::OpeningComplete),
        ConferencePhase::IntroducingSpeaker => Some(Trigger::SpeakerIntroduced),
        ConferencePhase::TimeWarning => Some(Trigger::WarningDelivered),
        ConferencePhase::ThankingSpeaker => Some(Trigger::ThankComplete),
        ConferencePhase::BreakAnnouncement => Some(Trigger::BreakAnnounced),
        ConferencePhase::BreakEnding => Some(Trigger::BreakOver),
        ConferencePhase::Closing => Some(Trigger::ClosingComplete),
        _ => None,
    }
}

/// Trigger fired when the countdown crosses the warning threshold. Only the
/// speaking-session phases care; a warning landing anywhere else is stale.
pub fn trigger_for_timer_warning(phase: ConferencePhase) -> Option<Trigger> {
    match phase {
        ConferencePhase::SpeakerActive | ConferencePhase::Interacting => {
            Some(Trigger::TimeWarning)
        }
        _ => None,
    }
}

/// Trigger fired when the countdown expires.
pub fn trigger_for_timer_expiry(phase: ConferencePhase) -> Option<Trigger> {
    match phase {
        ConferencePhase::SpeakerActive
        | ConferencePhase::Interacting
        | ConferencePhase::TimeWarning => Some(Trigger::SpeakerFinished),
        ConferencePhase::BreakActive => Some(Trigger::BreakEndingSoon),
        _ => None,
    }
}

/// Trigger implied by a timer signal in the given phase, if any. Ticks never
/// produce triggers; they only update bookkeeping.
pub fn trigger_for_timer_signal(signal: &TimerSignal, phase: ConferencePhase) -> Option<Trigger> {
    match signal {
        TimerSignal::Tick(_) => None,
        TimerSignal::Warning(_) => trigger_for_timer_warning(phase),
        TimerSignal::Expired(_) => trigger_for_timer_expiry(phase),
    }
}
