//! Side-effect descriptors attached to transition rows.
//!
//! The transition table stays declarative: `fire` returns these descriptors
//! and the runtime executes them, in order, before the next trigger is
//! accepted.

use crate::state_machine::ConferencePhase;

/// An ordered side effect of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start a fresh countdown for the session at the current index.
    StartSessionTimer,

    /// Cancel the countdown, if any. Idempotent.
    StopSessionTimer,

    /// Instruct the voice agent to produce a response appropriate to the
    /// phase it just entered.
    SpeakCue { phase: ConferencePhase },

    /// The conference reached its terminal phase: notify observers and
    /// cancel outstanding work.
    AnnounceEnded,
}

impl Effect {
    pub fn speak(phase: ConferencePhase) -> Self {
        Effect::SpeakCue { phase }
    }
}
