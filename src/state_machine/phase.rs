//! Conference phase type and phase classification sets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The single authoritative notion of "what phase is active now".
///
/// Exactly one variant is active at any instant; no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConferencePhase {
    #[default]
    Idle,
    Opening,
    IntroducingSpeaker,
    SpeakerActive,
    Interacting,
    TimeWarning,
    ThankingSpeaker,
    Transitioning,
    BreakAnnouncement,
    BreakActive,
    BreakEnding,
    Closing,
    Ended,
}

impl ConferencePhase {
    #[allow(dead_code)] // exercised by exhaustiveness tests
    pub const ALL: [ConferencePhase; 13] = [
        ConferencePhase::Idle,
        ConferencePhase::Opening,
        ConferencePhase::IntroducingSpeaker,
        ConferencePhase::SpeakerActive,
        ConferencePhase::Interacting,
        ConferencePhase::TimeWarning,
        ConferencePhase::ThankingSpeaker,
        ConferencePhase::Transitioning,
        ConferencePhase::BreakAnnouncement,
        ConferencePhase::BreakActive,
        ConferencePhase::BreakEnding,
        ConferencePhase::Closing,
        ConferencePhase::Ended,
    ];

    /// Phases where the moderator agent is expected to speak on entry.
    #[allow(dead_code)]
    pub fn is_speaking(self) -> bool {
        matches!(
            self,
            ConferencePhase::Opening
                | ConferencePhase::IntroducingSpeaker
                | ConferencePhase::TimeWarning
                | ConferencePhase::ThankingSpeaker
                | ConferencePhase::BreakAnnouncement
                | ConferencePhase::BreakEnding
                | ConferencePhase::Closing
        )
    }

    /// Phases during which a session countdown is active.
    pub fn is_timed(self) -> bool {
        matches!(
            self,
            ConferencePhase::SpeakerActive
                | ConferencePhase::Interacting
                | ConferencePhase::TimeWarning
                | ConferencePhase::BreakActive
                | ConferencePhase::BreakEnding
        )
    }

    /// Phases with a valid session index (everything between start and end).
    #[allow(dead_code)]
    pub fn is_active(self) -> bool {
        !matches!(self, ConferencePhase::Idle | ConferencePhase::Ended)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConferencePhase::Idle => "idle",
            ConferencePhase::Opening => "opening",
            ConferencePhase::IntroducingSpeaker => "introducing_speaker",
            ConferencePhase::SpeakerActive => "speaker_active",
            ConferencePhase::Interacting => "interacting",
            ConferencePhase::TimeWarning => "time_warning",
            ConferencePhase::ThankingSpeaker => "thanking_speaker",
            ConferencePhase::Transitioning => "transitioning",
            ConferencePhase::BreakAnnouncement => "break_announcement",
            ConferencePhase::BreakActive => "break_active",
            ConferencePhase::BreakEnding => "break_ending",
            ConferencePhase::Closing => "closing",
            ConferencePhase::Ended => "ended",
        }
    }
}

impl fmt::Display for ConferencePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirteen_mutually_exclusive_phases() {
        assert_eq!(ConferencePhase::ALL.len(), 13);
        for (i, a) in ConferencePhase::ALL.iter().enumerate() {
            for b in &ConferencePhase::ALL[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn terminal_phases_are_not_active() {
        assert!(!ConferencePhase::Idle.is_active());
        assert!(!ConferencePhase::Ended.is_active());
        assert!(ConferencePhase::SpeakerActive.is_active());
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&ConferencePhase::IntroducingSpeaker).unwrap();
        assert_eq!(json, "\"introducing_speaker\"");
    }
}
