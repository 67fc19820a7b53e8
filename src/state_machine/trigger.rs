//! Named events that may cause a state transition.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trigger vocabulary of the transition table.
///
/// Triggers arrive from three sources only: the event bridge (agent signals
/// and tool dispatch), the session timer, and operator commands. All of them
/// funnel through the single transition executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    StartConference,
    OpeningComplete,
    IntroduceSpeaker,
    SpeakerIntroduced,
    EnterInteraction,
    ExitInteraction,
    TimeWarning,
    WarningDelivered,
    SpeakerFinished,
    ThankComplete,
    AnnounceBreak,
    BreakAnnounced,
    BreakEndingSoon,
    BreakOver,
    StartClosing,
    ClosingComplete,
    OperatorNext,
}

impl Trigger {
    #[allow(dead_code)] // exercised by table-coverage tests
    pub const ALL: [Trigger; 17] = [
        Trigger::StartConference,
        Trigger::OpeningComplete,
        Trigger::IntroduceSpeaker,
        Trigger::SpeakerIntroduced,
        Trigger::EnterInteraction,
        Trigger::ExitInteraction,
        Trigger::TimeWarning,
        Trigger::WarningDelivered,
        Trigger::SpeakerFinished,
        Trigger::ThankComplete,
        Trigger::AnnounceBreak,
        Trigger::BreakEndingSoon,
        Trigger::BreakAnnounced,
        Trigger::BreakOver,
        Trigger::StartClosing,
        Trigger::ClosingComplete,
        Trigger::OperatorNext,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::StartConference => "start_conference",
            Trigger::OpeningComplete => "opening_complete",
            Trigger::IntroduceSpeaker => "introduce_speaker",
            Trigger::SpeakerIntroduced => "speaker_introduced",
            Trigger::EnterInteraction => "enter_interaction",
            Trigger::ExitInteraction => "exit_interaction",
            Trigger::TimeWarning => "time_warning",
            Trigger::WarningDelivered => "warning_delivered",
            Trigger::SpeakerFinished => "speaker_finished",
            Trigger::ThankComplete => "thank_complete",
            Trigger::AnnounceBreak => "announce_break",
            Trigger::BreakAnnounced => "break_announced",
            Trigger::BreakEndingSoon => "break_ending_soon",
            Trigger::BreakOver => "break_over",
            Trigger::StartClosing => "start_closing",
            Trigger::ClosingComplete => "closing_complete",
            Trigger::OperatorNext => "operator_next",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
