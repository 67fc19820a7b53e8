//! Declarative transition table and its executor.
//!
//! Each row is {trigger, source set, destination, optional guard, ordered
//! side-effect descriptors}. `fire` performs lookup, applies the destination
//! phase, and returns the effects for the runtime to execute; it never does
//! I/O itself. Transitioning is a router phase: entering it resolves to the
//! real destination within the same `fire` call, driven by the next catalog
//! entry.

use crate::agenda::SessionType;
use crate::error::TransitionError;
use crate::state_machine::{ConferenceContext, ConferencePhase, Effect, Trigger};
use std::sync::Arc;

use ConferencePhase as P;
use Trigger as T;

/// Guard predicate evaluated against the current context. A failing guard
/// behaves exactly like a missing row.
type Guard = fn(&ConferenceContext) -> bool;

/// Side-effect descriptor as written in the table; `SpeakCue` picks up the
/// row's destination phase when materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowEffect {
    StartTimer,
    StopTimer,
    Speak,
    AnnounceEnded,
}

/// One row of the transition graph.
struct TransitionRow {
    trigger: Trigger,
    sources: &'static [ConferencePhase],
    dest: ConferencePhase,
    guard: Option<Guard>,
    effects: &'static [RowEffect],
}

fn warning_not_yet_issued(ctx: &ConferenceContext) -> bool {
    !ctx.warning_issued
}

/// The 21 rows defining the conference graph.
static TABLE: [TransitionRow; 21] = [
    TransitionRow {
        trigger: T::StartConference,
        sources: &[P::Idle],
        dest: P::Opening,
        guard: None,
        effects: &[RowEffect::Speak],
    },
    TransitionRow {
        trigger: T::OpeningComplete,
        sources: &[P::Opening],
        dest: P::Transitioning,
        guard: None,
        effects: &[RowEffect::StopTimer],
    },
    TransitionRow {
        trigger: T::IntroduceSpeaker,
        sources: &[P::Transitioning],
        dest: P::IntroducingSpeaker,
        guard: None,
        effects: &[RowEffect::Speak],
    },
    TransitionRow {
        trigger: T::SpeakerIntroduced,
        sources: &[P::IntroducingSpeaker],
        dest: P::SpeakerActive,
        guard: None,
        effects: &[RowEffect::StartTimer],
    },
    TransitionRow {
        trigger: T::EnterInteraction,
        sources: &[P::SpeakerActive],
        dest: P::Interacting,
        guard: None,
        effects: &[],
    },
    TransitionRow {
        trigger: T::ExitInteraction,
        sources: &[P::Interacting],
        dest: P::SpeakerActive,
        guard: None,
        effects: &[],
    },
    TransitionRow {
        trigger: T::TimeWarning,
        sources: &[P::SpeakerActive],
        dest: P::TimeWarning,
        guard: Some(warning_not_yet_issued),
        effects: &[RowEffect::Speak],
    },
    TransitionRow {
        trigger: T::TimeWarning,
        sources: &[P::Interacting],
        dest: P::TimeWarning,
        guard: Some(warning_not_yet_issued),
        effects: &[RowEffect::Speak],
    },
    TransitionRow {
        trigger: T::WarningDelivered,
        sources: &[P::TimeWarning],
        dest: P::SpeakerActive,
        guard: None,
        effects: &[],
    },
    TransitionRow {
        trigger: T::SpeakerFinished,
        sources: &[P::SpeakerActive],
        dest: P::ThankingSpeaker,
        guard: None,
        effects: &[RowEffect::StopTimer, RowEffect::Speak],
    },
    TransitionRow {
        trigger: T::SpeakerFinished,
        sources: &[P::Interacting],
        dest: P::ThankingSpeaker,
        guard: None,
        effects: &[RowEffect::StopTimer, RowEffect::Speak],
    },
    TransitionRow {
        trigger: T::SpeakerFinished,
        sources: &[P::TimeWarning],
        dest: P::ThankingSpeaker,
        guard: None,
        effects: &[RowEffect::StopTimer, RowEffect::Speak],
    },
    TransitionRow {
        trigger: T::ThankComplete,
        sources: &[P::ThankingSpeaker],
        dest: P::Transitioning,
        guard: None,
        effects: &[],
    },
    TransitionRow {
        trigger: T::AnnounceBreak,
        sources: &[P::Transitioning],
        dest: P::BreakAnnouncement,
        guard: None,
        effects: &[RowEffect::Speak],
    },
    TransitionRow {
        trigger: T::BreakAnnounced,
        sources: &[P::BreakAnnouncement],
        dest: P::BreakActive,
        guard: None,
        effects: &[RowEffect::StartTimer],
    },
    TransitionRow {
        trigger: T::BreakEndingSoon,
        sources: &[P::BreakActive],
        dest: P::BreakEnding,
        guard: None,
        effects: &[RowEffect::Speak],
    },
    TransitionRow {
        trigger: T::BreakOver,
        sources: &[P::BreakEnding],
        dest: P::Transitioning,
        guard: None,
        effects: &[RowEffect::StopTimer],
    },
    TransitionRow {
        trigger: T::BreakOver,
        sources: &[P::BreakActive],
        dest: P::Transitioning,
        guard: None,
        effects: &[RowEffect::StopTimer],
    },
    TransitionRow {
        trigger: T::StartClosing,
        sources: &[P::Transitioning],
        dest: P::Closing,
        guard: None,
        effects: &[RowEffect::StopTimer, RowEffect::Speak],
    },
    TransitionRow {
        trigger: T::ClosingComplete,
        sources: &[P::Closing],
        dest: P::Ended,
        guard: None,
        effects: &[RowEffect::StopTimer, RowEffect::AnnounceEnded],
    },
    // Operator override: one row, five valid sources, always lands in the
    // router so the catalog decides what actually comes next.
    TransitionRow {
        trigger: T::OperatorNext,
        sources: &[
            P::Opening,
            P::SpeakerActive,
            P::Interacting,
            P::TimeWarning,
            P::BreakActive,
        ],
        dest: P::Transitioning,
        guard: None,
        effects: &[RowEffect::StopTimer],
    },
];

/// Result of an accepted trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireOutcome {
    /// Final phase after router resolution.
    pub phase: ConferencePhase,
    /// Generation assigned to this trigger.
    pub generation: u64,
    /// Ordered side effects for the runtime to execute.
    pub effects: Vec<Effect>,
}

/// The transition executor. Owns the context; the only writer of it.
pub struct ConferenceMachine {
    context: ConferenceContext,
}

impl ConferenceMachine {
    pub fn new(agenda: Arc<crate::agenda::Agenda>) -> Self {
        Self {
            context: ConferenceContext::new(agenda),
        }
    }

    pub fn context(&self) -> &ConferenceContext {
        &self.context
    }

    pub fn phase(&self) -> ConferencePhase {
        self.context.phase
    }

    /// Apply a trigger. On a miss (no row, or failing guard) the context is
    /// left untouched and `InvalidTransition` is returned; after Ended every
    /// trigger is rejected with `ConferenceEnded`.
    pub fn fire(&mut self, trigger: Trigger) -> Result<FireOutcome, TransitionError> {
        if self.context.phase == P::Ended {
            return Err(TransitionError::ConferenceEnded);
        }

        let phase = self.context.phase;
        let row = TABLE
            .iter()
            .find(|row| {
                row.trigger == trigger
                    && row.sources.contains(&phase)
                    && row.guard.is_none_or(|guard| guard(&self.context))
            })
            .ok_or(TransitionError::InvalidTransition { trigger, phase })?;

        self.context.generation += 1;
        let generation = self.context.generation;
        self.context.phase = row.dest;
        let mut effects = materialize(row);

        if row.dest == P::Transitioning {
            self.route(&mut effects);
        }

        Ok(FireOutcome {
            phase: self.context.phase,
            generation,
            effects,
        })
    }

    /// Router resolution: performed synchronously on entering Transitioning,
    /// so no caller ever observes the router phase as settled state. The
    /// session index advances here and nowhere else.
    fn route(&mut self, effects: &mut Vec<Effect>) {
        let followup = match self.context.next_session() {
            None => T::StartClosing,
            Some(next) => {
                let next_type = next.session_type;
                self.context.begin_session(self.context.session_index + 1);
                match next_type {
                    SessionType::Break => T::AnnounceBreak,
                    SessionType::Closing => T::StartClosing,
                    _ => T::IntroduceSpeaker,
                }
            }
        };

        let phase = self.context.phase;
        let row = TABLE
            .iter()
            .find(|row| row.trigger == followup && row.sources.contains(&phase));
        // The three router follow-ups all have a Transitioning source row;
        // a miss here is a table defect, not an input error.
        debug_assert!(row.is_some(), "router follow-up {followup} has no row");
        if let Some(row) = row {
            self.context.phase = row.dest;
            effects.extend(materialize(row));
        }
    }

    /// Flip the interaction-mode flag. Never changes the phase; valid only
    /// while a speaker holds the stage.
    pub fn toggle_interacting(&mut self) -> Result<bool, TransitionError> {
        match self.context.phase {
            P::SpeakerActive | P::Interacting => {
                self.context.interacting = !self.context.interacting;
                self.context.generation += 1;
                Ok(self.context.interacting)
            }
            P::Ended => Err(TransitionError::ConferenceEnded),
            phase => Err(TransitionError::InvalidTransition {
                trigger: T::EnterInteraction,
                phase,
            }),
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.context.is_paused = paused;
    }

    /// Record the latest timer reading into the context.
    pub fn record_elapsed(&mut self, elapsed_seconds: f64) {
        self.context.elapsed_seconds = elapsed_seconds;
    }

    pub fn mark_warning_issued(&mut self) {
        self.context.warning_issued = true;
    }
}

fn materialize(row: &TransitionRow) -> Vec<Effect> {
    row.effects
        .iter()
        .map(|effect| match effect {
            RowEffect::StartTimer => Effect::StartSessionTimer,
            RowEffect::StopTimer => Effect::StopSessionTimer,
            RowEffect::Speak => Effect::speak(row.dest),
            RowEffect::AnnounceEnded => Effect::AnnounceEnded,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::test_support::{agenda, session};
    use crate::agenda::{Agenda, SessionType};

    fn standard_agenda() -> Arc<Agenda> {
        Arc::new(crate::agenda::test_support::standard_agenda())
    }

    fn machine() -> ConferenceMachine {
        ConferenceMachine::new(standard_agenda())
    }

    /// Drive a fresh machine to the keynote's SpeakerActive phase.
    fn machine_at_speaker_active() -> ConferenceMachine {
        let mut m = machine();
        m.fire(T::StartConference).unwrap();
        m.fire(T::OpeningComplete).unwrap();
        m.fire(T::SpeakerIntroduced).unwrap();
        assert_eq!(m.phase(), P::SpeakerActive);
        assert_eq!(m.context().session_index, 1);
        m
    }

    #[test]
    fn table_has_twenty_one_rows() {
        assert_eq!(TABLE.len(), 21);
    }

    #[test]
    fn start_conference_enters_opening_at_index_zero() {
        let mut m = machine();
        let outcome = m.fire(T::StartConference).unwrap();
        assert_eq!(outcome.phase, P::Opening);
        assert_eq!(outcome.generation, 1);
        assert_eq!(outcome.effects, vec![Effect::speak(P::Opening)]);
        assert_eq!(m.context().session_index, 0);
    }

    #[test]
    fn opening_complete_routes_to_speaker_introduction() {
        let mut m = machine();
        m.fire(T::StartConference).unwrap();
        let outcome = m.fire(T::OpeningComplete).unwrap();
        // Router resolved within the same fire; Transitioning never settles.
        assert_eq!(outcome.phase, P::IntroducingSpeaker);
        assert_eq!(m.context().session_index, 1);
        assert!(outcome.effects.contains(&Effect::speak(P::IntroducingSpeaker)));
    }

    #[test]
    fn speaker_introduced_starts_the_session_timer() {
        let mut m = machine();
        m.fire(T::StartConference).unwrap();
        m.fire(T::OpeningComplete).unwrap();
        let outcome = m.fire(T::SpeakerIntroduced).unwrap();
        assert_eq!(outcome.phase, P::SpeakerActive);
        assert_eq!(outcome.effects, vec![Effect::StartSessionTimer]);
    }

    #[test]
    fn router_sends_break_sessions_to_break_announcement() {
        let mut m = machine_at_speaker_active();
        m.fire(T::SpeakerFinished).unwrap();
        let outcome = m.fire(T::ThankComplete).unwrap();
        assert_eq!(outcome.phase, P::BreakAnnouncement);
        assert_eq!(m.context().session_index, 2);
    }

    #[test]
    fn router_sends_exhausted_catalog_to_closing() {
        let short = Arc::new(agenda(vec![session("solo", SessionType::Talk, 60, None)]));
        let mut m = ConferenceMachine::new(short);
        m.context.phase = P::ThankingSpeaker;
        let outcome = m.fire(T::ThankComplete).unwrap();
        assert_eq!(outcome.phase, P::Closing);
        // No next entry: the index must not move past the catalog.
        assert_eq!(m.context().session_index, 0);
    }

    #[test]
    fn router_sends_closing_session_to_closing() {
        let two = Arc::new(agenda(vec![
            session("talk", SessionType::Talk, 60, None),
            session("closing", SessionType::Closing, 60, None),
        ]));
        let mut m = ConferenceMachine::new(two);
        m.context.phase = P::ThankingSpeaker;
        let outcome = m.fire(T::ThankComplete).unwrap();
        assert_eq!(outcome.phase, P::Closing);
        assert_eq!(m.context().session_index, 1);
    }

    #[test]
    fn session_index_advances_only_at_router_lookahead() {
        let mut m = machine();
        m.fire(T::StartConference).unwrap();
        assert_eq!(m.context().session_index, 0);
        m.fire(T::OpeningComplete).unwrap();
        // Advanced during router resolution, before IntroducingSpeaker entry.
        assert_eq!(m.context().session_index, 1);
        m.fire(T::SpeakerIntroduced).unwrap();
        assert_eq!(m.context().session_index, 1);
    }

    #[test]
    fn operator_next_reaches_transitioning_from_all_five_sources() {
        // Each source phase resolves through the router to a data-driven
        // destination; from the keynote the next entry is a break.
        for (setup, expected_index) in [(P::Opening, 1), (P::SpeakerActive, 2)] {
            let mut m = machine();
            m.fire(T::StartConference).unwrap();
            if setup == P::SpeakerActive {
                m.fire(T::OpeningComplete).unwrap();
                m.fire(T::SpeakerIntroduced).unwrap();
            }
            assert_eq!(m.phase(), setup);
            let outcome = m.fire(T::OperatorNext).unwrap();
            assert_ne!(outcome.phase, P::Transitioning);
            assert_eq!(m.context().session_index, expected_index);
        }

        for source in [P::Interacting, P::TimeWarning, P::BreakActive] {
            let mut m = machine_at_speaker_active();
            match source {
                P::Interacting => {
                    m.fire(T::EnterInteraction).unwrap();
                }
                P::TimeWarning => {
                    m.fire(T::TimeWarning).unwrap();
                }
                P::BreakActive => {
                    m.fire(T::SpeakerFinished).unwrap();
                    m.fire(T::ThankComplete).unwrap();
                    m.fire(T::BreakAnnounced).unwrap();
                }
                _ => unreachable!(),
            }
            assert_eq!(m.phase(), source);
            let outcome = m.fire(T::OperatorNext).unwrap();
            assert_ne!(outcome.phase, P::Transitioning);
            assert!(outcome.effects.contains(&Effect::StopSessionTimer));
        }
    }

    #[test]
    fn absent_pairs_leave_context_unchanged() {
        let mut m = machine_at_speaker_active();
        let before = m.context().clone();
        let err = m.fire(T::ClosingComplete).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                trigger: T::ClosingComplete,
                phase: P::SpeakerActive,
            }
        );
        assert_eq!(m.phase(), before.phase);
        assert_eq!(m.context().session_index, before.session_index);
        assert_eq!(m.context().generation, before.generation);
    }

    #[test]
    fn failing_guard_behaves_like_no_match() {
        let mut m = machine_at_speaker_active();
        m.mark_warning_issued();
        let err = m.fire(T::TimeWarning).unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
        assert_eq!(m.phase(), P::SpeakerActive);
    }

    #[test]
    fn every_trigger_after_ended_is_rejected() {
        let short = Arc::new(agenda(vec![session("solo", SessionType::Opening, 60, None)]));
        let mut m = ConferenceMachine::new(short);
        m.fire(T::StartConference).unwrap();
        m.fire(T::OpeningComplete).unwrap();
        assert_eq!(m.phase(), P::Closing);
        let outcome = m.fire(T::ClosingComplete).unwrap();
        assert_eq!(outcome.phase, P::Ended);
        assert!(outcome.effects.contains(&Effect::AnnounceEnded));

        for trigger in Trigger::ALL {
            assert_eq!(m.fire(trigger), Err(TransitionError::ConferenceEnded));
        }
        assert_eq!(
            m.toggle_interacting(),
            Err(TransitionError::ConferenceEnded)
        );
    }

    #[test]
    fn toggle_interacting_flips_flag_without_phase_change() {
        let mut m = machine_at_speaker_active();
        assert!(m.toggle_interacting().unwrap());
        assert_eq!(m.phase(), P::SpeakerActive);
        assert!(!m.toggle_interacting().unwrap());
        assert_eq!(m.phase(), P::SpeakerActive);
    }

    #[test]
    fn toggle_interacting_rejected_outside_stage_phases() {
        let mut m = machine();
        let err = m.toggle_interacting().unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn generations_increase_per_accepted_trigger() {
        let mut m = machine();
        let first = m.fire(T::StartConference).unwrap();
        // Router resolution is one logical step: a single generation even
        // though two table rows were applied.
        let second = m.fire(T::OpeningComplete).unwrap();
        assert_eq!(first.generation, 1);
        assert_eq!(second.generation, 2);
        // Rejected triggers leave the counter alone.
        let _ = m.fire(T::BreakOver);
        assert_eq!(m.context().generation, 2);
    }

    #[test]
    fn break_flow_round_trip() {
        let mut m = machine_at_speaker_active();
        m.fire(T::SpeakerFinished).unwrap();
        m.fire(T::ThankComplete).unwrap();
        assert_eq!(m.phase(), P::BreakAnnouncement);
        m.fire(T::BreakAnnounced).unwrap();
        assert_eq!(m.phase(), P::BreakActive);
        m.fire(T::BreakEndingSoon).unwrap();
        assert_eq!(m.phase(), P::BreakEnding);
        let outcome = m.fire(T::BreakOver).unwrap();
        // Next entry after the break is a talk.
        assert_eq!(outcome.phase, P::IntroducingSpeaker);
        assert_eq!(m.context().session_index, 3);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_phase() -> impl Strategy<Value = ConferencePhase> {
            prop::sample::select(ConferencePhase::ALL.to_vec())
        }

        fn arb_trigger() -> impl Strategy<Value = Trigger> {
            prop::sample::select(Trigger::ALL.to_vec())
        }

        fn has_row(phase: ConferencePhase, trigger: Trigger) -> bool {
            TABLE
                .iter()
                .any(|row| row.trigger == trigger && row.sources.contains(&phase))
        }

        proptest! {
            /// For every (phase, trigger) pair absent from the table, fire
            /// leaves the context untouched and reports InvalidTransition.
            #[test]
            fn absent_pairs_never_mutate(phase in arb_phase(), trigger in arb_trigger()) {
                prop_assume!(phase != ConferencePhase::Ended);
                prop_assume!(!has_row(phase, trigger));

                let mut m = ConferenceMachine::new(standard_agenda());
                m.context.phase = phase;
                m.context.session_index = 1;
                let generation_before = m.context.generation;

                let result = m.fire(trigger);
                prop_assert_eq!(
                    result,
                    Err(TransitionError::InvalidTransition { trigger, phase })
                );
                prop_assert_eq!(m.phase(), phase);
                prop_assert_eq!(m.context().session_index, 1);
                prop_assert_eq!(m.context().generation, generation_before);
            }

            /// Accepted triggers never leave the machine parked in the
            /// router phase.
            #[test]
            fn transitioning_never_settles(phase in arb_phase(), trigger in arb_trigger()) {
                prop_assume!(phase != ConferencePhase::Ended);
                prop_assume!(phase != ConferencePhase::Transitioning);

                let mut m = ConferenceMachine::new(standard_agenda());
                m.context.phase = phase;
                m.context.session_index = 1;
                if let Ok(outcome) = m.fire(trigger) {
                    prop_assert_ne!(outcome.phase, ConferencePhase::Transitioning);
                }
            }
        }
    }
}
