//! Mutable run state of a single conference.

use crate::agenda::{Agenda, SessionDescriptor};
use crate::state_machine::ConferencePhase;
use std::sync::Arc;

/// Run state owned and mutated exclusively by the transition executor.
///
/// Everything else observes it through snapshots; the session catalog itself
/// is shared read-only.
#[derive(Debug, Clone)]
pub struct ConferenceContext {
    pub phase: ConferencePhase,
    pub agenda: Arc<Agenda>,
    /// Index into the catalog. Valid whenever `phase.is_active()`.
    pub session_index: usize,
    pub is_paused: bool,
    /// Interaction mode: the agent may converse with the speaker. Flipped by
    /// the operator's toggle command; never changes the phase.
    pub interacting: bool,
    /// Elapsed seconds in the current session, as last reported by the timer.
    pub elapsed_seconds: f64,
    /// Set once the warning threshold crossing has been delivered.
    pub warning_issued: bool,
    /// Monotonically increasing counter assigned to every accepted trigger.
    pub generation: u64,
}

impl ConferenceContext {
    pub fn new(agenda: Arc<Agenda>) -> Self {
        Self {
            phase: ConferencePhase::Idle,
            agenda,
            session_index: 0,
            is_paused: false,
            interacting: false,
            elapsed_seconds: 0.0,
            warning_issued: false,
            generation: 0,
        }
    }

    pub fn current_session(&self) -> Option<&SessionDescriptor> {
        self.agenda.session(self.session_index)
    }

    pub fn next_session(&self) -> Option<&SessionDescriptor> {
        self.agenda.session(self.session_index + 1)
    }

    /// Seconds left in the current session per the last timer report.
    #[allow(clippy::cast_precision_loss)]
    pub fn remaining_seconds(&self) -> Option<f64> {
        self.current_session()
            .map(|s| (s.duration_secs as f64 - self.elapsed_seconds).max(0.0))
    }

    /// Reset per-session bookkeeping when the index moves to a new session.
    pub(super) fn begin_session(&mut self, index: usize) {
        self.session_index = index;
        self.elapsed_seconds = 0.0;
        self.warning_issued = false;
    }
}
