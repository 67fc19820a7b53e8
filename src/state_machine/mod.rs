//! Conference state machine
//!
//! A declarative transition table executed by a single owner of the run
//! context; transitions return side-effect descriptors for the runtime.

mod context;
mod effect;
mod phase;
mod transition;
mod trigger;

pub use context::ConferenceContext;
pub use effect::Effect;
pub use phase::ConferencePhase;
pub use transition::{ConferenceMachine, FireOutcome};
pub use trigger::Trigger;
