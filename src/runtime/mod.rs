//! Per-conference runtime.
//!
//! Every conference gets one executor task owning its state machine and
//! timer. All inputs (operator commands, agent signals, timer events) funnel
//! through a single mailbox, so triggers are applied strictly one at a time
//! in arrival order. Observers subscribe to a broadcast channel of
//! [`ConferenceEvent`]s.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ConferenceRuntime;
pub use traits::*;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};

use crate::agenda::Agenda;
use crate::bridge::AgentSignal;
use crate::config::Settings;
use crate::error::{CommandError, SendError};
use crate::sideband::{HttpTokenIssuer, SidebandFrame, SidebandLink};
use crate::state_machine::ConferenceContext;
use crate::timer::{TimerReading, TimerSignal};

/// Production runtime with concrete collaborators.
pub type ProductionRuntime =
    ConferenceRuntime<SidebandLink, ModeratorPromptBuilder, HttpTokenIssuer>;

/// Commands from the operator console.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    StartConference,
    Pause,
    Resume,
    NextSession,
    ToggleInteract,
    OverrideMessage { text: String },
    RequestToken,
    SidebandConnect,
}

/// Everything the executor mailbox can receive.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    Command(OperatorCommand),
    Agent(AgentSignal),
    Timer(TimerSignal),
}

impl From<TimerSignal> for RuntimeEvent {
    fn from(signal: TimerSignal) -> Self {
        Self::Timer(signal)
    }
}

/// Events pushed to operator clients.
#[derive(Debug, Clone)]
pub enum ConferenceEvent {
    AgendaLoaded {
        summary: Value,
    },
    TokenReady {
        token: String,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    },
    StateUpdate {
        snapshot: StateSnapshot,
    },
    TimerTick {
        reading: TimerReading,
    },
    ModeratorStatus {
        vocalizing: bool,
    },
    Transcript {
        text: String,
        is_final: bool,
    },
    Error {
        message: String,
    },
    ConferenceEnded,
}

/// Serializable view of the conference state after a transition.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub phase: crate::state_machine::ConferencePhase,
    pub session_index: usize,
    pub session_id: Option<String>,
    pub session_title: Option<String>,
    pub interacting: bool,
    pub is_paused: bool,
    pub warning_issued: bool,
    pub generation: u64,
    pub timer: Option<TimerReading>,
}

impl StateSnapshot {
    pub fn capture(context: &ConferenceContext, reading: Option<TimerReading>) -> Self {
        let session = context.current_session();
        Self {
            phase: context.phase,
            session_index: context.session_index,
            session_id: session.map(|s| s.id.clone()),
            session_title: session.map(|s| s.title.clone()),
            interacting: context.interacting,
            is_paused: context.is_paused,
            warning_issued: context.warning_issued,
            generation: context.generation,
            timer: reading,
        }
    }
}

/// Handle for interacting with a running conference.
#[derive(Clone)]
pub struct ConferenceHandle {
    pub event_tx: mpsc::Sender<RuntimeEvent>,
    pub broadcast_tx: broadcast::Sender<ConferenceEvent>,
    /// Receiving half of the agent sideband, claimed once by the transport.
    pub sideband_rx: Arc<Mutex<Option<mpsc::Receiver<SidebandFrame>>>>,
}

/// Owns every live conference runtime, keyed by conference id.
pub struct RuntimeManager {
    settings: Settings,
    runtimes: RwLock<HashMap<String, ConferenceHandle>>,
}

impl RuntimeManager {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    /// Create (or replace) the runtime for a conference from a validated
    /// agenda. Replacing drops the previous runtime's mailbox sender, which
    /// stops its executor task.
    pub async fn load_agenda(
        &self,
        conference_id: &str,
        agenda: Agenda,
    ) -> Result<ConferenceHandle, CommandError> {
        let agenda = Arc::new(agenda);
        let summary = agenda.summary();

        let (event_tx, event_rx) = mpsc::channel(64);
        let (broadcast_tx, _) = broadcast::channel(256);
        let (link, sideband_rx) = SidebandLink::channel(64);

        let runtime: ProductionRuntime = ConferenceRuntime::new(
            conference_id.to_string(),
            agenda,
            link,
            ModeratorPromptBuilder,
            HttpTokenIssuer::from_settings(&self.settings),
            self.settings.timer_config(),
            event_rx,
            event_tx.clone(),
            broadcast_tx.clone(),
        );

        let id = conference_id.to_string();
        tokio::spawn(async move {
            runtime.run().await;
            tracing::info!(conference_id = %id, "Conference runtime finished");
        });

        let handle = ConferenceHandle {
            event_tx,
            broadcast_tx,
            sideband_rx: Arc::new(Mutex::new(Some(sideband_rx))),
        };
        self.runtimes
            .write()
            .await
            .insert(conference_id.to_string(), handle.clone());

        let _ = handle
            .broadcast_tx
            .send(ConferenceEvent::AgendaLoaded { summary });
        Ok(handle)
    }

    pub async fn get(&self, conference_id: &str) -> Option<ConferenceHandle> {
        self.runtimes.read().await.get(conference_id).cloned()
    }

    /// Deliver an event to a conference's mailbox.
    pub async fn send_event(
        &self,
        conference_id: &str,
        event: RuntimeEvent,
    ) -> Result<(), CommandError> {
        let handle = self
            .get(conference_id)
            .await
            .ok_or(CommandError::NoAgenda)?;
        handle
            .event_tx
            .send(event)
            .await
            .map_err(|e| CommandError::Send(SendError::new(e.to_string())))
    }

    /// Subscribe to a conference's event stream.
    pub async fn subscribe(
        &self,
        conference_id: &str,
    ) -> Result<broadcast::Receiver<ConferenceEvent>, CommandError> {
        let handle = self
            .get(conference_id)
            .await
            .ok_or(CommandError::NoAgenda)?;
        Ok(handle.broadcast_tx.subscribe())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
