//! Conference runtime executor.
//!
//! Single consumer of the conference mailbox. Applying a trigger, running
//! its effects, and broadcasting the resulting snapshot happen before the
//! next event is read, so observers always see transitions in order.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{broadcast, mpsc};

use super::{
    AgentLink, ConferenceEvent, OperatorCommand, PromptBuilder, RuntimeEvent, StateSnapshot,
    TokenIssuer,
};
use crate::agenda::Agenda;
use crate::bridge::{self, AgentSignal};
use crate::error::{CommandError, TransitionError};
use crate::state_machine::{ConferenceMachine, ConferencePhase, Effect, FireOutcome, Trigger};
use crate::timer::{SessionTimer, TimerConfig, TimerSignal};
use crate::tools::{self, ToolCall};

/// Generic conference runtime, parameterized over its collaborators so
/// tests can substitute mocks for all I/O.
pub struct ConferenceRuntime<L, P, K>
where
    L: AgentLink + 'static,
    P: PromptBuilder + 'static,
    K: TokenIssuer + 'static,
{
    conference_id: String,
    machine: ConferenceMachine,
    timer: SessionTimer,
    link: Arc<L>,
    prompts: Arc<P>,
    tokens: Arc<K>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    event_tx: mpsc::Sender<RuntimeEvent>,
    broadcast_tx: broadcast::Sender<ConferenceEvent>,
}

impl<L, P, K> ConferenceRuntime<L, P, K>
where
    L: AgentLink + 'static,
    P: PromptBuilder + 'static,
    K: TokenIssuer + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conference_id: String,
        agenda: Arc<Agenda>,
        link: L,
        prompts: P,
        tokens: K,
        timer_config: TimerConfig,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        event_tx: mpsc::Sender<RuntimeEvent>,
        broadcast_tx: broadcast::Sender<ConferenceEvent>,
    ) -> Self {
        Self {
            conference_id,
            machine: ConferenceMachine::new(agenda),
            timer: SessionTimer::new(timer_config),
            link: Arc::new(link),
            prompts: Arc::new(prompts),
            tokens: Arc::new(tokens),
            event_rx,
            event_tx,
            broadcast_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(conference_id = %self.conference_id, "Starting conference runtime");

        while let Some(event) = self.event_rx.recv().await {
            if let Err(e) = self.process_event(event).await {
                tracing::warn!(
                    conference_id = %self.conference_id,
                    error = %e,
                    "Rejected conference event"
                );
                let _ = self.broadcast_tx.send(ConferenceEvent::Error {
                    message: e.to_string(),
                });
            }
        }

        self.timer.stop();
        tracing::info!(conference_id = %self.conference_id, "Conference runtime stopped");
    }

    async fn process_event(&mut self, event: RuntimeEvent) -> Result<(), CommandError> {
        match event {
            RuntimeEvent::Command(command) => self.handle_command(command).await,
            RuntimeEvent::Agent(signal) => {
                self.handle_agent_signal(signal).await;
                Ok(())
            }
            RuntimeEvent::Timer(signal) => {
                self.handle_timer_signal(signal).await;
                Ok(())
            }
        }
    }

    async fn handle_command(&mut self, command: OperatorCommand) -> Result<(), CommandError> {
        tracing::debug!(conference_id = %self.conference_id, ?command, "Operator command");
        // The machine rejects triggers after Ended on its own; commands that
        // bypass it (pause, override, token) must hit the same wall.
        if self.machine.phase() == ConferencePhase::Ended {
            return Err(TransitionError::ConferenceEnded.into());
        }
        match command {
            OperatorCommand::StartConference => {
                self.apply_trigger(Trigger::StartConference).await?;
            }
            OperatorCommand::Pause => {
                self.machine.set_paused(true);
                self.timer.pause();
                self.broadcast_state();
            }
            OperatorCommand::Resume => {
                self.machine.set_paused(false);
                self.timer.resume();
                self.broadcast_state();
            }
            OperatorCommand::NextSession => {
                self.apply_trigger(Trigger::OperatorNext).await?;
            }
            OperatorCommand::ToggleInteract => {
                self.machine.toggle_interacting()?;
                self.broadcast_state();
                self.refresh_instructions().await;
            }
            OperatorCommand::OverrideMessage { text } => {
                self.link.trigger_speech(&text).await?;
            }
            OperatorCommand::RequestToken => match self.tokens.issue().await {
                Ok(issued) => {
                    let _ = self.broadcast_tx.send(ConferenceEvent::TokenReady {
                        token: issued.token,
                        expires_at: issued.expires_at,
                    });
                }
                Err(e) => {
                    let _ = self.broadcast_tx.send(ConferenceEvent::Error {
                        message: e.to_string(),
                    });
                }
            },
            OperatorCommand::SidebandConnect => {
                self.link.register_tools(&tools::definitions()).await?;
                self.link
                    .update_instructions(&self.prompts.instructions(self.machine.context()))
                    .await?;
            }
        }
        Ok(())
    }

    async fn handle_agent_signal(&mut self, signal: AgentSignal) {
        match signal {
            AgentSignal::TurnComplete => {
                let phase = self.machine.phase();
                match bridge::trigger_for_turn_complete(phase) {
                    Some(trigger) => {
                        if let Err(e) = self.apply_trigger(trigger).await {
                            tracing::warn!(
                                conference_id = %self.conference_id,
                                %trigger, error = %e,
                                "Turn completion did not advance"
                            );
                        }
                    }
                    None => {
                        tracing::debug!(
                            conference_id = %self.conference_id,
                            %phase,
                            "Turn completion absorbed"
                        );
                    }
                }
            }
            AgentSignal::SpeechStarted => {
                let _ = self
                    .broadcast_tx
                    .send(ConferenceEvent::ModeratorStatus { vocalizing: true });
            }
            AgentSignal::SpeechStopped => {
                let _ = self
                    .broadcast_tx
                    .send(ConferenceEvent::ModeratorStatus { vocalizing: false });
            }
            AgentSignal::Transcript { text, is_final } => {
                let _ = self
                    .broadcast_tx
                    .send(ConferenceEvent::Transcript { text, is_final });
            }
            AgentSignal::ToolInvocation { id, name, args } => {
                self.handle_tool_invocation(&id, &name, args).await;
            }
        }
    }

    async fn handle_tool_invocation(&mut self, id: &str, name: &str, args: serde_json::Value) {
        let call = match ToolCall::from_name_and_args(name, args) {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(
                    conference_id = %self.conference_id,
                    tool = name, error = %e,
                    "Rejected tool invocation"
                );
                let result = json!({"error": e.to_string()});
                if let Err(send) = self.link.send_tool_result(id, &result).await {
                    self.report_send_failure(&send.to_string());
                }
                return;
            }
        };

        let outcome = tools::dispatch(&call, self.machine.context());
        tracing::debug!(
            conference_id = %self.conference_id,
            tool = call.name(),
            "Tool dispatched"
        );
        if let Err(send) = self.link.send_tool_result(id, &outcome.result).await {
            self.report_send_failure(&send.to_string());
        }

        if let Some(trigger) = outcome.trigger {
            if let Err(e) = self.apply_trigger(trigger).await {
                let _ = self.broadcast_tx.send(ConferenceEvent::Error {
                    message: format!("tool {} rejected: {e}", call.name()),
                });
            }
        }
    }

    async fn handle_timer_signal(&mut self, signal: TimerSignal) {
        let reading = match signal {
            TimerSignal::Tick(r) | TimerSignal::Warning(r) | TimerSignal::Expired(r) => r,
        };
        self.machine.record_elapsed(reading.elapsed_secs);

        match signal {
            TimerSignal::Tick(reading) => {
                let _ = self
                    .broadcast_tx
                    .send(ConferenceEvent::TimerTick { reading });
            }
            TimerSignal::Warning(_) | TimerSignal::Expired(_) => {
                let phase = self.machine.phase();
                match bridge::trigger_for_timer_signal(&signal, phase) {
                    Some(trigger) => {
                        if let Err(e) = self.apply_trigger(trigger).await {
                            tracing::debug!(
                                conference_id = %self.conference_id,
                                %trigger, %phase, error = %e,
                                "Stale timer signal ignored"
                            );
                        }
                    }
                    None => {
                        tracing::debug!(
                            conference_id = %self.conference_id,
                            %phase,
                            "Timer signal has no meaning here"
                        );
                    }
                }
            }
        }
    }

    /// Fire a trigger and, if accepted, run its effects and publish the new
    /// state. A rejected trigger changes nothing.
    async fn apply_trigger(&mut self, trigger: Trigger) -> Result<(), TransitionError> {
        let outcome = self.machine.fire(trigger)?;
        if trigger == Trigger::TimeWarning {
            self.machine.mark_warning_issued();
        }
        tracing::info!(
            conference_id = %self.conference_id,
            %trigger,
            phase = %outcome.phase,
            generation = outcome.generation,
            "Transition"
        );
        self.run_effects(&outcome).await;
        self.broadcast_state();
        self.refresh_instructions().await;
        Ok(())
    }

    async fn run_effects(&mut self, outcome: &FireOutcome) {
        for effect in &outcome.effects {
            match effect {
                Effect::StartSessionTimer => {
                    let duration = self
                        .machine
                        .context()
                        .current_session()
                        .map(|s| Duration::from_secs(s.duration_secs));
                    if let Some(duration) = duration {
                        self.timer.start(duration, self.event_tx.clone());
                    } else {
                        tracing::warn!(
                            conference_id = %self.conference_id,
                            "No current session to time"
                        );
                    }
                }
                Effect::StopSessionTimer => self.timer.stop(),
                Effect::SpeakCue { phase } => {
                    let cue = self.prompts.cue(self.machine.context(), *phase);
                    if let Err(e) = self.link.trigger_speech(&cue).await {
                        self.report_send_failure(&e.to_string());
                    }
                }
                Effect::AnnounceEnded => {
                    self.timer.stop();
                    let _ = self.broadcast_tx.send(ConferenceEvent::ConferenceEnded);
                }
            }
        }
    }

    fn broadcast_state(&self) {
        let snapshot = StateSnapshot::capture(self.machine.context(), self.timer.reading());
        let _ = self
            .broadcast_tx
            .send(ConferenceEvent::StateUpdate { snapshot });
    }

    async fn refresh_instructions(&self) {
        let instructions = self.prompts.instructions(self.machine.context());
        if let Err(e) = self.link.update_instructions(&instructions).await {
            self.report_send_failure(&e.to_string());
        }
    }

    fn report_send_failure(&self, message: &str) {
        tracing::warn!(
            conference_id = %self.conference_id,
            error = message,
            "Agent link send failed"
        );
        let _ = self.broadcast_tx.send(ConferenceEvent::Error {
            message: message.to_string(),
        });
    }
}
