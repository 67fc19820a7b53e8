//! WebSocket handlers for the operator console and the agent sideband.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::types::{ClientMessage, ServerMessage};
use super::AppState;
use crate::agenda::Agenda;
use crate::bridge::AgentSignal;
use crate::error::CommandError;
use crate::runtime::{ConferenceEvent, OperatorCommand, RuntimeEvent};

type WsSink = SplitSink<WebSocket, Message>;

pub async fn operator_ws(
    State(state): State<AppState>,
    Path(conference_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_operator(socket, state, conference_id))
}

async fn handle_operator(socket: WebSocket, state: AppState, conference_id: String) {
    let connection_id = uuid::Uuid::new_v4();
    tracing::info!(conference_id = %conference_id, %connection_id, "Operator connected");
    let (mut sink, mut stream) = socket.split();

    // Subscription exists only once an agenda has been loaded; the first
    // operator connects to an empty slot and subscribes on LOAD_AGENDA.
    let mut events = state.runtime.subscribe(&conference_id).await.ok();

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let Some(Ok(message)) = incoming else { break };
                let Message::Text(text) = message else { continue };
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => {
                        if let Err(e) =
                            handle_client_message(&state, &conference_id, msg, &mut events, &mut sink)
                                .await
                        {
                            let _ = send_message(
                                &mut sink,
                                &ServerMessage::Error { message: e.to_string() },
                            )
                            .await;
                        }
                    }
                    Err(e) => {
                        let _ = send_message(
                            &mut sink,
                            &ServerMessage::Error {
                                message: format!("malformed message: {e}"),
                            },
                        )
                        .await;
                    }
                }
            }
            event = next_event(&mut events) => {
                match event {
                    Some(event) => {
                        if send_message(&mut sink, &ServerMessage::from(event)).await.is_err() {
                            break;
                        }
                    }
                    // Runtime gone (agenda replaced or torn down); stop
                    // polling the dead channel but keep serving commands.
                    None => events = None,
                }
            }
        }
    }

    tracing::info!(conference_id = %conference_id, %connection_id, "Operator disconnected");
}

async fn handle_client_message(
    state: &AppState,
    conference_id: &str,
    message: ClientMessage,
    events: &mut Option<broadcast::Receiver<ConferenceEvent>>,
    sink: &mut WsSink,
) -> Result<(), CommandError> {
    let command = match message {
        ClientMessage::LoadAgenda { agenda } => {
            let agenda = Agenda::from_value(agenda)?;
            let summary = agenda.summary();
            let handle = state.runtime.load_agenda(conference_id, agenda).await?;
            *events = Some(handle.broadcast_tx.subscribe());
            let _ = send_message(sink, &ServerMessage::AgendaLoaded { summary }).await;
            return Ok(());
        }
        ClientMessage::RequestToken => OperatorCommand::RequestToken,
        ClientMessage::StartConference => OperatorCommand::StartConference,
        ClientMessage::SidebandConnect => OperatorCommand::SidebandConnect,
        ClientMessage::Pause => OperatorCommand::Pause,
        ClientMessage::Resume => OperatorCommand::Resume,
        ClientMessage::NextSession => OperatorCommand::NextSession,
        ClientMessage::ToggleInteract => OperatorCommand::ToggleInteract,
        ClientMessage::OverrideMessage { text } => OperatorCommand::OverrideMessage { text },
    };
    state
        .runtime
        .send_event(conference_id, RuntimeEvent::Command(command))
        .await
}

/// Next broadcast event, skipping over lag gaps. Pends forever when no
/// subscription exists so the select loop stays quiet.
async fn next_event(
    events: &mut Option<broadcast::Receiver<ConferenceEvent>>,
) -> Option<ConferenceEvent> {
    match events {
        Some(rx) => loop {
            match rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Operator stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        },
        None => std::future::pending().await,
    }
}

async fn send_message(sink: &mut WsSink, message: &ServerMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(message) {
        Ok(text) => sink.send(Message::Text(text)).await,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize server message");
            Ok(())
        }
    }
}

pub async fn sideband_ws(
    State(state): State<AppState>,
    Path(conference_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_sideband(socket, state, conference_id))
}

/// Bridges the agent transport: outbound control frames from the runtime,
/// inbound [`AgentSignal`]s into its mailbox. Exactly one transport may hold
/// the frame receiver at a time; it is returned on disconnect so the agent
/// can reconnect.
async fn handle_sideband(socket: WebSocket, state: AppState, conference_id: String) {
    let Some(handle) = state.runtime.get(&conference_id).await else {
        tracing::warn!(conference_id = %conference_id, "Sideband for unknown conference");
        return;
    };
    let Some(mut frames) = handle.sideband_rx.lock().await.take() else {
        tracing::warn!(conference_id = %conference_id, "Sideband already attached");
        return;
    };
    tracing::info!(conference_id = %conference_id, "Agent sideband connected");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                match serde_json::to_string(&frame) {
                    Ok(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to serialize sideband frame"),
                }
            }
            incoming = stream.next() => {
                let Some(Ok(message)) = incoming else { break };
                let Message::Text(text) = message else { continue };
                match serde_json::from_str::<AgentSignal>(&text) {
                    Ok(signal) => {
                        if handle
                            .event_tx
                            .send(RuntimeEvent::Agent(signal))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            conference_id = %conference_id,
                            error = %e,
                            "Malformed agent signal"
                        );
                    }
                }
            }
        }
    }

    *handle.sideband_rx.lock().await = Some(frames);
    tracing::info!(conference_id = %conference_id, "Agent sideband disconnected");
}
