//! Sideband channel to the realtime voice agent.
//!
//! The orchestrator never speaks the agent's realtime audio protocol. It
//! emits control frames (instructions, speech cues, tool results) over a
//! bounded channel; a transport task drains the channel onto whatever wire
//! the deployment uses. Token minting for the agent session goes through a
//! separate HTTP service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::error::{SendError, TokenError};
use crate::runtime::{AgentLink, IssuedToken, TokenIssuer};
use crate::tools::ToolDefinition;

/// Control frames sent toward the voice agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SidebandFrame {
    RegisterTools { tools: Value },
    UpdateInstructions { instructions: String },
    TriggerSpeech { cue: String },
    ToolResult { id: String, result: Value },
}

/// Channel-backed [`AgentLink`]. The receiving half belongs to the
/// transport; a closed receiver surfaces as [`SendError`] so the runtime
/// can report a broken agent connection instead of silently dropping cues.
///
/// Sends never block: the runtime's effect execution sits upstream of the
/// conference mailbox, so waiting on a full channel here would stall every
/// other trigger source. A full backlog (no transport attached yet, or one
/// that stopped draining) is an error the caller reports.
#[derive(Clone)]
pub struct SidebandLink {
    tx: mpsc::Sender<SidebandFrame>,
}

impl SidebandLink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SidebandFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    fn send(&self, frame: SidebandFrame) -> Result<(), SendError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                SendError::new("agent sideband backlog is full")
            }
            mpsc::error::TrySendError::Closed(_) => {
                SendError::new("agent sideband is disconnected")
            }
        })
    }
}

#[async_trait]
impl AgentLink for SidebandLink {
    async fn register_tools(&self, tools: &[ToolDefinition]) -> Result<(), SendError> {
        let tools = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.input_schema,
                })
            })
            .collect::<Vec<_>>();
        self.send(SidebandFrame::RegisterTools {
            tools: Value::Array(tools),
        })
    }

    async fn update_instructions(&self, instructions: &str) -> Result<(), SendError> {
        self.send(SidebandFrame::UpdateInstructions {
            instructions: instructions.to_string(),
        })
    }

    async fn trigger_speech(&self, cue: &str) -> Result<(), SendError> {
        self.send(SidebandFrame::TriggerSpeech {
            cue: cue.to_string(),
        })
    }

    async fn send_tool_result(&self, id: &str, result: &Value) -> Result<(), SendError> {
        self.send(SidebandFrame::ToolResult {
            id: id.to_string(),
            result: result.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(default)]
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Mints agent session tokens from the configured HTTP service. Deployments
/// without a token service get [`TokenError::Disabled`] at request time
/// rather than a startup failure.
pub struct HttpTokenIssuer {
    client: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl HttpTokenIssuer {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: settings.token_endpoint.clone(),
            api_key: settings.token_api_key.clone(),
        }
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn issue(&self) -> Result<IssuedToken, TokenError> {
        let endpoint = self.endpoint.as_ref().ok_or(TokenError::Disabled)?;

        let mut request = self.client.post(endpoint);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::Malformed(e.to_string()))?;

        if body.token.is_empty() {
            return Err(TokenError::Malformed("empty token".to_string()));
        }
        Ok(IssuedToken {
            token: body.token,
            expires_at: body.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn frames_arrive_in_send_order() {
        let (link, mut rx) = SidebandLink::channel(8);
        link.update_instructions("be brief").await.unwrap();
        link.trigger_speech("welcome everyone").await.unwrap();
        link.send_tool_result("call-1", &json!({"ok": true}))
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            SidebandFrame::UpdateInstructions {
                instructions: "be brief".to_string()
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            SidebandFrame::TriggerSpeech {
                cue: "welcome everyone".to_string()
            }
        );
        match rx.recv().await.unwrap() {
            SidebandFrame::ToolResult { id, result } => {
                assert_eq!(id, "call-1");
                assert_eq!(result["ok"], true);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn disconnected_transport_surfaces_as_send_error() {
        let (link, rx) = SidebandLink::channel(1);
        drop(rx);
        assert!(link.trigger_speech("hello").await.is_err());
    }

    #[tokio::test]
    async fn full_backlog_errors_instead_of_blocking() {
        // Receiver alive but nobody draining, as before a transport attaches.
        let (link, _rx) = SidebandLink::channel(1);
        link.trigger_speech("first").await.unwrap();
        let err = link.trigger_speech("second").await.unwrap_err();
        assert!(err.to_string().contains("backlog"));
    }

    #[tokio::test]
    async fn register_tools_serializes_definitions() {
        let (link, mut rx) = SidebandLink::channel(1);
        link.register_tools(&crate::tools::definitions())
            .await
            .unwrap();
        match rx.recv().await.unwrap() {
            SidebandFrame::RegisterTools { tools } => {
                let names: Vec<_> = tools
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|t| t["name"].as_str().unwrap().to_string())
                    .collect();
                assert!(names.contains(&"advance_to_next_session".to_string()));
                assert_eq!(names.len(), 4);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn unconfigured_issuer_reports_disabled() {
        let issuer = HttpTokenIssuer::from_settings(&Settings::default());
        assert!(matches!(issuer.issue().await, Err(TokenError::Disabled)));
    }

    #[test]
    fn frames_serialize_with_a_kind_tag() {
        let frame = SidebandFrame::TriggerSpeech {
            cue: "wrap up".to_string(),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["kind"], "trigger_speech");
        assert_eq!(value["cue"], "wrap up");
    }
}
