//! Mock implementations for testing.
//!
//! These mocks let the executor run without a voice agent or token service.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{AgentLink, IssuedToken, PromptBuilder, TokenIssuer};
use crate::error::{SendError, TokenError};
use crate::state_machine::{ConferenceContext, ConferencePhase};
use crate::tools::ToolDefinition;

/// Everything a mock link has been asked to send, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SentFrame {
    Tools(Vec<String>),
    Instructions(String),
    Speech(String),
    ToolResult { id: String, result: Value },
}

/// Agent link that records every frame. Clones share the same record, so a
/// clone handed to the runtime stays observable from the test.
#[derive(Default, Clone)]
pub struct MockAgentLink {
    sent: Arc<Mutex<Vec<SentFrame>>>,
    fail_sends: Arc<Mutex<bool>>,
}

impl MockAgentLink {
    pub fn sent(&self) -> Vec<SentFrame> {
        self.sent.lock().unwrap().clone()
    }

    /// Make every subsequent send fail, simulating a dropped agent.
    pub fn fail_sends(&self) {
        *self.fail_sends.lock().unwrap() = true;
    }

    fn record(&self, frame: SentFrame) -> Result<(), SendError> {
        if *self.fail_sends.lock().unwrap() {
            return Err(SendError::new("mock link is down"));
        }
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }
}

#[async_trait]
impl AgentLink for MockAgentLink {
    async fn register_tools(&self, tools: &[ToolDefinition]) -> Result<(), SendError> {
        self.record(SentFrame::Tools(
            tools.iter().map(|t| t.name.to_string()).collect(),
        ))
    }

    async fn update_instructions(&self, instructions: &str) -> Result<(), SendError> {
        self.record(SentFrame::Instructions(instructions.to_string()))
    }

    async fn trigger_speech(&self, cue: &str) -> Result<(), SendError> {
        self.record(SentFrame::Speech(cue.to_string()))
    }

    async fn send_tool_result(&self, id: &str, result: &Value) -> Result<(), SendError> {
        self.record(SentFrame::ToolResult {
            id: id.to_string(),
            result: result.clone(),
        })
    }
}

/// Deterministic prompt builder: output encodes the phase so tests can read
/// state off the frames.
pub struct MockPromptBuilder;

impl PromptBuilder for MockPromptBuilder {
    fn instructions(&self, context: &ConferenceContext) -> String {
        format!(
            "instructions:{}:{}",
            context.phase,
            if context.interacting { "on" } else { "off" }
        )
    }

    fn cue(&self, _context: &ConferenceContext, phase: ConferencePhase) -> String {
        format!("cue:{phase}")
    }
}

/// Token issuer with queued responses; defaults to an endless supply of
/// `mock-token`.
#[derive(Default)]
pub struct MockTokenIssuer {
    responses: Mutex<VecDeque<Result<IssuedToken, TokenError>>>,
}

impl MockTokenIssuer {
    pub fn queue(&self, response: Result<IssuedToken, TokenError>) {
        self.responses.lock().unwrap().push_back(response);
    }
}

#[async_trait]
impl TokenIssuer for MockTokenIssuer {
    async fn issue(&self) -> Result<IssuedToken, TokenError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(IssuedToken {
                    token: "mock-token".to_string(),
                    expires_at: None,
                })
            })
    }
}
