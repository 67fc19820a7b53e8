//! Tools callable by the voice agent.
//!
//! Four tools exist: advancing the agenda, reading the clock, reading the
//! agenda, and announcing a time warning. Calls arrive by name with JSON
//! arguments; parsing and dispatch are pure so every path is unit testable.
//! Applying the resulting trigger (and sending the result back over the
//! agent link) is the runtime's job.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::agenda::{SessionDescriptor, SessionQuery};
use crate::error::ToolError;
use crate::state_machine::{ConferenceContext, Trigger};

/// Why the agent is asking to advance the agenda.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceReason {
    SpeakerFinished,
    TimeExpired,
    OperatorSkip,
    BreakOver,
}

impl AdvanceReason {
    /// The trigger this reason fires. An early or operator-driven skip
    /// routes through the operator override; natural expiry and break end
    /// use their own triggers so the table's sources stay meaningful.
    pub fn trigger(self) -> Trigger {
        match self {
            Self::SpeakerFinished | Self::OperatorSkip => Trigger::OperatorNext,
            Self::TimeExpired => Trigger::SpeakerFinished,
            Self::BreakOver => Trigger::BreakOver,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AdvanceArgs {
    reason: AdvanceReason,
}

#[derive(Debug, Deserialize)]
struct SessionInfoArgs {
    #[serde(default)]
    which: SessionQuery,
}

#[derive(Debug, Deserialize)]
struct AnnounceWarningArgs {
    minutes_remaining: f64,
}

/// A validated tool call. Parsing rejects unknown names and malformed
/// arguments before anything touches conference state.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    AdvanceToNextSession { reason: AdvanceReason },
    CheckTimeRemaining,
    GetSessionInfo { which: SessionQuery },
    AnnounceTimeWarning { minutes_remaining: f64 },
}

impl ToolCall {
    pub fn from_name_and_args(name: &str, args: Value) -> Result<Self, ToolError> {
        match name {
            "advance_to_next_session" => {
                let args: AdvanceArgs = parse_args(args)?;
                Ok(Self::AdvanceToNextSession {
                    reason: args.reason,
                })
            }
            "check_time_remaining" => Ok(Self::CheckTimeRemaining),
            "get_session_info" => {
                let args: SessionInfoArgs = parse_args(args)?;
                Ok(Self::GetSessionInfo { which: args.which })
            }
            "announce_time_warning" => {
                let args: AnnounceWarningArgs = parse_args(args)?;
                Ok(Self::AnnounceTimeWarning {
                    minutes_remaining: args.minutes_remaining,
                })
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AdvanceToNextSession { .. } => "advance_to_next_session",
            Self::CheckTimeRemaining => "check_time_remaining",
            Self::GetSessionInfo { .. } => "get_session_info",
            Self::AnnounceTimeWarning { .. } => "announce_time_warning",
        }
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T, ToolError> {
    // Agents omit the argument object entirely when every field is optional.
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArgument(e.to_string()))
}

/// What a dispatched tool produced: a JSON result for the agent, and
/// possibly a trigger for the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub result: Value,
    pub trigger: Option<Trigger>,
}

/// Evaluate a tool call against the current conference state. Read-only;
/// the returned trigger is what would mutate state, and the caller decides
/// whether it lands.
pub fn dispatch(call: &ToolCall, context: &ConferenceContext) -> ToolOutcome {
    match call {
        ToolCall::AdvanceToNextSession { reason } => ToolOutcome {
            result: json!({
                "status": "advancing",
                "from_phase": context.phase.as_str(),
            }),
            trigger: Some(reason.trigger()),
        },
        ToolCall::CheckTimeRemaining => ToolOutcome {
            result: context
                .agenda
                .time_remaining(context)
                .unwrap_or_else(|| json!({"status": "no_active_session"})),
            trigger: None,
        },
        ToolCall::GetSessionInfo { which } => ToolOutcome {
            result: context
                .agenda
                .session_info(context, *which)
                .unwrap_or_else(|| json!({"exists": false})),
            trigger: None,
        },
        // Informational acknowledgement only; the timer owns the actual
        // warning transition.
        ToolCall::AnnounceTimeWarning { minutes_remaining } => {
            let speaker_name = context
                .current_session()
                .and_then(SessionDescriptor::speaker_name);
            ToolOutcome {
                result: json!({
                    "status": "warning_acknowledged",
                    "speaker_name": speaker_name,
                    "minutes_remaining": minutes_remaining,
                    "message": format!(
                        "{minutes_remaining} minutes remaining in the current session"
                    ),
                }),
                trigger: None,
            }
        }
    }
}

/// Tool definitions advertised to the agent at session setup.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "advance_to_next_session",
            description: "Move the conference to the next agenda item. Call this when the \
                          current session has genuinely concluded.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "reason": {
                        "type": "string",
                        "enum": ["speaker_finished", "time_expired", "operator_skip", "break_over"],
                        "description": "Why the agenda is advancing",
                    },
                },
                "required": ["reason"],
            }),
        },
        ToolDefinition {
            name: "check_time_remaining",
            description: "Report elapsed and remaining time for the current session.",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: "get_session_info",
            description: "Describe the current or upcoming agenda session.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "which": {
                        "type": "string",
                        "enum": ["current", "next"],
                        "description": "Which session to describe (default: current)",
                    },
                },
            }),
        },
        ToolDefinition {
            name: "announce_time_warning",
            description: "Deliver a spoken time warning to the current speaker.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "minutes_remaining": {
                        "type": "number",
                        "description": "Minutes left in the session",
                    },
                },
                "required": ["minutes_remaining"],
            }),
        },
    ]
}

/// A tool as advertised over the agent link.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::test_support;
    use crate::state_machine::{ConferenceMachine, ConferencePhase, Trigger};
    use std::sync::Arc;

    fn running_machine() -> ConferenceMachine {
        let mut machine = ConferenceMachine::new(Arc::new(test_support::standard_agenda()));
        machine.fire(Trigger::StartConference).unwrap();
        machine.fire(Trigger::OpeningComplete).unwrap();
        machine.fire(Trigger::SpeakerIntroduced).unwrap();
        assert_eq!(machine.phase(), ConferencePhase::SpeakerActive);
        machine
    }

    #[test]
    fn unknown_tool_name_is_rejected() {
        let err = ToolCall::from_name_and_args("open_pod_bay_doors", json!({})).unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "open_pod_bay_doors"));
    }

    #[test]
    fn bogus_advance_reason_is_rejected_before_any_state_change() {
        let machine = running_machine();
        let generation = machine.context().generation;

        let err =
            ToolCall::from_name_and_args("advance_to_next_session", json!({"reason": "vibes"}))
                .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
        assert_eq!(machine.context().generation, generation);
    }

    #[test]
    fn advance_reasons_map_to_their_triggers() {
        assert_eq!(
            AdvanceReason::SpeakerFinished.trigger(),
            Trigger::OperatorNext
        );
        assert_eq!(AdvanceReason::OperatorSkip.trigger(), Trigger::OperatorNext);
        assert_eq!(AdvanceReason::TimeExpired.trigger(), Trigger::SpeakerFinished);
        assert_eq!(AdvanceReason::BreakOver.trigger(), Trigger::BreakOver);
    }

    #[test]
    fn advance_parses_and_reports_the_source_phase() {
        let machine = running_machine();
        let call = ToolCall::from_name_and_args(
            "advance_to_next_session",
            json!({"reason": "speaker_finished"}),
        )
        .unwrap();
        let outcome = dispatch(&call, machine.context());
        assert_eq!(outcome.trigger, Some(Trigger::OperatorNext));
        assert_eq!(outcome.result["status"], "advancing");
        assert_eq!(outcome.result["from_phase"], "speaker_active");
    }

    #[test]
    fn check_time_remaining_reads_the_context_clock() {
        let mut machine = running_machine();
        machine.record_elapsed(300.0);
        let call = ToolCall::from_name_and_args("check_time_remaining", Value::Null).unwrap();
        let outcome = dispatch(&call, machine.context());
        assert_eq!(outcome.trigger, None);
        assert_eq!(outcome.result["elapsed_seconds"], 300.0);
    }

    #[test]
    fn get_session_info_defaults_to_current() {
        let machine = running_machine();
        let call = ToolCall::from_name_and_args("get_session_info", json!({})).unwrap();
        let outcome = dispatch(&call, machine.context());
        assert_eq!(outcome.trigger, None);
        assert_eq!(
            outcome.result["session_index"],
            machine.context().session_index
        );
        assert!(outcome.result["title"].is_string());
    }

    #[test]
    fn get_session_info_next_looks_ahead() {
        let machine = running_machine();
        let call =
            ToolCall::from_name_and_args("get_session_info", json!({"which": "next"})).unwrap();
        let outcome = dispatch(&call, machine.context());
        assert_eq!(
            outcome.result["session_index"],
            machine.context().session_index + 1
        );
    }

    #[test]
    fn announce_time_warning_is_informational_only() {
        let machine = running_machine();
        let call = ToolCall::from_name_and_args(
            "announce_time_warning",
            json!({"minutes_remaining": 4.0}),
        )
        .unwrap();
        let outcome = dispatch(&call, machine.context());
        assert_eq!(outcome.trigger, None);
        assert_eq!(outcome.result["minutes_remaining"], 4.0);
        assert_eq!(outcome.result["speaker_name"], "Dr. Test");
        assert!(outcome.result["message"].is_string());
    }

    #[test]
    fn definitions_cover_all_four_tools() {
        let defs = definitions();
        let names: Vec<_> = defs.iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "advance_to_next_session",
                "check_time_remaining",
                "get_session_info",
                "announce_time_warning",
            ]
        );
        for def in defs {
            assert_eq!(def.input_schema["type"], "object");
        }
    }
}
