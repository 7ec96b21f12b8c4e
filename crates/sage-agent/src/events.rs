//! Controller lifecycle events

use sage_ai::Usage;
use serde::{Deserialize, Serialize};

/// Events emitted while a turn runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A user turn started
    TurnStart,

    /// The reasoner was invoked (1-based step)
    ReasoningStart { step: u32 },

    /// The reasoner returned
    ReasoningEnd { step: u32, tool_calls: usize },

    /// Tool execution started
    ToolExecutionStart {
        tool_call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },

    /// Tool execution completed
    ToolExecutionEnd {
        tool_call_id: String,
        tool_name: String,
        result: String,
        is_error: bool,
    },

    /// The turn produced an answer
    TurnEnd { steps: u32, usage: Usage },

    /// The turn failed
    Error { message: String },
}

impl AgentEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::TurnEnd { .. } | AgentEvent::Error { .. })
    }

    /// Short status line for a spinner, if this event warrants one
    pub fn status_text(&self) -> Option<String> {
        match self {
            AgentEvent::TurnStart => Some("Thinking…".to_string()),
            AgentEvent::ReasoningStart { step } if *step > 1 => {
                Some(format!("Thinking (step {})…", step))
            }
            AgentEvent::ToolExecutionStart { tool_name, .. } => {
                Some(format!("Calling {}…", tool_name))
            }
            _ => None,
        }
    }
}
