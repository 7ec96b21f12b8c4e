//! Conversation controller: alternates reasoning and tool execution until the
//! reasoner answers.

use std::sync::Arc;

use sage_ai::{Message, ToolCall, Usage};
use tokio::sync::broadcast;

use crate::{
    error::{Error, Result},
    events::AgentEvent,
    reasoner::{Reasoner, ReasonerRequest},
    tool::ToolRegistry,
};

/// Default ceiling on reasoning steps per turn
pub const DEFAULT_MAX_STEPS: u32 = 10;

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// System prompt sent with every reasoning step
    pub system_prompt: Option<String>,
    /// Maximum reasoner invocations per turn
    pub max_steps: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// What the reasoner produced on one step
#[derive(Debug, Clone, PartialEq)]
pub enum AgentTurn {
    /// Final answer, no tool calls
    Answer(Message),
    /// One or more tool requests, in the order issued
    ToolCalls { message: Message, calls: Vec<ToolCall> },
}

impl AgentTurn {
    pub fn from_message(message: Message) -> Self {
        let calls = message.tool_calls();
        if calls.is_empty() {
            AgentTurn::Answer(message)
        } else {
            AgentTurn::ToolCalls { message, calls }
        }
    }
}

/// Result of a completed turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// New messages in order: the user message, every intermediate assistant
    /// and tool-result message, and the final answer.
    pub messages: Vec<Message>,
    /// The final assistant message
    pub answer: Message,
    /// Reasoner invocations used
    pub steps: u32,
    /// Token usage summed over all steps
    pub usage: Usage,
}

impl TurnOutcome {
    pub fn answer_text(&self) -> String {
        self.answer.text()
    }

    /// Number of tool-result messages produced during the turn
    pub fn tool_results(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, Message::ToolResult { .. }))
            .count()
    }
}

enum LoopState {
    Reasoning,
    ToolExecution(Vec<ToolCall>),
    Done(Message),
}

/// Drives one user turn through the reasoner and the tool registry
pub struct Controller {
    config: ControllerConfig,
    reasoner: Arc<dyn Reasoner>,
    tools: Arc<ToolRegistry>,
    tool_definitions: Vec<sage_ai::Tool>,
    event_tx: broadcast::Sender<AgentEvent>,
}

impl Controller {
    pub fn new(
        config: ControllerConfig,
        reasoner: Arc<dyn Reasoner>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let tool_definitions = tools.definitions();
        Self {
            config,
            reasoner,
            tools,
            tool_definitions,
            event_tx,
        }
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one turn. `history` is not modified; on success the caller appends
    /// `TurnOutcome::messages` to it.
    pub async fn run_turn(&self, history: &[Message], user: Message) -> Result<TurnOutcome> {
        let _ = self.event_tx.send(AgentEvent::TurnStart);

        let mut working = Vec::with_capacity(history.len() + 4);
        working.extend_from_slice(history);
        working.push(user);

        let mut usage = Usage::default();
        match self.drive(&mut working, &mut usage).await {
            Ok((answer, steps)) => {
                let _ = self.event_tx.send(AgentEvent::TurnEnd {
                    steps,
                    usage: usage.clone(),
                });
                Ok(TurnOutcome {
                    messages: working.split_off(history.len()),
                    answer,
                    steps,
                    usage,
                })
            }
            Err(e) => {
                tracing::debug!(error = %e, "turn failed");
                let _ = self.event_tx.send(AgentEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn drive(&self, working: &mut Vec<Message>, usage: &mut Usage) -> Result<(Message, u32)> {
        let max_steps = self.config.max_steps.max(1);
        let mut steps = 0u32;
        let mut state = LoopState::Reasoning;

        loop {
            state = match state {
                LoopState::Reasoning => {
                    steps += 1;
                    let _ = self.event_tx.send(AgentEvent::ReasoningStart { step: steps });
                    tracing::debug!(step = steps, history = working.len(), "reasoning");

                    let message = self
                        .reasoner
                        .reason(ReasonerRequest {
                            system_prompt: self.config.system_prompt.as_deref(),
                            history: working.as_slice(),
                            tools: &self.tool_definitions,
                        })
                        .await?;
                    if let Some(u) = message.usage() {
                        usage.add(u);
                    }

                    match AgentTurn::from_message(message) {
                        AgentTurn::Answer(answer) => {
                            let _ = self.event_tx.send(AgentEvent::ReasoningEnd {
                                step: steps,
                                tool_calls: 0,
                            });
                            working.push(answer.clone());
                            LoopState::Done(answer)
                        }
                        AgentTurn::ToolCalls { message, calls } => {
                            let _ = self.event_tx.send(AgentEvent::ReasoningEnd {
                                step: steps,
                                tool_calls: calls.len(),
                            });
                            if steps >= max_steps {
                                return Err(Error::StepLimitExceeded { max_steps });
                            }
                            working.push(message);
                            LoopState::ToolExecution(calls)
                        }
                    }
                }
                LoopState::ToolExecution(calls) => {
                    for call in calls {
                        working.push(self.execute_tool_call(call).await);
                    }
                    LoopState::Reasoning
                }
                LoopState::Done(answer) => return Ok((answer, steps)),
            };
        }
    }

    async fn execute_tool_call(&self, call: ToolCall) -> Message {
        let ToolCall {
            id,
            name,
            arguments,
        } = call;

        let _ = self.event_tx.send(AgentEvent::ToolExecutionStart {
            tool_call_id: id.clone(),
            tool_name: name.clone(),
            arguments: arguments.clone(),
        });
        tracing::debug!(tool = %name, id = %id, "executing tool");

        let result = self.tools.invoke(&name, arguments).await;
        if result.is_error {
            tracing::debug!(tool = %name, result = %result.text_content(), "tool returned an error");
        }

        let _ = self.event_tx.send(AgentEvent::ToolExecutionEnd {
            tool_call_id: id.clone(),
            tool_name: name.clone(),
            result: result.text_content(),
            is_error: result.is_error,
        });

        Message::tool_result(id, name, result.content, result.is_error)
    }
}
