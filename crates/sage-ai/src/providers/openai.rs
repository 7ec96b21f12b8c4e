//! OpenAI-compatible Chat Completions provider (Groq, OpenAI, OpenRouter, Ollama)

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use super::ChatProvider;
use crate::{
    error::{Error, Result},
    stream::{MessageEvent, MessageEventStream},
    types::{ChatOptions, Content, Context, Message, Model, StopReason, Usage},
};

/// Client for any endpoint speaking the `/chat/completions` protocol
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    /// Create a provider. `api_key` may be `None` for local servers.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    fn headers(&self, model: &Model) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| Error::InvalidApiKey)?;
            headers.insert(AUTHORIZATION, value);
        }
        for (key, value) in &model.headers {
            if let (Ok(name), Ok(val)) = (
                key.parse::<HeaderName>(),
                value.parse::<HeaderValue>(),
            ) {
                headers.insert(name, val);
            }
        }
        Ok(headers)
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn stream(
        &self,
        model: &Model,
        context: &Context,
        options: &ChatOptions,
    ) -> Result<MessageEventStream> {
        let request = build_request(model, context, options);
        let url = format!("{}/chat/completions", model.base_url.trim_end_matches('/'));
        tracing::debug!(
            model = %model.id,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "chat completion request"
        );

        let builder = self
            .client
            .post(&url)
            .headers(self.headers(model)?)
            .json(&request);

        let mut event_source = EventSource::new(builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        // Surface HTTP status failures here, typed, rather than as stream errors
        let first = match event_source.next().await {
            Some(Ok(Event::Open)) => None,
            Some(Ok(Event::Message(msg))) => Some(msg.data),
            Some(Err(e)) => {
                event_source.close();
                return Err(connect_error(e).await);
            }
            None => return Err(Error::Sse("stream closed before opening".into())),
        };

        Ok(Box::pin(create_stream(event_source, first)))
    }
}

async fn connect_error(e: reqwest_eventsource::Error) -> Error {
    match e {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            Error::from_status(status, body)
        }
        reqwest_eventsource::Error::Transport(e) => Error::Http(e),
        other => Error::Sse(other.to_string()),
    }
}

fn build_request(model: &Model, context: &Context, options: &ChatOptions) -> ChatRequest {
    let mut messages = Vec::with_capacity(context.messages.len() + 1);

    if let Some(system_prompt) = &context.system_prompt {
        messages.push(WireMessage {
            role: "system",
            content: Some(system_prompt.clone()),
            tool_calls: None,
            tool_call_id: None,
        });
    }
    messages.extend(context.messages.iter().map(to_wire_message));

    let tools: Option<Vec<WireTool>> = if context.tools.is_empty() {
        None
    } else {
        Some(
            context
                .tools
                .iter()
                .map(|t| WireTool {
                    tool_type: "function",
                    function: WireFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
        )
    };

    ChatRequest {
        model: model.id.clone(),
        messages,
        stream: true,
        stream_options: Some(StreamOptionsWire {
            include_usage: true,
        }),
        max_tokens: options.max_tokens.or(Some(model.max_tokens)),
        temperature: options.temperature,
        tool_choice: tools.as_ref().map(|_| "auto"),
        tools,
    }
}

fn to_wire_message(msg: &Message) -> WireMessage {
    match msg {
        Message::User { .. } => WireMessage {
            role: "user",
            content: Some(msg.text()),
            tool_calls: None,
            tool_call_id: None,
        },
        Message::Assistant { content, .. } => {
            let calls: Vec<WireToolCall> = content
                .iter()
                .filter_map(|c| match c {
                    Content::ToolCall {
                        id,
                        name,
                        arguments,
                    } => Some(WireToolCall {
                        id: id.clone(),
                        call_type: "function",
                        function: WireFunctionCall {
                            name: name.clone(),
                            arguments: arguments.to_string(),
                        },
                    }),
                    Content::Text { .. } => None,
                })
                .collect();
            let text = msg.text();
            WireMessage {
                role: "assistant",
                content: (!text.is_empty()).then_some(text),
                tool_calls: (!calls.is_empty()).then_some(calls),
                tool_call_id: None,
            }
        }
        Message::ToolResult { tool_call_id, .. } => WireMessage {
            role: "tool",
            content: Some(msg.text()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.clone()),
        },
    }
}

/// Translate one SSE data payload into message events.
fn chunk_events(data: &str) -> std::result::Result<Vec<MessageEvent>, serde_json::Error> {
    let chunk: StreamChunk = serde_json::from_str(data)?;
    let mut events = Vec::new();

    for choice in chunk.choices {
        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            events.push(MessageEvent::TextDelta { delta: text });
        }
        for tc in choice.delta.tool_calls.unwrap_or_default() {
            let (name, arguments) = match tc.function {
                Some(f) => (f.name, f.arguments.unwrap_or_default()),
                None => (None, String::new()),
            };
            events.push(MessageEvent::ToolCallDelta {
                index: tc.index,
                id: tc.id,
                name,
                arguments,
            });
        }
        if let Some(reason) = choice.finish_reason {
            events.push(MessageEvent::Done {
                stop_reason: stop_reason_from(&reason),
                usage: Usage::default(),
            });
        }
    }

    if let Some(u) = chunk.usage {
        events.push(MessageEvent::Done {
            stop_reason: StopReason::Stop,
            usage: Usage {
                input: u.prompt_tokens,
                output: u.completion_tokens,
            },
        });
    }

    Ok(events)
}

fn stop_reason_from(reason: &str) -> StopReason {
    match reason {
        "length" => StopReason::Length,
        "tool_calls" | "function_call" => StopReason::ToolUse,
        "stop" => StopReason::Stop,
        _ => StopReason::Error,
    }
}

/// The finish reason and the usage report may arrive in separate chunks;
/// both are folded into a single terminal `Done`.
fn create_stream(
    mut event_source: EventSource,
    first: Option<String>,
) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        let mut stop_reason: Option<StopReason> = None;
        let mut usage = Usage::default();
        let mut pending = first;

        loop {
            let data = match pending.take() {
                Some(data) => data,
                None => match event_source.next().await {
                    None | Some(Err(reqwest_eventsource::Error::StreamEnded)) => break,
                    Some(Ok(Event::Open)) => continue,
                    Some(Ok(Event::Message(msg))) => msg.data,
                    Some(Err(e)) => {
                        yield MessageEvent::Error {
                            message: format!("SSE error: {}", e),
                        };
                        event_source.close();
                        return;
                    }
                },
            };

            if data.trim() == "[DONE]" {
                break;
            }
            match chunk_events(&data) {
                Ok(events) => {
                    for event in events {
                        match event {
                            MessageEvent::Done { stop_reason: reason, usage: u } => {
                                if u != Usage::default() {
                                    usage = u;
                                } else {
                                    stop_reason = Some(reason);
                                }
                            }
                            other => yield other,
                        }
                    }
                }
                Err(e) => {
                    yield MessageEvent::Error {
                        message: format!("Failed to parse chunk: {}", e),
                    };
                    event_source.close();
                    return;
                }
            }
        }

        event_source.close();
        yield MessageEvent::Done {
            stop_reason: stop_reason.unwrap_or(StopReason::Stop),
            usage,
        };
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptionsWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct StreamOptionsWire {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: &'static str,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<StreamUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCall {
    index: usize,
    id: Option<String>,
    function: Option<StreamFunction>,
}

#[derive(Debug, Deserialize)]
struct StreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
