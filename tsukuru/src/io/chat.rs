//! Chat completion backend.
//!
//! The [`ChatClient`] trait decouples the retrieval loop from the HTTP
//! endpoint. Tests use scripted clients that return predetermined tool calls
//! without touching the network.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument, trace, warn};

use crate::core::types::{ToolCall, ToolChoice, ToolSpec};

/// One round-trip to the chat endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: ToolChoice,
}

/// Abstraction over chat completion backends.
pub trait ChatClient {
    /// Send the request and return the tool calls of the first choice.
    ///
    /// An empty list means the model answered without calling a tool.
    fn chat(&self, request: &ChatRequest) -> Result<Vec<ToolCall>>;
}

/// Blocking client for any endpoint implementing `/v1/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    /// `api_key` is `None` for keyless endpoints; otherwise it is sent as a
    /// bearer token on every request.
    pub fn new(api_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        if api_key.is_none() {
            warn!(url = %api_url, "no access token configured; sending unauthenticated requests");
        }
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }
}

impl ChatClient for OpenAiClient {
    #[instrument(skip_all, fields(model = %request.model, tools = request.tools.len()))]
    fn chat(&self, request: &ChatRequest) -> Result<Vec<ToolCall>> {
        let payload = build_payload(request);
        debug!(
            system_len = request.system.len(),
            user_len = request.user.len(),
            "sending chat request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full chat request payload");
        }

        let mut req = self.client.post(&self.api_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req
            .send()
            .with_context(|| format!("POST {}", self.api_url))?;
        let response = check_status(response)?;
        let body = response.text().context("read chat response body")?;
        trace!(body = %body, "full chat response body");

        parse_tool_calls(&body)
    }
}

/// Serialize a request into the OpenAI wire format.
fn build_payload(request: &ChatRequest) -> ChatCompletionRequest {
    let tools = request
        .tools
        .iter()
        .map(|tool| WireTool {
            kind: "function",
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        })
        .collect();
    let tool_choice = match &request.tool_choice {
        ToolChoice::Required => json!("required"),
        ToolChoice::Function(name) => json!({ "type": "function", "function": { "name": name } }),
    };
    ChatCompletionRequest {
        model: request.model.clone(),
        messages: vec![
            Message {
                role: "system",
                content: request.system.clone(),
            },
            Message {
                role: "user",
                content: request.user.clone(),
            },
        ],
        tools,
        tool_choice,
    }
}

/// Extract tool calls from a chat completion response body.
fn parse_tool_calls(body: &str) -> Result<Vec<ToolCall>> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).context("parse chat response")?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("chat response carried no choices"))?;
    let calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall {
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();
    debug!(
        tool_calls = calls.len(),
        has_text = choice.message.content.is_some(),
        "received chat response"
    );
    Ok(calls)
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|env| env.error.message)
        .unwrap_or(body);
    warn!(%status, "chat endpoint returned an error");
    Err(anyhow!("chat endpoint returned {status}: {message}"))
}

// Wire types.

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    tools: Vec<WireTool>,
    tool_choice: Value,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: WireCalledFunction,
}

#[derive(Debug, Deserialize)]
struct WireCalledFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
