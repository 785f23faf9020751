// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    CompletionRequest, Message, MessageContent, ModelProvider, ModelTurn, ProposedCall, Role,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider speaking the OpenAI-compatible `chat/completions` wire format.
///
/// Non-streaming by design: the agent loop consumes exactly one complete
/// turn per iteration, so streaming would only complicate retry handling.
pub struct OpenAiProvider {
    model: String,
    api_key: Option<String>,
    base_url: String,
    max_tokens: Option<u32>,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        model: String,
        api_key: Option<String>,
        base_url: Option<String>,
        max_tokens: Option<u32>,
        temperature: f32,
    ) -> Self {
        Self {
            model,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            max_tokens,
            temperature,
            client: reqwest::Client::new(),
        }
    }

    fn build_body(&self, req: &CompletionRequest) -> Value {
        let messages: Vec<Value> = req.messages.iter().map(wire_message).collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });
        if let Some(mt) = self.max_tokens {
            body["max_tokens"] = json!(mt);
        }
        if !req.tools.is_empty() {
            let tools: Vec<Value> = req
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }
        body
    }
}

/// Serialize one conversation message into the OpenAI wire shape.
fn wire_message(msg: &Message) -> Value {
    match &msg.content {
        MessageContent::Text(text) => json!({
            "role": wire_role(msg.role),
            "content": text,
        }),
        MessageContent::ToolCall { tool_call_id, function } => json!({
            "role": "assistant",
            "content": Value::Null,
            "tool_calls": [{
                "id": tool_call_id,
                "type": "function",
                "function": {
                    "name": function.name,
                    "arguments": function.arguments,
                }
            }]
        }),
        MessageContent::ToolResult { tool_call_id, content } => json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": content,
        }),
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, req: CompletionRequest) -> anyhow::Result<ModelTurn> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = self.build_body(&req);

        debug!(model = %self.model, messages = req.messages.len(), "model completion request");

        let mut http = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.context("model endpoint unreachable")?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .context("model response was not valid JSON")?;

        if !status.is_success() {
            let msg = payload["error"]["message"].as_str().unwrap_or("unknown error");
            bail!("model API error ({status}): {msg}");
        }

        parse_completion(&payload)
    }
}

/// Extract a [`ModelTurn`] from a chat-completions response payload.
fn parse_completion(payload: &Value) -> anyhow::Result<ModelTurn> {
    let message = payload["choices"]
        .get(0)
        .map(|c| &c["message"])
        .context("model response missing choices")?;

    let text = message["content"].as_str().unwrap_or("").to_string();

    let mut tool_calls = Vec::new();
    if let Some(calls) = message["tool_calls"].as_array() {
        for (i, call) in calls.iter().enumerate() {
            let name = call["function"]["name"].as_str().unwrap_or("").to_string();
            // An id is required to thread the result back; synthesize one if
            // the endpoint left it out.
            let id = match call["id"].as_str() {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => format!("call_synthetic_{i}"),
            };
            tool_calls.push(ProposedCall {
                id,
                name,
                arguments: call["function"]["arguments"].as_str().unwrap_or("").to_string(),
            });
        }
    }

    Ok(ModelTurn { text, tool_calls })
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
