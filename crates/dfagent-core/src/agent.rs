// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use dfagent_config::AgentConfig;
use dfagent_model::{CompletionRequest, Message, ModelProvider, ModelTurn};
use dfagent_tools::{with_retry, RetryPolicy, ToolCall, ToolRegistry};

use crate::transcript::Transcript;

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    /// The model produced a final answer within the iteration budget.
    Answered,
    /// The iteration budget ran out before a final answer.
    ForcedStop,
    /// A non-recoverable fault: transport failure after retries, or
    /// cancellation by the caller.
    Failed { reason: String },
}

/// Everything the loop produced, whether or not it reached an answer.
#[derive(Debug)]
pub struct LoopOutcome {
    pub output: String,
    pub status: InvocationStatus,
    pub transcript: Transcript,
}

/// Drives the model ↔ tool loop for one question.
///
/// Every model turn consumes one iteration, including turns that could not
/// be parsed into an action or an answer; those are fed back to the model
/// as correction observations so it can recover on its own.
pub struct AgentLoop {
    model: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    config: Arc<AgentConfig>,
}

impl AgentLoop {
    pub fn new(
        model: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        config: Arc<AgentConfig>,
    ) -> Self {
        Self { model, tools, config }
    }

    /// Run the loop to completion.  `cancel` aborts at the next await point
    /// when the sender fires or is dropped; pass `None` to run undisturbed.
    pub async fn run(
        &self,
        system_prompt: &str,
        question: &str,
        mut cancel: Option<oneshot::Receiver<()>>,
    ) -> LoopOutcome {
        let mut transcript = Transcript::new();
        transcript.record_user(question);

        let mut messages = vec![Message::system(system_prompt), Message::user(question)];
        let schemas: Vec<dfagent_model::ToolSchema> = self
            .tools
            .schemas()
            .into_iter()
            .map(|s| dfagent_model::ToolSchema {
                name: s.name,
                description: s.description,
                parameters: s.parameters,
            })
            .collect();

        let mut last_reasoning = String::new();

        for iteration in 1..=self.config.max_iterations {
            if let Some(rx) = cancel.as_mut() {
                match rx.try_recv() {
                    Err(oneshot::error::TryRecvError::Empty) => {}
                    _ => return Self::failed(transcript, "cancelled by caller"),
                }
            }

            let turn = match self.next_turn(&messages, &schemas, cancel.as_mut()).await {
                Ok(turn) => turn,
                Err(TurnError::Cancelled) => {
                    return Self::failed(transcript, "cancelled by caller")
                }
                Err(TurnError::Transport(e)) => {
                    warn!(iteration, error = %e, "model transport failure");
                    return Self::failed(transcript, format!("model call failed: {e:#}"));
                }
            };
            debug!(
                iteration,
                calls = turn.tool_calls.len(),
                text_len = turn.text.len(),
                "model turn"
            );
            if !turn.text.trim().is_empty() {
                last_reasoning = turn.text.trim().to_string();
            }

            if let Some(call) = turn.tool_calls.first().cloned() {
                // A disconnecting caller must not wait out an in-flight
                // sandbox call; race the dispatch like the model call.
                let acted = match cancel.as_mut() {
                    Some(rx) => tokio::select! {
                        result = self.act(&mut transcript, &mut messages, &turn, call) => {
                            Some(result)
                        }
                        _ = rx => None,
                    },
                    None => Some(self.act(&mut transcript, &mut messages, &turn, call).await),
                };
                match acted {
                    None => return Self::failed(transcript, "cancelled by caller"),
                    Some(Ok(())) => {}
                    Some(Err(e)) => {
                        return Self::failed(transcript, format!("tool execution failed: {e:#}"))
                    }
                }
            } else if !turn.text.trim().is_empty() {
                let answer = turn.text.trim().to_string();
                info!(iteration, "final answer produced");
                transcript.record_final(&answer);
                return LoopOutcome {
                    output: answer,
                    status: InvocationStatus::Answered,
                    transcript,
                };
            } else {
                // Neither an action nor an answer: tell the model and burn
                // the iteration.
                let correction =
                    "Your last message was empty. Call a tool or state the final answer \
                     as plain text.";
                transcript.record_exchange("invalid_turn", json!({}), "", correction, true);
                messages.push(Message::user(correction));
            }
        }

        info!(budget = self.config.max_iterations, "iteration budget exhausted");
        let output = if last_reasoning.is_empty() {
            "I was unable to complete the analysis within the iteration limit.".to_string()
        } else {
            last_reasoning
        };
        LoopOutcome { output, status: InvocationStatus::ForcedStop, transcript }
    }

    /// Execute one proposed call, feeding the observation back to both the
    /// transcript and the conversation.  `Err` means a non-recoverable
    /// tool fault; everything the model can fix comes back as `Ok`.
    async fn act(
        &self,
        transcript: &mut Transcript,
        messages: &mut Vec<Message>,
        turn: &ModelTurn,
        call: dfagent_model::ProposedCall,
    ) -> Result<()> {
        let raw = if call.arguments.trim().is_empty() { "{}" } else { &call.arguments };
        let args: Value = match serde_json::from_str(raw) {
            Ok(v @ Value::Object(_)) => v,
            Ok(_) => {
                let observation = format!(
                    "The arguments for '{}' must be a JSON object. \
                     Repeat the call with a well-formed JSON object.",
                    call.name
                );
                transcript.record_exchange(
                    &call.name,
                    json!({ "raw": call.arguments }),
                    &turn.text,
                    &observation,
                    true,
                );
                messages.push(Message::tool_call(&call.id, &call.name, &call.arguments));
                messages.push(Message::tool_result(&call.id, &observation));
                return Ok(());
            }
            Err(e) => {
                let observation = format!(
                    "The arguments for '{}' were not valid JSON ({e}). \
                     Repeat the call with a well-formed JSON object.",
                    call.name
                );
                transcript.record_exchange(
                    &call.name,
                    json!({ "raw": call.arguments }),
                    &turn.text,
                    &observation,
                    true,
                );
                messages.push(Message::tool_call(&call.id, &call.name, &call.arguments));
                messages.push(Message::tool_result(&call.id, &observation));
                return Ok(());
            }
        };

        let tool_call =
            ToolCall { id: call.id.clone(), name: call.name.clone(), args: args.clone() };
        let output = match self.tools.execute(&tool_call).await {
            Ok(output) => output,
            Err(e) => {
                // The attempted call must stay diagnosable even though the
                // invocation is about to fail.
                transcript.record_exchange(
                    &call.name,
                    args,
                    &turn.text,
                    &format!("tool execution failed: {e:#}"),
                    true,
                );
                return Err(e);
            }
        };

        transcript.record_exchange(&call.name, args, &turn.text, &output.content, output.is_error);
        messages.push(Message::tool_call(&call.id, &call.name, &call.arguments));
        messages.push(Message::tool_result(&call.id, &output.content));
        Ok(())
    }

    async fn next_turn(
        &self,
        messages: &[Message],
        schemas: &[dfagent_model::ToolSchema],
        cancel: Option<&mut oneshot::Receiver<()>>,
    ) -> Result<ModelTurn, TurnError> {
        let completion = self.complete(messages, schemas);
        match cancel {
            Some(rx) => tokio::select! {
                result = completion => result.map_err(TurnError::Transport),
                _ = rx => Err(TurnError::Cancelled),
            },
            None => completion.await.map_err(TurnError::Transport),
        }
    }

    /// One model completion with timeout and transport retry.
    async fn complete(
        &self,
        messages: &[Message],
        schemas: &[dfagent_model::ToolSchema],
    ) -> Result<ModelTurn> {
        let policy = RetryPolicy::from_agent(&self.config);
        let timeout = Duration::from_secs(self.config.model_timeout_secs);
        with_retry(&policy, "model completion", || {
            let request = CompletionRequest {
                messages: messages.to_vec(),
                tools: schemas.to_vec(),
            };
            async move {
                match tokio::time::timeout(timeout, self.model.generate(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow!("model call timed out")),
                }
            }
        })
        .await
    }

    fn failed(transcript: Transcript, reason: impl Into<String>) -> LoopOutcome {
        let reason = reason.into();
        LoopOutcome {
            output: reason.clone(),
            status: InvocationStatus::Failed { reason },
            transcript,
        }
    }
}

enum TurnError {
    Transport(anyhow::Error),
    Cancelled,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
