// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{CompletionRequest, ModelProvider, ModelTurn, Role};

/// Deterministic mock provider.  Echoes the last user message back as the
/// final answer.
#[derive(Default)]
pub struct MockProvider;

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, req: CompletionRequest) -> anyhow::Result<ModelTurn> {
        let reply = req
            .messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .and_then(|m| m.as_text())
            .unwrap_or("[no input]");
        Ok(ModelTurn::text_only(format!("MOCK: {reply}")))
    }
}

/// A pre-scripted mock provider.  Each `generate` call pops the next turn
/// from the front of the queue, so tests can specify exact sequences of
/// tool calls and answers without network access.
pub struct ScriptedMockProvider {
    turns: Arc<Mutex<Vec<ModelTurn>>>,
    /// Every `CompletionRequest` seen by this provider, in call order.
    /// Written on each call so tests can inspect what was sent.
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// When the script runs out: `Some(turn)` repeats that turn forever,
    /// `None` makes further calls fail (transport-style).
    fallback: Option<ModelTurn>,
}

impl ScriptedMockProvider {
    pub fn new(turns: Vec<ModelTurn>) -> Self {
        Self {
            turns: Arc::new(Mutex::new(turns)),
            requests: Arc::new(Mutex::new(Vec::new())),
            fallback: Some(ModelTurn::text_only("[no more scripted turns]")),
        }
    }

    /// Provider that returns the same turn on every call, forever.
    /// Useful for budget-exhaustion tests.
    pub fn repeating(turn: ModelTurn) -> Self {
        Self {
            turns: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            fallback: Some(turn),
        }
    }

    /// Provider whose every call fails as if the endpoint were unreachable.
    pub fn unreachable() -> Self {
        Self {
            turns: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            fallback: None,
        }
    }

    /// Convenience: provider that immediately returns a final answer.
    pub fn always_text(reply: impl Into<String>) -> Self {
        Self::new(vec![ModelTurn::text_only(reply)])
    }

    /// Convenience: provider that calls one tool, then answers.
    pub fn tool_then_text(
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        args_json: impl Into<String>,
        final_text: impl Into<String>,
    ) -> Self {
        Self::new(vec![
            ModelTurn::call(tool_id, tool_name, args_json),
            ModelTurn::text_only(final_text),
        ])
    }

    pub fn calls_seen(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelProvider for ScriptedMockProvider {
    fn name(&self) -> &str {
        "scripted-mock"
    }
    fn model_name(&self) -> &str {
        "scripted-mock-model"
    }

    async fn generate(&self, req: CompletionRequest) -> anyhow::Result<ModelTurn> {
        self.requests.lock().unwrap().push(req);
        let next = {
            let mut turns = self.turns.lock().unwrap();
            if turns.is_empty() { None } else { Some(turns.remove(0)) }
        };
        match next.or_else(|| self.fallback.clone()) {
            Some(turn) => Ok(turn),
            None => anyhow::bail!("scripted transport failure: model unreachable"),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;

    fn req() -> CompletionRequest {
        CompletionRequest { messages: vec![Message::user("hi")], tools: vec![] }
    }

    #[tokio::test]
    async fn mock_echoes_last_user_message() {
        let turn = MockProvider.generate(req()).await.unwrap();
        assert!(turn.text.contains("MOCK: hi"));
    }

    #[tokio::test]
    async fn scripted_pops_in_order() {
        let p = ScriptedMockProvider::new(vec![
            ModelTurn::call("c1", "run_code", "{}"),
            ModelTurn::text_only("done"),
        ]);
        let first = p.generate(req()).await.unwrap();
        assert_eq!(first.tool_calls[0].name, "run_code");
        let second = p.generate(req()).await.unwrap();
        assert_eq!(second.text, "done");
        assert_eq!(p.calls_seen(), 2);
    }

    #[tokio::test]
    async fn repeating_never_runs_out() {
        let p = ScriptedMockProvider::repeating(ModelTurn::default());
        for _ in 0..20 {
            assert!(p.generate(req()).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn unreachable_always_errors() {
        let p = ScriptedMockProvider::unreachable();
        assert!(p.generate(req()).await.is_err());
        assert!(p.generate(req()).await.is_err());
    }

    #[tokio::test]
    async fn requests_are_recorded() {
        let p = ScriptedMockProvider::always_text("ok");
        let _ = p.generate(req()).await.unwrap();
        let seen = p.requests.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages[0].as_text(), Some("hi"));
    }
}
