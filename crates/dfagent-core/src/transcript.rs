// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use serde::Serialize;
use serde_json::Value;

/// One entry in an invocation's transcript.
///
/// Ordering invariants, maintained by [`Transcript`]'s recording methods:
/// every `AgentAction` is immediately followed by exactly one `Observation`
/// (turns the loop could not parse are recorded the same way, with a
/// synthetic observation), and `FinalAnswer` appears at most once, last.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    UserTurn {
        content: String,
    },
    AgentAction {
        tool: String,
        tool_input: Value,
        /// The model's reasoning text accompanying the action, if any.
        log: String,
    },
    Observation {
        content: String,
        is_error: bool,
    },
    FinalAnswer {
        content: String,
    },
}

/// One action/observation pair, in the flattened shape callers consume.
#[derive(Debug, Clone, Serialize)]
pub struct IntermediateStep {
    pub tool: String,
    pub tool_input: Value,
    pub log: String,
    pub observation: String,
    pub is_error: bool,
}

/// Append-only record of everything that happened during one invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    steps: Vec<Step>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_user(&mut self, content: impl Into<String>) {
        self.steps.push(Step::UserTurn { content: content.into() });
    }

    /// Record an action and its observation as one unit, so a transcript
    /// can never hold an action without the observation that answered it.
    pub fn record_exchange(
        &mut self,
        tool: impl Into<String>,
        tool_input: Value,
        log: impl Into<String>,
        observation: impl Into<String>,
        is_error: bool,
    ) {
        self.steps.push(Step::AgentAction {
            tool: tool.into(),
            tool_input,
            log: log.into(),
        });
        self.steps.push(Step::Observation { content: observation.into(), is_error });
    }

    pub fn record_final(&mut self, content: impl Into<String>) {
        debug_assert!(
            !self.steps.iter().any(|s| matches!(s, Step::FinalAnswer { .. })),
            "a transcript holds at most one final answer"
        );
        self.steps.push(Step::FinalAnswer { content: content.into() });
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The action/observation pairs, in order.
    pub fn intermediate_steps(&self) -> Vec<IntermediateStep> {
        let mut pairs = Vec::new();
        let mut iter = self.steps.iter().peekable();
        while let Some(step) = iter.next() {
            if let Step::AgentAction { tool, tool_input, log } = step {
                if let Some(Step::Observation { content, is_error }) = iter.peek() {
                    pairs.push(IntermediateStep {
                        tool: tool.clone(),
                        tool_input: tool_input.clone(),
                        log: log.clone(),
                        observation: content.clone(),
                        is_error: *is_error,
                    });
                    iter.next();
                }
            }
        }
        pairs
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.steps.iter().rev().find_map(|s| match s {
            Step::FinalAnswer { content } => Some(content.as_str()),
            _ => None,
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn exchanges_pair_actions_with_observations() {
        let mut t = Transcript::new();
        t.record_user("total sales?");
        t.record_exchange("execute_python", json!({"code": "x"}), "", "42", false);
        t.record_exchange("execute_python", json!({"code": "y"}), "log", "boom", true);
        t.record_final("42");

        let steps = t.intermediate_steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].observation, "42");
        assert!(!steps[0].is_error);
        assert!(steps[1].is_error);
        assert_eq!(t.final_answer(), Some("42"));
    }

    #[test]
    fn actions_never_appear_consecutively() {
        let mut t = Transcript::new();
        t.record_exchange("a", json!({}), "", "obs", false);
        t.record_exchange("b", json!({}), "", "obs", false);
        let mut last_was_action = false;
        for step in t.steps() {
            let is_action = matches!(step, Step::AgentAction { .. });
            assert!(!(is_action && last_was_action));
            last_was_action = is_action;
        }
    }

    #[test]
    fn empty_transcript_has_no_answer() {
        let t = Transcript::new();
        assert!(t.final_answer().is_none());
        assert!(t.intermediate_steps().is_empty());
    }

    #[test]
    fn steps_serialize_with_type_tags() {
        let mut t = Transcript::new();
        t.record_user("q");
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["steps"][0]["type"], "user_turn");
    }
}
