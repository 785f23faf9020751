// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use serde::Serialize;

use dfagent_ingest::{SourceFailure, TableSet};
use dfagent_tools::ChartArtifact;

use crate::agent::{InvocationStatus, LoopOutcome};
use crate::transcript::{IntermediateStep, Transcript};

/// A source that did not make it into the table set, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct FailedSource {
    pub name: String,
    pub error: String,
}

/// A chart persisted during the invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ChartRef {
    pub filename: String,
    pub url: String,
}

/// The complete result of one invocation, shaped for serialization.
#[derive(Debug, Serialize)]
pub struct InvocationResult {
    pub output: String,
    pub status: InvocationStatus,
    pub intermediate_steps: Vec<IntermediateStep>,
    /// Names of the tables that were loaded, in normalization order.
    pub dataframes_loaded: Vec<String>,
    pub failed_sources: Vec<FailedSource>,
    pub charts: Vec<ChartRef>,
    pub transcript: Transcript,
}

/// Pure assembly: no IO, no clock, no randomness.  Everything in the
/// result comes from the arguments.
pub fn assemble(
    outcome: LoopOutcome,
    tables: &TableSet,
    failures: &[SourceFailure],
    charts: Vec<ChartArtifact>,
) -> InvocationResult {
    InvocationResult {
        output: outcome.output,
        status: outcome.status,
        intermediate_steps: outcome.transcript.intermediate_steps(),
        dataframes_loaded: tables.names(),
        failed_sources: failures
            .iter()
            .map(|f| FailedSource { name: f.name.clone(), error: f.error.to_string() })
            .collect(),
        charts: charts
            .into_iter()
            .map(|c| ChartRef { filename: c.filename, url: c.url })
            .collect(),
        transcript: outcome.transcript,
    }
}

impl InvocationResult {
    pub fn answered(&self) -> bool {
        self.status == InvocationStatus::Answered
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use dfagent_ingest::{IngestError, Table};
    use serde_json::json;

    use super::*;

    fn outcome() -> LoopOutcome {
        let mut transcript = Transcript::new();
        transcript.record_user("q");
        transcript.record_exchange("execute_python", json!({"code": "x"}), "", "42", false);
        transcript.record_final("42");
        LoopOutcome {
            output: "42".into(),
            status: InvocationStatus::Answered,
            transcript,
        }
    }

    #[test]
    fn result_mirrors_loop_outcome_and_tables() {
        let mut tables = TableSet::new();
        tables.insert(Table::new("sales", vec!["a".into()], vec![]));
        let failures = vec![SourceFailure {
            name: "bad".into(),
            error: IngestError::UnsupportedFormat { name: "bad".into(), extension: "txt".into() },
        }];
        let charts = vec![ChartArtifact {
            filename: "rev.png".into(),
            url: "http://store/charts/s1/rev.png".into(),
        }];

        let result = assemble(outcome(), &tables, &failures, charts);

        assert!(result.answered());
        assert_eq!(result.output, "42");
        assert_eq!(result.dataframes_loaded, vec!["sales"]);
        assert_eq!(result.intermediate_steps.len(), 1);
        assert_eq!(result.failed_sources[0].name, "bad");
        assert!(result.failed_sources[0].error.contains("unsupported format"));
        assert_eq!(result.charts[0].filename, "rev.png");
    }

    #[test]
    fn result_serializes_to_the_wire_shape() {
        let result = assemble(outcome(), &TableSet::new(), &[], vec![]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["output"], "42");
        assert_eq!(json["status"], "answered");
        assert_eq!(json["dataframes_loaded"], json!([]));
        assert_eq!(json["intermediate_steps"][0]["tool"], "execute_python");
    }

    #[test]
    fn failed_status_serializes_with_reason() {
        let loop_outcome = LoopOutcome {
            output: "model call failed".into(),
            status: InvocationStatus::Failed { reason: "model call failed".into() },
            transcript: Transcript::new(),
        };
        let result = assemble(loop_outcome, &TableSet::new(), &[], vec![]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"]["failed"]["reason"], "model call failed");
    }
}
