// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::oneshot;
use tracing::info;

use dfagent_config::Config;
use dfagent_ingest::normalize;
use dfagent_model::ModelProvider;
use dfagent_sandbox::Sandbox;
use dfagent_storage::ObjectStore;
use dfagent_tools::{chart_sink, standard_registry, RetryPolicy, SessionHandle};

use crate::agent::AgentLoop;
use crate::assemble::{assemble, InvocationResult};
use crate::prompts::system_prompt;

/// The top-level facade: wires normalization, the sandbox session, the
/// toolbox, and the agent loop together for one question at a time.
///
/// Each `invoke` call is independent: fresh tables, a fresh session, a
/// fresh transcript.  The analyzer itself holds only configuration and
/// backend handles, so one instance can serve calls sequentially.
pub struct Analyzer {
    config: Arc<Config>,
    model: Arc<dyn ModelProvider>,
    sandbox: Arc<dyn Sandbox>,
    store: Arc<dyn ObjectStore>,
}

impl Analyzer {
    pub fn new(
        config: Arc<Config>,
        model: Arc<dyn ModelProvider>,
        sandbox: Arc<dyn Sandbox>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self { config, model, sandbox, store }
    }

    /// Answer one question about the given sources (logical name → URI).
    ///
    /// Never returns early with an error: faults are reported through the
    /// result's status, and the sandbox session is released on every exit
    /// path, including cancellation.
    pub async fn invoke(
        &self,
        question: &str,
        sources: &[(String, String)],
        cancel: Option<oneshot::Receiver<()>>,
    ) -> InvocationResult {
        let ingested = normalize(sources, self.store.as_ref()).await;
        info!(
            tables = ingested.tables.len(),
            failures = ingested.failures.len(),
            "sources normalized"
        );

        // Nothing to analyze: fail fast with the per-source failures
        // instead of asking the model to reason over an empty table set.
        if ingested.tables.is_empty() {
            let reason = "no tables could be loaded".to_string();
            let mut transcript = crate::Transcript::new();
            transcript.record_user(question);
            let outcome = crate::LoopOutcome {
                output: reason.clone(),
                status: crate::InvocationStatus::Failed { reason },
                transcript,
            };
            return assemble(outcome, &ingested.tables, &ingested.failures, vec![]);
        }

        let session = Arc::new(SessionHandle::new(
            self.sandbox.clone(),
            ingested.tables.clone(),
            RetryPolicy::from_agent(&self.config.agent),
        ));
        let sink = chart_sink();
        let registry = standard_registry(
            session.clone(),
            self.store.clone(),
            &self.config.storage.chart_prefix,
            sink.clone(),
        );

        let prompt = system_prompt(
            &self.config.agent,
            &ingested.tables,
            Utc::now().date_naive(),
        );
        let agent = AgentLoop::new(
            self.model.clone(),
            Arc::new(registry),
            Arc::new(self.config.agent.clone()),
        );

        let outcome = agent.run(&prompt, question, cancel).await;
        session.release().await;

        let charts = std::mem::take(&mut *sink.lock().unwrap());
        assemble(outcome, &ingested.tables, &ingested.failures, charts)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
