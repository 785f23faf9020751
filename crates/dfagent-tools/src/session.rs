// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use dfagent_config::AgentConfig;
use dfagent_ingest::TableSet;
use dfagent_sandbox::{ExecOutcome, Sandbox, SessionId};

/// Transport-level retry settings shared by model and sandbox calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn from_agent(cfg: &AgentConfig) -> Self {
        Self { retries: cfg.transport_retries, backoff_ms: cfg.retry_backoff_ms }
    }

    pub fn none() -> Self {
        Self { retries: 0, backoff_ms: 0 }
    }
}

/// Run `f` up to `retries + 1` times, doubling the backoff delay after each
/// transport failure.  Only `Err` triggers a retry; content-level failures
/// arrive inside `Ok` values and are never retried here.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = policy.backoff_ms;
    let mut last_err = None;
    for attempt in 0..=policy.retries {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(what, attempt, error = %e, "transport failure");
                last_err = Some(e);
                if attempt < policy.retries {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    delay = delay.saturating_mul(2);
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{what} failed")))
        .with_context(|| format!("{what} failed after {} attempts", policy.retries + 1))
}

/// Lazily opened sandbox session shared by all tools of one invocation.
///
/// The session opens on first use, is seeded with the invocation's tables
/// as CSV files (plus pandas frames named after them), and must be
/// released exactly once when the invocation ends, on every exit path.
pub struct SessionHandle {
    sandbox: Arc<dyn Sandbox>,
    tables: TableSet,
    retry: RetryPolicy,
    current: Mutex<Option<SessionId>>,
}

impl SessionHandle {
    pub fn new(sandbox: Arc<dyn Sandbox>, tables: TableSet, retry: RetryPolicy) -> Self {
        Self { sandbox, tables, retry, current: Mutex::new(None) }
    }

    /// The live session id, opening and seeding a session if none exists.
    pub async fn acquire(&self) -> Result<SessionId> {
        let mut current = self.current.lock().await;
        if let Some(id) = current.as_ref() {
            return Ok(id.clone());
        }

        let id = with_retry(&self.retry, "sandbox open_session", || {
            self.sandbox.open_session()
        })
        .await?;
        info!(session = %id, tables = self.tables.len(), "sandbox session opened");

        self.seed(&id).await?;
        *current = Some(id.clone());
        Ok(id)
    }

    /// Run a snippet in the shared session, opening it if needed.
    pub async fn run(&self, code: &str) -> Result<ExecOutcome> {
        let id = self.acquire().await?;
        with_retry(&self.retry, "sandbox execute", || {
            self.sandbox.execute(&id, code)
        })
        .await
    }

    /// Close the session if one was opened.  Close failures are logged and
    /// swallowed: the remote side reaps idle sessions on its own.
    pub async fn release(&self) {
        let mut current = self.current.lock().await;
        if let Some(id) = current.take() {
            if let Err(e) = self.sandbox.close_session(&id).await {
                warn!(session = %id, error = %e, "failed to close sandbox session");
            } else {
                debug!(session = %id, "sandbox session released");
            }
        }
    }

    pub async fn is_open(&self) -> bool {
        self.current.lock().await.is_some()
    }

    /// Upload every table as `{name}.csv` and load it into a pandas frame
    /// of the same name, so generated code can use either form.
    async fn seed(&self, id: &SessionId) -> Result<()> {
        if self.tables.is_empty() {
            return Ok(());
        }

        let mut bootstrap = String::from("import pandas as pd\n");
        for table in self.tables.iter() {
            let path = format!("{}.csv", table.name);
            self.sandbox
                .write_file(id, &path, Bytes::from(table.to_csv()))
                .await
                .with_context(|| format!("failed to upload table '{}'", table.name))?;
            if is_identifier(&table.name) {
                bootstrap.push_str(&format!("{} = pd.read_csv('{path}')\n", table.name));
            }
        }

        let outcome = with_retry(&self.retry, "sandbox seed", || {
            self.sandbox.execute(id, &bootstrap)
        })
        .await?;
        if outcome.is_error {
            bail!("failed to load tables into the session: {}", outcome.rendered());
        }
        debug!(session = %id, "session seeded");
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
