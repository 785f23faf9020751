// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::{ExecOutcome, Sandbox, SessionId};

/// Scripted in-process sandbox for tests.
///
/// `execute` pops outcomes from a queue (falling back to an empty success
/// once the script runs out) and records every snippet it was given, so
/// tests can assert both what the agent ran and that the session was
/// released.
#[derive(Default)]
pub struct MockSandbox {
    state: Mutex<MockState>,
    fail_open: bool,
}

#[derive(Default)]
struct MockState {
    script: VecDeque<ExecOutcome>,
    execute_failures: u32,
    opened: Vec<SessionId>,
    closed: Vec<SessionId>,
    executed: Vec<(SessionId, String)>,
    files: Vec<(SessionId, String, Bytes)>,
}

impl MockSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sandbox whose `execute` yields these outcomes in order.
    pub fn scripted(outcomes: impl IntoIterator<Item = ExecOutcome>) -> Self {
        let sandbox = Self::default();
        sandbox.state.lock().unwrap().script = outcomes.into_iter().collect();
        sandbox
    }

    /// Sandbox whose `open_session` always fails, as if unreachable.
    pub fn failing_open() -> Self {
        Self { state: Mutex::default(), fail_open: true }
    }

    /// Make the next `n` `execute` calls fail at the transport level
    /// before the script resumes.
    pub fn fail_next_executes(&self, n: u32) {
        self.state.lock().unwrap().execute_failures = n;
    }

    /// Every snippet executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.iter().map(|(_, c)| c.clone()).collect()
    }

    /// Paths of files written into any session.
    pub fn files_written(&self) -> Vec<String> {
        self.state.lock().unwrap().files.iter().map(|(_, p, _)| p.clone()).collect()
    }

    pub fn file_bytes(&self, path: &str) -> Option<Bytes> {
        self.state
            .lock()
            .unwrap()
            .files
            .iter()
            .find(|(_, p, _)| p == path)
            .map(|(_, _, b)| b.clone())
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.lock().unwrap().opened.len()
    }

    /// True when every opened session has been closed again.
    pub fn all_sessions_closed(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.opened.iter().all(|s| state.closed.contains(s))
    }
}

#[async_trait]
impl Sandbox for MockSandbox {
    async fn open_session(&self) -> Result<SessionId> {
        if self.fail_open {
            bail!("sandbox unavailable");
        }
        let session = SessionId(Uuid::new_v4().to_string());
        self.state.lock().unwrap().opened.push(session.clone());
        Ok(session)
    }

    async fn execute(&self, session: &SessionId, code: &str) -> Result<ExecOutcome> {
        let mut state = self.state.lock().unwrap();
        if state.execute_failures > 0 {
            state.execute_failures -= 1;
            bail!("connection reset");
        }
        state.executed.push((session.clone(), code.to_string()));
        Ok(state.script.pop_front().unwrap_or_default())
    }

    async fn write_file(&self, session: &SessionId, path: &str, bytes: Bytes) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .files
            .push((session.clone(), path.to_string(), bytes));
        Ok(())
    }

    async fn close_session(&self, session: &SessionId) -> Result<()> {
        self.state.lock().unwrap().closed.push(session.clone());
        Ok(())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
