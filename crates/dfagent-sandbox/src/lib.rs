// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT

//! Remote code-execution sandbox.
//!
//! A sandbox runs untrusted, model-written analysis code in an isolated
//! stateful session: variables and files persist across `execute` calls
//! within one session and are gone when it closes.  The host never runs
//! that code itself.

mod http;
mod mock;

pub use http::HttpSandbox;
pub use mock::MockSandbox;

use async_trait::async_trait;
use bytes::Bytes;

/// Opaque handle to one live sandbox session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What one code execution produced.  `is_error` distinguishes code that
/// ran and failed (a tracebacked observation the agent can correct from)
/// from transport errors, which surface as `Err` on the call itself.
#[derive(Debug, Clone, Default)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    pub is_error: bool,
}

impl ExecOutcome {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { stdout: stdout.into(), stderr: String::new(), is_error: false }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self { stdout: String::new(), stderr: stderr.into(), is_error: true }
    }

    /// Render the outcome as observation text for the agent.
    pub fn rendered(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (false, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
            (true, true) => String::new(),
        }
    }
}

/// Stateful remote execution environment.
///
/// Implementations must scope all state to the session: two sessions never
/// observe each other's variables or files.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Start a fresh session.
    async fn open_session(&self) -> anyhow::Result<SessionId>;

    /// Run a snippet inside the session, inheriting its accumulated state.
    async fn execute(&self, session: &SessionId, code: &str) -> anyhow::Result<ExecOutcome>;

    /// Place a file into the session's working directory.
    async fn write_file(
        &self,
        session: &SessionId,
        path: &str,
        bytes: Bytes,
    ) -> anyhow::Result<()>;

    /// Tear the session down.  Idempotent on the remote side.
    async fn close_session(&self, session: &SessionId) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_combines_streams() {
        let both = ExecOutcome {
            stdout: "42".into(),
            stderr: "warning".into(),
            is_error: false,
        };
        assert_eq!(both.rendered(), "42\nwarning");
        assert_eq!(ExecOutcome::ok("hi").rendered(), "hi");
        assert_eq!(ExecOutcome::failed("boom").rendered(), "boom");
        assert_eq!(ExecOutcome::default().rendered(), "");
    }
}
