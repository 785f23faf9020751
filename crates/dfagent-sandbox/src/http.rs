// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;

use dfagent_config::{Config, SandboxConfig};

use crate::{ExecOutcome, Sandbox, SessionId};

/// Sandbox backed by an HTTP code-interpreter service.
///
/// Wire surface:
///   POST   {base}/sessions                     → { "session_id": "..." }
///   POST   {base}/sessions/{id}/execute        { "code": "..." }
///                                              → { stdout, stderr, is_error }
///   PUT    {base}/sessions/{id}/files/{path}   raw bytes
///   DELETE {base}/sessions/{id}
pub struct HttpSandbox {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

#[derive(Deserialize)]
struct SessionResponse {
    session_id: String,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    is_error: bool,
}

impl HttpSandbox {
    pub fn new(cfg: &SandboxConfig, timeout_secs: u64) -> Result<Self> {
        let auth_token = match &cfg.auth_token_env {
            Some(var) => Some(
                std::env::var(var)
                    .with_context(|| format!("sandbox auth token env var '{var}' is not set"))?,
            ),
            None => None,
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build sandbox HTTP client")?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(&cfg.sandbox, cfg.agent.sandbox_timeout_secs)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }
        req
    }
}

#[async_trait]
impl Sandbox for HttpSandbox {
    async fn open_session(&self) -> Result<SessionId> {
        let response = self
            .request(reqwest::Method::POST, "/sessions")
            .send()
            .await
            .context("sandbox unreachable while opening session")?;
        if !response.status().is_success() {
            bail!("sandbox refused to open a session: HTTP {}", response.status());
        }
        let body: SessionResponse = response
            .json()
            .await
            .context("malformed session response from sandbox")?;
        debug!(session = %body.session_id, "sandbox session opened");
        Ok(SessionId(body.session_id))
    }

    async fn execute(&self, session: &SessionId, code: &str) -> Result<ExecOutcome> {
        let response = self
            .request(reqwest::Method::POST, &format!("/sessions/{session}/execute"))
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await
            .context("sandbox unreachable during execute")?;
        if !response.status().is_success() {
            bail!("sandbox execute failed: HTTP {}", response.status());
        }
        let body: ExecuteResponse = response
            .json()
            .await
            .context("malformed execute response from sandbox")?;
        Ok(ExecOutcome {
            stdout: body.stdout,
            stderr: body.stderr,
            is_error: body.is_error,
        })
    }

    async fn write_file(&self, session: &SessionId, path: &str, bytes: Bytes) -> Result<()> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/sessions/{session}/files/{path}"),
            )
            .body(bytes)
            .send()
            .await
            .context("sandbox unreachable during file upload")?;
        if !response.status().is_success() {
            bail!("sandbox rejected file '{path}': HTTP {}", response.status());
        }
        Ok(())
    }

    async fn close_session(&self, session: &SessionId) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/sessions/{session}"))
            .send()
            .await
            .context("sandbox unreachable while closing session")?;
        if !response.status().is_success() {
            bail!("sandbox failed to close session: HTTP {}", response.status());
        }
        debug!(%session, "sandbox session closed");
        Ok(())
    }
}
