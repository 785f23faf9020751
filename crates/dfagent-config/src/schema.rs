// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider identifier: "openai" (any OpenAI-compatible endpoint) or "mock".
    pub provider: String,
    /// Model name forwarded to the provider API.
    pub name: String,
    /// Environment variable that holds the API key (read at runtime).
    pub api_key_env: Option<String>,
    /// Explicit API key; prefer api_key_env in config files to avoid secrets
    /// in version-controlled files.
    pub api_key: Option<String>,
    /// Base URL override.  Useful for local proxies or compatible gateways.
    pub base_url: Option<String>,
    /// Maximum tokens to request in a single completion.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.  The analysis workload wants reproducible code,
    /// so the default is 0.0.
    #[serde(default)]
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            name: "gpt-4.1".into(),
            api_key_env: Some("OPENAI_API_KEY".into()),
            api_key: None,
            base_url: None,
            max_tokens: None,
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum loop iterations before a forced stop.  Every model turn counts,
    /// including turns whose output could not be parsed.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Number of leading rows included per table in the grounding summary.
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
    /// Transport-level retries for model and sandbox calls (content-level
    /// errors are never retried here; the model sees those as observations).
    #[serde(default = "default_transport_retries")]
    pub transport_retries: u32,
    /// Base delay for exponential backoff between transport retries.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Timeout for a single model completion call.
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,
    /// Timeout for a single sandbox execute call.
    #[serde(default = "default_sandbox_timeout_secs")]
    pub sandbox_timeout_secs: u64,
    /// Replace the built-in system instruction entirely.
    pub system_prompt: Option<String>,
}

fn default_max_iterations() -> u32 { 15 }
fn default_sample_rows() -> usize { 5 }
fn default_transport_retries() -> u32 { 2 }
fn default_retry_backoff_ms() -> u64 { 500 }
fn default_model_timeout_secs() -> u64 { 120 }
fn default_sandbox_timeout_secs() -> u64 { 300 }

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            sample_rows: default_sample_rows(),
            transport_retries: default_transport_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            model_timeout_secs: default_model_timeout_secs(),
            sandbox_timeout_secs: default_sandbox_timeout_secs(),
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Base URL of the code-execution service.
    #[serde(default = "default_sandbox_url")]
    pub base_url: String,
    /// Environment variable that holds the sandbox auth token, if any.
    pub auth_token_env: Option<String>,
}

fn default_sandbox_url() -> String { "http://localhost:8194".into() }

impl Default for SandboxConfig {
    fn default() -> Self {
        Self { base_url: default_sandbox_url(), auth_token_env: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the object storage gateway used for chart uploads.
    #[serde(default = "default_storage_url")]
    pub base_url: String,
    /// Key prefix under which chart artifacts are stored.  The invocation's
    /// session id is appended, so two invocations never share a namespace.
    #[serde(default = "default_chart_prefix")]
    pub chart_prefix: String,
}

fn default_storage_url() -> String { "http://localhost:9000".into() }
fn default_chart_prefix() -> String { "charts".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_storage_url(),
            chart_prefix: default_chart_prefix(),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
