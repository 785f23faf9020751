mod types;
mod provider;
mod openai;
mod mock;

pub use types::*;
pub use provider::ModelProvider;
pub use openai::OpenAiProvider;
pub use mock::{MockProvider, ScriptedMockProvider};

use anyhow::bail;
use dfagent_config::ModelConfig;

/// Construct a boxed [`ModelProvider`] from configuration.
///
/// Provider selection:
/// - `"openai"` → [`OpenAiProvider`] (any OpenAI-compatible endpoint via
///   `base_url`)
/// - `"mock"` → [`MockProvider`] (echo-back; useful for smoke tests)
pub fn from_config(cfg: &ModelConfig) -> anyhow::Result<Box<dyn ModelProvider>> {
    let key = resolve_api_key(cfg);
    match cfg.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiProvider::new(
            cfg.name.clone(),
            key,
            cfg.base_url.clone(),
            cfg.max_tokens,
            cfg.temperature,
        ))),
        "mock" => Ok(Box::new(MockProvider)),
        other => bail!("unknown model provider: {other}"),
    }
}

fn resolve_api_key(cfg: &ModelConfig) -> Option<String> {
    if let Some(k) = &cfg.api_key {
        return Some(k.clone());
    }
    if let Some(env) = &cfg.api_key_env {
        return std::env::var(env).ok();
    }
    None
}
