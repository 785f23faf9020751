use async_trait::async_trait;

use crate::{CompletionRequest, ModelTurn};

/// A hosted language model, invoked as a black-box turn generator.
///
/// `generate` is one blocking call per agent-loop iteration.  An `Err` from
/// this method always means a transport-class failure (endpoint unreachable,
/// timeout, malformed HTTP response); content-level problems with what the
/// model said are expressed in the returned [`ModelTurn`] and judged by the
/// loop, not here.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name for status display.
    fn name(&self) -> &str;

    /// Model identifier as reported to users.
    fn model_name(&self) -> &str;

    async fn generate(&self, req: CompletionRequest) -> anyhow::Result<ModelTurn>;
}
