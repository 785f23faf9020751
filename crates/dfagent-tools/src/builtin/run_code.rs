use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::session::SessionHandle;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// Runs model-written Python in the invocation's shared sandbox session.
///
/// State persists across calls: a frame computed in one step is visible in
/// the next.  Code that raises comes back as an error observation the
/// model can correct; only transport failures abort the invocation.
pub struct RunCodeTool {
    session: Arc<SessionHandle>,
}

impl RunCodeTool {
    pub fn new(session: Arc<SessionHandle>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Tool for RunCodeTool {
    fn name(&self) -> &str {
        "execute_python"
    }

    fn description(&self) -> &str {
        "Execute Python code in a stateful analysis session. The loaded tables are \
         available both as pandas DataFrames named after each table and as CSV files \
         ({name}.csv). Variables persist across calls. Print what you want to see."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python source to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, call: &ToolCall) -> anyhow::Result<ToolOutput> {
        let code = match call.args.get("code").and_then(|v| v.as_str()) {
            Some(c) if !c.trim().is_empty() => c,
            _ => return Ok(ToolOutput::err(&call.id, "missing 'code'")),
        };

        debug!(bytes = code.len(), "execute_python tool");

        let outcome = self.session.run(code).await?;
        let mut content = outcome.rendered();
        if content.is_empty() {
            content = "(no output; print() the values you need)".to_string();
        }
        Ok(if outcome.is_error {
            ToolOutput::err(&call.id, content)
        } else {
            ToolOutput::ok(&call.id, content)
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use dfagent_ingest::TableSet;
    use dfagent_sandbox::{ExecOutcome, MockSandbox};

    use super::*;
    use crate::session::RetryPolicy;

    fn tool_with(sandbox: Arc<MockSandbox>) -> RunCodeTool {
        let session = SessionHandle::new(sandbox, TableSet::new(), RetryPolicy::none());
        RunCodeTool::new(Arc::new(session))
    }

    fn call(args: Value) -> ToolCall {
        ToolCall { id: "c1".into(), name: "execute_python".into(), args }
    }

    #[tokio::test]
    async fn stdout_becomes_the_observation() {
        let sandbox = Arc::new(MockSandbox::scripted([ExecOutcome::ok("42")]));
        let out = tool_with(sandbox)
            .execute(&call(json!({"code": "print(42)"})))
            .await
            .unwrap();
        assert!(!out.is_error);
        assert_eq!(out.content, "42");
    }

    #[tokio::test]
    async fn traceback_is_an_error_observation_not_a_fault() {
        let sandbox = Arc::new(MockSandbox::scripted([ExecOutcome::failed(
            "NameError: name 'salse' is not defined",
        )]));
        let out = tool_with(sandbox)
            .execute(&call(json!({"code": "salse.head()"})))
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.content.contains("NameError"));
    }

    #[tokio::test]
    async fn missing_code_argument_is_rejected() {
        let sandbox = Arc::new(MockSandbox::new());
        let out = tool_with(sandbox).execute(&call(json!({}))).await.unwrap();
        assert!(out.is_error);
        assert!(out.content.contains("missing 'code'"));
    }

    #[tokio::test]
    async fn silent_success_hints_at_print() {
        let sandbox = Arc::new(MockSandbox::scripted([ExecOutcome::default()]));
        let out = tool_with(sandbox)
            .execute(&call(json!({"code": "x = 1"})))
            .await
            .unwrap();
        assert!(!out.is_error);
        assert!(out.content.contains("no output"));
    }
}
