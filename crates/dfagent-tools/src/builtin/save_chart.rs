use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{debug, warn};

use dfagent_storage::ObjectStore;

use crate::session::SessionHandle;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// A chart persisted during one invocation.
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    pub filename: String,
    pub url: String,
}

/// Shared collector the response assembler drains after the loop ends.
pub type ChartSink = Arc<Mutex<Vec<ChartArtifact>>>;

pub fn chart_sink() -> ChartSink {
    Arc::new(Mutex::new(Vec::new()))
}

/// Persists a chart produced inside the sandbox to object storage, keyed
/// under `{prefix}/{session_id}/{filename}` so invocations never share a
/// namespace.
///
/// The chart arrives either inline as base64 (`data`) or as a `path`
/// inside the session, in which case the bytes are pulled out through the
/// session itself.
pub struct SaveChartTool {
    session: Arc<SessionHandle>,
    store: Arc<dyn ObjectStore>,
    chart_prefix: String,
    sink: ChartSink,
}

impl SaveChartTool {
    pub fn new(
        session: Arc<SessionHandle>,
        store: Arc<dyn ObjectStore>,
        chart_prefix: impl Into<String>,
        sink: ChartSink,
    ) -> Self {
        Self { session, store, chart_prefix: chart_prefix.into(), sink }
    }

    async fn chart_bytes(
        &self,
        call_id: &str,
        data: Option<&str>,
        path: Option<&str>,
    ) -> anyhow::Result<Result<Vec<u8>, ToolOutput>> {
        let encoded = match (data, path) {
            (Some(data), _) => data.trim().to_string(),
            (None, Some(path)) => {
                if path.contains(['\'', '\n']) {
                    return Ok(Err(ToolOutput::err(call_id, "invalid 'path'")));
                }
                let snippet = format!(
                    "import base64\n\
                     with open('{path}', 'rb') as _f:\n    \
                     print(base64.b64encode(_f.read()).decode())\n"
                );
                let outcome = self.session.run(&snippet).await?;
                if outcome.is_error {
                    return Ok(Err(ToolOutput::err(
                        call_id,
                        format!("could not read '{path}': {}", outcome.rendered()),
                    )));
                }
                outcome.stdout.trim().to_string()
            }
            (None, None) => {
                return Ok(Err(ToolOutput::err(
                    call_id,
                    "provide either 'data' (base64) or 'path'",
                )))
            }
        };

        match base64::engine::general_purpose::STANDARD.decode(&encoded) {
            Ok(bytes) if !bytes.is_empty() => Ok(Ok(bytes)),
            Ok(_) => Ok(Err(ToolOutput::err(call_id, "chart is empty"))),
            Err(e) => Ok(Err(ToolOutput::err(call_id, format!("invalid base64: {e}")))),
        }
    }
}

#[async_trait]
impl Tool for SaveChartTool {
    fn name(&self) -> &str {
        "save_chart"
    }

    fn description(&self) -> &str {
        "Persist a chart so it outlives the analysis session. Pass the image either \
         inline as base64 ('data') or as the path of a file you already wrote inside \
         the session ('path'). Returns the stored chart's URL."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Name for the stored chart, e.g. 'revenue.png'"
                },
                "data": {
                    "type": "string",
                    "description": "Base64-encoded image bytes"
                },
                "path": {
                    "type": "string",
                    "description": "Path of an image file inside the session"
                }
            },
            "required": ["filename"]
        })
    }

    async fn execute(&self, call: &ToolCall) -> anyhow::Result<ToolOutput> {
        let filename = call
            .args
            .get("filename")
            .and_then(|v| v.as_str())
            .map(|f| f.rsplit('/').next().unwrap_or(f).to_string())
            .filter(|f| !f.is_empty());
        let Some(filename) = filename else {
            return Ok(ToolOutput::err(&call.id, "missing 'filename'"));
        };
        let data = call.args.get("data").and_then(|v| v.as_str());
        let path = call.args.get("path").and_then(|v| v.as_str());

        let bytes = match self.chart_bytes(&call.id, data, path).await? {
            Ok(bytes) => bytes,
            Err(output) => return Ok(output),
        };

        // Key under the live session id; opens the session if the model
        // saves a chart before running any code.
        let session = self.session.acquire().await?;
        let key = format!("{}/{session}/{filename}", self.chart_prefix);
        debug!(%key, size = bytes.len(), "save_chart tool");

        match self.store.store(&key, Bytes::from(bytes)).await {
            Ok(url) => {
                self.sink
                    .lock()
                    .unwrap()
                    .push(ChartArtifact { filename: filename.clone(), url: url.clone() });
                Ok(ToolOutput::ok(&call.id, format!("chart saved: {url}")))
            }
            Err(e) => {
                warn!(%key, error = %e, "chart upload failed");
                Ok(ToolOutput::err(&call.id, format!("failed to store chart: {e}")))
            }
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use dfagent_ingest::TableSet;
    use dfagent_sandbox::{ExecOutcome, MockSandbox};
    use dfagent_storage::MemoryStore;

    use super::*;
    use crate::session::RetryPolicy;

    const PNG_B64: &str = "iVBORw0KGgo=";

    fn setup(sandbox: Arc<MockSandbox>, store: Arc<MemoryStore>) -> (SaveChartTool, ChartSink) {
        let session = Arc::new(SessionHandle::new(
            sandbox,
            TableSet::new(),
            RetryPolicy::none(),
        ));
        let sink = chart_sink();
        let tool = SaveChartTool::new(session, store, "charts", sink.clone());
        (tool, sink)
    }

    fn call(args: Value) -> ToolCall {
        ToolCall { id: "c1".into(), name: "save_chart".into(), args }
    }

    #[tokio::test]
    async fn inline_base64_chart_is_stored_under_session_key() {
        let store = Arc::new(MemoryStore::new());
        let (tool, sink) = setup(Arc::new(MockSandbox::new()), store.clone());

        let out = tool
            .execute(&call(json!({"filename": "rev.png", "data": PNG_B64})))
            .await
            .unwrap();

        assert!(!out.is_error);
        let keys = store.stored_keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("charts/"));
        assert!(keys[0].ends_with("/rev.png"));
        let charts = sink.lock().unwrap();
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].filename, "rev.png");
        assert!(out.content.contains(&charts[0].url));
    }

    #[tokio::test]
    async fn sandbox_path_is_pulled_through_the_session() {
        let sandbox = Arc::new(MockSandbox::scripted([ExecOutcome::ok(format!(
            "{PNG_B64}\n"
        ))]));
        let store = Arc::new(MemoryStore::new());
        let (tool, _) = setup(sandbox.clone(), store.clone());

        let out = tool
            .execute(&call(json!({"filename": "rev.png", "path": "rev.png"})))
            .await
            .unwrap();

        assert!(!out.is_error);
        assert!(sandbox.executed()[0].contains("b64encode"));
        assert_eq!(store.stored_keys().len(), 1);
    }

    #[tokio::test]
    async fn unreadable_path_is_a_recoverable_error() {
        let sandbox = Arc::new(MockSandbox::scripted([ExecOutcome::failed(
            "FileNotFoundError: rev.png",
        )]));
        let (tool, sink) = setup(sandbox, Arc::new(MemoryStore::new()));

        let out = tool
            .execute(&call(json!({"filename": "rev.png", "path": "rev.png"})))
            .await
            .unwrap();

        assert!(out.is_error);
        assert!(sink.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_failure_is_a_recoverable_error() {
        let store = Arc::new(MemoryStore::failing_uploads());
        let (tool, sink) = setup(Arc::new(MockSandbox::new()), store);

        let out = tool
            .execute(&call(json!({"filename": "rev.png", "data": PNG_B64})))
            .await
            .unwrap();

        assert!(out.is_error);
        assert!(out.content.contains("failed to store chart"));
        assert!(sink.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_payload_is_rejected() {
        let (tool, _) = setup(Arc::new(MockSandbox::new()), Arc::new(MemoryStore::new()));
        let out = tool.execute(&call(json!({"filename": "rev.png"}))).await.unwrap();
        assert!(out.is_error);
        assert!(out.content.contains("'data'"));
    }

    #[tokio::test]
    async fn filename_is_reduced_to_its_basename() {
        let store = Arc::new(MemoryStore::new());
        let (tool, _) = setup(Arc::new(MockSandbox::new()), store.clone());
        tool.execute(&call(json!({"filename": "../../etc/rev.png", "data": PNG_B64})))
            .await
            .unwrap();
        assert!(store.stored_keys()[0].ends_with("/rev.png"));
        assert!(!store.stored_keys()[0].contains(".."));
    }
}
