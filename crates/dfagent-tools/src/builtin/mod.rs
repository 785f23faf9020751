pub mod run_code;
pub mod save_chart;

use std::sync::Arc;

use dfagent_storage::ObjectStore;

use crate::registry::ToolRegistry;
use crate::session::SessionHandle;
use run_code::RunCodeTool;
use save_chart::{ChartSink, SaveChartTool};

/// The standard analysis toolbox: one code-execution tool, one chart
/// persistence tool, both bound to the same shared session.
pub fn standard_registry(
    session: Arc<SessionHandle>,
    store: Arc<dyn ObjectStore>,
    chart_prefix: &str,
    sink: ChartSink,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(RunCodeTool::new(session.clone()));
    registry.register(SaveChartTool::new(session, store, chart_prefix, sink));
    registry
}
