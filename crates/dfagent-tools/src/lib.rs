// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT

//! Tools the model may call during an analysis invocation, plus the shared
//! sandbox session they run against.

mod tool;
mod registry;
mod session;
pub mod builtin;

pub use tool::{Tool, ToolCall, ToolOutput};
pub use registry::{ToolRegistry, ToolSchema};
pub use session::{with_retry, RetryPolicy, SessionHandle};
pub use builtin::save_chart::{chart_sink, ChartArtifact, ChartSink};
pub use builtin::standard_registry;
