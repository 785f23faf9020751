// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT

//! The agent core: prompt construction, the model ↔ tool loop, and the
//! invocation facade that ties ingestion, sandbox, and storage together.

mod agent;
mod assemble;
mod context;
mod invocation;
mod prompts;
mod transcript;

pub use agent::{AgentLoop, InvocationStatus, LoopOutcome};
pub use assemble::{assemble, ChartRef, FailedSource, InvocationResult};
pub use context::grounding_summary;
pub use invocation::Analyzer;
pub use prompts::system_prompt;
pub use transcript::{IntermediateStep, Step, Transcript};
