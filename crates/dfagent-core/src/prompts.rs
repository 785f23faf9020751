// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use chrono::NaiveDate;

use dfagent_config::AgentConfig;
use dfagent_ingest::TableSet;

use crate::context::grounding_summary;

const INSTRUCTIONS: &str = "\
You are a data analyst. Answer the user's question about the loaded tables \
by writing Python and running it with the tools provided.

Rules:
- Use only the tools listed; do not assume any other capability exists.
- Ground every claim in executed code. Never fabricate numbers, column \
names, or table contents.
- Prefer small runnable steps over long speculative scripts; read the \
output of each step before the next.
- If code fails, read the error and correct your code instead of retrying \
it unchanged.
- Tables are loaded as pandas DataFrames named after each table, and the \
same data is available as CSV files ({name}.csv).
- To keep a chart, write it to a file and persist it with the save_chart \
tool; mention its returned URL in your answer.
- Do not reveal internal identifiers such as session ids.
- When you know the answer, state it directly as plain text.";

/// Build the system instruction for one invocation.
///
/// A configured `system_prompt` replaces the built-in instruction text;
/// the date line and the table summary are always appended, since the
/// model has no other source for either.
pub fn system_prompt(cfg: &AgentConfig, tables: &TableSet, today: NaiveDate) -> String {
    let instructions = cfg.system_prompt.as_deref().unwrap_or(INSTRUCTIONS);
    format!(
        "{instructions}\n\nToday's date is {}.\n\nLoaded tables:\n{}",
        today.format("%Y-%m-%d"),
        grounding_summary(tables, cfg.sample_rows),
    )
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
