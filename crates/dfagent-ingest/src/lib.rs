// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
mod table;
mod error;
mod normalize;

pub use table::{Column, ColumnType, Table, TableSet};
pub use error::IngestError;
pub use normalize::{normalize, NormalizeOutcome, SourceFailure};
