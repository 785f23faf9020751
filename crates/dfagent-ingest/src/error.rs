use thiserror::Error;

/// Per-source ingestion failures.  None of these abort the batch: the
/// normalizer reports them next to whatever tables did load, so a single
/// bad upload never obscures which source failed.
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    /// The storage backend could not deliver the bytes.
    #[error("failed to load source '{name}': {reason}")]
    SourceLoad { name: String, reason: String },

    /// The URI's extension is not one of csv / parquet / json / xlsx / xls.
    #[error("unsupported format '.{extension}' for source '{name}'")]
    UnsupportedFormat { name: String, extension: String },

    /// The bytes arrived but could not be parsed as the declared format.
    #[error("failed to parse source '{name}': {reason}")]
    Parse { name: String, reason: String },
}

impl IngestError {
    /// The logical source name this error is scoped to.
    pub fn source_name(&self) -> &str {
        match self {
            Self::SourceLoad { name, .. }
            | Self::UnsupportedFormat { name, .. }
            | Self::Parse { name, .. } => name,
        }
    }
}
