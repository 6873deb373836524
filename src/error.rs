use thiserror::Error;

use crate::codec::MalformedEncoding;

/// Failures surfaced by the export/import pipeline.
///
/// None of these are retried or rolled back by the library; the caller
/// decides whether to re-run (import is idempotent, export is read-only).
#[derive(Debug, Error)]
pub enum PorterError {
    /// A read against the store failed. `chunk` is the zero-based index of
    /// the failing chunk when the query went through the batch planner.
    #[error("query against {table} failed{}: {source}", .chunk.map(|c| format!(" (chunk {c})")).unwrap_or_default())]
    QueryFailure {
        table: &'static str,
        chunk: Option<usize>,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    MalformedEncoding(#[from] MalformedEncoding),

    /// The interchange document is missing, unreadable, or has the wrong
    /// shape. No database writes are attempted once this is raised.
    #[error("invalid interchange document: {0}")]
    InvalidDocument(String),

    /// A delete or insert failed during import. Rows written before this
    /// point stay committed.
    #[error("write to {table} failed for identity {identity}: {source}")]
    WriteFailure {
        table: &'static str,
        identity: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type PorterResult<T> = Result<T, PorterError>;
