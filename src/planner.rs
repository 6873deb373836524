//! Chunked key-set fetching.
//!
//! Dependent lookups during export can reference tens of thousands of keys;
//! a single `IN (...)` list that size runs into store-side query limits.
//! The planner splits a key set into bounded chunks, runs one query per
//! chunk strictly in sequence, and concatenates the results.

use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;

use crate::error::{PorterError, PorterResult};

/// Default number of keys per query, matching the store-safe limit the
/// exporter has always used.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Fetches the rows whose key is in `keys`, at most `chunk_size` keys per
/// query.
///
/// Absent keys are dropped and duplicates collapse to their first
/// occurrence, so each key lands in exactly one chunk and chunk composition
/// is deterministic. A failing chunk aborts the whole fetch; the error
/// carries the table name and the zero-based chunk index.
pub async fn fetch_by_keys<K, R, F, Fut>(
    table: &'static str,
    keys: impl IntoIterator<Item = Option<K>>,
    chunk_size: usize,
    mut fetch: F,
) -> PorterResult<Vec<R>>
where
    K: Eq + Hash + Copy,
    F: FnMut(Vec<K>) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<R>>>,
{
    let chunk_size = chunk_size.max(1);

    let mut seen = HashSet::new();
    let mut deduplicated = Vec::new();
    for key in keys.into_iter().flatten() {
        if seen.insert(key) {
            deduplicated.push(key);
        }
    }

    let mut rows = Vec::new();
    for (index, chunk) in deduplicated.chunks(chunk_size).enumerate() {
        let fetched = fetch(chunk.to_vec())
            .await
            .map_err(|source| PorterError::QueryFailure {
                table,
                chunk: Some(index),
                source,
            })?;
        rows.extend(fetched);
    }
    Ok(rows)
}
