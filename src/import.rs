//! Replay of a snapshot into a target store.
//!
//! Entities are written in dependency order (visits, actions, links,
//! conversions) so referenced rows exist before referencing rows when the
//! target enforces foreign keys. Each row is replaced delete-then-insert by
//! its identity, which makes a re-run converge to the same end state
//! instead of failing on duplicate keys. There is no overarching
//! transaction: a failure aborts the run and leaves earlier writes
//! committed.

use tracing::info;

use crate::error::{PorterError, PorterResult};
use crate::models::{ActionLinkRow, ConversionRow, VisitRow};
use crate::snapshot::Snapshot;
use crate::store::VisitStore;

/// Rows written per entity by a completed import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub visits: usize,
    pub actions: usize,
    pub action_links: usize,
    pub conversions: usize,
}

/// Replays `snapshot` into `store`. Idempotent: importing the same snapshot
/// twice yields the same end state as importing it once.
pub async fn import(store: &dyn VisitStore, snapshot: &Snapshot) -> PorterResult<ImportResult> {
    let mut result = ImportResult::default();

    for visit in &snapshot.log_visit {
        let row = VisitRow::try_from(visit)?;
        store
            .replace_visit(&row)
            .await
            .map_err(|source| PorterError::WriteFailure {
                table: "log_visit",
                identity: visit.idvisit.to_string(),
                source,
            })?;
        result.visits += 1;
    }
    info!(count = result.visits, "imported visits");

    for action in &snapshot.log_action {
        store
            .replace_action(action)
            .await
            .map_err(|source| PorterError::WriteFailure {
                table: "log_action",
                identity: action.idaction.to_string(),
                source,
            })?;
        result.actions += 1;
    }
    info!(count = result.actions, "imported actions");

    for link in &snapshot.log_link_visit_action {
        let row = ActionLinkRow::try_from(link)?;
        store
            .replace_action_link(&row)
            .await
            .map_err(|source| PorterError::WriteFailure {
                table: "log_link_visit_action",
                identity: link.idlink_va.to_string(),
                source,
            })?;
        result.action_links += 1;
    }
    info!(count = result.action_links, "imported visit-action-links");

    for conversion in &snapshot.log_conversion {
        let row = ConversionRow::try_from(conversion)?;
        store
            .replace_conversion(&row)
            .await
            .map_err(|source| PorterError::WriteFailure {
                table: "log_conversion",
                identity: format!("({}, {})", conversion.idvisit, conversion.server_time),
                source,
            })?;
        result.conversions += 1;
    }
    info!(count = result.conversions, "imported conversions");

    Ok(result)
}
