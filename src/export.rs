//! Read-only extraction of a time-bounded slice of visit data.
//!
//! The root set is the visits in the date range; action links, actions, and
//! conversions are pulled in by following foreign keys through the chunked
//! planner, so the snapshot is referentially complete by construction. The
//! four reads are not wrapped in one transaction; concurrent writers can
//! cause minor skew between tables.

use chrono::NaiveDate;
use tracing::info;

use crate::error::{PorterError, PorterResult};
use crate::models::{Action, ActionLink, Conversion, Visit};
use crate::planner;
use crate::snapshot::Snapshot;
use crate::store::VisitStore;

/// Exports all visits whose first action time falls within the inclusive
/// date range, plus every row they reference.
///
/// An empty root set yields an empty snapshot, not an error.
pub async fn export(
    store: &dyn VisitStore,
    start_date: NaiveDate,
    end_date: NaiveDate,
    chunk_size: usize,
) -> PorterResult<Snapshot> {
    let start = format!("{} 00:00:00", start_date.format("%Y-%m-%d"));
    let end = format!("{} 23:59:59", end_date.format("%Y-%m-%d"));

    let visits: Vec<Visit> = store
        .visits_between(&start, &end)
        .await
        .map_err(|source| PorterError::QueryFailure {
            table: "log_visit",
            chunk: None,
            source,
        })?
        .into_iter()
        .map(Visit::from)
        .collect();
    info!(count = visits.len(), "got visits");

    let idvisits: Vec<i64> = visits.iter().map(|v| v.idvisit).collect();

    let links: Vec<ActionLink> = planner::fetch_by_keys(
        "log_link_visit_action",
        idvisits.iter().map(|id| Some(*id)),
        chunk_size,
        |chunk| async move { store.links_for_visits(&chunk).await },
    )
    .await?
    .into_iter()
    .map(ActionLink::from)
    .collect();
    info!(count = links.len(), "got visit-action-links");

    let actions: Vec<Action> = planner::fetch_by_keys(
        "log_action",
        links.iter().flat_map(|link| link.action_refs()),
        chunk_size,
        |chunk| async move { store.actions_by_ids(&chunk).await },
    )
    .await?;
    info!(count = actions.len(), "got actions");

    let conversions: Vec<Conversion> = planner::fetch_by_keys(
        "log_conversion",
        idvisits.iter().map(|id| Some(*id)),
        chunk_size,
        |chunk| async move { store.conversions_for_visits(&chunk).await },
    )
    .await?
    .into_iter()
    .map(Conversion::from)
    .collect();
    info!(count = conversions.len(), "got conversions");

    Ok(Snapshot::new(visits, actions, links, conversions))
}
