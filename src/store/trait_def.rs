use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Action, ActionLinkRow, ConversionRow, VisitRow};

/// Narrow contract the pipeline needs from a relational store.
///
/// Implementations own connection management and physical table naming
/// (prefixing); callers pass logical names only. All statements are
/// parameterized; identifier lists arrive pre-chunked from the planner, so
/// a single call never exceeds the configured chunk size.
#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Create the four log tables when absent.
    async fn init(&self) -> Result<()>;

    /// Visits whose first action time falls in `[start, end]`, inclusive on
    /// both ends. Timestamps are `YYYY-MM-DD HH:MM:SS` text.
    async fn visits_between(&self, start: &str, end: &str) -> Result<Vec<VisitRow>>;

    /// Action links for one chunk of visit ids.
    async fn links_for_visits(&self, idvisits: &[i64]) -> Result<Vec<ActionLinkRow>>;

    /// Actions for one chunk of action ids.
    async fn actions_by_ids(&self, idactions: &[i64]) -> Result<Vec<Action>>;

    /// Conversions for one chunk of visit ids.
    async fn conversions_for_visits(&self, idvisits: &[i64]) -> Result<Vec<ConversionRow>>;

    /// Delete any row with the same `idvisit`, then insert this one. The
    /// two statements commit independently (no surrounding transaction).
    async fn replace_visit(&self, visit: &VisitRow) -> Result<()>;

    /// Delete-then-insert by `idaction`.
    async fn replace_action(&self, action: &Action) -> Result<()>;

    /// Delete-then-insert by `idlink_va`.
    async fn replace_action_link(&self, link: &ActionLinkRow) -> Result<()>;

    /// Delete-then-insert by the composite `(idvisit, server_time)`.
    async fn replace_conversion(&self, conversion: &ConversionRow) -> Result<()>;
}
