//! The snapshot value type and its interchange serialization.
//!
//! The interchange document is a single JSON object with one ordered
//! sequence of rows per table, keyed by the logical table name, plus a
//! `format_version` field. Documents written before versioning existed are
//! read as version 1.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PorterError, PorterResult};
use crate::models::{Action, ActionLink, Conversion, Visit};

pub const FORMAT_VERSION: u32 = 1;

fn default_format_version() -> u32 {
    1
}

/// The complete in-memory bundle of exported rows for one run. Immutable
/// once produced; import only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub log_visit: Vec<Visit>,
    pub log_action: Vec<Action>,
    pub log_link_visit_action: Vec<ActionLink>,
    pub log_conversion: Vec<Conversion>,
}

/// Per-entity record counts, for logging and result reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityCounts {
    pub visits: usize,
    pub actions: usize,
    pub action_links: usize,
    pub conversions: usize,
}

impl Snapshot {
    pub fn new(
        visits: Vec<Visit>,
        actions: Vec<Action>,
        action_links: Vec<ActionLink>,
        conversions: Vec<Conversion>,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            log_visit: visits,
            log_action: actions,
            log_link_visit_action: action_links,
            log_conversion: conversions,
        }
    }

    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            visits: self.log_visit.len(),
            actions: self.log_action.len(),
            action_links: self.log_link_visit_action.len(),
            conversions: self.log_conversion.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.log_visit.is_empty()
            && self.log_action.is_empty()
            && self.log_link_visit_action.is_empty()
            && self.log_conversion.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> PorterResult<Self> {
        let snapshot: Snapshot = serde_json::from_str(text)
            .map_err(|e| PorterError::InvalidDocument(e.to_string()))?;
        if snapshot.format_version != FORMAT_VERSION {
            return Err(PorterError::InvalidDocument(format!(
                "unsupported format_version {} (expected {})",
                snapshot.format_version, FORMAT_VERSION
            )));
        }
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = self.to_json()?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> PorterResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            PorterError::InvalidDocument(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }
}
