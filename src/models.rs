//! Entity types for the four analytics log tables.
//!
//! Tables with binary identifier columns get two representations: the `*Row`
//! type mirrors the stored row (`Vec<u8>` for binary columns) and the
//! snapshot type carries those columns as lowercase hex text so the
//! interchange document stays purely textual. `log_action` has no binary
//! columns and uses a single type both ways.

use serde::{Deserialize, Serialize};

use crate::codec::{self, MalformedEncoding};

/// `log_visit` as stored.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct VisitRow {
    pub idvisit: i64,
    pub idsite: i64,
    pub idvisitor: Vec<u8>,
    pub visit_first_action_time: String,
    pub visit_last_action_time: String,
    pub config_id: Vec<u8>,
    pub location_ip: Vec<u8>,
    pub visit_total_actions: i64,
    pub visit_total_time: i64,
}

/// One browsing session, binary columns hex-encoded for transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub idvisit: i64,
    pub idsite: i64,
    pub idvisitor: String,
    pub visit_first_action_time: String,
    pub visit_last_action_time: String,
    pub config_id: String,
    pub location_ip: String,
    pub visit_total_actions: i64,
    pub visit_total_time: i64,
}

impl From<VisitRow> for Visit {
    fn from(row: VisitRow) -> Self {
        Self {
            idvisit: row.idvisit,
            idsite: row.idsite,
            idvisitor: codec::encode(&row.idvisitor),
            visit_first_action_time: row.visit_first_action_time,
            visit_last_action_time: row.visit_last_action_time,
            config_id: codec::encode(&row.config_id),
            location_ip: codec::encode(&row.location_ip),
            visit_total_actions: row.visit_total_actions,
            visit_total_time: row.visit_total_time,
        }
    }
}

impl TryFrom<&Visit> for VisitRow {
    type Error = MalformedEncoding;

    fn try_from(visit: &Visit) -> Result<Self, Self::Error> {
        Ok(Self {
            idvisit: visit.idvisit,
            idsite: visit.idsite,
            idvisitor: codec::decode(&visit.idvisitor)?,
            visit_first_action_time: visit.visit_first_action_time.clone(),
            visit_last_action_time: visit.visit_last_action_time.clone(),
            config_id: codec::decode(&visit.config_id)?,
            location_ip: codec::decode(&visit.location_ip)?,
            visit_total_actions: visit.visit_total_actions,
            visit_total_time: visit.visit_total_time,
        })
    }
}

/// `log_action`: a page view, event, or other named action. Same shape in
/// the store and in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Action {
    pub idaction: i64,
    pub name: Option<String>,
    pub hash: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub action_type: i64,
    pub url_prefix: Option<i64>,
}

/// `log_link_visit_action` as stored.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ActionLinkRow {
    pub idlink_va: i64,
    pub idsite: i64,
    pub idvisitor: Vec<u8>,
    pub idvisit: i64,
    pub server_time: String,
    pub idaction_url_ref: Option<i64>,
    pub idaction_name_ref: Option<i64>,
    pub idaction_name: Option<i64>,
    pub idaction_url: Option<i64>,
    pub time_spent_ref_action: i64,
}

/// Join record between a visit and the actions performed during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLink {
    pub idlink_va: i64,
    pub idsite: i64,
    pub idvisitor: String,
    pub idvisit: i64,
    pub server_time: String,
    pub idaction_url_ref: Option<i64>,
    pub idaction_name_ref: Option<i64>,
    pub idaction_name: Option<i64>,
    pub idaction_url: Option<i64>,
    pub time_spent_ref_action: i64,
}

impl ActionLink {
    /// The four action foreign keys, nulls included.
    pub fn action_refs(&self) -> [Option<i64>; 4] {
        [
            self.idaction_url_ref,
            self.idaction_name_ref,
            self.idaction_name,
            self.idaction_url,
        ]
    }
}

impl From<ActionLinkRow> for ActionLink {
    fn from(row: ActionLinkRow) -> Self {
        Self {
            idlink_va: row.idlink_va,
            idsite: row.idsite,
            idvisitor: codec::encode(&row.idvisitor),
            idvisit: row.idvisit,
            server_time: row.server_time,
            idaction_url_ref: row.idaction_url_ref,
            idaction_name_ref: row.idaction_name_ref,
            idaction_name: row.idaction_name,
            idaction_url: row.idaction_url,
            time_spent_ref_action: row.time_spent_ref_action,
        }
    }
}

impl TryFrom<&ActionLink> for ActionLinkRow {
    type Error = MalformedEncoding;

    fn try_from(link: &ActionLink) -> Result<Self, Self::Error> {
        Ok(Self {
            idlink_va: link.idlink_va,
            idsite: link.idsite,
            idvisitor: codec::decode(&link.idvisitor)?,
            idvisit: link.idvisit,
            server_time: link.server_time.clone(),
            idaction_url_ref: link.idaction_url_ref,
            idaction_name_ref: link.idaction_name_ref,
            idaction_name: link.idaction_name,
            idaction_url: link.idaction_url,
            time_spent_ref_action: link.time_spent_ref_action,
        })
    }
}

/// `log_conversion` as stored. No surrogate key is exported; replay
/// identity is the composite `(idvisit, server_time)`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ConversionRow {
    pub idvisit: i64,
    pub idsite: i64,
    pub idvisitor: Vec<u8>,
    pub server_time: String,
    pub idgoal: i64,
    pub url: Option<String>,
    pub revenue: Option<f64>,
}

/// A goal completion tied to a visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub idvisit: i64,
    pub idsite: i64,
    pub idvisitor: String,
    pub server_time: String,
    pub idgoal: i64,
    pub url: Option<String>,
    pub revenue: Option<f64>,
}

impl From<ConversionRow> for Conversion {
    fn from(row: ConversionRow) -> Self {
        Self {
            idvisit: row.idvisit,
            idsite: row.idsite,
            idvisitor: codec::encode(&row.idvisitor),
            server_time: row.server_time,
            idgoal: row.idgoal,
            url: row.url,
            revenue: row.revenue,
        }
    }
}

impl TryFrom<&Conversion> for ConversionRow {
    type Error = MalformedEncoding;

    fn try_from(conversion: &Conversion) -> Result<Self, Self::Error> {
        Ok(Self {
            idvisit: conversion.idvisit,
            idsite: conversion.idsite,
            idvisitor: codec::decode(&conversion.idvisitor)?,
            server_time: conversion.server_time.clone(),
            idgoal: conversion.idgoal,
            url: conversion.url.clone(),
            revenue: conversion.revenue,
        })
    }
}
