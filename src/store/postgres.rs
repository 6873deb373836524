use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;

use crate::models::{Action, ActionLinkRow, ConversionRow, VisitRow};
use crate::store::VisitStore;

pub struct PostgresStore {
    pool: Arc<PgPool>,
    prefix: String,
}

impl PostgresStore {
    /// One connection: statements within a run are strictly sequential.
    pub async fn new(database_url: &str, prefix: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
            prefix: prefix.to_string(),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

#[async_trait]
impl VisitStore for PostgresStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                idvisit BIGINT PRIMARY KEY,
                idsite BIGINT NOT NULL,
                idvisitor BYTEA NOT NULL,
                visit_first_action_time TEXT NOT NULL,
                visit_last_action_time TEXT NOT NULL,
                config_id BYTEA NOT NULL,
                location_ip BYTEA NOT NULL,
                visit_total_actions BIGINT NOT NULL DEFAULT 0,
                visit_total_time BIGINT NOT NULL DEFAULT 0
            )
            "#,
            self.table("log_visit")
        ))
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{}visit_first_action_time ON {}(visit_first_action_time)",
            self.prefix,
            self.table("log_visit")
        ))
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                idaction BIGINT PRIMARY KEY,
                name TEXT,
                hash BIGINT NOT NULL,
                "type" BIGINT NOT NULL,
                url_prefix BIGINT
            )
            "#,
            self.table("log_action")
        ))
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                idlink_va BIGINT PRIMARY KEY,
                idsite BIGINT NOT NULL,
                idvisitor BYTEA NOT NULL,
                idvisit BIGINT NOT NULL,
                server_time TEXT NOT NULL,
                idaction_url_ref BIGINT,
                idaction_name_ref BIGINT,
                idaction_name BIGINT,
                idaction_url BIGINT,
                time_spent_ref_action BIGINT NOT NULL DEFAULT 0
            )
            "#,
            self.table("log_link_visit_action")
        ))
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{}link_idvisit ON {}(idvisit)",
            self.prefix,
            self.table("log_link_visit_action")
        ))
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                idvisit BIGINT NOT NULL,
                idsite BIGINT NOT NULL,
                idvisitor BYTEA NOT NULL,
                server_time TEXT NOT NULL,
                idgoal BIGINT NOT NULL,
                url TEXT,
                revenue DOUBLE PRECISION
            )
            "#,
            self.table("log_conversion")
        ))
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{}conversion_idvisit ON {}(idvisit)",
            self.prefix,
            self.table("log_conversion")
        ))
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn visits_between(&self, start: &str, end: &str) -> Result<Vec<VisitRow>> {
        let visits = sqlx::query_as::<_, VisitRow>(&format!(
            r#"
            SELECT idvisit, idsite, idvisitor, visit_first_action_time,
                   visit_last_action_time, config_id, location_ip,
                   visit_total_actions, visit_total_time
            FROM {}
            WHERE visit_first_action_time >= $1 AND visit_first_action_time <= $2
            ORDER BY idvisit
            "#,
            self.table("log_visit")
        ))
        .bind(start)
        .bind(end)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(visits)
    }

    async fn links_for_visits(&self, idvisits: &[i64]) -> Result<Vec<ActionLinkRow>> {
        if idvisits.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT idlink_va, idsite, idvisitor, idvisit, server_time,
                   idaction_url_ref, idaction_name_ref, idaction_name,
                   idaction_url, time_spent_ref_action
            FROM {}
            WHERE idvisit IN (
            "#,
            self.table("log_link_visit_action")
        ));
        let mut separated = builder.separated(", ");
        for idvisit in idvisits {
            separated.push_bind(*idvisit);
        }
        builder.push(") ORDER BY idlink_va");

        let links = builder
            .build_query_as::<ActionLinkRow>()
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(links)
    }

    async fn actions_by_ids(&self, idactions: &[i64]) -> Result<Vec<Action>> {
        if idactions.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            r#"SELECT idaction, name, hash, "type", url_prefix FROM {} WHERE idaction IN ("#,
            self.table("log_action")
        ));
        let mut separated = builder.separated(", ");
        for idaction in idactions {
            separated.push_bind(*idaction);
        }
        builder.push(") ORDER BY idaction");

        let actions = builder
            .build_query_as::<Action>()
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(actions)
    }

    async fn conversions_for_visits(&self, idvisits: &[i64]) -> Result<Vec<ConversionRow>> {
        if idvisits.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT idvisit, idsite, idvisitor, server_time, idgoal, url, revenue
            FROM {}
            WHERE idvisit IN (
            "#,
            self.table("log_conversion")
        ));
        let mut separated = builder.separated(", ");
        for idvisit in idvisits {
            separated.push_bind(*idvisit);
        }
        builder.push(") ORDER BY idvisit, server_time");

        let conversions = builder
            .build_query_as::<ConversionRow>()
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(conversions)
    }

    async fn replace_visit(&self, visit: &VisitRow) -> Result<()> {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE idvisit = $1",
            self.table("log_visit")
        ))
        .bind(visit.idvisit)
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {} (idvisit, idsite, idvisitor, visit_first_action_time,
                            visit_last_action_time, config_id, location_ip,
                            visit_total_actions, visit_total_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
            self.table("log_visit")
        ))
        .bind(visit.idvisit)
        .bind(visit.idsite)
        .bind(&visit.idvisitor)
        .bind(&visit.visit_first_action_time)
        .bind(&visit.visit_last_action_time)
        .bind(&visit.config_id)
        .bind(&visit.location_ip)
        .bind(visit.visit_total_actions)
        .bind(visit.visit_total_time)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn replace_action(&self, action: &Action) -> Result<()> {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE idaction = $1",
            self.table("log_action")
        ))
        .bind(action.idaction)
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(&format!(
            r#"INSERT INTO {} (idaction, name, hash, "type", url_prefix) VALUES ($1, $2, $3, $4, $5)"#,
            self.table("log_action")
        ))
        .bind(action.idaction)
        .bind(&action.name)
        .bind(action.hash)
        .bind(action.action_type)
        .bind(action.url_prefix)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn replace_action_link(&self, link: &ActionLinkRow) -> Result<()> {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE idlink_va = $1",
            self.table("log_link_visit_action")
        ))
        .bind(link.idlink_va)
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {} (idlink_va, idsite, idvisitor, idvisit, server_time,
                            idaction_url_ref, idaction_name_ref, idaction_name,
                            idaction_url, time_spent_ref_action)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
            self.table("log_link_visit_action")
        ))
        .bind(link.idlink_va)
        .bind(link.idsite)
        .bind(&link.idvisitor)
        .bind(link.idvisit)
        .bind(&link.server_time)
        .bind(link.idaction_url_ref)
        .bind(link.idaction_name_ref)
        .bind(link.idaction_name)
        .bind(link.idaction_url)
        .bind(link.time_spent_ref_action)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn replace_conversion(&self, conversion: &ConversionRow) -> Result<()> {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE idvisit = $1 AND server_time = $2",
            self.table("log_conversion")
        ))
        .bind(conversion.idvisit)
        .bind(&conversion.server_time)
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {} (idvisit, idsite, idvisitor, server_time, idgoal, url, revenue)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
            self.table("log_conversion")
        ))
        .bind(conversion.idvisit)
        .bind(conversion.idsite)
        .bind(&conversion.idvisitor)
        .bind(&conversion.server_time)
        .bind(conversion.idgoal)
        .bind(&conversion.url)
        .bind(conversion.revenue)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
