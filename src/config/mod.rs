use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::planner::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    /// Physical table-name prefix, e.g. `matomo_`. Empty by default.
    pub table_prefix: String,
    /// Maximum number of keys per dependent-lookup query.
    pub chunk_size: usize,
    /// Path of the interchange document written by export and read by import.
    pub export_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./visitport.db".to_string());

        let table_prefix = std::env::var("TABLE_PREFIX").unwrap_or_default();

        let chunk_size = match std::env::var("CHUNK_SIZE") {
            Ok(value) => value
                .parse::<usize>()
                .context("CHUNK_SIZE must be a positive integer")?,
            Err(_) => DEFAULT_CHUNK_SIZE,
        };

        let export_path =
            std::env::var("EXPORT_PATH").unwrap_or_else(|_| "visit-export.json".to_string());

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
            },
            table_prefix,
            chunk_size,
            export_path,
        })
    }
}
