use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use visitport::config::{Config, DatabaseBackend};
use visitport::snapshot::Snapshot;
use visitport::store::{PostgresStore, SqliteStore, VisitStore};

#[derive(Parser)]
#[command(name = "visitport")]
#[command(about = "Export and import web-analytics visit data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export visit data for an inclusive date range
    Export {
        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        start_date: NaiveDate,
        /// Last day of the range (YYYY-MM-DD)
        #[arg(long)]
        end_date: NaiveDate,
    },
    /// Import visit data from the export file
    Import,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let store: Arc<dyn VisitStore> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("using SQLite store: {}", config.database.url);
            Arc::new(SqliteStore::new(&config.database.url, &config.table_prefix).await?)
        }
        DatabaseBackend::Postgres => {
            info!("using PostgreSQL store: {}", config.database.url);
            Arc::new(PostgresStore::new(&config.database.url, &config.table_prefix).await?)
        }
    };
    store.init().await?;

    match cli.command {
        Commands::Export {
            start_date,
            end_date,
        } => {
            if end_date < start_date {
                bail!("end date {end_date} is before start date {start_date}");
            }
            let snapshot =
                visitport::export::export(store.as_ref(), start_date, end_date, config.chunk_size)
                    .await?;
            snapshot.save(Path::new(&config.export_path))?;
            let counts = snapshot.counts();
            info!(
                visits = counts.visits,
                actions = counts.actions,
                action_links = counts.action_links,
                conversions = counts.conversions,
                "export successful, stored results in {:?}",
                config.export_path
            );
        }
        Commands::Import => {
            let snapshot = match Snapshot::load(Path::new(&config.export_path)) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    // Loud but non-fatal: no database writes are attempted.
                    error!("no usable data in {:?}: {err}", config.export_path);
                    return Ok(());
                }
            };
            let result = visitport::import::import(store.as_ref(), &snapshot).await?;
            info!(
                visits = result.visits,
                actions = result.actions,
                action_links = result.action_links,
                conversions = result.conversions,
                "import successful"
            );
        }
    }

    Ok(())
}
