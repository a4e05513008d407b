//! Database migration runner for Tally.
//!
//! Usage:
//!   migrator up      - Run all pending migrations (default)
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations

use anyhow::{Context, bail};
use sea_orm_migration::MigratorTrait;
use tally_db::migration::Migrator;
use tally_shared::{AppConfig, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init(&config.logging).context("failed to initialize tracing")?;

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let db = tally_db::connect(&config.database).await?;
    info!(%command, "connected to database");

    match command.as_str() {
        "up" => Migrator::up(&db, None).await?,
        "down" => Migrator::down(&db, Some(1)).await?,
        "status" => Migrator::status(&db).await?,
        "fresh" => Migrator::fresh(&db).await?,
        other => bail!("unknown command `{other}`, expected up, down, status or fresh"),
    }

    info!(%command, "migrations finished");
    Ok(())
}
