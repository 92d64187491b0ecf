//! Periodic maintenance against the Postgres store.
//!
//! ```bash
//! # Notify the administrator about products under the stock threshold (default)
//! pharmacy-maintenance low-stock
//!
//! # Announce orders placed in the last 6 hours to their owners
//! pharmacy-maintenance recent-orders 6
//!
//! # Only create missing tables
//! pharmacy-maintenance schema
//! ```
//!
//! Configuration comes from the `PHARMACY_*` environment variables and
//! `DATABASE_URL`.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

use pharmacy_infra::{LifecycleConfig, NotificationEmitter, PostgresEntityStore};

#[derive(Parser, Debug)]
#[command(name = "pharmacy-maintenance")]
#[command(version, about = "Pharmacy notification sweeps and schema setup")]
struct Cli {
    #[command(subcommand)]
    task: Option<Task>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    /// Notify the administrator about products below the stock threshold
    LowStock,
    /// Announce recently placed orders to their owners
    RecentOrders {
        /// Look-back window in hours (at most one year)
        #[arg(default_value_t = 24, value_parser = clap::value_parser!(i64).range(1..=8760))]
        hours: i64,
    },
    /// Create missing tables and exit
    Schema,
}

/// Start of the look-back window ending at `now`.
fn window_start(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    chrono::Duration::try_hours(hours)
        .and_then(|window| now.checked_sub_signed(window))
        .with_context(|| format!("look-back window of {hours} hours is out of range"))
}

#[tokio::main]
async fn main() -> Result<()> {
    pharmacy_observability::init();

    let task = Cli::parse().task.unwrap_or(Task::LowStock);
    let config = LifecycleConfig::from_env()?;
    let url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set")?;

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&url)
        .await
        .context("failed to connect to postgres")?;
    let store = PostgresEntityStore::new(pool);
    store.ensure_schema().await?;
    tracing::info!(?task, "schema ready");

    let since = match task {
        Task::RecentOrders { hours } => Some(window_start(Utc::now(), hours)?),
        _ => None,
    };

    // The store's sync interface blocks on the runtime, so it runs off the
    // async workers.
    let emitted = tokio::task::spawn_blocking(move || {
        let notifier = NotificationEmitter::new(store);
        match (task, since) {
            (Task::LowStock, _) => notifier
                .check_low_stock(config.low_stock_threshold, config.admin_user_id)
                .map(|n| n.len()),
            (Task::RecentOrders { .. }, Some(since)) => {
                notifier.announce_recent_orders(since).map(|n| n.len())
            }
            _ => Ok(0),
        }
    })
    .await
    .context("maintenance task panicked")??;

    tracing::info!(emitted, "maintenance finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("pharmacy-maintenance").chain(args.iter().copied()))
    }

    #[test]
    fn low_stock_is_the_default_task() {
        assert_eq!(parse(&[]).unwrap().task, None);
        assert_eq!(parse(&["low-stock"]).unwrap().task, Some(Task::LowStock));
        assert_eq!(parse(&["schema"]).unwrap().task, Some(Task::Schema));
    }

    #[test]
    fn recent_orders_window_is_bounded() {
        assert_eq!(
            parse(&["recent-orders"]).unwrap().task,
            Some(Task::RecentOrders { hours: 24 })
        );
        assert_eq!(
            parse(&["recent-orders", "6"]).unwrap().task,
            Some(Task::RecentOrders { hours: 6 })
        );
        assert!(parse(&["recent-orders", "0"]).is_err());
        assert!(parse(&["recent-orders", "-3"]).is_err());
        assert!(parse(&["recent-orders", "3000000000000000"]).is_err());
        assert!(parse(&["restock"]).is_err());
    }

    #[test]
    fn window_start_rejects_overflow() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            window_start(now, 6).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap()
        );
        assert!(window_start(now, i64::MAX).is_err());
    }
}
