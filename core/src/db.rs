//! Database pool construction and leader-elected migrations (`spec.md` §4.7).

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::config::DbConfig;

/// Build a `PgPool` per `config`, enforcing the §5 "DB statement 5 s"
/// contract on every connection via `statement_timeout`.
///
/// # Errors
///
/// Returns an error if the connection string is invalid or the pool
/// cannot establish its minimum connections.
pub async fn connect(config: &DbConfig) -> anyhow::Result<PgPool> {
    let options: PgConnectOptions = config.url.parse()?;
    let statement_timeout_ms = config.statement_timeout.as_millis();

    let pool = PgPoolOptions::new()
        .min_connections(config.pool_min)
        .max_connections(config.pool_max)
        .idle_timeout(Some(config.idle_timeout))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query(&format!("SET statement_timeout = {statement_timeout_ms}"))
                    .execute(conn)
                    .await?;
                Ok(())
            })
        })
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Advisory lock key used to serialize migrations across concurrently
/// starting service processes (`spec.md` §4.7, "applied by a leader on
/// startup"). An arbitrary fixed constant shared by every binary.
const MIGRATION_LOCK_KEY: i64 = 0x4441_5445_434f_5245; // "DATECORE" in hex-ish, just a fixed constant

/// Run embedded migrations, holding a Postgres advisory lock for the
/// duration so that when every service starts at once only one process
/// actually runs them.
///
/// # Errors
///
/// Returns an error if the lock cannot be acquired/released or a
/// migration fails.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(pool)
        .await?;

    let result = sqlx::migrate!("./migrations").run(pool).await;

    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(pool)
        .await?;

    result.map_err(anyhow::Error::from)
}

/// Connect and migrate in one call; the common path for every service's
/// `main.rs`.
///
/// # Errors
///
/// See [`connect`] and [`run_migrations`].
pub async fn connect_and_migrate(config: &DbConfig) -> anyhow::Result<PgPool> {
    let pool = connect(config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Statement timeout duration, exposed for services (like the gateway)
/// that make synchronous calls but hold no DB pool of their own.
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(5);
