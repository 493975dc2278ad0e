//! Database schema management for `garden-irrigation`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the reading and action tables if they do not exist (idempotent).
///
/// Table names come from [`Config`](crate::Config) and have already been
/// validated as plain identifiers. Safe to call on every startup.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool, sensor_table: &str, action_table: &str) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Append-only reading history, one row per ingested event
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {sensor_table} (
            id                UUID             PRIMARY KEY,
            device_id         TEXT             NOT NULL,
            timestamp_utc     TIMESTAMPTZ      NOT NULL,
            soil_moisture_raw DOUBLE PRECISION NOT NULL,
            moisture_percent  DOUBLE PRECISION NOT NULL,
            pump_status       TEXT             NOT NULL,
            rssi              DOUBLE PRECISION
        );
        "#
    ))
    .execute(&mut *tx)
    .await?;

    // Audit trail of pump commands
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {action_table} (
            id            UUID        PRIMARY KEY,
            device_id     TEXT        NOT NULL,
            timestamp_utc TIMESTAMPTZ NOT NULL,
            action        TEXT        NOT NULL,
            reason        TEXT        NOT NULL
        );
        "#
    ))
    .execute(&mut *tx)
    .await?;

    // Newest-first per-device scans
    sqlx::query(&format!(
        r#"
        CREATE INDEX IF NOT EXISTS idx_{sensor_table}_device_ts
            ON {sensor_table} (device_id, timestamp_utc DESC, id DESC);
        "#
    ))
    .execute(&mut *tx)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE INDEX IF NOT EXISTS idx_{action_table}_device_ts
            ON {action_table} (device_id, timestamp_utc DESC);
        "#
    ))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
