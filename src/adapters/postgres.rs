//! PostgreSQL-backed telemetry store and action log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::CollaboratorError;
use crate::models::{Action, ActionKind, PageToken, PumpStatus, Reading, ReadingPage, TimeRange};
use crate::ports::{ActionLog, TelemetryStore};

// ---

#[derive(Debug, sqlx::FromRow)]
struct ReadingRow {
    // ---
    id: Uuid,
    device_id: String,
    timestamp_utc: DateTime<Utc>,
    soil_moisture_raw: f64,
    moisture_percent: f64,
    pump_status: String,
    rssi: Option<f64>,
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Reading {
            id: row.id,
            device_id: row.device_id,
            timestamp: row.timestamp_utc,
            soil_moisture_raw: row.soil_moisture_raw,
            moisture_percent: row.moisture_percent,
            pump_status: PumpStatus::parse(&row.pump_status).unwrap_or(PumpStatus::Off),
            rssi: row.rssi,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ActionRow {
    // ---
    id: Uuid,
    device_id: String,
    timestamp_utc: DateTime<Utc>,
    action: String,
    reason: String,
}

impl TryFrom<ActionRow> for Action {
    type Error = CollaboratorError;

    fn try_from(row: ActionRow) -> Result<Self, Self::Error> {
        // ---
        let action = ActionKind::parse(&row.action).ok_or_else(|| {
            let what = format!("unknown action {:?} in row {}", row.action, row.id);
            CollaboratorError::Malformed(what)
        })?;
        Ok(Action {
            id: row.id,
            device_id: row.device_id,
            timestamp: row.timestamp_utc,
            action,
            reason: row.reason,
        })
    }
}

/// Reading history stored in one PostgreSQL table.
#[derive(Debug, Clone)]
pub struct PgTelemetryStore {
    pool: PgPool,
    table: String,
}

impl PgTelemetryStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        PgTelemetryStore {
            pool,
            table: table.into(),
        }
    }
}

#[async_trait]
impl TelemetryStore for PgTelemetryStore {
    async fn append(&self, reading: &Reading) -> Result<(), CollaboratorError> {
        // ---
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (
                id, device_id, timestamp_utc,
                soil_moisture_raw, moisture_percent, pump_status, rssi
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
            self.table
        ))
        .bind(reading.id)
        .bind(&reading.device_id)
        .bind(reading.timestamp)
        .bind(reading.soil_moisture_raw)
        .bind(reading.moisture_percent)
        .bind(reading.pump_status.as_str())
        .bind(reading.rssi)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query(
        &self,
        device_id: &str,
        range: Option<TimeRange>,
        limit: u32,
        page_token: Option<PageToken>,
    ) -> Result<ReadingPage, CollaboratorError> {
        // ---
        // One extra row tells us whether another page exists.
        let rows: Vec<ReadingRow> = sqlx::query_as(&format!(
            r#"
            SELECT id, device_id, timestamp_utc,
                   soil_moisture_raw, moisture_percent, pump_status, rssi
            FROM {}
            WHERE device_id = $1
              AND ($2::timestamptz IS NULL OR timestamp_utc >= $2)
              AND ($3::timestamptz IS NULL OR timestamp_utc < $3)
              AND ($4::timestamptz IS NULL OR (timestamp_utc, id) < ($4, $5::uuid))
            ORDER BY timestamp_utc DESC, id DESC
            LIMIT $6
            "#,
            self.table
        ))
        .bind(device_id)
        .bind(range.map(|r| r.start))
        .bind(range.map(|r| r.end))
        .bind(page_token.map(|t| t.timestamp))
        .bind(page_token.map(|t| t.id))
        .bind(i64::from(limit) + 1)
        .fetch_all(&self.pool)
        .await?;

        let readings = rows.into_iter().map(Reading::from).collect();
        Ok(ReadingPage::from_newest_first(readings, limit))
    }
}

/// Action history stored in one PostgreSQL table.
#[derive(Debug, Clone)]
pub struct PgActionLog {
    pool: PgPool,
    table: String,
}

impl PgActionLog {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        PgActionLog {
            pool,
            table: table.into(),
        }
    }
}

#[async_trait]
impl ActionLog for PgActionLog {
    async fn append(&self, action: &Action) -> Result<(), CollaboratorError> {
        // ---
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (id, device_id, timestamp_utc, action, reason)
            VALUES ($1, $2, $3, $4, $5)
            "#,
            self.table
        ))
        .bind(action.id)
        .bind(&action.device_id)
        .bind(action.timestamp)
        .bind(action.action.as_str())
        .bind(&action.reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query(&self, device_id: &str, limit: u32) -> Result<Vec<Action>, CollaboratorError> {
        // ---
        let rows: Vec<ActionRow> = sqlx::query_as(&format!(
            r#"
            SELECT id, device_id, timestamp_utc, action, reason
            FROM {}
            WHERE device_id = $1
            ORDER BY timestamp_utc DESC, id DESC
            LIMIT $2
            "#,
            self.table
        ))
        .bind(device_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Action::try_from).collect()
    }
}
