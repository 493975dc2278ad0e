//! Collaborator interfaces the ingestion pipeline is built against.
//!
//! Each trait is a narrow seam over one external system. Production
//! adapters live in [`crate::adapters`]; tests substitute the in-memory
//! ones from [`crate::adapters::memory`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};

use crate::error::CollaboratorError;
use crate::models::{
    Action, ActionKind, ForecastSnapshot, PageToken, Priority, Reading, ReadingPage, TimeRange,
};

// ---

/// Append-only history of sensor readings.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    async fn append(&self, reading: &Reading) -> Result<(), CollaboratorError>;

    /// Newest-first readings for `device_id`, resuming after `page_token`.
    async fn query(
        &self,
        device_id: &str,
        range: Option<TimeRange>,
        limit: u32,
        page_token: Option<PageToken>,
    ) -> Result<ReadingPage, CollaboratorError>;
}

/// Append-only history of irrigation actions.
#[async_trait]
pub trait ActionLog: Send + Sync {
    async fn append(&self, action: &Action) -> Result<(), CollaboratorError>;

    /// Newest-first actions for `device_id`.
    async fn query(&self, device_id: &str, limit: u32) -> Result<Vec<Action>, CollaboratorError>;
}

/// Source of weather forecasts.
#[async_trait]
pub trait WeatherOracle: Send + Sync {
    async fn fetch(
        &self,
        location: &str,
        timeout: Duration,
    ) -> Result<ForecastSnapshot, CollaboratorError>;
}

/// Fire-and-forget pump command channel.
///
/// `Ok(())` only means the command was handed to the transport.
#[async_trait]
pub trait ActuatorGateway: Send + Sync {
    async fn publish(
        &self,
        device_id: &str,
        action: ActionKind,
        duration_seconds: u32,
    ) -> Result<(), CollaboratorError>;
}

/// Best-effort human alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        subject: &str,
        message: &str,
        priority: Priority,
    ) -> Result<(), CollaboratorError>;
}

/// Wall clock as seen by the garden.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Hour of day (0..=23) in the garden's local time.
    fn local_hour(&self) -> u32;
}

/// System clock shifted by a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    // ---
    /// Offsets outside ±23 hours fall back to UTC.
    pub fn new(utc_offset_hours: i32) -> Self {
        let offset = utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        SystemClock { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_hour(&self) -> u32 {
        Utc::now().with_timezone(&self.offset).hour()
    }
}
