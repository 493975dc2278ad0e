//! Data models for the irrigation pipeline.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::InputError;

// ---

/// Clamp a percentage into `[0, 100]`, mapping NaN to 0.
pub fn clamp_percent(value: f64) -> f64 {
    // ---
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Pump state as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PumpStatus {
    On,
    Off,
}

impl PumpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PumpStatus::On => "ON",
            PumpStatus::Off => "OFF",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ON" => Some(PumpStatus::On),
            "OFF" => Some(PumpStatus::Off),
            _ => None,
        }
    }
}

/// One timestamped moisture sample from a garden sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    // ---
    pub id: Uuid,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub soil_moisture_raw: f64,
    pub moisture_percent: f64,
    pub pump_status: PumpStatus,
    pub rssi: Option<f64>,
}

impl Reading {
    // ---
    /// Validate an ingest event and build a [`Reading`] from it.
    ///
    /// `deviceId` and `moisturePercent` are required; everything else falls
    /// back to the device firmware defaults. `received_at` stamps readings
    /// whose event carries no `timestamp`.
    pub fn from_event(event: &Value, received_at: DateTime<Utc>) -> Result<Self, InputError> {
        // ---
        let device_id = match event.get("deviceId") {
            None | Some(Value::Null) => return Err(InputError::MissingField("deviceId")),
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(InputError::InvalidField {
                    field: "deviceId",
                    reason: "must not be empty".to_string(),
                })
            }
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(InputError::InvalidField {
                    field: "deviceId",
                    reason: format!("expected a string, got {other}"),
                })
            }
        };

        let moisture_percent = match event.get("moisturePercent") {
            None | Some(Value::Null) => return Err(InputError::MissingField("moisturePercent")),
            Some(v) => v.as_f64().ok_or_else(|| InputError::InvalidField {
                field: "moisturePercent",
                reason: format!("expected a number, got {v}"),
            })?,
        };

        let soil_moisture_raw = event
            .get("soilMoisture")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let pump_status = match event.get("pumpStatus").and_then(Value::as_str) {
            Some(s) => PumpStatus::parse(s).unwrap_or_else(|| {
                tracing::warn!(
                    device_id = %device_id,
                    pump_status = s,
                    "Unknown pump status, assuming OFF"
                );
                PumpStatus::Off
            }),
            None => PumpStatus::Off,
        };

        let timestamp = event
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(received_at)
            .trunc_subsecs(6);

        Ok(Reading {
            id: Uuid::new_v4(),
            device_id,
            timestamp,
            soil_moisture_raw,
            moisture_percent: clamp_percent(moisture_percent),
            pump_status,
            rssi: event.get("rssi").and_then(Value::as_f64),
        })
    }
}

/// Weather conditions used as decision input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSnapshot {
    // ---
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub rain_probability_percent: f64,
    pub description: String,
}

impl ForecastSnapshot {
    /// The fixed snapshot substituted when no live forecast is available.
    pub fn unavailable() -> Self {
        ForecastSnapshot {
            temperature_c: 25.0,
            humidity_percent: 50.0,
            rain_probability_percent: 0.0,
            description: "unavailable".to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.description == "unavailable"
    }
}

/// The engine's verdict for one reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub should_water: bool,
    pub duration_seconds: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    WaterOn,
    WaterOff,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::WaterOn => "WATER_ON",
            ActionKind::WaterOff => "WATER_OFF",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WATER_ON" => Some(ActionKind::WaterOn),
            "WATER_OFF" => Some(ActionKind::WaterOff),
            _ => None,
        }
    }
}

/// Durable record that a pump command was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    // ---
    pub id: Uuid,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: ActionKind,
    pub reason: String,
}

/// Alert urgency. Ordered so `priority >= Priority::High` selects the
/// urgent channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

/// What the pipeline did with one reading.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    // ---
    pub accepted: bool,
    pub device_id: String,
    pub decision: Decision,
    pub forecast: ForecastSnapshot,
    pub persisted: bool,
    pub dispatched: bool,
    pub logged: bool,
    pub notified: bool,
}

/// Half-open interval `[start, end)` over reading timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    // ---
    /// Parse the `"start,end"` RFC 3339 query format.
    pub fn parse(s: &str) -> Result<Self, InputError> {
        // ---
        let invalid = |reason: &str| InputError::InvalidField {
            field: "timestamp_range",
            reason: reason.to_string(),
        };

        let (start, end) = s
            .split_once(',')
            .ok_or_else(|| invalid("expected \"start,end\""))?;
        let start = DateTime::parse_from_rfc3339(start.trim())
            .map_err(|e| invalid(&format!("bad start: {e}")))?
            .with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339(end.trim())
            .map_err(|e| invalid(&format!("bad end: {e}")))?
            .with_timezone(&Utc);

        if end < start {
            return Err(invalid("end precedes start"));
        }
        Ok(TimeRange { start, end })
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

/// Resume position for newest-first reading queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageToken {
    pub timestamp: DateTime<Utc>,
    pub id: Uuid,
}

impl PageToken {
    // ---
    pub fn for_reading(reading: &Reading) -> Self {
        PageToken {
            timestamp: reading.timestamp,
            id: reading.id,
        }
    }

    pub fn encode(&self) -> String {
        format!("{}_{}", self.timestamp.timestamp_micros(), self.id)
    }

    pub fn decode(s: &str) -> Result<Self, InputError> {
        // ---
        let invalid = || InputError::InvalidField {
            field: "page_token",
            reason: "malformed page token".to_string(),
        };
        let (micros, id) = s.split_once('_').ok_or_else(invalid)?;
        let micros: i64 = micros.parse().map_err(|_| invalid())?;
        let timestamp = DateTime::from_timestamp_micros(micros).ok_or_else(invalid)?;
        let id = Uuid::parse_str(id).map_err(|_| invalid())?;
        Ok(PageToken { timestamp, id })
    }

    /// True when `reading` sorts strictly after this token in
    /// newest-first order.
    pub fn precedes(&self, reading: &Reading) -> bool {
        (reading.timestamp, reading.id) < (self.timestamp, self.id)
    }
}

/// One page of a newest-first reading query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPage {
    pub readings: Vec<Reading>,
    pub next_page_token: Option<String>,
}

impl ReadingPage {
    // ---
    /// Build a page from readings sorted newest first. Callers fetch one
    /// row past `limit`; its presence means another page exists.
    pub fn from_newest_first(mut readings: Vec<Reading>, limit: u32) -> Self {
        // ---
        let limit = limit as usize;
        let next_page_token = if readings.len() > limit {
            readings.truncate(limit);
            readings.last().map(|r| PageToken::for_reading(r).encode())
        } else {
            None
        };
        ReadingPage {
            readings,
            next_page_token,
        }
    }
}
