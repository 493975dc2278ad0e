//! Configuration loader for the `garden-irrigation` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Nothing else in the crate calls `env::var`; the
//! pipeline and adapters receive their settings through [`Config`].
//!
use std::{env, time::Duration};

use anyhow::{anyhow, bail, Result};

use crate::engine::DecisionPolicy;

/// Parse an optional numeric variable with a default value.
macro_rules! parse_var {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string variable.
macro_rules! require_var {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name)
            .filter(|v: &String| !v.is_empty())
            .ok_or_else(|| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Read an optional string variable, treating empty values as unset.
macro_rules! optional_var {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name).filter(|v: &String| !v.is_empty())
    };
}

pub const DEFAULT_WEATHER_API_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

/// Settings the ingestion pipeline itself needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // ---
    /// Location passed to the weather oracle.
    pub location: String,

    /// Upper bound on a forecast fetch, enforced by the pipeline.
    pub weather_timeout: Duration,

    /// Upper bound on one pump command or alert delivery.
    pub command_timeout: Duration,

    /// Thresholds and durations used by the decision engine.
    pub policy: DecisionPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            location: "San Francisco".to_string(),
            weather_timeout: Duration::from_millis(5000),
            command_timeout: Duration::from_millis(5000),
            policy: DecisionPolicy::default(),
        }
    }
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Address the HTTP server binds to.
    pub listen_addr: String,

    /// Table holding sensor readings.
    pub sensor_data_table: String,

    /// Table holding irrigation actions.
    pub action_log_table: String,

    /// Weather API endpoint.
    pub weather_api_url: String,

    /// Weather API key. Empty disables live forecasts.
    pub weather_api_key: String,

    /// Base URL of the device command broker, if any.
    pub actuator_url: Option<String>,

    /// Topic pump commands are published on.
    pub command_topic: String,

    /// Webhook receiving every alert.
    pub notify_webhook_url: Option<String>,

    /// Webhook additionally receiving high and critical alerts.
    pub notify_urgent_webhook_url: Option<String>,

    /// Offset of the garden's local time from UTC, in hours.
    pub utc_offset_hours: i32,

    pub pipeline: PipelineConfig,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `LISTEN_ADDR` – bind address (default: 0.0.0.0:8080)
/// - `SENSOR_DATA_TABLE` / `ACTION_LOG_TABLE` – table names
///   (default: garden_sensor_data / garden_action_log)
/// - `WEATHER_API_URL`, `WEATHER_API_KEY`, `LOCATION`, `WEATHER_TIMEOUT_MS`
///   (default timeout: 5000)
/// - `ACTUATOR_URL`, `COMMAND_TOPIC` (default: garden/commands)
/// - `COMMAND_TIMEOUT_MS` – bound on each pump command and alert (default: 5000)
/// - `NOTIFY_WEBHOOK_URL`, `NOTIFY_URGENT_WEBHOOK_URL`
/// - `LOCAL_UTC_OFFSET_HOURS` (default: 0)
/// - `DECISION_POLICY` – `three_tier` (default) or `two_tier`
/// - `CRITICAL_MOISTURE`, `LOW_MOISTURE`, `OPTIMAL_MOISTURE` – threshold overrides.
///   Under `two_tier` the optimal threshold follows `LOW_MOISTURE` unless
///   `OPTIMAL_MOISTURE` is set explicitly.
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    load_from(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let db_url = require_var!(lookup, "DATABASE_URL");
    let db_pool_max = parse_var!(lookup, "DB_POOL_MAX", u32, 5);
    let listen_addr = optional_var!(lookup, "LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into());

    let sensor_data_table =
        optional_var!(lookup, "SENSOR_DATA_TABLE").unwrap_or_else(|| "garden_sensor_data".into());
    let action_log_table =
        optional_var!(lookup, "ACTION_LOG_TABLE").unwrap_or_else(|| "garden_action_log".into());
    validate_identifier("SENSOR_DATA_TABLE", &sensor_data_table)?;
    validate_identifier("ACTION_LOG_TABLE", &action_log_table)?;

    let weather_api_url =
        optional_var!(lookup, "WEATHER_API_URL").unwrap_or_else(|| DEFAULT_WEATHER_API_URL.into());
    let weather_api_key = optional_var!(lookup, "WEATHER_API_KEY").unwrap_or_default();
    let location = optional_var!(lookup, "LOCATION").unwrap_or_else(|| "San Francisco".into());
    let weather_timeout_ms = parse_var!(lookup, "WEATHER_TIMEOUT_MS", u64, 5000);

    let actuator_url = optional_var!(lookup, "ACTUATOR_URL");
    let command_topic =
        optional_var!(lookup, "COMMAND_TOPIC").unwrap_or_else(|| "garden/commands".into());
    let command_timeout_ms = parse_var!(lookup, "COMMAND_TIMEOUT_MS", u64, 5000);
    let notify_webhook_url = optional_var!(lookup, "NOTIFY_WEBHOOK_URL");
    let notify_urgent_webhook_url = optional_var!(lookup, "NOTIFY_URGENT_WEBHOOK_URL");
    let utc_offset_hours = parse_var!(lookup, "LOCAL_UTC_OFFSET_HOURS", i32, 0);

    let (mut policy, optimal_follows_low) =
        match optional_var!(lookup, "DECISION_POLICY").as_deref() {
            None | Some("three_tier") => (DecisionPolicy::three_tier(), false),
            Some("two_tier") => (DecisionPolicy::two_tier(), true),
            Some(other) => {
                bail!("Invalid DECISION_POLICY: {other} (expected three_tier or two_tier)")
            }
        };
    policy.critical_moisture =
        parse_var!(lookup, "CRITICAL_MOISTURE", f64, policy.critical_moisture);
    policy.low_moisture = parse_var!(lookup, "LOW_MOISTURE", f64, policy.low_moisture);
    // Two tiers have no optimal band of their own
    let optimal_default = if optimal_follows_low {
        policy.low_moisture
    } else {
        policy.optimal_moisture
    };
    policy.optimal_moisture = parse_var!(lookup, "OPTIMAL_MOISTURE", f64, optimal_default);

    if !(policy.critical_moisture <= policy.low_moisture
        && policy.low_moisture <= policy.optimal_moisture)
    {
        bail!(
            "Moisture thresholds must satisfy CRITICAL <= LOW <= OPTIMAL (got {} / {} / {})",
            policy.critical_moisture,
            policy.low_moisture,
            policy.optimal_moisture
        );
    }

    if weather_timeout_ms == 0 {
        bail!("Invalid WEATHER_TIMEOUT_MS: must be greater than zero");
    }
    if command_timeout_ms == 0 {
        bail!("Invalid COMMAND_TIMEOUT_MS: must be greater than zero");
    }

    Ok(Config {
        db_url,
        db_pool_max,
        listen_addr,
        sensor_data_table,
        action_log_table,
        weather_api_url,
        weather_api_key,
        actuator_url,
        command_topic,
        notify_webhook_url,
        notify_urgent_webhook_url,
        utc_offset_hours,
        pipeline: PipelineConfig {
            location,
            weather_timeout: Duration::from_millis(weather_timeout_ms),
            command_timeout: Duration::from_millis(command_timeout_ms),
            policy,
        },
    })
}

/// Table names are spliced into SQL, so only plain identifiers are allowed.
fn validate_identifier(var_name: &str, value: &str) -> Result<()> {
    // ---
    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        bail!("Invalid {var_name}: {value:?} is not a plain SQL identifier");
    }
    Ok(())
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords and the weather
    /// API key while showing all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        // Mask the password in the database URL for security
        let masked_db_url = if let Some(at_pos) = self.db_url.rfind('@') {
            if let Some(colon_pos) = self.db_url[..at_pos].rfind(':') {
                format!(
                    "{}:****{}",
                    &self.db_url[..colon_pos],
                    &self.db_url[at_pos..]
                )
            } else {
                self.db_url.clone()
            }
        } else {
            self.db_url.clone()
        };
        let key_state = if self.weather_api_key.is_empty() { "<unset>" } else { "****" };
        let unset = || "<unset>".to_string();
        let actuator_url = self.actuator_url.clone().unwrap_or_else(unset);
        let notify_url = self.notify_webhook_url.clone().unwrap_or_else(unset);
        let urgent_url = self.notify_urgent_webhook_url.clone().unwrap_or_else(unset);
        let policy = &self.pipeline.policy;

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL       : {}", masked_db_url);
        tracing::info!("  DB_POOL_MAX        : {}", self.db_pool_max);
        tracing::info!("  LISTEN_ADDR        : {}", self.listen_addr);
        tracing::info!("  SENSOR_DATA_TABLE  : {}", self.sensor_data_table);
        tracing::info!("  ACTION_LOG_TABLE   : {}", self.action_log_table);
        tracing::info!("  WEATHER_API_URL    : {}", self.weather_api_url);
        tracing::info!("  WEATHER_API_KEY    : {}", key_state);
        tracing::info!("  LOCATION           : {}", self.pipeline.location);
        tracing::info!("  WEATHER_TIMEOUT    : {:?}", self.pipeline.weather_timeout);
        tracing::info!("  ACTUATOR_URL       : {}", actuator_url);
        tracing::info!("  COMMAND_TOPIC      : {}", self.command_topic);
        tracing::info!("  COMMAND_TIMEOUT    : {:?}", self.pipeline.command_timeout);
        tracing::info!("  NOTIFY_WEBHOOK_URL : {}", notify_url);
        tracing::info!("  NOTIFY_URGENT_URL  : {}", urgent_url);
        tracing::info!("  UTC_OFFSET_HOURS   : {}", self.utc_offset_hours);
        tracing::info!(
            "  THRESHOLDS         : critical={} low={} optimal={}",
            policy.critical_moisture,
            policy.low_moisture,
            policy.optimal_moisture
        );
    }
}
