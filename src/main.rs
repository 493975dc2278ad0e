//! Application entry point for the `garden-irrigation` service.
//!
//! This binary orchestrates the full startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Establishing a PostgreSQL connection pool
//! - Creating the reading and action tables if they do not exist
//! - Wiring the collaborators into the ingestion pipeline
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – PostgreSQL connection string
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See [`garden_irrigation::config::load_from_env`] for the rest.
use std::{env, sync::Arc};

use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

use garden_irrigation::adapters::{
    HttpActuatorGateway, OpenWeatherMap, PgActionLog, PgTelemetryStore, WebhookNotifier,
};
use garden_irrigation::ports::{ActionLog, SystemClock, TelemetryStore};
use garden_irrigation::routes::{self, AppState};
use garden_irrigation::{config, schema, Collaborators, IngestionPipeline};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool, &cfg.sensor_data_table, &cfg.action_log_table).await?;

    // Outer bound for every outbound call; adapters set tighter per-request limits
    let pipeline_cfg = &cfg.pipeline;
    let http = reqwest::Client::builder()
        .user_agent(concat!("garden-irrigation/", env!("CARGO_PKG_VERSION")))
        .timeout(pipeline_cfg.weather_timeout.max(pipeline_cfg.command_timeout))
        .build()?;

    let telemetry: Arc<dyn TelemetryStore> =
        Arc::new(PgTelemetryStore::new(pool.clone(), cfg.sensor_data_table.clone()));
    let actions: Arc<dyn ActionLog> =
        Arc::new(PgActionLog::new(pool.clone(), cfg.action_log_table.clone()));

    let collaborators = Collaborators {
        telemetry: telemetry.clone(),
        actions: actions.clone(),
        weather: Arc::new(OpenWeatherMap::new(
            http.clone(),
            cfg.weather_api_url.clone(),
            cfg.weather_api_key.clone(),
        )),
        actuator: Arc::new(HttpActuatorGateway::new(
            http.clone(),
            cfg.actuator_url.clone(),
            cfg.command_topic.clone(),
            cfg.pipeline.command_timeout,
        )),
        notifier: Arc::new(WebhookNotifier::new(
            http,
            cfg.notify_webhook_url.clone(),
            cfg.notify_urgent_webhook_url.clone(),
            cfg.pipeline.command_timeout,
        )),
        clock: Arc::new(SystemClock::new(cfg.utc_offset_hours)),
    };

    let state = AppState {
        pipeline: Arc::new(IngestionPipeline::new(collaborators, cfg.pipeline.clone())),
        telemetry,
        actions,
    };
    let app = routes::router(state);

    tracing::info!("Listening on {}", cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AXUM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `AXUM_LOG_LEVEL` env var
///
/// Called once at startup, before any other logging.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to AXUM_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AXUM_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
