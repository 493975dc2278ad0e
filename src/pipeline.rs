//! Ingestion pipeline: persist → forecast → decide → act → log/notify.
//!
//! Each step is best-effort. A failed collaborator is logged and reported
//! in the [`Outcome`], never propagated; only a malformed event is
//! rejected, and that happens before any side effect.
//!
//! Ordering: persisting the reading and fetching the forecast run
//! concurrently; deciding waits for both; publishing, logging the action
//! and notifying run concurrently after the decision. Publishing and
//! notifying are each bounded by the command timeout. The pipeline holds no
//! mutable state, so concurrent calls never interact, including calls for
//! the same device.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::engine::Alert;
use crate::error::{CollaboratorError, InputError};
use crate::models::{Action, ActionKind, Decision, ForecastSnapshot, Outcome, Reading};
use crate::ports::{ActionLog, ActuatorGateway, Clock, Notifier, TelemetryStore, WeatherOracle};

// ---

/// The external systems the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub telemetry: Arc<dyn TelemetryStore>,
    pub actions: Arc<dyn ActionLog>,
    pub weather: Arc<dyn WeatherOracle>,
    pub actuator: Arc<dyn ActuatorGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

pub struct IngestionPipeline {
    collaborators: Collaborators,
    config: PipelineConfig,
}

impl IngestionPipeline {
    // ---
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Self {
        IngestionPipeline {
            collaborators,
            config,
        }
    }

    /// Validate a raw ingest event, then [`handle`](Self::handle) it.
    pub async fn ingest(&self, event: &Value) -> Result<Outcome, InputError> {
        // ---
        let reading = Reading::from_event(event, self.collaborators.clock.now()).map_err(|e| {
            warn!("Rejected ingest event: {}", e);
            e
        })?;
        Ok(self.handle(&reading).await)
    }

    /// Run one reading through the pipeline.
    #[tracing::instrument(name = "ingest", skip_all, fields(device_id = %reading.device_id))]
    pub async fn handle(&self, reading: &Reading) -> Outcome {
        // ---
        info!(
            moisture = reading.moisture_percent,
            pump = reading.pump_status.as_str(),
            "Reading received"
        );

        // Step 1 + 2: persist and fetch forecast
        let (persisted, forecast) = tokio::join!(self.persist(reading), self.fetch_forecast());

        // Step 3: decide
        let decision = self.config.policy.decide(
            reading.moisture_percent,
            &forecast,
            self.collaborators.clock.local_hour(),
        );
        info!(
            should_water = decision.should_water,
            duration = decision.duration_seconds,
            "Decision: {}",
            decision.reason
        );

        let alert = self
            .config
            .policy
            .alert(reading.moisture_percent, &forecast, &decision);

        let mut outcome = Outcome {
            accepted: true,
            device_id: reading.device_id.clone(),
            decision,
            forecast,
            persisted,
            dispatched: false,
            logged: false,
            notified: false,
        };

        // Step 4 + 5: act, log, alert
        let watering = outcome.decision.should_water;
        let (dispatched, logged, notified) = tokio::join!(
            async { watering && self.dispatch(reading, &outcome.decision).await },
            async { watering && self.log_action(reading, &outcome.decision).await },
            async {
                match &alert {
                    Some(alert) => self.notify(reading, alert).await,
                    None => false,
                }
            }
        );
        outcome.dispatched = dispatched;
        outcome.logged = logged;
        outcome.notified = notified;

        debug!(dispatched, logged, notified, "Pipeline complete");
        outcome
    }

    async fn persist(&self, reading: &Reading) -> bool {
        // ---
        match self.collaborators.telemetry.append(reading).await {
            Ok(()) => {
                debug!("Reading saved");
                true
            }
            Err(e) => {
                warn!("Failed to store reading {}: {}", reading.id, e);
                false
            }
        }
    }

    /// Fetch the forecast, bounded by the configured timeout whether or not
    /// the oracle honours it. Any failure yields the fallback snapshot.
    async fn fetch_forecast(&self) -> ForecastSnapshot {
        // ---
        let timeout = self.config.weather_timeout;
        let fetch = self
            .collaborators
            .weather
            .fetch(&self.config.location, timeout);

        match tokio::time::timeout(timeout, fetch).await {
            Ok(Ok(forecast)) => forecast,
            Ok(Err(e)) => {
                warn!("Weather fetch failed, using fallback forecast: {}", e);
                ForecastSnapshot::unavailable()
            }
            Err(_) => {
                let e = CollaboratorError::Timeout(timeout);
                warn!("Weather fetch failed, using fallback forecast: {}", e);
                ForecastSnapshot::unavailable()
            }
        }
    }

    async fn dispatch(&self, reading: &Reading, decision: &Decision) -> bool {
        // ---
        let publish = self.collaborators.actuator.publish(
            &reading.device_id,
            ActionKind::WaterOn,
            decision.duration_seconds,
        );
        match self.bounded(publish).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to publish WATER_ON ({}s): {}",
                    decision.duration_seconds, e
                );
                false
            }
        }
    }

    async fn log_action(&self, reading: &Reading, decision: &Decision) -> bool {
        // ---
        let action = Action {
            id: Uuid::new_v4(),
            device_id: reading.device_id.clone(),
            timestamp: self.collaborators.clock.now(),
            action: ActionKind::WaterOn,
            reason: decision.reason.clone(),
        };
        match self.collaborators.actions.append(&action).await {
            Ok(()) => {
                debug!("Action logged: {}", action.action.as_str());
                true
            }
            Err(e) => {
                warn!("Failed to log action: {}", e);
                false
            }
        }
    }

    async fn notify(&self, reading: &Reading, alert: &Alert) -> bool {
        // ---
        let message = format!("[{}] {}", reading.device_id, alert.message);
        let send = self
            .collaborators
            .notifier
            .send(&alert.subject, &message, alert.priority);
        match self.bounded(send).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send alert {:?}: {}", alert.subject, e);
                false
            }
        }
    }

    /// Run an outbound call under the command timeout.
    async fn bounded<F>(&self, call: F) -> Result<(), CollaboratorError>
    where
        F: Future<Output = Result<(), CollaboratorError>>,
    {
        // ---
        let timeout = self.config.command_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .unwrap_or(Err(CollaboratorError::Timeout(timeout)))
    }
}
