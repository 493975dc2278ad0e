#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use garden_irrigation::adapters::memory::{
    FixedClock, InMemoryActionLog, InMemoryTelemetryStore, RecordingActuator, RecordingNotifier,
    StubWeather,
};
use garden_irrigation::routes::AppState;
use garden_irrigation::{Collaborators, ForecastSnapshot, IngestionPipeline, PipelineConfig};

// ---

pub struct Harness {
    pub telemetry: Arc<InMemoryTelemetryStore>,
    pub actions: Arc<InMemoryActionLog>,
    pub weather: Arc<StubWeather>,
    pub actuator: Arc<RecordingActuator>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<FixedClock>,
    pub pipeline: Arc<IngestionPipeline>,
}

impl Harness {
    // ---
    pub fn new(forecast: ForecastSnapshot, local_hour: u32) -> Self {
        Self::with_config(forecast, local_hour, PipelineConfig::default())
    }

    pub fn with_config(
        forecast: ForecastSnapshot,
        local_hour: u32,
        config: PipelineConfig,
    ) -> Self {
        // ---
        let telemetry = Arc::new(InMemoryTelemetryStore::new());
        let actions = Arc::new(InMemoryActionLog::new());
        let weather = Arc::new(StubWeather::responding(forecast));
        let actuator = Arc::new(RecordingActuator::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            local_hour,
        ));

        let collaborators = Collaborators {
            telemetry: telemetry.clone(),
            actions: actions.clone(),
            weather: weather.clone(),
            actuator: actuator.clone(),
            notifier: notifier.clone(),
            clock: clock.clone(),
        };

        Harness {
            telemetry,
            actions,
            weather,
            actuator,
            notifier,
            clock,
            pipeline: Arc::new(IngestionPipeline::new(collaborators, config)),
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            pipeline: self.pipeline.clone(),
            telemetry: self.telemetry.clone(),
            actions: self.actions.clone(),
        }
    }
}

pub fn forecast(temperature_c: f64, rain_probability_percent: f64) -> ForecastSnapshot {
    ForecastSnapshot {
        temperature_c,
        humidity_percent: 55.0,
        rain_probability_percent,
        description: "scattered clouds".to_string(),
    }
}

pub fn event(device_id: &str, moisture_percent: f64) -> Value {
    json!({
        "deviceId": device_id,
        "soilMoisture": 3100,
        "moisturePercent": moisture_percent,
        "pumpStatus": "OFF",
        "rssi": -61
    })
}
