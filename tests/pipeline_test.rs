use std::time::Duration;

use garden_irrigation::adapters::memory::WeatherBehavior;
use garden_irrigation::{
    ActionKind, DecisionPolicy, ForecastSnapshot, InputError, PipelineConfig, Priority,
};

mod common;
use common::{event, forecast, Harness};

#[tokio::test]
async fn critical_reading_at_night_waters_logs_and_alerts() {
    // ---
    let h = Harness::new(forecast(18.0, 90.0), 3);

    let outcome = h.pipeline.ingest(&event("d1", 10.0)).await.unwrap();

    assert!(outcome.accepted);
    assert!(outcome.persisted && outcome.dispatched && outcome.logged && outcome.notified);
    assert!(outcome.decision.should_water);
    assert_eq!(outcome.decision.duration_seconds, 35);

    let stored = h.telemetry.readings();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].device_id, "d1");
    assert_eq!(stored[0].moisture_percent, 10.0);

    let commands = h.actuator.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].device_id, "d1");
    assert_eq!(commands[0].action, ActionKind::WaterOn);
    assert_eq!(commands[0].duration_seconds, 35);

    let actions = h.actions.actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, ActionKind::WaterOn);
    assert!(actions[0].reason.contains("CRITICAL"));
    assert!(actions[0].reason.contains("Night watering"));

    let alerts = h.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].priority >= Priority::High);
    assert!(alerts[0].message.contains("10%"));
    assert!(alerts[0].message.contains("35s"));
}

#[tokio::test]
async fn rain_expected_postpones_watering() {
    // ---
    let h = Harness::new(forecast(22.0, 70.0), 14);

    let outcome = h.pipeline.ingest(&event("d1", 20.0)).await.unwrap();

    assert!(!outcome.decision.should_water);
    assert!(outcome.decision.reason.contains("rain expected"));
    assert!(outcome.persisted);
    assert!(!outcome.dispatched && !outcome.logged && !outcome.notified);
    assert!(h.actuator.commands().is_empty());
    assert!(h.actions.actions().is_empty());
    assert!(h.notifier.alerts().is_empty());
}

#[tokio::test]
async fn low_moisture_waters_without_alerting() {
    // ---
    let h = Harness::new(forecast(33.0, 10.0), 14);

    let outcome = h.pipeline.ingest(&event("d2", 18.0)).await.unwrap();

    assert!(outcome.dispatched && outcome.logged);
    assert!(!outcome.notified);
    assert_eq!(h.actuator.commands()[0].duration_seconds, 20);
    assert!(h.notifier.alerts().is_empty());
}

#[tokio::test]
async fn optimal_moisture_only_persists() {
    // ---
    let h = Harness::new(forecast(35.0, 0.0), 2);

    let outcome = h.pipeline.ingest(&event("d1", 60.0)).await.unwrap();

    assert!(!outcome.decision.should_water);
    assert_eq!(h.telemetry.readings().len(), 1);
    assert!(h.actuator.commands().is_empty());
}

#[tokio::test]
async fn weather_timeout_falls_back_to_default_forecast() {
    // ---
    let config = PipelineConfig {
        weather_timeout: Duration::from_millis(50),
        ..PipelineConfig::default()
    };
    let h = Harness::with_config(forecast(35.0, 95.0), 14, config);
    h.weather.set_behavior(WeatherBehavior::Hang(
        Duration::from_secs(30),
        forecast(35.0, 95.0),
    ));

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        h.pipeline.ingest(&event("d1", 20.0)),
    )
    .await
    .expect("pipeline must not wait on a hung oracle")
    .unwrap();

    assert_eq!(outcome.forecast, ForecastSnapshot::unavailable());
    // Default forecast: 25°C, 0% rain → low-tier watering for 15s.
    assert!(outcome.decision.should_water);
    assert_eq!(outcome.decision.duration_seconds, 15);
    assert!(outcome.decision.reason.contains("low rain chance (0%)"));
}

#[tokio::test]
async fn weather_failure_falls_back_to_default_forecast() {
    // ---
    let h = Harness::new(forecast(35.0, 95.0), 14);
    h.weather.set_behavior(WeatherBehavior::Fail);

    let outcome = h.pipeline.ingest(&event("d1", 20.0)).await.unwrap();

    assert!(outcome.forecast.is_fallback());
    assert_eq!(outcome.forecast.temperature_c, 25.0);
    assert_eq!(outcome.forecast.humidity_percent, 50.0);
    assert!(outcome.dispatched);
    assert_eq!(h.weather.calls(), vec!["San Francisco".to_string()]);
}

#[tokio::test]
async fn store_failure_does_not_block_watering() {
    // ---
    let h = Harness::new(forecast(20.0, 0.0), 12);
    h.telemetry.set_failing(true);

    let outcome = h.pipeline.ingest(&event("d1", 5.0)).await.unwrap();

    assert!(!outcome.persisted);
    assert!(outcome.dispatched && outcome.logged && outcome.notified);
    assert_eq!(outcome.decision.duration_seconds, 30);
}

#[tokio::test]
async fn actuator_failure_is_reported_not_retried() {
    // ---
    let h = Harness::new(forecast(20.0, 0.0), 12);
    h.actuator.set_failing(true);

    let outcome = h.pipeline.ingest(&event("d1", 5.0)).await.unwrap();

    assert!(outcome.accepted);
    assert!(!outcome.dispatched);
    assert!(outcome.logged && outcome.notified);
    assert!(h.actuator.commands().is_empty());
    assert_eq!(h.actions.actions().len(), 1);
}

#[tokio::test]
async fn log_and_notifier_failures_leave_decision_intact() {
    // ---
    let h = Harness::new(forecast(20.0, 0.0), 12);
    h.actions.set_failing(true);
    h.notifier.set_failing(true);

    let outcome = h.pipeline.ingest(&event("d1", 5.0)).await.unwrap();

    assert!(outcome.dispatched);
    assert!(!outcome.logged && !outcome.notified);
    assert!(outcome.decision.should_water);
    assert_eq!(outcome.decision.duration_seconds, 30);
}

#[tokio::test]
async fn malformed_event_has_no_side_effects() {
    // ---
    let h = Harness::new(forecast(20.0, 0.0), 12);

    let err = h
        .pipeline
        .ingest(&serde_json::json!({ "moisturePercent": 5 }))
        .await
        .unwrap_err();
    assert_eq!(err, InputError::MissingField("deviceId"));

    let err = h
        .pipeline
        .ingest(&serde_json::json!({ "deviceId": "d1", "moisturePercent": "wet" }))
        .await
        .unwrap_err();
    assert_eq!(err.field(), "moisturePercent");

    assert!(h.telemetry.readings().is_empty());
    assert!(h.weather.calls().is_empty());
    assert!(h.actuator.commands().is_empty());
}

#[tokio::test]
async fn concurrent_readings_for_one_device_are_not_deduplicated() {
    // ---
    let h = Harness::new(forecast(20.0, 0.0), 12);

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let pipeline = h.pipeline.clone();
        tasks.push(tokio::spawn(async move {
            pipeline.ingest(&event("d1", 8.0)).await
        }));
    }
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.dispatched);
    }

    assert_eq!(h.telemetry.readings().len(), 4);
    assert_eq!(h.actuator.commands().len(), 4);
    assert_eq!(h.actions.actions().len(), 4);
}

#[tokio::test]
async fn hour_is_read_per_event() {
    // ---
    let h = Harness::new(forecast(20.0, 0.0), 12);

    let day = h.pipeline.ingest(&event("d1", 10.0)).await.unwrap();
    h.clock.set_local_hour(22);
    let night = h.pipeline.ingest(&event("d1", 10.0)).await.unwrap();

    assert_eq!(day.decision.duration_seconds, 30);
    assert_eq!(night.decision.duration_seconds, 35);
}

#[tokio::test]
async fn two_tier_policy_is_selectable() {
    // ---
    let config = PipelineConfig {
        policy: DecisionPolicy::two_tier(),
        ..PipelineConfig::default()
    };
    let h = Harness::with_config(forecast(20.0, 40.0), 2, config);

    // 40% rain postpones under the two-tier cutoff of 30%, and says so.
    let outcome = h.pipeline.ingest(&event("d1", 20.0)).await.unwrap();
    assert!(!outcome.decision.should_water);
    assert!(outcome.notified);
    assert!(h.actuator.commands().is_empty());

    // No night bonus in the two-tier scheme; critical alerts at critical.
    let outcome = h.pipeline.ingest(&event("d1", 12.0)).await.unwrap();
    assert_eq!(outcome.decision.duration_seconds, 30);
    assert!(outcome.notified);

    // Low-tier watering is alerted too.
    h.weather.set_behavior(WeatherBehavior::Respond(forecast(20.0, 10.0)));
    let outcome = h.pipeline.ingest(&event("d1", 20.0)).await.unwrap();
    assert!(outcome.decision.should_water && outcome.notified);
    assert_eq!(outcome.decision.duration_seconds, 20);

    let alerts = h.notifier.alerts();
    assert_eq!(alerts.len(), 3);

    assert_eq!(alerts[0].subject, "Rain Expected");
    assert_eq!(alerts[0].priority, Priority::Normal);
    assert!(alerts[0].message.contains("40% rain chance"));

    assert_eq!(alerts[1].subject, "CRITICAL: Garden Needs Water!");
    assert_eq!(alerts[1].priority, Priority::Critical);

    assert_eq!(alerts[2].subject, "Garden Alert: Low Moisture");
    assert_eq!(alerts[2].priority, Priority::High);
    assert!(alerts[2].message.contains("Rain chance: 10%"));
}

#[tokio::test]
async fn hanging_actuator_is_cut_off_by_command_timeout() {
    // ---
    let config = PipelineConfig {
        command_timeout: Duration::from_millis(100),
        ..PipelineConfig::default()
    };
    let h = Harness::with_config(forecast(20.0, 0.0), 12, config);
    h.actuator.set_hang(Some(Duration::from_secs(30)));

    let started = std::time::Instant::now();
    let outcome = h.pipeline.ingest(&event("d1", 10.0)).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(outcome.decision.should_water);
    assert!(!outcome.dispatched);
    assert!(outcome.persisted && outcome.logged && outcome.notified);
    assert!(h.actuator.commands().is_empty());
}

#[tokio::test]
async fn hanging_notifier_is_cut_off_by_command_timeout() {
    // ---
    let config = PipelineConfig {
        command_timeout: Duration::from_millis(100),
        ..PipelineConfig::default()
    };
    let h = Harness::with_config(forecast(20.0, 0.0), 12, config);
    h.notifier.set_hang(Some(Duration::from_secs(30)));

    let started = std::time::Instant::now();
    let outcome = h.pipeline.ingest(&event("d1", 10.0)).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(outcome.dispatched && outcome.logged);
    assert!(!outcome.notified);
    assert!(h.notifier.alerts().is_empty());
}
