//! In-memory collaborators.
//!
//! Every adapter records what it was asked to do and can be switched into a
//! failing mode, so pipeline behaviour under partial outages can be checked
//! without a database, broker or weather API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::CollaboratorError;
use crate::models::{
    Action, ActionKind, ForecastSnapshot, PageToken, Priority, Reading, ReadingPage, TimeRange,
};
use crate::ports::{ActionLog, ActuatorGateway, Clock, Notifier, TelemetryStore, WeatherOracle};

// ---

fn injected(what: &str) -> CollaboratorError {
    CollaboratorError::Unavailable(format!("{what} failure injected"))
}

/// Sleep for the configured stall, if any, before answering.
async fn stall(hang: &Mutex<Option<Duration>>) {
    let delay = *hang.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTelemetryStore {
    readings: Mutex<Vec<Reading>>,
    failing: AtomicBool,
}

impl InMemoryTelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Everything appended so far, in append order.
    pub fn readings(&self) -> Vec<Reading> {
        self.readings.lock().clone()
    }
}

#[async_trait]
impl TelemetryStore for InMemoryTelemetryStore {
    async fn append(&self, reading: &Reading) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected("telemetry store"));
        }
        self.readings.lock().push(reading.clone());
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
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected("telemetry store"));
        }

        let mut matching: Vec<Reading> = self
            .readings
            .lock()
            .iter()
            .filter(|r| r.device_id == device_id)
            .filter(|r| range.map_or(true, |range| range.contains(r.timestamp)))
            .filter(|r| page_token.map_or(true, |token| token.precedes(r)))
            .cloned()
            .collect();

        matching.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        matching.truncate(limit as usize + 1);
        Ok(ReadingPage::from_newest_first(matching, limit))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryActionLog {
    actions: Mutex<Vec<Action>>,
    failing: AtomicBool,
}

impl InMemoryActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().clone()
    }
}

#[async_trait]
impl ActionLog for InMemoryActionLog {
    async fn append(&self, action: &Action) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected("action log"));
        }
        self.actions.lock().push(action.clone());
        Ok(())
    }

    async fn query(&self, device_id: &str, limit: u32) -> Result<Vec<Action>, CollaboratorError> {
        // ---
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected("action log"));
        }
        let mut matching: Vec<Action> = self
            .actions
            .lock()
            .iter()
            .filter(|a| a.device_id == device_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        matching.truncate(limit as usize);
        Ok(matching)
    }
}

/// What a [`StubWeather`] does when asked for a forecast.
#[derive(Debug, Clone)]
pub enum WeatherBehavior {
    Respond(ForecastSnapshot),
    Fail,
    /// Sleep for the given time before responding, ignoring the timeout.
    Hang(Duration, ForecastSnapshot),
}

#[derive(Debug)]
pub struct StubWeather {
    behavior: Mutex<WeatherBehavior>,
    calls: Mutex<Vec<String>>,
}

impl StubWeather {
    // ---
    pub fn new(behavior: WeatherBehavior) -> Self {
        StubWeather {
            behavior: Mutex::new(behavior),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn responding(forecast: ForecastSnapshot) -> Self {
        Self::new(WeatherBehavior::Respond(forecast))
    }

    pub fn set_behavior(&self, behavior: WeatherBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Locations requested so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl WeatherOracle for StubWeather {
    async fn fetch(
        &self,
        location: &str,
        _timeout: Duration,
    ) -> Result<ForecastSnapshot, CollaboratorError> {
        // ---
        self.calls.lock().push(location.to_string());
        let behavior = self.behavior.lock().clone();
        match behavior {
            WeatherBehavior::Respond(forecast) => Ok(forecast),
            WeatherBehavior::Fail => Err(injected("weather")),
            WeatherBehavior::Hang(delay, forecast) => {
                tokio::time::sleep(delay).await;
                Ok(forecast)
            }
        }
    }
}

/// One recorded [`ActuatorGateway::publish`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedCommand {
    pub device_id: String,
    pub action: ActionKind,
    pub duration_seconds: u32,
}

#[derive(Debug, Default)]
pub struct RecordingActuator {
    commands: Mutex<Vec<PublishedCommand>>,
    failing: AtomicBool,
    hang: Mutex<Option<Duration>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Stall every publish for `delay` before answering.
    pub fn set_hang(&self, delay: Option<Duration>) {
        *self.hang.lock() = delay;
    }

    /// Commands accepted so far. Failed publishes are not recorded.
    pub fn commands(&self) -> Vec<PublishedCommand> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl ActuatorGateway for RecordingActuator {
    async fn publish(
        &self,
        device_id: &str,
        action: ActionKind,
        duration_seconds: u32,
    ) -> Result<(), CollaboratorError> {
        stall(&self.hang).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected("actuator"));
        }
        self.commands.lock().push(PublishedCommand {
            device_id: device_id.to_string(),
            action,
            duration_seconds,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentAlert {
    pub subject: String,
    pub message: String,
    pub priority: Priority,
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<SentAlert>>,
    failing: AtomicBool,
    hang: Mutex<Option<Duration>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Stall every send for `delay` before answering.
    pub fn set_hang(&self, delay: Option<Duration>) {
        *self.hang.lock() = delay;
    }

    pub fn alerts(&self) -> Vec<SentAlert> {
        self.alerts.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        subject: &str,
        message: &str,
        priority: Priority,
    ) -> Result<(), CollaboratorError> {
        stall(&self.hang).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected("notifier"));
        }
        self.alerts.lock().push(SentAlert {
            subject: subject.to_string(),
            message: message.to_string(),
            priority,
        });
        Ok(())
    }
}

/// Clock pinned to one instant and one local hour.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    hour: Mutex<u32>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, local_hour: u32) -> Self {
        FixedClock {
            now: Mutex::new(now),
            hour: Mutex::new(local_hour),
        }
    }

    pub fn set_local_hour(&self, hour: u32) {
        *self.hour.lock() = hour;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    fn local_hour(&self) -> u32 {
        *self.hour.lock()
    }
}
