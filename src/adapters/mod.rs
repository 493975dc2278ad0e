//! Concrete collaborators behind the [`crate::ports`] traits.

mod actuator;
pub mod memory;
mod notifier;
mod postgres;
#[cfg(test)]
mod test_server;
mod weather;

pub use actuator::{CommandPayload, HttpActuatorGateway};
pub use notifier::WebhookNotifier;
pub use postgres::{PgActionLog, PgTelemetryStore};
pub use weather::{parse_current_weather, OpenWeatherMap};
