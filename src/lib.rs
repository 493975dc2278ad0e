//! Irrigation decision service for garden soil-moisture sensors.
//!
//! A reading arrives on `POST /ingest`, is stored, combined with a weather
//! forecast, and judged by the [`engine`]. When the soil needs water a pump
//! command is published, the action is recorded, and critically dry soil
//! raises an alert. See [`pipeline`] for the step ordering and failure
//! semantics.

pub mod adapters;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod ports;
pub mod routes;
pub mod schema;

pub use config::{Config, PipelineConfig};
pub use engine::{decide, Alert, DecisionPolicy};
pub use error::{CollaboratorError, InputError};
pub use models::{
    Action, ActionKind, Decision, ForecastSnapshot, Outcome, Priority, PumpStatus, Reading,
};
pub use pipeline::{Collaborators, IngestionPipeline};
