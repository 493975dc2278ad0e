//! HTTP publish gateway for pump commands.
//!
//! Commands go to `{base_url}/topics/{topic}?qos=1` as JSON, the HTTPS
//! publish shape used by common IoT brokers. A 2xx only means the broker
//! took the message; whether the pump ran is never reported back.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::error::CollaboratorError;
use crate::models::ActionKind;
use crate::ports::ActuatorGateway;

// ---

/// Wire payload understood by the garden firmware.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandPayload<'a> {
    pub device_id: &'a str,
    pub action: ActionKind,
    pub duration: u32,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct HttpActuatorGateway {
    client: reqwest::Client,
    base_url: Option<String>,
    topic: String,
    timeout: Duration,
}

impl HttpActuatorGateway {
    /// `base_url = None` leaves the gateway unconfigured; every publish fails.
    /// Each publish gives up after `timeout`.
    pub fn new(
        client: reqwest::Client,
        base_url: Option<String>,
        topic: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        HttpActuatorGateway {
            client,
            base_url,
            topic: topic.into(),
            timeout,
        }
    }

    fn publish_url(&self, base_url: &str) -> String {
        format!("{}/topics/{}?qos=1", base_url.trim_end_matches('/'), self.topic)
    }
}

#[async_trait]
impl ActuatorGateway for HttpActuatorGateway {
    async fn publish(
        &self,
        device_id: &str,
        action: ActionKind,
        duration_seconds: u32,
    ) -> Result<(), CollaboratorError> {
        // ---
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            CollaboratorError::Unavailable("no actuator endpoint configured".to_string())
        })?;

        let payload = CommandPayload {
            device_id,
            action,
            duration: duration_seconds,
            timestamp: Utc::now().to_rfc3339(),
        };

        let response = self
            .client
            .post(self.publish_url(base_url))
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollaboratorError::Timeout(self.timeout)
                } else {
                    e.into()
                }
            })?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Rejected {
                status: response.status().as_u16(),
            });
        }

        tracing::info!(
            "Command sent: {} for {}s to {}",
            action.as_str(),
            duration_seconds,
            device_id
        );
        Ok(())
    }
}
