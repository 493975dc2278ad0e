//! Webhook notifier.
//!
//! Every alert goes to the primary webhook. High and critical alerts are
//! also posted to the urgent webhook, prefixed the way SMS alerts are.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CollaboratorError;
use crate::models::Priority;
use crate::ports::Notifier;

// ---

#[derive(Debug, Serialize)]
struct AlertPayload<'a> {
    subject: &'a str,
    message: &'a str,
    priority: Priority,
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    primary_url: Option<String>,
    urgent_url: Option<String>,
    timeout: Duration,
}

impl WebhookNotifier {
    /// Each webhook post gives up after `timeout`.
    pub fn new(
        client: reqwest::Client,
        primary_url: Option<String>,
        urgent_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        WebhookNotifier {
            client,
            primary_url,
            urgent_url,
            timeout,
        }
    }

    async fn post(&self, url: &str, payload: &AlertPayload<'_>) -> Result<(), CollaboratorError> {
        // ---
        let response = self
            .client
            .post(url)
            .json(payload)
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
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(
        &self,
        subject: &str,
        message: &str,
        priority: Priority,
    ) -> Result<(), CollaboratorError> {
        // ---
        if self.primary_url.is_none() && self.urgent_url.is_none() {
            return Err(CollaboratorError::Unavailable(
                "no notification channel configured".to_string(),
            ));
        }

        let mut delivered = false;
        let mut last_err = None;

        if let Some(url) = &self.primary_url {
            let payload = AlertPayload { subject, message, priority };
            match self.post(url, &payload).await {
                Ok(()) => delivered = true,
                Err(e) => {
                    tracing::warn!("Primary notification channel failed: {}", e);
                    last_err = Some(e);
                }
            }
        }

        if priority >= Priority::High {
            if let Some(url) = &self.urgent_url {
                let urgent = format!("GARDEN ALERT: {message}");
                let payload = AlertPayload {
                    subject,
                    message: &urgent,
                    priority,
                };
                match self.post(url, &payload).await {
                    Ok(()) => delivered = true,
                    Err(e) => {
                        tracing::warn!("Urgent notification channel failed: {}", e);
                        last_err = Some(e);
                    }
                }
            }
        }

        match (delivered, last_err) {
            (true, _) => {
                tracing::info!("Notification sent: {}", subject);
                Ok(())
            }
            (false, Some(e)) => Err(e),
            (false, None) => Err(CollaboratorError::Unavailable(format!(
                "no channel accepts {} priority alerts",
                priority.as_str()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::adapters::test_server::{test_client, TestServer};

    fn notifier(primary_url: Option<String>, urgent_url: Option<String>) -> WebhookNotifier {
        WebhookNotifier::new(
            test_client(),
            primary_url,
            urgent_url,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_fails() {
        // ---
        let n = notifier(None, None);
        let err = n.send("s", "m", Priority::High).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_urgent_only_notifier_skips_low_priority() {
        // ---
        let n = notifier(None, Some("http://127.0.0.1:9/hook".into()));
        let err = n.send("s", "m", Priority::Low).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_high_priority_reaches_both_channels() {
        // ---
        let server = TestServer::start().await;
        let n = notifier(Some(server.url("/primary")), Some(server.url("/urgent")));

        n.send("CRITICAL: Garden Needs Water!", "Soil at 8%", Priority::High)
            .await
            .unwrap();

        let mut requests = server.requests();
        requests.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].path, "/primary");
        assert_eq!(requests[0].body["subject"], "CRITICAL: Garden Needs Water!");
        assert_eq!(requests[0].body["message"], "Soil at 8%");
        assert_eq!(requests[0].body["priority"], "high");

        assert_eq!(requests[1].path, "/urgent");
        assert_eq!(requests[1].body["message"], "GARDEN ALERT: Soil at 8%");
        assert_eq!(requests[1].body["priority"], "high");
    }

    #[tokio::test]
    async fn test_low_priority_reaches_primary_only() {
        // ---
        let server = TestServer::start().await;
        let n = notifier(Some(server.url("/primary")), Some(server.url("/urgent")));

        n.send("Rain Expected", "Watering postponed", Priority::Low)
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/primary");
        assert_eq!(requests[0].body["priority"], "low");
    }

    #[tokio::test]
    async fn test_one_working_channel_is_enough() {
        // ---
        let server = TestServer::start().await;
        let n = notifier(Some(server.url("/broken")), Some(server.url("/urgent")));

        n.send("CRITICAL: Garden Needs Water!", "Soil at 8%", Priority::Critical)
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/urgent");
        assert_eq!(requests[0].body["message"], "GARDEN ALERT: Soil at 8%");
    }

    #[tokio::test]
    async fn test_every_channel_failing_is_an_error() {
        // ---
        let server = TestServer::start().await;
        let n = notifier(Some(server.url("/broken")), None);

        let err = n.send("s", "m", Priority::High).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Rejected { status: 500 }));
    }
}
