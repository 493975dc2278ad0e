//! OpenWeatherMap forecast oracle.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CollaboratorError;
use crate::models::{clamp_percent, ForecastSnapshot};
use crate::ports::WeatherOracle;

// ---

/// Current-conditions lookup against the OpenWeatherMap `weather` endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherMap {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenWeatherMap {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        OpenWeatherMap {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl WeatherOracle for OpenWeatherMap {
    async fn fetch(
        &self,
        location: &str,
        timeout: Duration,
    ) -> Result<ForecastSnapshot, CollaboratorError> {
        // ---
        if self.api_key.is_empty() {
            return Err(CollaboratorError::Unavailable(
                "no weather API key configured".to_string(),
            ));
        }

        let response = self
            .client
            .get(&self.api_url)
            .query(&[("q", location), ("appid", self.api_key.as_str()), ("units", "metric")])
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;
        tracing::debug!("Weather raw response: {}", body);

        let forecast = parse_current_weather(&body)?;
        tracing::info!(
            temperature_c = forecast.temperature_c,
            rain_probability = forecast.rain_probability_percent,
            description = %forecast.description,
            "Weather fetched for {}",
            location
        );
        Ok(forecast)
    }
}

/// Map an OpenWeatherMap current-weather body to a [`ForecastSnapshot`].
///
/// The endpoint reports rain volume rather than probability, so the last
/// hour's `rain.1h` millimetres scaled by 100 stand in for it.
pub fn parse_current_weather(body: &Value) -> Result<ForecastSnapshot, CollaboratorError> {
    // ---
    let main = body
        .get("main")
        .ok_or_else(|| CollaboratorError::Malformed("missing 'main' object".to_string()))?;
    let temperature = main
        .get("temp")
        .and_then(Value::as_f64)
        .ok_or_else(|| CollaboratorError::Malformed("missing 'main.temp'".to_string()))?;
    let humidity = main.get("humidity").and_then(Value::as_f64).unwrap_or(50.0);

    let rain_probability = body
        .get("rain")
        .and_then(|r| r.get("1h"))
        .and_then(Value::as_f64)
        .map(|mm| mm * 100.0)
        .unwrap_or(0.0);

    let description = body
        .get("weather")
        .and_then(Value::as_array)
        .and_then(|w| w.first())
        .and_then(|w| w.get("description"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    Ok(ForecastSnapshot {
        temperature_c: (temperature * 10.0).round() / 10.0,
        humidity_percent: clamp_percent(humidity),
        rain_probability_percent: clamp_percent(rain_probability),
        description,
    })
}
