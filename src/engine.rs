//! Irrigation decision engine.
//!
//! [`DecisionPolicy::decide`] maps a moisture reading, a forecast and the
//! local hour to a [`Decision`]. It does no I/O and reads no clock, so the
//! same inputs always produce the same output and any number of pipeline
//! invocations may call it concurrently.
//!
//! Branches, first match wins:
//! 1. moisture < critical: water, regardless of forecast
//! 2. moisture < low: water unless rain is expected
//! 3. moisture >= optimal: no watering
//! 4. otherwise: adequate, no watering
//!
//! A night bonus is then added to decisions that already water.

use serde::Serialize;

use crate::models::{clamp_percent, Decision, ForecastSnapshot, Priority};

// ---

pub const CRITICAL_MOISTURE: f64 = 15.0;
pub const LOW_MOISTURE: f64 = 25.0;
pub const OPTIMAL_MOISTURE: f64 = 45.0;

/// Threshold and duration constants for the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionPolicy {
    // ---
    /// Below this moisture percent the soil is critically dry.
    pub critical_moisture: f64,

    /// Below this moisture percent the soil is dry enough to consider watering.
    pub low_moisture: f64,

    /// At or above this moisture percent the soil is optimal.
    pub optimal_moisture: f64,

    /// Rain probability at or above which low-tier watering is postponed.
    pub rain_postpone_percent: f64,

    /// Temperature above which low-tier watering uses the hot duration.
    pub hot_temperature_c: f64,

    pub critical_duration_secs: u32,
    pub low_duration_secs: u32,
    pub hot_duration_secs: u32,

    /// Extra seconds added before 06:00 and after 20:59 local time.
    pub night_bonus_secs: u32,

    /// Priority of the alert raised for critically dry soil.
    pub critical_priority: Priority,

    /// Alert when low-tier watering is triggered.
    pub alert_on_low: bool,

    /// Alert when low-tier watering is postponed for rain.
    pub alert_on_postpone: bool,
}

/// A human-readable alert derived from one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub subject: String,
    pub message: String,
    pub priority: Priority,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::three_tier()
    }
}

impl DecisionPolicy {
    // ---
    /// Critical / low / optimal tiers with a night bonus.
    pub fn three_tier() -> Self {
        DecisionPolicy {
            critical_moisture: CRITICAL_MOISTURE,
            low_moisture: LOW_MOISTURE,
            optimal_moisture: OPTIMAL_MOISTURE,
            rain_postpone_percent: 50.0,
            hot_temperature_c: 30.0,
            critical_duration_secs: 30,
            low_duration_secs: 15,
            hot_duration_secs: 20,
            night_bonus_secs: 5,
            critical_priority: Priority::High,
            alert_on_low: false,
            alert_on_postpone: false,
        }
    }

    /// Critical / low tiers only: a stricter rain cutoff, a fixed 20 s low
    /// watering and no night bonus. Everything at or above `low` counts as
    /// optimal. Every low-tier outcome is alerted and critical alerts go out
    /// at critical priority.
    pub fn two_tier() -> Self {
        DecisionPolicy {
            critical_moisture: CRITICAL_MOISTURE,
            low_moisture: LOW_MOISTURE,
            optimal_moisture: LOW_MOISTURE,
            rain_postpone_percent: 30.0,
            hot_temperature_c: 30.0,
            critical_duration_secs: 30,
            low_duration_secs: 20,
            hot_duration_secs: 20,
            night_bonus_secs: 0,
            critical_priority: Priority::Critical,
            alert_on_low: true,
            alert_on_postpone: true,
        }
    }

    /// Decide whether and how long to water.
    ///
    /// Total: out-of-range moisture and rain are clamped into `[0, 100]`
    /// and the hour into `0..=23` before evaluation.
    pub fn decide(
        &self,
        moisture_percent: f64,
        forecast: &ForecastSnapshot,
        local_hour: u32,
    ) -> Decision {
        // ---
        let moisture = clamp_percent(moisture_percent);
        let rain = clamp_percent(forecast.rain_probability_percent);
        let hour = local_hour.min(23);

        let mut decision = if moisture < self.critical_moisture {
            Decision {
                should_water: true,
                duration_seconds: self.critical_duration_secs,
                reason: format!("CRITICAL: Soil very dry ({moisture}%) - immediate watering"),
            }
        } else if moisture < self.low_moisture {
            if rain < self.rain_postpone_percent {
                let duration_seconds = if forecast.temperature_c > self.hot_temperature_c {
                    self.hot_duration_secs
                } else {
                    self.low_duration_secs
                };
                Decision {
                    should_water: true,
                    duration_seconds,
                    reason: format!("Soil dry ({moisture}%), low rain chance ({rain}%)"),
                }
            } else {
                no_water(format!("Soil dry ({moisture}%) but rain expected ({rain}%)"))
            }
        } else if moisture >= self.optimal_moisture {
            no_water(format!("Soil moisture optimal ({moisture}%)"))
        } else {
            no_water("Soil moisture adequate".to_string())
        };

        if decision.should_water && is_night(hour) && self.night_bonus_secs > 0 {
            decision.duration_seconds += self.night_bonus_secs;
            decision.reason.push_str(" - Night watering (optimal time)");
        }

        decision
    }

    /// The alert, if any, this policy raises for `decision`.
    ///
    /// `decision` must come from [`decide`](Self::decide) with the same
    /// moisture and forecast.
    pub fn alert(
        &self,
        moisture_percent: f64,
        forecast: &ForecastSnapshot,
        decision: &Decision,
    ) -> Option<Alert> {
        // ---
        let moisture = clamp_percent(moisture_percent);
        let rain = clamp_percent(forecast.rain_probability_percent);

        if moisture < self.critical_moisture {
            return decision.should_water.then(|| Alert {
                subject: "CRITICAL: Garden Needs Water!".to_string(),
                message: format!(
                    "Soil moisture critically low at {moisture}%. \
                     Automatic watering triggered for {}s.",
                    decision.duration_seconds
                ),
                priority: self.critical_priority,
            });
        }
        if moisture >= self.low_moisture {
            return None;
        }

        if decision.should_water && self.alert_on_low {
            Some(Alert {
                subject: "Garden Alert: Low Moisture".to_string(),
                message: format!(
                    "Soil at {moisture}%. Rain chance: {rain}%. \
                     Watering scheduled for {}s.",
                    decision.duration_seconds
                ),
                priority: Priority::High,
            })
        } else if !decision.should_water && self.alert_on_postpone {
            Some(Alert {
                subject: "Rain Expected".to_string(),
                message: format!(
                    "Soil at {moisture}% but {rain}% rain chance. Watering postponed."
                ),
                priority: Priority::Normal,
            })
        } else {
            None
        }
    }
}

/// Decide with the default three-tier policy.
pub fn decide(moisture_percent: f64, forecast: &ForecastSnapshot, local_hour: u32) -> Decision {
    DecisionPolicy::default().decide(moisture_percent, forecast, local_hour)
}

fn is_night(hour: u32) -> bool {
    hour < 6 || hour > 20
}

fn no_water(reason: String) -> Decision {
    Decision {
        should_water: false,
        duration_seconds: 0,
        reason,
    }
}
