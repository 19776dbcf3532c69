//! # Daily Load Shape
//!
//! Deterministic time-of-day demand curve: a constant baseline plus Gaussian
//! bumps around typical demand peaks, clamped to a fixed range.

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A single Gaussian demand bump on the 24h clock
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct DemandBump {
    /// Hour of day at which the bump peaks (0.0-24.0)
    #[validate(range(min = 0.0, max = 24.0))]
    pub center_hour: f64,
    /// Height of the bump above the baseline
    pub weight: f64,
    /// Width of the bump in hours
    #[validate(range(exclusive_min = 0.0))]
    pub width_hours: f64,
}

impl DemandBump {
    pub fn contribution(&self, hour: f64) -> f64 {
        let x = (hour - self.center_hour) / self.width_hours;
        self.weight * (-(x * x)).exp()
    }
}

/// Residential/industrial day curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoadShape {
    pub baseline: f64,
    #[validate(nested)]
    pub bumps: Vec<DemandBump>,
    pub min: f64,
    pub max: f64,
}

impl Default for LoadShape {
    fn default() -> Self {
        Self {
            baseline: 0.35,
            bumps: vec![
                // Evening peak: cooking, lighting, entertainment
                DemandBump { center_hour: 19.0, weight: 0.35, width_hours: 3.5 },
                // Midday plateau
                DemandBump { center_hour: 12.0, weight: 0.15, width_hours: 4.0 },
            ],
            min: 0.1,
            max: 1.0,
        }
    }
}

impl LoadShape {
    /// Demand factor for a fractional hour of day, clamped to `[min, max]`
    pub fn at_hour(&self, hour: f64) -> f64 {
        let raw = self.baseline
            + self
                .bumps
                .iter()
                .map(|bump| bump.contribution(hour))
                .sum::<f64>();
        raw.min(self.max).max(self.min)
    }

    /// Demand factor for a wall-clock instant.
    ///
    /// Uses the local hour plus minutes as a fraction; seconds are ignored.
    pub fn day_pattern<T: Timelike>(&self, now: &T) -> f64 {
        self.at_hour(hour_of_day(now))
    }
}

pub fn hour_of_day<T: Timelike>(now: &T) -> f64 {
    now.hour() as f64 + now.minute() as f64 / 60.0
}
