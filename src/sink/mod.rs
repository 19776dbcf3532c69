//! # Sample Sinks
//!
//! Destinations for meter samples. A [`Sample`] is converted into a tagged,
//! timestamped [`Point`] and handed to a [`SampleSink`].
//!
//! - [`InfluxSink`]: InfluxDB v2 HTTP write API
//! - [`LogSink`]: dry run, logs the encoded line instead of sending it
//! - [`MemorySink`]: collects points in memory

pub mod influx;
pub mod line_protocol;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::simulation::Sample;

pub use influx::InfluxSink;

/// Default measurement name for meter points
pub const DEFAULT_MEASUREMENT: &str = "power_samples";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("write rejected: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Tag values identifying the simulated meter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterTags {
    pub site: String,
    pub sensor: String,
}

/// Typed record accepted by every sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(&'static str, f64)>,
    /// Unix time in whole seconds
    pub timestamp_secs: i64,
}

impl Point {
    pub fn from_sample(measurement: &str, tags: &MeterTags, sample: &Sample) -> Self {
        Self {
            measurement: measurement.to_string(),
            tags: vec![
                ("site".to_string(), tags.site.clone()),
                ("sensor".to_string(), tags.sensor.clone()),
            ],
            fields: sample.fields().to_vec(),
            timestamp_secs: sample.timestamp.timestamp(),
        }
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
pub trait SampleSink: Send + Sync {
    async fn write(&self, point: &Point) -> Result<(), SinkError>;
}

/// Dry-run sink: logs the encoded record and always succeeds
#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl SampleSink for LogSink {
    async fn write(&self, point: &Point) -> Result<(), SinkError> {
        info!(line = %point.to_line_protocol(), "dry run");
        Ok(())
    }
}

/// In-memory sink. Clones share the same storage.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    points: Arc<Mutex<Vec<Point>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (`true`) or succeed again (`false`)
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn points(&self) -> Vec<Point> {
        self.points.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.points.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.lock().is_empty()
    }
}

#[async_trait]
impl SampleSink for MemorySink {
    async fn write(&self, point: &Point) -> Result<(), SinkError> {
        if *self.failing.lock() {
            return Err(SinkError::Unavailable("memory sink set to fail".into()));
        }
        self.points.lock().push(point.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> Sample {
        Sample {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 15, 18, 0, 0).unwrap(),
            vrms: 231.0,
            irms: 5.0,
            p_real: 1039.5,
            s_apparent: 1155.0,
            pf: 0.9,
            energy_kwh: 0.25,
            v_peak: 326.68,
            i_peak: 7.07,
        }
    }

    fn tags() -> MeterTags {
        MeterTags { site: "shu".into(), sensor: "sim_pi01".into() }
    }

    #[test]
    fn point_carries_every_sample_field() {
        let s = sample();
        let point = Point::from_sample(DEFAULT_MEASUREMENT, &tags(), &s);
        assert_eq!(point.measurement, "power_samples");
        assert_eq!(point.tag("site"), Some("shu"));
        assert_eq!(point.tag("sensor"), Some("sim_pi01"));
        assert_eq!(point.timestamp_secs, s.timestamp.timestamp());

        let names: Vec<_> = point.fields.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            names,
            ["vrms", "irms", "p_real", "s_apparent", "pf", "energy_kwh", "v_peak", "i_peak"]
        );
        assert_eq!(point.field("energy_kwh"), Some(0.25));
        assert_eq!(point.field("p_real"), Some(1039.5));
        assert_eq!(point.field("missing"), None);
    }

    #[tokio::test]
    async fn memory_sink_collects_and_fails_on_demand() {
        let sink = MemorySink::new();
        let point = Point::from_sample(DEFAULT_MEASUREMENT, &tags(), &sample());

        sink.write(&point).await.unwrap();
        sink.set_failing(true);
        assert!(matches!(sink.write(&point).await, Err(SinkError::Unavailable(_))));
        sink.set_failing(false);
        sink.clone().write(&point).await.unwrap();

        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn log_sink_always_succeeds() {
        let point = Point::from_sample(DEFAULT_MEASUREMENT, &tags(), &sample());
        assert!(LogSink.write(&point).await.is_ok());
    }
}
