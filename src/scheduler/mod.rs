//! Fixed-interval sampling loop.
//!
//! Each iteration waits for the next interval tick, asks the model for a
//! sample, hands the resulting point to the sink and logs a status line.
//! Missed ticks are delayed rather than caught up, so sink latency shifts
//! the cadence instead of producing bursts.

pub mod clock;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::simulation::TelemetryModel;
use crate::sink::{MeterTags, Point, SampleSink, DEFAULT_MEASUREMENT};

pub use clock::{Clock, SteppedClock, SystemClock};

/// What the loop does when the sink rejects a sample.
///
/// Energy is accumulated either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WriteErrorPolicy {
    /// Log a warning and keep sampling
    #[default]
    Skip,
    /// Stop the loop with the sink error
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopConfig {
    pub tick_seconds: f64,
    pub max_ticks: Option<u64>,
    pub on_write_error: WriteErrorPolicy,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 1.0,
            max_ticks: None,
            on_write_error: WriteErrorPolicy::Skip,
        }
    }
}

impl LoopConfig {
    fn interval(&self) -> Result<Duration> {
        let interval = Duration::try_from_secs_f64(self.tick_seconds)
            .with_context(|| format!("invalid tick interval: {} s", self.tick_seconds))?;
        anyhow::ensure!(!interval.is_zero(), "tick interval must be positive");
        Ok(interval)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub written: u64,
    pub failed: u64,
    pub energy_kwh: f64,
}

pub struct MeterLoop<C = SystemClock, R = StdRng> {
    model: TelemetryModel<R>,
    sink: Arc<dyn SampleSink>,
    clock: C,
    tags: MeterTags,
    measurement: String,
    config: LoopConfig,
}

impl<C: Clock, R: Rng> MeterLoop<C, R> {
    pub fn new(
        model: TelemetryModel<R>,
        sink: Arc<dyn SampleSink>,
        clock: C,
        tags: MeterTags,
        config: LoopConfig,
    ) -> Self {
        Self {
            model,
            sink,
            clock,
            tags,
            measurement: DEFAULT_MEASUREMENT.to_string(),
            config,
        }
    }

    pub fn with_measurement(mut self, measurement: impl Into<String>) -> Self {
        self.measurement = measurement.into();
        self
    }

    pub fn model(&self) -> &TelemetryModel<R> {
        &self.model
    }

    /// Sample until `shutdown` resolves or `max_ticks` samples were taken.
    ///
    /// Shutdown is only observed while waiting for the next tick, so a sample
    /// that has been generated is always offered to the sink.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut interval = tokio::time::interval(self.config.interval()?);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut summary = RunSummary::default();
        loop {
            if self.config.max_ticks.is_some_and(|max| summary.ticks >= max) {
                info!(ticks = summary.ticks, "tick limit reached");
                break;
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(ticks = summary.ticks, "shutdown requested");
                    break;
                }
                _ = interval.tick() => {}
            }

            let now = self.clock.now();
            let sample = self.model.tick(now, self.config.tick_seconds);
            let point = Point::from_sample(&self.measurement, &self.tags, &sample);
            summary.ticks += 1;
            summary.energy_kwh = sample.energy_kwh;

            match self.sink.write(&point).await {
                Ok(()) => {
                    summary.written += 1;
                    info!(
                        p_real_w = sample.p_real,
                        vrms_v = sample.vrms,
                        irms_a = sample.irms,
                        pf = sample.pf,
                        energy_kwh = sample.energy_kwh,
                        "wrote sample"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    match self.config.on_write_error {
                        WriteErrorPolicy::Skip => {
                            warn!(error = %e, energy_kwh = sample.energy_kwh, "sample write failed");
                        }
                        WriteErrorPolicy::Abort => {
                            return Err(e).context(format!(
                                "sample write failed after {} ticks",
                                summary.ticks
                            ));
                        }
                    }
                }
            }
        }

        Ok(summary)
    }
}
