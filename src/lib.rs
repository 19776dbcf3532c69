//! Synthetic single-phase AC power meter.
//!
//! [`simulation::TelemetryModel`] produces one [`simulation::Sample`] per tick,
//! [`scheduler::MeterLoop`] drives it at a fixed cadence and forwards each
//! reading to a [`sink::SampleSink`] such as InfluxDB.

pub mod config;
pub mod scheduler;
pub mod simulation;
pub mod sink;
pub mod telemetry;
