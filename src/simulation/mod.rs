//! # Meter Simulation Module
//!
//! Synthetic single-phase AC power meter.
//!
//! ## Components
//!
//! - **LoadShape**: Deterministic daily demand curve (baseline plus Gaussian peaks)
//! - **TelemetryModel**: Voltage/current/power-factor generation with noise and appliance spikes
//! - **EnergyAccumulator**: Cumulative kWh register, never decreases
//! - **Sample**: One immutable reading per tick
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Local;
//! use power_meter_sim::simulation::{MeterModelConfig, TelemetryModel};
//!
//! let config = MeterModelConfig {
//!     random_seed: Some(42),
//!     ..Default::default()
//! };
//! let mut model = TelemetryModel::from_config(config).unwrap();
//!
//! let sample = model.tick(Local::now().fixed_offset(), 1.0);
//! assert_eq!(sample.p_real, sample.s_apparent * sample.pf);
//! ```

pub mod energy;
pub mod load_shape;
pub mod meter;
pub mod sample;

pub use energy::{EnergyAccumulator, JOULES_PER_KWH};
pub use load_shape::{DemandBump, LoadShape};
pub use meter::{MeterModelConfig, ModelError, TelemetryModel, DEFAULT_NOISE_PCT};
pub use sample::Sample;
