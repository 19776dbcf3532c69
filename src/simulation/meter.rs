//! # Single-Phase Meter Model
//!
//! Generates RMS voltage, RMS current and power factor readings for a single
//! AC phase and derives apparent/real power, peak values and cumulative energy.
//!
//! - Voltage: nominal value with a slow sinusoidal drift over wall-clock time
//! - Current: base load scaled by the daily [`LoadShape`], plus random appliance spikes
//! - Power factor: improves slightly with load, clamped to a realistic band
//!
//! All randomness comes from the generator handed to [`TelemetryModel::new`],
//! so a seeded generator replays the exact same sequence of samples.

use chrono::{DateTime, FixedOffset, SubsecRound, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, BernoulliError, Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;
use thiserror::Error;
use validator::Validate;

use super::energy::EnergyAccumulator;
use super::load_shape::LoadShape;
use super::sample::Sample;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid appliance spike probability: {0}")]
    SpikeProbability(#[from] BernoulliError),
    #[error("{name} range is inverted: min {min} > max {max}")]
    InvertedRange {
        name: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{name} must be a finite number")]
    NonFinite { name: &'static str },
    #[error("invalid model configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Meter model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MeterModelConfig {
    /// Nominal RMS voltage in V (230 V for Europe)
    pub nominal_voltage_v: f64,
    /// Amplitude of the slow voltage drift in V
    pub voltage_drift_amplitude_v: f64,
    /// Drift argument divisor in seconds (sin(t / period))
    #[validate(range(exclusive_min = 0.0))]
    pub voltage_drift_period_s: f64,
    /// Uniform voltage noise as a fraction of the value
    #[validate(range(min = 0.0, max = 1.0))]
    pub voltage_noise_pct: f64,

    /// Always-on current in A
    pub base_current_a: f64,
    /// Current added at full daily demand in A
    pub load_current_span_a: f64,
    /// Probability of an appliance spike per sample (0.0-1.0)
    #[validate(range(min = 0.0, max = 1.0))]
    pub spike_probability: f64,
    pub spike_min_a: f64,
    pub spike_max_a: f64,
    /// Uniform current noise as a fraction of the value
    #[validate(range(min = 0.0, max = 1.0))]
    pub current_noise_pct: f64,

    /// Power factor at minimum demand, before the load-dependent part
    pub pf_base: f64,
    /// Power factor added at full daily demand
    pub pf_load_span: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub pf_noise_pct: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub pf_min: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub pf_max: f64,

    #[validate(nested)]
    pub load_shape: LoadShape,

    /// Random seed for reproducibility (None = random)
    pub random_seed: Option<u64>,
}

impl Default for MeterModelConfig {
    fn default() -> Self {
        Self {
            nominal_voltage_v: 230.0,
            voltage_drift_amplitude_v: 4.0,
            voltage_drift_period_s: 400.0,
            voltage_noise_pct: 0.003,
            base_current_a: 0.8,
            load_current_span_a: 10.0,
            spike_probability: 0.06,
            spike_min_a: 4.0,
            spike_max_a: 12.0,
            current_noise_pct: 0.02,
            pf_base: 0.82,
            pf_load_span: 0.1,
            pf_noise_pct: 0.02,
            pf_min: 0.75,
            pf_max: 0.98,
            load_shape: LoadShape::default(),
            random_seed: None,
        }
    }
}

impl MeterModelConfig {
    /// Deterministic variant: no noise and no appliance spikes
    pub fn noiseless() -> Self {
        Self {
            voltage_noise_pct: 0.0,
            current_noise_pct: 0.0,
            pf_noise_pct: 0.0,
            spike_probability: 0.0,
            ..Self::default()
        }
    }

    /// Reject non-finite values, out-of-range fields and inverted ranges
    pub fn check(&self) -> Result<(), ModelError> {
        let scalars = [
            ("nominal_voltage_v", self.nominal_voltage_v),
            ("voltage_drift_amplitude_v", self.voltage_drift_amplitude_v),
            ("voltage_drift_period_s", self.voltage_drift_period_s),
            ("voltage_noise_pct", self.voltage_noise_pct),
            ("base_current_a", self.base_current_a),
            ("load_current_span_a", self.load_current_span_a),
            ("spike_probability", self.spike_probability),
            ("spike_min_a", self.spike_min_a),
            ("spike_max_a", self.spike_max_a),
            ("current_noise_pct", self.current_noise_pct),
            ("pf_base", self.pf_base),
            ("pf_load_span", self.pf_load_span),
            ("pf_noise_pct", self.pf_noise_pct),
            ("pf_min", self.pf_min),
            ("pf_max", self.pf_max),
            ("load_shape.baseline", self.load_shape.baseline),
            ("load_shape.min", self.load_shape.min),
            ("load_shape.max", self.load_shape.max),
        ];
        let bumps = self.load_shape.bumps.iter().flat_map(|bump| {
            [
                ("load_shape.bumps.center_hour", bump.center_hour),
                ("load_shape.bumps.weight", bump.weight),
                ("load_shape.bumps.width_hours", bump.width_hours),
            ]
        });
        if let Some((name, _)) = scalars
            .into_iter()
            .chain(bumps)
            .find(|(_, value)| !value.is_finite())
        {
            return Err(ModelError::NonFinite { name });
        }

        self.validate()?;
        check_range("appliance spike current", self.spike_min_a, self.spike_max_a)?;
        check_range("power factor", self.pf_min, self.pf_max)?;
        check_range("load shape", self.load_shape.min, self.load_shape.max)?;
        Ok(())
    }
}

/// Default relative noise for [`TelemetryModel::noisy`]
pub const DEFAULT_NOISE_PCT: f64 = 0.005;

pub struct TelemetryModel<R = StdRng> {
    config: MeterModelConfig,
    rng: R,
    spike: Bernoulli,
    spike_current: Uniform<f64>,
    energy: EnergyAccumulator,
}

impl TelemetryModel<StdRng> {
    /// Build a model with a `StdRng` seeded from `config.random_seed`,
    /// or from OS entropy when no seed is configured
    pub fn from_config(config: MeterModelConfig) -> Result<Self, ModelError> {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(config, rng)
    }
}

impl<R: Rng> TelemetryModel<R> {
    pub fn new(config: MeterModelConfig, rng: R) -> Result<Self, ModelError> {
        config.check()?;

        let spike = Bernoulli::new(config.spike_probability)?;
        let spike_current = Uniform::new_inclusive(config.spike_min_a, config.spike_max_a);

        Ok(Self {
            config,
            rng,
            spike,
            spike_current,
            energy: EnergyAccumulator::new(),
        })
    }

    pub fn config(&self) -> &MeterModelConfig {
        &self.config
    }

    /// Cumulative energy since construction in kWh
    pub fn energy_kwh(&self) -> f64 {
        self.energy.kwh()
    }

    /// Daily demand factor in `[load_shape.min, load_shape.max]`
    pub fn day_pattern(&self, now: DateTime<FixedOffset>) -> f64 {
        self.config.load_shape.day_pattern(&now)
    }

    /// Scale `value` by `1 + u`, `u ~ U[-pct, pct]`. Consumes one draw.
    pub fn noisy(&mut self, value: f64, pct: f64) -> f64 {
        let pct = pct.abs();
        value * (1.0 + self.rng.gen_range(-pct..=pct))
    }

    /// One Bernoulli draw: does a large appliance switch on this sample?
    pub fn appliance_spike(&mut self) -> bool {
        self.spike.sample(&mut self.rng)
    }

    pub fn simulate_vrms(&mut self, now: DateTime<FixedOffset>) -> f64 {
        let drift = self.config.voltage_drift_amplitude_v
            * (epoch_seconds(now) / self.config.voltage_drift_period_s).sin();
        let pct = self.config.voltage_noise_pct;
        self.noisy(self.config.nominal_voltage_v + drift, pct)
    }

    pub fn simulate_irms(&mut self, now: DateTime<FixedOffset>) -> f64 {
        let mut base =
            self.config.base_current_a + self.config.load_current_span_a * self.day_pattern(now);
        if self.appliance_spike() {
            base += self.spike_current.sample(&mut self.rng);
        }
        let pct = self.config.current_noise_pct;
        self.noisy(base, pct)
    }

    pub fn simulate_pf(&mut self, now: DateTime<FixedOffset>) -> f64 {
        let base = self.config.pf_base + self.config.pf_load_span * self.day_pattern(now);
        let pct = self.config.pf_noise_pct;
        self.noisy(base, pct)
            .clamp(self.config.pf_min, self.config.pf_max)
    }

    /// Produce one sample and advance the energy register by `dt_seconds`.
    ///
    /// Panics if any derived quantity is not finite.
    pub fn tick(&mut self, now: DateTime<FixedOffset>, dt_seconds: f64) -> Sample {
        let vrms = self.simulate_vrms(now);
        let irms = self.simulate_irms(now);
        let pf = self.simulate_pf(now);

        let s_apparent = vrms * irms;
        let p_real = s_apparent * pf;
        let energy_kwh = self.energy.accumulate(p_real, dt_seconds);

        let sample = Sample {
            timestamp: now.with_timezone(&Utc).trunc_subsecs(0),
            vrms,
            irms,
            p_real,
            s_apparent,
            pf,
            energy_kwh,
            v_peak: vrms * SQRT_2,
            i_peak: irms * SQRT_2,
        };
        assert!(sample.is_finite(), "non-finite meter sample: {sample:?}");
        sample
    }
}

fn check_range(name: &'static str, min: f64, max: f64) -> Result<(), ModelError> {
    if min > max {
        return Err(ModelError::InvertedRange { name, min, max });
    }
    Ok(())
}

fn epoch_seconds(now: DateTime<FixedOffset>) -> f64 {
    now.timestamp() as f64 + now.timestamp_subsec_nanos() as f64 * 1e-9
}
