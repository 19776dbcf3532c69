use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use validator::Validate;

use crate::scheduler::{LoopConfig, WriteErrorPolicy};
use crate::simulation::{MeterModelConfig, ModelError};
use crate::sink::{MeterTags, DEFAULT_MEASUREMENT};

/// Flat variables of the original deployment, read verbatim as strings
const LEGACY_ENV_KEYS: [(&str, &str); 6] = [
    ("INFLUX_URL", "influx.url"),
    ("INFLUX_TOKEN", "influx.token"),
    ("INFLUX_ORG", "influx.org"),
    ("INFLUX_BUCKET", "influx.bucket"),
    ("SITE", "meter.site"),
    ("SENSOR", "meter.sensor"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
    #[error("invalid model configuration: {0}")]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub influx: InfluxConfig,
    pub meter: MeterConfig,
    pub output: OutputConfig,
    pub model: MeterModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct InfluxConfig {
    #[validate(length(min = 1, message = "INFLUX_URL is not set"), url)]
    pub url: String,
    #[validate(length(min = 1, message = "INFLUX_TOKEN is not set"))]
    pub token: String,
    #[validate(length(min = 1, message = "INFLUX_ORG is not set"))]
    pub org: String,
    #[validate(length(min = 1, message = "INFLUX_BUCKET is not set"))]
    pub bucket: String,
    #[validate(length(min = 1))]
    pub measurement: String,
    #[validate(range(min = 1))]
    pub timeout_seconds: u64,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            org: String::new(),
            bucket: "energy_lab".into(),
            measurement: DEFAULT_MEASUREMENT.into(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MeterConfig {
    pub site: String,
    pub sensor: String,
    /// Sampling cadence in seconds, at most one day
    #[validate(range(min = 0.001, max = 86_400.0))]
    pub tick_seconds: f64,
    /// Stop after this many samples (None = run until interrupted)
    pub max_ticks: Option<u64>,
    pub on_write_error: WriteErrorPolicy,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            site: "shu".into(),
            sensor: "sim_pi01".into(),
            tick_seconds: 1.0,
            max_ticks: None,
            on_write_error: WriteErrorPolicy::default(),
        }
    }
}

impl MeterConfig {
    pub fn tags(&self) -> MeterTags {
        MeterTags {
            site: self.site.clone(),
            sensor: self.sensor.clone(),
        }
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            tick_seconds: self.tick_seconds,
            max_ticks: self.max_ticks,
            on_write_error: self.on_write_error,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Log samples instead of writing them to InfluxDB
    pub dry_run: bool,
    pub log_format: LogFormat,
}

impl Config {
    /// Defaults, then `config/default.toml`, then the flat `INFLUX_*`/`SITE`/`SENSOR`
    /// variables, then `METER_SIM__SECTION__KEY` variables
    pub fn load() -> Result<Self, ConfigError> {
        let figment = Self::figment()
            .merge(Toml::file("config/default.toml"))
            .merge(env_providers());
        Self::from_figment(figment)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let cfg: Config = figment.extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Connection parameters are only required when samples leave the process
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.output.dry_run {
            self.influx.validate()?;
        }
        if !self.meter.tick_seconds.is_finite() {
            return Err(ConfigError::NonFinite("meter.tick_seconds"));
        }
        self.meter.validate()?;
        self.model.check()?;
        Ok(())
    }
}

fn env_providers() -> Figment {
    // `Env` would parse "0123" as a number; these are opaque strings
    let legacy = LEGACY_ENV_KEYS
        .iter()
        .fold(Figment::new(), |figment, &(var, key)| match std::env::var(var) {
            Ok(value) => figment.merge(Serialized::default(key, value)),
            Err(_) => figment,
        });
    legacy.merge(Env::prefixed("METER_SIM__").split("__"))
}
