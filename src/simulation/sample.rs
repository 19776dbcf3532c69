use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One meter reading produced per tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Reading time, UTC, whole seconds
    pub timestamp: DateTime<Utc>,
    /// RMS voltage in V
    pub vrms: f64,
    /// RMS current in A
    pub irms: f64,
    /// Real power in W
    pub p_real: f64,
    /// Apparent power in VA
    pub s_apparent: f64,
    /// Power factor (0.0-1.0)
    pub pf: f64,
    /// Cumulative energy since model start in kWh
    pub energy_kwh: f64,
    /// Peak voltage in V
    pub v_peak: f64,
    /// Peak current in A
    pub i_peak: f64,
}

impl Sample {
    /// Numeric fields by name, in sink order
    pub fn fields(&self) -> [(&'static str, f64); 8] {
        [
            ("vrms", self.vrms),
            ("irms", self.irms),
            ("p_real", self.p_real),
            ("s_apparent", self.s_apparent),
            ("pf", self.pf),
            ("energy_kwh", self.energy_kwh),
            ("v_peak", self.v_peak),
            ("i_peak", self.i_peak),
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.is_finite())
    }
}
