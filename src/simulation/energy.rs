//! Cumulative energy register of the simulated meter.

/// Joules per kWh
pub const JOULES_PER_KWH: f64 = 3.6e6;

/// Integrates real power into kWh since the model was created.
///
/// Only positive power is counted, so the register never runs backwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyAccumulator {
    accumulated_kwh: f64,
}

impl EnergyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `max(p_real_w, 0) * dt_seconds` and return the new total in kWh
    pub fn accumulate(&mut self, p_real_w: f64, dt_seconds: f64) -> f64 {
        let increment = p_real_w.max(0.0) * dt_seconds.max(0.0) / JOULES_PER_KWH;
        self.accumulated_kwh += increment;
        self.accumulated_kwh
    }

    pub fn kwh(&self) -> f64 {
        self.accumulated_kwh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn starts_at_zero() {
        assert_eq!(EnergyAccumulator::new().kwh(), 0.0);
    }

    #[test]
    fn one_kilowatt_for_an_hour_is_one_kwh() {
        let mut acc = EnergyAccumulator::new();
        for _ in 0..3600 {
            acc.accumulate(1000.0, 1.0);
        }
        assert!((acc.kwh() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn negative_power_is_ignored() {
        let mut acc = EnergyAccumulator::new();
        acc.accumulate(500.0, 10.0);
        let before = acc.kwh();
        assert_eq!(acc.accumulate(-2000.0, 10.0), before);
    }

    proptest! {
        #[test]
        fn constant_power_integrates_linearly(p in 0.0f64..20_000.0, n in 1usize..2000) {
            let mut acc = EnergyAccumulator::new();
            for _ in 0..n {
                acc.accumulate(p, 1.0);
            }
            let expected = n as f64 * p / JOULES_PER_KWH;
            prop_assert!((acc.kwh() - expected).abs() <= 1e-9 * expected.max(1.0));
        }

        #[test]
        fn never_decreases(powers in proptest::collection::vec(-5_000.0f64..5_000.0, 1..200)) {
            let mut acc = EnergyAccumulator::new();
            let mut last = acc.kwh();
            for p in powers {
                let now = acc.accumulate(p, 1.0);
                prop_assert!(now >= last);
                last = now;
            }
        }
    }
}
