//! Durability math, shared by every module category.

use crate::Constants;

/// Output multiplier for a module at `durability` out of `max_durability`.
/// Pure function.
pub fn durability_efficiency(durability: f64, max_durability: f64, constants: &Constants) -> f64 {
    if max_durability <= 0.0 {
        return 1.0;
    }
    let ratio = durability / max_durability;
    if ratio <= constants.durability_band_critical_threshold {
        constants.durability_band_critical_efficiency
    } else if ratio <= constants.durability_band_degraded_threshold {
        constants.durability_band_degraded_efficiency
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::base_content;

    #[test]
    fn nominal_band_full_efficiency() {
        let constants = &base_content().constants;
        assert!((durability_efficiency(100.0, 100.0, constants) - 1.0).abs() < 1e-9);
        assert!((durability_efficiency(51.0, 100.0, constants) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn degraded_band_reduced_efficiency() {
        let constants = &base_content().constants;
        assert!((durability_efficiency(50.0, 100.0, constants) - 0.75).abs() < 1e-9);
        assert!((durability_efficiency(21.0, 100.0, constants) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn critical_band_heavily_reduced() {
        let constants = &base_content().constants;
        assert!((durability_efficiency(20.0, 100.0, constants) - 0.5).abs() < 1e-9);
        assert!((durability_efficiency(0.0, 100.0, constants) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_max_durability_is_nominal() {
        let constants = &base_content().constants;
        assert!((durability_efficiency(0.0, 0.0, constants) - 1.0).abs() < 1e-9);
    }
}
