//! Temperature and moisture fields.
//!
//! Both are built from a noise channel plus label-driven biases, with an
//! elevation penalty, then clamped into the label's allowed window and
//! quantized to a byte.

use crate::biomes::ClimateRules;
use crate::noise::{noise_field, Channel};
use crate::tilemap::Tilemap;

/// Normalized temperature lost between sea level and the top of the range.
const LAPSE_PENALTY: f32 = 0.35;

/// Normalized moisture lost between sea level and the top of the range.
const MOISTURE_ELEVATION_PENALTY: f32 = 0.2;

fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Fraction of the way to the highest representable elevation, 0 at or below sea level.
fn altitude(elevation: i8) -> f32 {
    elevation.max(0) as f32 / 127.0
}

/// 1.0 on the vertical midline, falling to 0.0 at the top and bottom rows.
pub fn latitude_band(y: usize, height: usize) -> f32 {
    if height <= 1 {
        return 1.0;
    }
    let v = y as f32 / (height - 1) as f32;
    1.0 - (v - 0.5).abs() * 2.0
}

pub fn generate_temperature(seed: u64, elevation: &Tilemap<i8>, rules: &ClimateRules) -> Tilemap<u8> {
    let (width, height) = (elevation.width, elevation.height);
    let jitter = noise_field(seed, Channel::Temperature, width, height);
    let mut temperature = Tilemap::new_with(width, height, 0u8);

    for (x, y, t) in temperature.iter_mut() {
        let raw = 0.22
            + 0.5 * latitude_band(y, height)
            + (*jitter.get(x, y) - 0.5) * 0.3
            + rules.temperature_bias
            - LAPSE_PENALTY * altitude(*elevation.get(x, y));
        *t = to_byte(rules.clamp_temperature(raw));
    }

    temperature
}

pub fn generate_moisture(seed: u64, elevation: &Tilemap<i8>, rules: &ClimateRules) -> Tilemap<u8> {
    let (width, height) = (elevation.width, elevation.height);
    let base = noise_field(seed, Channel::Moisture, width, height);
    let mut moisture = Tilemap::new_with(width, height, 0u8);

    for (x, y, m) in moisture.iter_mut() {
        let raw = 0.1 + 0.8 * *base.get(x, y) + rules.moisture_bias
            - MOISTURE_ELEVATION_PENALTY * altitude(*elevation.get(x, y));
        *m = to_byte(rules.clamp_moisture(raw));
    }

    moisture
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(map: &Tilemap<u8>) -> f64 {
        map.iter().map(|(_, _, &v)| v as f64).sum::<f64>() / map.as_slice().len() as f64
    }

    #[test]
    fn test_latitude_band_peaks_at_midline() {
        assert_eq!(latitude_band(0, 65), 0.0);
        assert_eq!(latitude_band(32, 65), 1.0);
        assert_eq!(latitude_band(64, 65), 0.0);
    }

    #[test]
    fn test_label_biases_shift_climate() {
        let flat = Tilemap::new_with(48, 48, 0i8);
        let neutral = ClimateRules::for_label("meadow");
        let arctic = ClimateRules::for_label("arctic");
        let tropical = ClimateRules::for_label("tropical");

        let t_neutral = mean(&generate_temperature(5, &flat, &neutral));
        assert!(mean(&generate_temperature(5, &flat, &arctic)) < t_neutral);
        assert!(mean(&generate_temperature(5, &flat, &tropical)) > t_neutral);
        assert!(mean(&generate_moisture(5, &flat, &tropical)) > mean(&generate_moisture(5, &flat, &neutral)));
    }

    #[test]
    fn test_high_ground_is_colder() {
        let low = Tilemap::new_with(32, 32, 0i8);
        let high = Tilemap::new_with(32, 32, 120i8);
        let rules = ClimateRules::default();
        assert!(mean(&generate_temperature(9, &high, &rules)) < mean(&generate_temperature(9, &low, &rules)));
    }

    #[test]
    fn test_arctic_window_caps_temperature() {
        let flat = Tilemap::new_with(40, 40, 0i8);
        let rules = ClimateRules::for_label("arctic");
        let cap = (rules.temperature_range.1 * 255.0).round() as u8;
        let t = generate_temperature(77, &flat, &rules);
        assert!(t.iter().all(|(_, _, &v)| v <= cap));
    }
}
