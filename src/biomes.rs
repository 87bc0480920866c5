//! Biome classification and per-label climate rules.
//!
//! Everything here is a pure function of its inputs. A biome label such as
//! `"arctic_coast"` or `"temperate_rainforest"` is parsed into keyword tags,
//! and the tags decide the climate biases and the temperature/moisture
//! windows that cells are clamped into before classification.

use serde::{Deserialize, Serialize};

/// Cell elevation above which terrain is always mountain.
pub const MOUNTAIN_ELEVATION: i8 = 72;

/// Categorical terrain classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    Mountain,
    Tundra,
    Boreal,
    Jungle,
    Wetland,
    Swamp,
    Desert,
    Grassland,
    Forest,
}

impl Biome {
    pub fn all() -> &'static [Biome] {
        &[
            Biome::Mountain,
            Biome::Tundra,
            Biome::Boreal,
            Biome::Jungle,
            Biome::Wetland,
            Biome::Swamp,
            Biome::Desert,
            Biome::Grassland,
            Biome::Forest,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Biome::Mountain => "mountain",
            Biome::Tundra => "tundra",
            Biome::Boreal => "boreal",
            Biome::Jungle => "jungle",
            Biome::Wetland => "wetland",
            Biome::Swamp => "swamp",
            Biome::Desert => "desert",
            Biome::Grassland => "grassland",
            Biome::Forest => "forest",
        }
    }

    /// Additive roughness bonus on top of the roughness noise channel.
    pub fn roughness_bonus(&self) -> i32 {
        match self {
            Biome::Mountain => 3,
            Biome::Swamp => 2,
            Biome::Wetland | Biome::Jungle => 1,
            _ => 0,
        }
    }
}

impl std::fmt::Display for Biome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Fixed decision table over (elevation, moisture, temperature).
pub fn classify(elevation: i8, moisture: u8, temperature: u8) -> Biome {
    if elevation > MOUNTAIN_ELEVATION {
        return Biome::Mountain;
    }
    match (moisture, temperature) {
        // Cold bands
        (_, t) if t < 50 => Biome::Tundra,
        (m, t) if t < 92 => {
            if m >= 96 { Biome::Boreal } else { Biome::Tundra }
        }

        // Wet
        (m, t) if m > 170 && t > 160 => Biome::Jungle,
        (m, _) if m > 170 => Biome::Wetland,
        (m, t) if m > 120 && t > 165 => Biome::Swamp,

        // Dry
        (m, t) if m < 70 && t > 150 => Biome::Desert,
        (m, _) if m < 70 => Biome::Grassland,

        _ => Biome::Forest,
    }
}

/// Climate adjustments derived from a biome label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClimateRules {
    /// Added to normalized temperature before clamping
    pub temperature_bias: f32,
    /// Added to normalized moisture before clamping
    pub moisture_bias: f32,
    /// Normalized temperature window (inclusive)
    pub temperature_range: (f32, f32),
    /// Normalized moisture window (inclusive)
    pub moisture_range: (f32, f32),
    /// Force the outer ring of the grid to water
    pub coastal: bool,
}

impl Default for ClimateRules {
    fn default() -> Self {
        Self {
            temperature_bias: 0.0,
            moisture_bias: 0.0,
            temperature_range: (0.0, 1.0),
            moisture_range: (0.0, 1.0),
            coastal: false,
        }
    }
}

const ARCTIC_TAGS: &[&str] = &["arctic", "polar", "tundra", "glacier", "ice", "alpine"];
const DESERT_TAGS: &[&str] = &["desert", "arid", "dune", "badlands"];
const TROPICAL_TAGS: &[&str] = &["tropical", "jungle", "equatorial", "mangrove"];
const WET_TAGS: &[&str] = &[
    "rainforest", "coastal", "coast", "delta", "island", "marsh", "swamp", "wetland",
];
const COASTAL_TAGS: &[&str] = &["coastal", "coast", "island", "archipelago"];

/// Highest normalized temperature an arctic label allows. Below the
/// warm thresholds of jungle, swamp and desert (160/165/150 of 255).
const ARCTIC_MAX_TEMPERATURE: f32 = 0.55;

/// Lowest normalized temperature a desert label allows. Above the
/// boreal band (92 of 255).
const DESERT_MIN_TEMPERATURE: f32 = 0.4;

fn has_tag(words: &[&str], tags: &[&str]) -> bool {
    words.iter().any(|w| tags.contains(w))
}

impl ClimateRules {
    /// Parse a free-form label ("Arctic Coast", "temperate_rainforest", ...)
    /// into climate rules. Unknown labels get neutral rules.
    pub fn for_label(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let mut rules = ClimateRules::default();

        if has_tag(&words, ARCTIC_TAGS) {
            rules.temperature_bias -= 0.25;
            rules.temperature_range.1 = ARCTIC_MAX_TEMPERATURE;
        }
        if has_tag(&words, DESERT_TAGS) {
            rules.temperature_bias += 0.18;
            rules.moisture_bias -= 0.2;
            rules.temperature_range.0 = DESERT_MIN_TEMPERATURE;
        }
        if has_tag(&words, TROPICAL_TAGS) {
            rules.temperature_bias += 0.18;
            rules.moisture_bias += 0.18;
        }
        if has_tag(&words, WET_TAGS) {
            rules.moisture_bias += 0.18;
        }
        rules.coastal = has_tag(&words, COASTAL_TAGS);

        // Contradictory labels ("arctic desert") keep a valid window
        if rules.temperature_range.0 > rules.temperature_range.1 {
            rules.temperature_range.0 = rules.temperature_range.1;
        }

        rules
    }

    pub fn clamp_temperature(&self, t: f32) -> f32 {
        t.clamp(0.0, 1.0)
            .clamp(self.temperature_range.0, self.temperature_range.1)
    }

    pub fn clamp_moisture(&self, m: f32) -> f32 {
        m.clamp(0.0, 1.0)
            .clamp(self.moisture_range.0, self.moisture_range.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_table() {
        assert_eq!(classify(100, 128, 128), Biome::Mountain);
        assert_eq!(classify(0, 200, 30), Biome::Tundra);
        assert_eq!(classify(0, 120, 80), Biome::Boreal);
        assert_eq!(classify(0, 50, 80), Biome::Tundra);
        assert_eq!(classify(0, 200, 200), Biome::Jungle);
        assert_eq!(classify(0, 200, 120), Biome::Wetland);
        assert_eq!(classify(0, 140, 200), Biome::Swamp);
        assert_eq!(classify(0, 40, 200), Biome::Desert);
        assert_eq!(classify(0, 40, 120), Biome::Grassland);
        assert_eq!(classify(0, 100, 120), Biome::Forest);
    }

    #[test]
    fn test_label_parsing() {
        let arctic = ClimateRules::for_label("Arctic Coast");
        assert!(arctic.temperature_bias < 0.0);
        assert!(arctic.coastal);
        assert_eq!(arctic.temperature_range.1, ARCTIC_MAX_TEMPERATURE);

        let rainforest = ClimateRules::for_label("temperate_rainforest");
        assert!(rainforest.moisture_bias > 0.0);
        assert!(!rainforest.coastal);

        let plain = ClimateRules::for_label("meadow");
        assert_eq!(plain, ClimateRules::default());

        // Substrings do not count as tags
        assert!(!ClimateRules::for_label("coastline_museum").coastal);
    }

    #[test]
    fn test_arctic_window_excludes_warm_biomes() {
        let rules = ClimateRules::for_label("arctic");
        let t_max = (rules.clamp_temperature(1.0) * 255.0) as u8;
        for m in 0..=255u8 {
            for e in [-60i8, 0, 40] {
                let b = classify(e, m, t_max);
                assert!(!matches!(b, Biome::Desert | Biome::Jungle | Biome::Swamp), "{:?}", b);
            }
        }
    }
}
