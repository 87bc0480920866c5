//! ASCII rendering of terrain grids for terminal previews and text exports.

use std::fs::File;
use std::io::{self, Write};

use crate::biomes::Biome;
use crate::topology::TerrainSummary;
use crate::world::{Cell, TerrainGrid};

/// ASCII rendering modes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AsciiMode {
    /// Biome characters, with water features drawn over them
    Biome,
    /// Elevation gradient
    Height,
    Temperature,
    Moisture,
    /// Roughness digit 1-9
    Roughness,
}

impl AsciiMode {
    pub fn name(&self) -> &'static str {
        match self {
            AsciiMode::Biome => "Biome",
            AsciiMode::Height => "Height",
            AsciiMode::Temperature => "Temperature",
            AsciiMode::Moisture => "Moisture",
            AsciiMode::Roughness => "Roughness",
        }
    }

    pub fn all() -> &'static [AsciiMode] {
        &[
            AsciiMode::Biome,
            AsciiMode::Height,
            AsciiMode::Temperature,
            AsciiMode::Moisture,
            AsciiMode::Roughness,
        ]
    }

    /// Parse a mode name, case-insensitive.
    pub fn from_name(name: &str) -> Option<AsciiMode> {
        AsciiMode::all()
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Get ASCII character for a biome
pub fn biome_char(biome: Biome) -> char {
    match biome {
        Biome::Mountain => '^',
        Biome::Tundra => ':',
        Biome::Boreal => 'B',
        Biome::Jungle => 'J',
        Biome::Wetland => 'w',
        Biome::Swamp => '&',
        Biome::Desert => 'd',
        Biome::Grassland => '"',
        Biome::Forest => 'T',
    }
}

/// Water features take precedence over the biome underneath.
pub fn cell_char(cell: &Cell) -> char {
    if cell.is_river() {
        '='
    } else if cell.is_lake() {
        'o'
    } else if cell.is_water() {
        '~'
    } else {
        biome_char(cell.biome)
    }
}

/// Get ASCII character for elevation (11-level gradient over -128..=127)
pub fn height_char(elevation: i8) -> char {
    const CHARS: &[char] = &['~', '.', '-', '=', '+', '*', '#', '%', '^', 'A', 'M'];
    gradient(CHARS, (elevation as f32 + 128.0) / 255.0)
}

pub fn temperature_char(temperature: u8) -> char {
    const CHARS: &[char] = &['#', '=', '-', '.', ',', ';', ':', '+', '*', '@'];
    gradient(CHARS, temperature as f32 / 255.0)
}

pub fn moisture_char(moisture: u8) -> char {
    const CHARS: &[char] = &['_', '.', '-', ':', ';', '=', '+', '#', '%', '~'];
    gradient(CHARS, moisture as f32 / 255.0)
}

fn gradient(chars: &[char], t: f32) -> char {
    let idx = (t.clamp(0.0, 1.0) * (chars.len() - 1) as f32) as usize;
    chars[idx.min(chars.len() - 1)]
}

/// Render the grid as text, one line per row.
pub fn render_ascii_map(grid: &TerrainGrid, mode: AsciiMode) -> String {
    let width = grid.width();
    let mut result = String::with_capacity((width + 1) * grid.height());

    for row in grid.cells().chunks(width) {
        for cell in row {
            let ch = match mode {
                AsciiMode::Biome => cell_char(cell),
                AsciiMode::Height => height_char(cell.elevation),
                AsciiMode::Temperature => temperature_char(cell.temperature),
                AsciiMode::Moisture => moisture_char(cell.moisture),
                AsciiMode::Roughness => char::from_digit(cell.roughness.min(9) as u32, 10).unwrap_or('?'),
            };
            result.push(ch);
        }
        result.push('\n');
    }

    result
}

/// Generate legend for biome characters
pub fn biome_legend() -> String {
    let mut legend = String::new();
    legend.push_str("=== BIOME LEGEND ===\n");
    legend.push_str("  ~ water   = river   o lake\n");
    for chunk in Biome::all().chunks(3) {
        legend.push(' ');
        for biome in chunk {
            legend.push_str(&format!(" {} {:<10}", biome_char(*biome), biome.name()));
        }
        legend.push('\n');
    }
    legend
}

/// Write a text report: header, biome map, legend and statistics.
pub fn export_world_file(grid: &TerrainGrid, seed: u64, label: &str, profile_id: &str, path: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    let total = grid.cells().len().max(1);
    let summary = TerrainSummary::of(grid);

    writeln!(file, "=== TOPOGEN WORLD FILE ===")?;
    writeln!(file, "Seed: {}", seed)?;
    writeln!(file, "Biome label: {}", label)?;
    writeln!(file, "Profile: {}", profile_id)?;
    writeln!(file, "Size: {}x{}", grid.width(), grid.height())?;
    writeln!(file)?;

    writeln!(file, "=== MAP (Biome View) ===")?;
    write!(file, "{}", render_ascii_map(grid, AsciiMode::Biome))?;
    writeln!(file)?;
    write!(file, "{}", biome_legend())?;
    writeln!(file)?;

    writeln!(file, "=== STATISTICS ===")?;
    writeln!(
        file,
        "Elevation p10/p50/p90: {:.1} / {:.1} / {:.1}",
        summary.elev_p10, summary.elev_p50, summary.elev_p90
    )?;
    writeln!(file, "Water: {:.1}%", summary.water_fraction * 100.0)?;
    writeln!(file, "River: {:.1}%", summary.river_fraction * 100.0)?;
    writeln!(file, "Lake: {:.1}%", summary.lake_fraction * 100.0)?;
    writeln!(file, "Coast: {:.1}%", summary.coast_fraction * 100.0)?;
    writeln!(file, "Mean roughness: {:.2}", summary.mean_roughness)?;
    writeln!(file)?;

    writeln!(file, "Biome distribution:")?;
    for (biome, count) in grid.biome_counts() {
        writeln!(
            file,
            "  {} {:<10} {:>6} ({:.1}%)",
            biome_char(biome),
            biome.name(),
            count,
            count as f64 * 100.0 / total as f64
        )?;
    }

    Ok(())
}
