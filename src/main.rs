use clap::Parser;

use topogen::ascii::{self, AsciiMode};
use topogen::export;
use topogen::logging::init_logging;
use topogen::topology::{self, TerrainSummary};
use topogen::{Profile, ProfileStore, TerrainGrid};

#[derive(Parser, Debug)]
#[command(name = "topogen")]
#[command(about = "Generate deterministic terrain grids, optionally calibrated by a distilled profile")]
struct Args {
    /// Width of the grid in cells
    #[arg(short = 'W', long, default_value = "64")]
    width: usize,

    /// Height of the grid in cells
    #[arg(short = 'H', long, default_value = "64")]
    height: usize,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Biome label, e.g. "temperate_rainforest" or "arctic_coast"
    #[arg(short, long, default_value = "temperate")]
    biome: String,

    /// Calibrate with this profile id from the profile directory
    #[arg(short, long)]
    profile: Option<String>,

    /// Print an ASCII map (biome, height, temperature, moisture, roughness)
    #[arg(long)]
    ascii: Option<String>,

    /// Export the biome view to a PNG
    #[arg(long)]
    png: Option<String>,

    /// Pixels per cell for --png
    #[arg(long, default_value = "4")]
    png_scale: u32,

    /// Export elevation as a grayscale PNG
    #[arg(long)]
    heightmap: Option<String>,

    /// Export a text report (map, legend and statistics)
    #[arg(long)]
    export_world: Option<String>,

    /// Also generate this many candidates (seed, seed+1, ...) and summarize them
    #[arg(long)]
    candidates: Option<usize>,

    /// List available profile ids and exit
    #[arg(long)]
    list_profiles: bool,
}

fn print_summary(grid: &TerrainGrid) {
    let s = TerrainSummary::of(grid);
    println!(
        "Elevation p10/p50/p90: {:.1} / {:.1} / {:.1}",
        s.elev_p10, s.elev_p50, s.elev_p90
    );
    println!(
        "Water {:.1}% | river {:.1}% | lake {:.1}% | coast {:.1}%",
        s.water_fraction * 100.0,
        s.river_fraction * 100.0,
        s.lake_fraction * 100.0,
        s.coast_fraction * 100.0
    );
    println!("Mean roughness: {:.2}", s.mean_roughness);

    let total = grid.cells().len().max(1) as f64;
    for (biome, count) in grid.biome_counts() {
        if count > 0 {
            println!("  {:<10} {:>6} ({:.1}%)", biome.name(), count, count as f64 * 100.0 / total);
        }
    }
}

fn main() {
    init_logging();
    let args = Args::parse();
    let store = ProfileStore::from_env();

    if args.list_profiles {
        println!("Profiles in {}:", store.dir().display());
        for id in store.list_ids() {
            println!("  {}", id);
        }
        return;
    }

    let seed = args.seed.unwrap_or_else(rand::random);

    let profile: Option<Profile> = args.profile.as_deref().map(|id| {
        store.load(id).unwrap_or_else(|| {
            eprintln!("Profile {:?} not found in {}, using default", id, store.dir().display());
            Profile::default_profile()
        })
    });

    println!("Generating terrain with seed: {}", seed);
    println!("Grid size: {}x{}", args.width, args.height);
    println!("Biome label: {}", args.biome);
    match &profile {
        Some(p) => println!("Profile: {} ({})", p.id, p.name),
        None => println!("Profile: none (uncalibrated)"),
    }

    let grid = match &profile {
        Some(p) => topology::generate_calibrated(seed, &args.biome, args.width, args.height, p),
        None => topology::generate(seed, &args.biome, args.width, args.height),
    };
    print_summary(&grid);

    if let Some(n) = args.candidates {
        let seeds: Vec<u64> = (0..n as u64).map(|i| seed.wrapping_add(i)).collect();
        let grids = topology::generate_candidates(&seeds, &args.biome, args.width, args.height, profile.as_ref());
        println!("Candidates:");
        for (s, g) in seeds.iter().zip(&grids) {
            let summary = TerrainSummary::of(g);
            println!(
                "  seed {:>20}: p50 {:>6.1} | water {:>5.1}% | river {:>4.1}%",
                s,
                summary.elev_p50,
                summary.water_fraction * 100.0,
                summary.river_fraction * 100.0
            );
        }
    }

    if let Some(ref mode_name) = args.ascii {
        match AsciiMode::from_name(mode_name) {
            Some(mode) => {
                println!();
                print!("{}", ascii::render_ascii_map(&grid, mode));
                if mode == AsciiMode::Biome {
                    print!("{}", ascii::biome_legend());
                }
            }
            None => eprintln!("Unknown ASCII mode {:?}", mode_name),
        }
    }

    if let Some(ref path) = args.png {
        match export::export_biome_map(&grid, args.png_scale, path) {
            Ok(()) => println!("Exported biome map to: {}", path),
            Err(e) => eprintln!("Failed to export biome map: {}", e),
        }
    }

    if let Some(ref path) = args.heightmap {
        match export::export_heightmap(&grid, path) {
            Ok(()) => println!("Exported heightmap to: {}", path),
            Err(e) => eprintln!("Failed to export heightmap: {}", e),
        }
    }

    if let Some(ref path) = args.export_world {
        let profile_id = profile.as_ref().map(|p| p.id.as_str()).unwrap_or("none");
        match ascii::export_world_file(&grid, seed, &args.biome, profile_id, path) {
            Ok(()) => println!("Exported world file to: {}", path),
            Err(e) => eprintln!("Failed to export world file: {}", e),
        }
    }
}
