//! Distill a terrain profile from real elevation tiles over a bounding box.

use std::path::Path;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;

use topogen::config::{DistillConfig, DEFAULT_SAMPLE_CAP};
use topogen::distill::{parse_cell_meters, BoundingBox, Distiller};
use topogen::logging::init_logging;
use topogen::profile::DEFAULT_CELL_METERS;
use topogen::tiles::CancelToken;

#[derive(Parser, Debug)]
#[command(name = "distill")]
#[command(about = "Distill a terrain profile from elevation tiles")]
struct Args {
    /// Bounding box as minLon,minLat,maxLon,maxLat
    #[arg(long, allow_hyphen_values = true)]
    bbox: String,

    /// Output profile JSON path
    #[arg(long)]
    out: String,

    /// Profile id (default: file stem of --out)
    #[arg(long)]
    id: Option<String>,

    /// Display name (default: id)
    #[arg(long)]
    name: Option<String>,

    /// Target cell size in meters
    #[arg(long, default_value_t = DEFAULT_CELL_METERS, value_parser = parse_cell_meters)]
    cell: f64,

    /// Provenance string stored in the profile
    #[arg(long)]
    source: Option<String>,

    /// Upper bound on samples per axis
    #[arg(long, default_value_t = DEFAULT_SAMPLE_CAP)]
    sample_cap: usize,

    /// Cache root for tiles and sample grids
    #[arg(long)]
    cache_dir: Option<String>,

    /// Abort the distillation after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn default_source() -> String {
    format!("terrarium elevation tiles, distilled {}", chrono::Utc::now().format("%Y-%m-%d"))
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let bbox: BoundingBox = match args.bbox.parse() {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let out = Path::new(&args.out);
    let id = args.id.clone().unwrap_or_else(|| {
        out.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "distilled".to_string())
    });
    let name = args.name.clone().unwrap_or_else(|| id.clone());
    let source = args.source.clone().unwrap_or_else(default_source);

    let mut config = DistillConfig::from_env();
    if let Some(ref dir) = args.cache_dir {
        config.cache_root = dir.into();
    }

    println!("Distilling {} ({}) over bbox {}", id, name, bbox);
    println!("Cell size: {} m, sample cap: {}", args.cell, args.sample_cap);

    let mut distiller = match Distiller::new(config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to set up distiller: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(secs) = args.timeout_secs {
        distiller = distiller.with_cancel(CancelToken::with_deadline(Instant::now() + Duration::from_secs(secs)));
    }

    let start = Instant::now();
    let profile = match distiller.distill_named(&id, &name, Some(source), &bbox, args.cell, args.sample_cap) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Distillation failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = profile.save_to(out) {
        eprintln!("Failed to write {}: {}", out.display(), e);
        return ExitCode::FAILURE;
    }

    println!("Elevation p10/p50/p90: {} / {} / {}", profile.elev_p10, profile.elev_p50, profile.elev_p90);
    println!("Slope p50/p90: {} / {} deg", profile.slope_p50, profile.slope_p90);
    println!(
        "Ruggedness {} | river density {} | lake coverage {}",
        profile.ruggedness, profile.river_density, profile.lake_coverage
    );
    println!("Tiles: {}", distiller.tile_cache().stats().summary());
    println!("Wrote {} in {:?}", out.display(), start.elapsed());
    ExitCode::SUCCESS
}
