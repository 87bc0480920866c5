//! Distill many profiles from a JSON list of named bounding boxes.
//!
//! List format: `[{"id": "alps", "name": "Swiss Alps", "bbox": "7.0,46.0,7.2,46.15"}, ...]`

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;

use topogen::config::{DistillConfig, DEFAULT_SAMPLE_CAP};
use topogen::distill::{parse_cell_meters, BoundingBox, Distiller};
use topogen::logging::init_logging;
use topogen::profile::DEFAULT_CELL_METERS;
use topogen::ProfileStore;

#[derive(Parser, Debug)]
#[command(name = "distill_batch")]
#[command(about = "Distill terrain profiles for every area in a list")]
struct Args {
    /// JSON array of {id, name, bbox}
    #[arg(long)]
    list: String,

    /// Directory receiving <id>.json profiles (default: the profile directory)
    #[arg(long)]
    out_dir: Option<String>,

    /// Overwrite profiles that already exist
    #[arg(long)]
    force: bool,

    /// Target cell size in meters
    #[arg(long, default_value_t = DEFAULT_CELL_METERS, value_parser = parse_cell_meters)]
    cell: f64,

    /// Upper bound on samples per axis
    #[arg(long, default_value_t = DEFAULT_SAMPLE_CAP)]
    sample_cap: usize,

    /// Cache root for tiles and sample grids
    #[arg(long)]
    cache_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Area {
    id: String,
    name: String,
    bbox: String,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let areas: Vec<Area> = match fs::read_to_string(&args.list)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
    {
        Ok(areas) => areas,
        Err(e) => {
            eprintln!("Failed to read list {}: {}", args.list, e);
            return ExitCode::from(2);
        }
    };

    let mut config = DistillConfig::from_env();
    if let Some(ref dir) = args.cache_dir {
        config.cache_root = dir.into();
    }
    let mut distiller = match Distiller::new(config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to set up distiller: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = match args.out_dir {
        Some(ref dir) => ProfileStore::new(dir),
        None => ProfileStore::from_env(),
    };
    let source = format!("terrarium elevation tiles, distilled {}", chrono::Utc::now().format("%Y-%m-%d"));
    let (mut ok, mut skipped, mut failed) = (0usize, 0usize, 0usize);

    for area in &areas {
        let out = store.path_for(&area.id);
        if store.exists(&area.id) && !args.force {
            println!("skip {} ({} exists)", area.id, out.display());
            skipped += 1;
            continue;
        }

        let result = area
            .bbox
            .parse::<BoundingBox>()
            .and_then(|bbox| {
                distiller.distill_named(&area.id, &area.name, Some(source.clone()), &bbox, args.cell, args.sample_cap)
            })
            .map_err(|e| e.to_string())
            .and_then(|profile| store.save(&profile).map(|_| ()).map_err(|e| e.to_string()));

        match result {
            Ok(()) => {
                println!("ok   {} -> {} ({})", area.id, out.display(), distiller.tile_cache().stats().summary());
                ok += 1;
            }
            Err(e) => {
                println!("FAIL {}: {}", area.id, e);
                failed += 1;
            }
        }
    }

    println!();
    println!("{} ok, {} skipped, {} failed ({} total)", ok, skipped, failed, areas.len());

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
