mod check;
mod export;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cluster_shape::{
    FilterConfig, PixelKey, PixelLimits, PixelLimitsCollection, StripKey, StripLimitsCollection,
};
use log::{debug, error, info, warn};
use std::{io::Write, path::PathBuf};

#[derive(Parser)]
#[command(author, version, about = "Inspect and check cluster-shape calibration tables", long_about = None)]
struct Args {
    /// Filter configuration file (TOML)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Directory searched for calibration resources
    #[arg(short = 'd', long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write both limits tables as CSV
    Dump {
        /// Output directory (defaults to the working directory)
        #[arg(short = 'o', long = "output-dir")]
        output_dir: Option<PathBuf>,
    },
    /// Check both limits tables for self-consistency
    Check {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the packed key of a cluster shape
    Key {
        #[command(subcommand)]
        shape: Shape,
    },
}

#[derive(Subcommand)]
enum Shape {
    /// Pixel shape: part (0 = barrel), dx, dy
    Pixel {
        part: u32,
        #[arg(allow_negative_numbers = true)]
        dx: i32,
        #[arg(allow_negative_numbers = true)]
        dy: i32,
    },
    /// Strip cluster width
    Strip {
        #[arg(allow_negative_numbers = true)]
        width: i32,
    },
}

fn main() {
    // Initialize logger - defaults to RUST_LOG if set, otherwise INFO
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let args = Args::parse();
    match run(args) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Error: {e}");
            for cause in e.chain().skip(1) {
                error!("  caused by: {cause}");
                if let Some(ioe) = cause.downcast_ref::<std::io::Error>()
                    && ioe.kind() == std::io::ErrorKind::NotFound
                {
                    error!("Hint: pass --data-dir or set CLUSTER_SHAPE_DATA_DIR.");
                    break;
                }
            }
            let _ = std::io::stderr().flush();
            std::process::exit(1);
        }
    }
}

/// `Ok(false)` when the command ran but found problems
fn run(args: Args) -> Result<bool> {
    let mut config = match &args.config {
        Some(path) => FilterConfig::load_from_file(path)?,
        None => FilterConfig::default(),
    };
    if args.data_dir.is_some() {
        config.data_dir = args.data_dir.clone();
        config.validate()?;
    }

    match args.command {
        Command::Key { shape } => {
            print_key(&shape);
            Ok(true)
        }
        Command::Dump { output_dir } => {
            let (pixel, strip) = load_tables(&config)?;
            let (pixel_path, strip_path) =
                export::export_tables_to_csv(&pixel, &strip, output_dir.as_deref())?;
            info!("Pixel limits saved to: {}", pixel_path.display());
            info!("Strip limits saved to: {}", strip_path.display());
            Ok(true)
        }
        Command::Check { json } => {
            let (pixel, strip) = load_tables(&config)?;
            let report = check::check_tables(&pixel, &strip);

            if json {
                let out = serde_json::to_string_pretty(&report)?;
                println!("{out}");
            } else {
                info!(
                    "Pixel table: {} slots, {} calibrated",
                    report.pixel_slots, report.calibrated_pixel_slots
                );
                info!(
                    "Strip table: {} slots, {} calibrated",
                    report.strip_slots, report.calibrated_strip_slots
                );
                for v in &report.violations {
                    warn!("{} slot {}: {} failed at {:?}", v.table, v.slot, v.check, v.probe);
                }
                if report.is_clean() {
                    info!("No violations found");
                }
            }
            Ok(report.is_clean())
        }
    }
}

fn load_tables(config: &FilterConfig) -> Result<(PixelLimitsCollection, StripLimitsCollection)> {
    let pixel_path = config.pixel_shape_path()?;
    let strip_path = config.strip_shape_path()?;
    debug!("Pixel limits from {}", pixel_path.display());
    debug!("Strip limits from {}", strip_path.display());

    let pixel = PixelLimitsCollection::load(&pixel_path)
        .with_context(|| format!("Failed to load pixel limits {}", pixel_path.display()))?;
    let strip = StripLimitsCollection::load(&strip_path)
        .with_context(|| format!("Failed to load strip limits {}", strip_path.display()))?;
    if pixel.iter().all(|l| *l == PixelLimits::default()) {
        warn!("Pixel limits {} contain no records", pixel_path.display());
    }
    Ok((pixel, strip))
}

fn print_key(shape: &Shape) {
    match *shape {
        Shape::Pixel { part, dx, dy } => {
            let key = PixelKey::new(part, dx, dy);
            println!("pixel ({part}, {dx}, {dy}) -> key {key} (slot {})", key.index());
        }
        Shape::Strip { width } => {
            let key = StripKey::new(width);
            println!("strip width {width} -> key {key} (slot {})", key.index());
        }
    }
}
