//! gyroid: generate watertight gyroid lattices from the command line.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=tpms_lattice=info` - Stage summaries
//! - `RUST_LOG=tpms_lattice=debug` - Calibration steps and component sizes
//! - `RUST_LOG=tpms_mesh::timing=debug` - Performance timing
//! - `RUST_LOG=debug` - All debug output
//!
//! # Example
//!
//! ```bash
//! # 70% porous 25 mm cube, denser at the bottom
//! gyroid -v generate --porosity 70 --grading-ratio 2 -o scaffold.stl
//!
//! # Check an existing file
//! gyroid verify scaffold.stl
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{calibrate, generate, verify};

/// gyroid - generate porous gyroid lattices for volumetric meshing.
///
/// Calibrates wall thickness to a target porosity, cleans the voxel solid,
/// and writes a watertight, outward-oriented STL surface.
#[derive(Parser)]
#[command(name = "gyroid")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

/// Design parameters shared by `generate` and `calibrate`.
///
/// Every flag is optional so that values from `--config` can show through.
#[derive(Args, Clone, Default)]
pub struct DesignArgs {
    /// Cube edge length in mm [default: 25]
    #[arg(long)]
    size: Option<f64>,

    /// Unit cells along each axis [default: 3]
    #[arg(long)]
    periods: Option<u32>,

    /// Target porosity in percent (0-100)
    #[arg(long, conflicts_with = "thickness")]
    porosity: Option<f64>,

    /// Wall thickness parameter (0-2)
    #[arg(long, conflicts_with = "porosity")]
    thickness: Option<f64>,

    /// Bottom-to-top thickness ratio (>= 1) [default: 1]
    #[arg(long)]
    grading_ratio: Option<f64>,

    /// Samples per axis inside the cube [default: 100]
    #[arg(long)]
    resolution: Option<usize>,

    /// Thickness search tolerance on porosity [default: 0.02]
    #[arg(long)]
    tolerance: Option<f64>,

    /// Thickness search iteration budget [default: 20]
    #[arg(long)]
    max_iterations: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a lattice and write it as binary STL
    Generate {
        /// Output STL path
        #[arg(short, long)]
        output: PathBuf,

        /// TOML design file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        design: DesignArgs,

        /// Keep regions not connected to the main lattice
        #[arg(long)]
        keep_floaters: bool,

        /// Lattice points added outside each cube face [default: 3]
        #[arg(long)]
        padding: Option<usize>,

        /// Dilation/erosion steps used to close pinholes [default: 2]
        #[arg(long)]
        closing_iterations: Option<usize>,

        /// Decimal places used to match edges when certifying [default: 6]
        #[arg(long)]
        edge_precision: Option<u32>,
    },

    /// Find the thickness for a porosity, or the porosity of a thickness
    Calibrate {
        /// TOML design file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        design: DesignArgs,
    },

    /// Check an STL file for orientation and boundary edges
    Verify {
        /// Input STL file
        input: PathBuf,

        /// Decimal places used to match edges
        #[arg(long, default_value = "6")]
        precision: u32,
    },
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "tpms_lattice=info,tpms_mesh=info",
            2 => "tpms_lattice=debug,tpms_mesh=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    // Nicer panic reports in development builds
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Generate {
            output,
            config,
            design,
            keep_floaters,
            padding,
            closing_iterations,
            edge_precision,
        } => generate::run(
            output,
            config.as_deref(),
            design,
            generate::Tuning {
                keep_floaters: *keep_floaters,
                padding: *padding,
                closing_iterations: *closing_iterations,
                edge_precision: *edge_precision,
            },
            &cli,
        ),
        Commands::Calibrate { config, design } => calibrate::run(config.as_deref(), design, &cli),
        Commands::Verify { input, precision } => verify::run(input, *precision, &cli),
    };

    if let Err(e) = &result {
        if !cli.quiet {
            if let Some(err) = e.downcast_ref::<tpms_lattice::LatticeError>() {
                eprintln!("{}: {}", "Error".red().bold(), err);
                eprintln!("  {}: {}", "Code".cyan(), err.code());
                eprintln!("  {}: {}", "Suggestion".green(), err.recovery_suggestion());
            } else if let Some(err) = e.downcast_ref::<tpms_mesh::MeshError>() {
                eprintln!("{}: {}", "Error".red().bold(), err);
                eprintln!("  {}: {}", "Code".cyan(), err.code());
                eprintln!("  {}: {}", "Suggestion".green(), err.recovery_suggestion());
                if let Some(location) = err.location() {
                    eprintln!("  {}: {}", "Location".yellow(), location.display());
                }
            } else {
                eprintln!("{}: {}", "Error".red().bold(), e);
                for cause in e.chain().skip(1) {
                    eprintln!("  {}: {}", "Caused by".yellow(), cause);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
