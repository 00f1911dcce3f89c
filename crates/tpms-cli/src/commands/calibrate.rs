//! gyroid calibrate command - relate wall thickness and porosity.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::commands::resolve_design;
use crate::output::{self, percent};
use crate::{Cli, DesignArgs, OutputFormat};

#[derive(Serialize)]
struct CalibrationResult {
    size: f64,
    periods: u32,
    resolution: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_porosity: Option<f64>,
    thickness: f64,
    thickness_bottom: f64,
    thickness_top: f64,
    gradient_per_mm: f64,
    achieved_porosity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<f64>,
    converged: bool,
    iterations: usize,
    samples: Vec<SampleInfo>,
}

#[derive(Serialize)]
struct SampleInfo {
    thickness: f64,
    porosity: f64,
}

pub fn run(config: Option<&Path>, design: &DesignArgs, cli: &Cli) -> Result<()> {
    let resolved = resolve_design(config, design)?;
    let builder = resolved.builder()?;
    let request = builder.request().clone();
    let report = builder.calibrate_only()?;

    let result = CalibrationResult {
        size: request.size,
        periods: request.periods,
        resolution: request.resolution,
        target_porosity: report.target_porosity,
        thickness: report.thickness,
        thickness_bottom: report.profile.bottom(),
        thickness_top: report.profile.top(),
        gradient_per_mm: report.profile.gradient(request.size),
        achieved_porosity: report.achieved_porosity,
        error: report.error(),
        converged: report.converged,
        iterations: report.iterations,
        samples: report
            .samples
            .iter()
            .map(|s| SampleInfo {
                thickness: s.thickness,
                porosity: s.porosity,
            })
            .collect(),
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&result, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Calibration".bold().underline());
                println!(
                    "  {}: {} mm, {} cells, {}^3 samples",
                    "Cube".cyan(),
                    result.size,
                    result.periods,
                    result.resolution
                );

                match result.target_porosity {
                    Some(target) => {
                        println!("  {}: {}", "Target porosity".cyan(), percent(target));
                        println!("  {}: {:.3}", "Thickness".cyan(), result.thickness);
                        println!(
                            "  {}: {}",
                            "Achieved porosity".cyan(),
                            percent(result.achieved_porosity)
                        );
                        let status = if result.converged {
                            "Converged".green().bold()
                        } else {
                            "Not converged".yellow().bold()
                        };
                        println!(
                            "  {}: {} after {} iteration(s), error {}",
                            "Status".cyan(),
                            status,
                            result.iterations,
                            percent(result.error.unwrap_or(0.0))
                        );
                    }
                    None => {
                        println!("  {}: {:.3}", "Thickness".cyan(), result.thickness);
                        println!(
                            "  {}: {}",
                            "Porosity".cyan(),
                            percent(result.achieved_porosity)
                        );
                    }
                }

                if result.thickness_bottom != result.thickness_top {
                    println!(
                        "  {}: bottom {:.3}, top {:.3} ({:.4} per mm)",
                        "Grading".cyan(),
                        result.thickness_bottom,
                        result.thickness_top,
                        result.gradient_per_mm
                    );
                }

                if result.samples.len() > 1 {
                    println!("\n{}", "Samples:".bold());
                    for (i, s) in result.samples.iter().enumerate() {
                        println!(
                            "  {:>2}. thickness {:.4} -> porosity {}",
                            i + 1,
                            s.thickness,
                            percent(s.porosity)
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
