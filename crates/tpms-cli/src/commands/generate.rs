//! gyroid generate command - build a lattice and write it as STL.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tpms_lattice::{GenerationStatus, LatticeBuildResult};
use tracing::warn;

use crate::commands::resolve_design;
use crate::output::{self, percent};
use crate::{Cli, DesignArgs, OutputFormat};

/// Pipeline flags that only `generate` accepts.
pub struct Tuning {
    pub keep_floaters: bool,
    pub padding: Option<usize>,
    pub closing_iterations: Option<usize>,
    pub edge_precision: Option<u32>,
}

#[derive(Serialize)]
struct GenerateSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    status: String,
    calibration: CalibrationInfo,
    solid: SolidInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    surface: Option<SurfaceInfo>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct CalibrationInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    target_porosity: Option<f64>,
    thickness: f64,
    thickness_bottom: f64,
    thickness_top: f64,
    gradient_per_mm: f64,
    achieved_porosity: f64,
    converged: bool,
    iterations: usize,
}

#[derive(Serialize)]
struct SolidInfo {
    points_per_axis: usize,
    spacing: f64,
    porosity_thresholded: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    porosity_filtered: Option<f64>,
    porosity_final: f64,
    components_before: usize,
    removed_voxels: usize,
    closing_added_voxels: usize,
    closing_removed_voxels: usize,
    components_after: usize,
}

#[derive(Serialize)]
struct SurfaceInfo {
    vertices: usize,
    triangles: usize,
    volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    centroid: Option<[f64; 3]>,
    surface_area: f64,
    flipped: bool,
    edges: usize,
    boundary_edges: usize,
    inconsistent_edges: usize,
    severity: String,
}

fn summarize(result: &LatticeBuildResult, size: f64, output: Option<&Path>) -> GenerateSummary {
    let calibration = &result.calibration;
    let stats = &result.stats;

    let surface = match (&stats.orientation, &stats.watertight) {
        (Some(orientation), Some(watertight)) => Some(SurfaceInfo {
            vertices: stats.vertex_count,
            triangles: stats.triangle_count,
            volume: orientation.volume,
            centroid: orientation.centroid.map(|c| [c.x, c.y, c.z]),
            surface_area: orientation.surface_area,
            flipped: orientation.flipped,
            edges: watertight.edge_count,
            boundary_edges: watertight.boundary_edge_count,
            inconsistent_edges: watertight.inconsistent_edge_count,
            severity: watertight.severity.to_string(),
        }),
        _ => None,
    };

    GenerateSummary {
        output: output.map(|p| p.display().to_string()),
        status: result.status.to_string(),
        calibration: CalibrationInfo {
            target_porosity: calibration.target_porosity,
            thickness: calibration.thickness,
            thickness_bottom: calibration.profile.bottom(),
            thickness_top: calibration.profile.top(),
            gradient_per_mm: calibration.profile.gradient(size),
            achieved_porosity: calibration.achieved_porosity,
            converged: calibration.converged,
            iterations: calibration.iterations,
        },
        solid: SolidInfo {
            points_per_axis: stats.points_per_axis,
            spacing: stats.spacing,
            porosity_thresholded: stats.porosity.thresholded,
            porosity_filtered: stats.porosity.filtered,
            porosity_final: stats.porosity.closed,
            components_before: stats.components_before,
            removed_voxels: stats.removed_voxels,
            closing_added_voxels: stats.closing_added_voxels,
            closing_removed_voxels: stats.closing_removed_voxels,
            components_after: stats.components_after,
        },
        surface,
        warnings: result.warnings.iter().map(|w| w.to_string()).collect(),
    }
}

fn print_text(summary: &GenerateSummary, status: GenerationStatus) {
    let c = &summary.calibration;
    println!("{}", "Gyroid Lattice".bold().underline());

    println!("\n{}", "Calibration:".bold());
    if let Some(target) = c.target_porosity {
        println!("  {}: {}", "Target porosity".cyan(), percent(target));
    }
    if c.thickness_bottom != c.thickness_top {
        println!(
            "  {}: {:.3} (bottom {:.3}, top {:.3})",
            "Thickness".cyan(),
            c.thickness,
            c.thickness_bottom,
            c.thickness_top
        );
        println!("  {}: {:.4} per mm", "Gradient".cyan(), c.gradient_per_mm);
    } else {
        println!("  {}: {:.3}", "Thickness".cyan(), c.thickness);
    }
    println!(
        "  {}: {}",
        "Calibrated porosity".cyan(),
        percent(c.achieved_porosity)
    );
    if c.target_porosity.is_some() {
        let converged = if c.converged {
            "yes".green()
        } else {
            "no, using best sample".yellow()
        };
        println!(
            "  {}: {} ({} iterations)",
            "Converged".cyan(),
            converged,
            c.iterations
        );
    }

    let s = &summary.solid;
    println!("\n{}", "Solid:".bold());
    println!(
        "  {}: {}^3 points, spacing {:.4} mm",
        "Lattice".cyan(),
        s.points_per_axis,
        s.spacing
    );
    println!(
        "  {}: {}",
        "Porosity after thresholding".cyan(),
        percent(s.porosity_thresholded)
    );
    match s.porosity_filtered {
        Some(filtered) => {
            println!(
                "  {}: {}",
                "Porosity after filtering".cyan(),
                percent(filtered)
            );
            if s.removed_voxels > 0 {
                println!(
                    "  {}: {} region(s), {} voxels",
                    "Removed floaters".yellow(),
                    s.components_before.saturating_sub(1),
                    s.removed_voxels
                );
            }
        }
        None => println!(
            "  {}: {} component(s) kept",
            "Floaters".cyan(),
            s.components_before
        ),
    }
    println!(
        "  {}: {} ({} voxels added by closing)",
        "Final porosity".cyan(),
        percent(s.porosity_final).bold(),
        s.closing_added_voxels
    );
    if s.closing_removed_voxels > 0 {
        println!(
            "  {}: {} voxels left detached by closing",
            "Removed".yellow(),
            s.closing_removed_voxels
        );
    }
    println!("  {}: {}", "Components".cyan(), s.components_after);

    if let Some(m) = &summary.surface {
        println!("\n{}", "Surface:".bold());
        println!("  {}: {}", "Vertices".cyan(), m.vertices);
        println!("  {}: {}", "Triangles".cyan(), m.triangles);
        println!("  {}: {:.2} mm³", "Volume".cyan(), m.volume);
        if let Some([x, y, z]) = m.centroid {
            println!("  {}: [{:.2}, {:.2}, {:.2}]", "Center".cyan(), x, y, z);
        }
        println!("  {}: {:.2} mm²", "Surface area".cyan(), m.surface_area);
        if m.flipped {
            println!("  {}", "Normals were inverted and have been flipped".yellow());
        }
        println!("  {}: {}", "Boundary edges".cyan(), m.boundary_edges);
        if m.inconsistent_edges > 0 {
            println!(
                "  {}: {}",
                "Inconsistent edges".yellow(),
                m.inconsistent_edges
            );
        }
    }

    println!();
    let status_text = match status {
        GenerationStatus::Watertight => "Watertight".green().bold(),
        GenerationStatus::MinorDefects => {
            "Minor defects, should be okay for meshing".yellow().bold()
        }
        GenerationStatus::SevereDefects => "Severe defects, try increasing resolution".red().bold(),
        GenerationStatus::NoSurface => "No surface found".red().bold(),
        GenerationStatus::ZeroVolume => "Surface encloses no volume".red().bold(),
    };
    println!("{}: {}", "Status".cyan(), status_text);
    if let Some(path) = &summary.output {
        println!("{}: {}", "Saved".cyan(), path);
    }

    for warning in &summary.warnings {
        println!("{} {}", "⚠".yellow(), warning);
    }
}

pub fn run(
    output: &Path,
    config: Option<&Path>,
    design: &DesignArgs,
    tuning: Tuning,
    cli: &Cli,
) -> Result<()> {
    let mut resolved = resolve_design(config, design)?;
    if tuning.keep_floaters {
        resolved.design.keep_floaters = Some(true);
    }
    if tuning.padding.is_some() {
        resolved.tuning.padding = tuning.padding;
    }
    if tuning.closing_iterations.is_some() {
        resolved.tuning.closing_iterations = tuning.closing_iterations;
    }
    if tuning.edge_precision.is_some() {
        resolved.tuning.edge_precision = tuning.edge_precision;
    }

    let builder = resolved.builder()?;
    let size = builder.request().size;
    let result = builder.build()?;

    let written = if result.status.has_mesh() {
        result
            .save_stl(output)
            .with_context(|| format!("Failed to write lattice to {:?}", output))?;
        Some(output)
    } else {
        warn!(status = %result.status, "Nothing written");
        None
    };

    let summary = summarize(&result, size, written);
    match cli.format {
        OutputFormat::Json => output::print(&summary, cli.format, cli.quiet),
        OutputFormat::Text => {
            if !cli.quiet {
                print_text(&summary, result.status);
            }
        }
    }

    // Degenerate geometry is reported, not written
    if !result.status.has_mesh() {
        std::process::exit(2);
    }

    Ok(())
}
