//! gyroid verify command - certify an STL surface.

use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde::Serialize;
use tpms_lattice::MAX_EDGE_PRECISION;
use tpms_mesh::{DefectSeverity, VerifyParams, certify_watertight, load_stl, orient_outward};

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct VerifyResult {
    path: String,
    triangles: usize,
    volume: f64,
    signed_volume_before: f64,
    inside_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    centroid: Option<[f64; 3]>,
    surface_area: f64,
    precision: u32,
    edges: usize,
    boundary_edges: usize,
    inconsistent_edges: usize,
    severity: String,
    watertight: bool,
}

pub fn run(input: &Path, precision: u32, cli: &Cli) -> Result<()> {
    if precision > MAX_EDGE_PRECISION {
        bail!(
            "Precision {} exceeds the maximum of {} decimals",
            precision,
            MAX_EDGE_PRECISION
        );
    }

    let mut mesh =
        load_stl(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;

    let orientation = orient_outward(&mut mesh);
    let report = certify_watertight(&mesh, &VerifyParams::with_precision(precision));

    let result = VerifyResult {
        path: input.display().to_string(),
        triangles: mesh.triangle_count(),
        volume: orientation.volume,
        signed_volume_before: orientation.signed_volume_before,
        inside_out: orientation.flipped,
        centroid: orientation.centroid.map(|c| [c.x, c.y, c.z]),
        surface_area: orientation.surface_area,
        precision,
        edges: report.edge_count,
        boundary_edges: report.boundary_edge_count,
        inconsistent_edges: report.inconsistent_edge_count,
        severity: report.severity.to_string(),
        watertight: report.is_watertight(),
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&result, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Verification Report".bold().underline());
                println!("  {}: {}", "File".cyan(), input.display());
                println!("  {}: {}", "Triangles".cyan(), result.triangles);
                println!("  {}: {:.2} mm³", "Volume".cyan(), result.volume);
                if let Some([x, y, z]) = result.centroid {
                    println!("  {}: [{:.2}, {:.2}, {:.2}]", "Center".cyan(), x, y, z);
                }
                if result.inside_out {
                    println!(
                        "  {} Normals were inverted (signed volume {:.2})",
                        "⚠".yellow(),
                        result.signed_volume_before
                    );
                }
                println!("  {}: {}", "Edges".cyan(), result.edges);
                println!("  {}: {}", "Boundary edges".cyan(), result.boundary_edges);
                if result.inconsistent_edges > 0 {
                    println!(
                        "  {}: {}",
                        "Inconsistent edges".yellow(),
                        result.inconsistent_edges
                    );
                }

                let status = match report.severity {
                    DefectSeverity::Watertight => "Watertight".green().bold(),
                    DefectSeverity::Minor => "Minor defects, should be okay for meshing".yellow().bold(),
                    DefectSeverity::Severe => "Severe defects, try increasing resolution".red().bold(),
                };
                println!("  {}: {}", "Status".cyan(), status);
            }
        }
    }

    // Exit with error code if open
    if !result.watertight {
        std::process::exit(1);
    }

    Ok(())
}
