//! Subcommand implementations.

pub mod calibrate;
pub mod generate;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};
use tpms_lattice::DesignConfig;

use crate::DesignArgs;

/// Load `--config` (if any) and overlay the design flags on it.
pub fn resolve_design(config: Option<&Path>, args: &DesignArgs) -> Result<DesignConfig> {
    let mut resolved = match config {
        Some(path) => DesignConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load design file {:?}", path))?,
        None => DesignConfig::default(),
    };

    let design = &mut resolved.design;
    // A target on the command line replaces the file's target of either kind.
    if args.porosity.is_some() || args.thickness.is_some() {
        design.porosity = args.porosity;
        design.thickness = args.thickness;
    }
    if args.size.is_some() {
        design.size = args.size;
    }
    if args.periods.is_some() {
        design.periods = args.periods;
    }
    if args.grading_ratio.is_some() {
        design.grading_ratio = args.grading_ratio;
    }
    if args.resolution.is_some() {
        design.resolution = args.resolution;
    }

    let tuning = &mut resolved.tuning;
    if args.tolerance.is_some() {
        tuning.tolerance = args.tolerance;
    }
    if args.max_iterations.is_some() {
        tuning.max_iterations = args.max_iterations;
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design.toml");
        std::fs::write(
            &path,
            "[design]\nsize = 20.0\nthickness = 0.5\nresolution = 80\n",
        )
        .unwrap();

        let args = DesignArgs {
            porosity: Some(60.0),
            resolution: Some(40),
            ..Default::default()
        };
        let resolved = resolve_design(Some(&path), &args).unwrap();

        assert_eq!(resolved.design.size, Some(20.0));
        assert_eq!(resolved.design.porosity, Some(60.0));
        assert_eq!(resolved.design.thickness, None);
        assert_eq!(resolved.design.resolution, Some(40));
    }

    #[test]
    fn test_no_file_uses_flags_only() {
        let args = DesignArgs {
            thickness: Some(0.3),
            ..Default::default()
        };
        let resolved = resolve_design(None, &args).unwrap();
        let request = resolved.into_request().unwrap();
        assert_eq!(request.target, tpms_lattice::DesignTarget::Thickness(0.3));
        assert_eq!(request.size, tpms_lattice::DEFAULT_SIZE);
    }
}
