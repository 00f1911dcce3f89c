//! Serializable design files.
//!
//! A `DesignConfig` mirrors a [`DesignRequest`] plus optional tuning overrides,
//! so a lattice can be regenerated from a file checked in next to the part.
//!
//! # Example TOML
//!
//! ```toml
//! [design]
//! size = 25.0
//! periods = 3
//! porosity = 70.0
//! grading_ratio = 2.0
//! resolution = 120
//!
//! [tuning]
//! closing_iterations = 2
//! edge_precision = 6
//! ```
//!
//! Porosity is given in percent, as on the command line.

use serde::{Deserialize, Serialize};

use crate::builder::LatticeBuilder;
use crate::error::LatticeResult;
use crate::request::{DesignRequest, DesignTarget};

/// Design section. Absent fields take the request defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesignSection {
    /// Cube edge length in mm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// Unit cells along each axis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods: Option<u32>,
    /// Target porosity in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub porosity: Option<f64>,
    /// Explicit wall thickness parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,
    /// Bottom-to-top thickness ratio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_ratio: Option<f64>,
    /// Samples per axis inside the cube.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<usize>,
    /// Skip removal of disconnected regions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_floaters: Option<bool>,
}

/// Tuning overrides. Absent fields keep the builder defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TuningSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_defect_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_points: Option<usize>,
}

/// A lattice design file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesignConfig {
    /// Optional name for this design.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub design: DesignSection,
    #[serde(default)]
    pub tuning: TuningSection,
}

/// Percent with float noise from the scaling rounded off, so 0.7 is
/// written as 70.0 and reads back as 0.7.
fn fraction_to_percent(fraction: f64) -> f64 {
    (fraction * 100.0 * 1e9).round() / 1e9
}

impl DesignConfig {
    /// Config describing `request` with no tuning overrides.
    pub fn from_request(request: &DesignRequest) -> Self {
        let (porosity, thickness) = match request.target {
            DesignTarget::Porosity(p) => (Some(fraction_to_percent(p)), None),
            DesignTarget::Thickness(t) => (None, Some(t)),
        };
        Self {
            name: None,
            design: DesignSection {
                size: Some(request.size),
                periods: Some(request.periods),
                porosity,
                thickness,
                grading_ratio: Some(request.grading_ratio),
                resolution: Some(request.resolution),
                keep_floaters: Some(request.keep_floaters),
            },
            tuning: TuningSection::default(),
        }
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or doesn't match the schema.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, DesignConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&contents)?)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml(&self, path: impl AsRef<std::path::Path>) -> Result<(), DesignConfigError> {
        let toml_str = self.to_toml()?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Build the design request.
    ///
    /// # Errors
    ///
    /// Fails when both or neither of porosity and thickness are set. Range
    /// checks happen later, in [`DesignRequest::validate`].
    pub fn into_request(&self) -> LatticeResult<DesignRequest> {
        let d = &self.design;
        let mut request = DesignRequest::from_options(d.porosity.map(|p| p / 100.0), d.thickness)?;
        if let Some(size) = d.size {
            request = request.size(size);
        }
        if let Some(periods) = d.periods {
            request = request.periods(periods);
        }
        if let Some(ratio) = d.grading_ratio {
            request = request.grading_ratio(ratio);
        }
        if let Some(resolution) = d.resolution {
            request = request.resolution(resolution);
        }
        if let Some(keep) = d.keep_floaters {
            request = request.keep_floaters(keep);
        }
        Ok(request)
    }

    /// Apply the tuning overrides to `builder`.
    pub fn apply_to(&self, mut builder: LatticeBuilder) -> LatticeBuilder {
        let t = &self.tuning;
        if let Some(padding) = t.padding {
            builder = builder.padding(padding);
        }
        if let Some(tolerance) = t.tolerance {
            builder = builder.tolerance(tolerance);
        }
        if let Some(iterations) = t.max_iterations {
            builder = builder.max_iterations(iterations);
        }
        if let Some(iterations) = t.closing_iterations {
            builder = builder.closing_iterations(iterations);
        }
        if let Some(precision) = t.edge_precision {
            builder = builder.edge_precision(precision);
        }
        if let Some(limit) = t.minor_defect_limit {
            builder = builder.minor_defect_limit(limit);
        }
        if let Some(max) = t.max_points {
            builder = builder.max_points(max);
        }
        builder
    }

    /// Request plus tuned builder in one step.
    pub fn builder(&self) -> LatticeResult<LatticeBuilder> {
        Ok(self.apply_to(LatticeBuilder::new(self.into_request()?)))
    }
}

/// Errors that can occur when loading or saving design files.
#[derive(Debug)]
pub enum DesignConfigError {
    /// I/O error reading or writing file.
    Io(std::io::Error),
    /// TOML parsing error.
    TomlParse(toml::de::Error),
    /// TOML serialization error.
    TomlSerialize(toml::ser::Error),
}

impl std::fmt::Display for DesignConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::TomlParse(e) => write!(f, "TOML parse error: {}", e),
            Self::TomlSerialize(e) => write!(f, "TOML serialize error: {}", e),
        }
    }
}

impl std::error::Error for DesignConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::TomlParse(e) => Some(e),
            Self::TomlSerialize(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for DesignConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for DesignConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::TomlParse(e)
    }
}

impl From<toml::ser::Error> for DesignConfigError {
    fn from(e: toml::ser::Error) -> Self {
        Self::TomlSerialize(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LatticeError;

    #[test]
    fn test_parse_design_file() {
        let config = DesignConfig::from_toml(
            r#"
            name = "femoral-insert"

            [design]
            size = 20.0
            periods = 4
            porosity = 65.0
            grading_ratio = 2.0

            [tuning]
            closing_iterations = 1
            edge_precision = 8
            "#,
        )
        .unwrap();

        let request = config.into_request().unwrap();
        assert_eq!(request.size, 20.0);
        assert_eq!(request.periods, 4);
        assert_eq!(request.target, DesignTarget::Porosity(0.65));
        assert_eq!(request.grading_ratio, 2.0);
        assert_eq!(request.resolution, crate::request::DEFAULT_RESOLUTION);

        let builder = config.apply_to(LatticeBuilder::new(request));
        assert_eq!(builder.generation_params().closing_iterations, 1);
        assert_eq!(builder.generation_params().edge_precision, 8);
        assert_eq!(builder.generation_params().padding, 3);
    }

    #[test]
    fn test_empty_design_needs_a_target() {
        let config = DesignConfig::from_toml("").unwrap();
        assert!(matches!(
            config.into_request(),
            Err(LatticeError::NoTargetGiven)
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(DesignConfig::from_toml("[design]\nporsity = 70.0\n").is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let request = DesignRequest::with_thickness(0.4).periods(5).resolution(60);
        let mut config = DesignConfig::from_request(&request);
        config.tuning.padding = Some(4);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design.toml");
        config.save_toml(&path).unwrap();

        let loaded = DesignConfig::from_toml_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.into_request().unwrap(), request);
    }

    #[test]
    fn test_porosity_roundtrip() {
        for fraction in [0.07, 0.29, 0.55, 0.7, 0.83] {
            let request = DesignRequest::with_porosity(fraction).grading_ratio(1.5);
            let config = DesignConfig::from_request(&request);
            let text = config.to_toml().unwrap();
            let loaded = DesignConfig::from_toml(&text).unwrap().into_request().unwrap();

            let DesignTarget::Porosity(p) = loaded.target else {
                panic!("expected porosity target, got {}", loaded.target);
            };
            assert!((p - fraction).abs() < 1e-12, "{} read back as {}", fraction, p);
            assert_eq!(loaded.grading_ratio, 1.5);
        }

        let config = DesignConfig::from_request(&DesignRequest::with_porosity(0.7));
        assert_eq!(config.design.porosity, Some(70.0));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DesignConfig::from_toml_file("/nonexistent/design.toml").unwrap_err();
        assert!(matches!(err, DesignConfigError::Io(_)));
    }
}
