//! Error types for surface mesh operations with rich diagnostics.
//!
//! Every error carries:
//! - A machine-readable code in the format `MESH-XXXX`
//! - Location information where one exists (usually a file path)
//! - A recovery suggestion
//! - Terminal display via miette
//!
//! # Error Codes
//!
//! - `MESH-1xxx`: I/O errors (file reading, writing, parsing)
//! - `MESH-2xxx`: Validation errors (empty or malformed geometry)
//!
//! Watertightness defects are *not* errors. They are reported through
//! [`WatertightReport`](crate::WatertightReport) so that callers can decide
//! whether an imperfect mesh is still usable.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Machine-readable error codes for mesh operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // I/O errors (1xxx)
    /// MESH-1001: Failed to read file
    IoRead = 1001,
    /// MESH-1002: Failed to write file
    IoWrite = 1002,
    /// MESH-1003: Failed to parse file format
    ParseError = 1003,

    // Validation errors (2xxx)
    /// MESH-2003: Mesh has no triangles
    EmptyMesh = 2003,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `MESH-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IoRead => "MESH-1001",
            ErrorCode::IoWrite => "MESH-1002",
            ErrorCode::ParseError => "MESH-1003",
            ErrorCode::EmptyMesh => "MESH-2003",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for mesh errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Check the file system or the source of the file.
    CheckSource { checks: Vec<String> },
    /// Re-export or regenerate the file.
    Regenerate { hint: String },
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::CheckSource { checks } => {
                write!(f, "Check: {}", checks.join(", "))
            }
            RecoverySuggestion::Regenerate { hint } => write!(f, "{}", hint),
        }
    }
}

/// Errors that can occur during mesh I/O and validation.
#[derive(Debug, Error, Diagnostic)]
pub enum MeshError {
    /// Error reading from a file.
    #[error("failed to read mesh from {path}")]
    #[diagnostic(
        code(mesh::io::read),
        help("Check that the file exists and is readable. Try: ls -la {}", path.display())
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing to a file.
    #[error("failed to write mesh to {path}")]
    #[diagnostic(
        code(mesh::io::write),
        help("Check that the directory exists and is writable")
    )]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing an STL file.
    #[error("failed to parse mesh from {path}: {details}")]
    #[diagnostic(
        code(mesh::parse::error),
        help("The file may be truncated or not an STL file. Regenerate it and try again.")
    )]
    ParseError { path: PathBuf, details: String },

    /// Mesh has no triangles.
    #[error("mesh is empty: {details}")]
    #[diagnostic(
        code(mesh::validation::empty),
        help("The mesh must contain at least one triangle.")
    )]
    EmptyMesh { details: String },
}

impl MeshError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeshError::IoRead { .. } => ErrorCode::IoRead,
            MeshError::IoWrite { .. } => ErrorCode::IoWrite,
            MeshError::ParseError { .. } => ErrorCode::ParseError,
            MeshError::EmptyMesh { .. } => ErrorCode::EmptyMesh,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            MeshError::IoRead { .. } => RecoverySuggestion::CheckSource {
                checks: vec!["file exists".into(), "file permissions".into()],
            },
            MeshError::IoWrite { .. } => RecoverySuggestion::CheckSource {
                checks: vec!["directory exists".into(), "write permissions".into()],
            },
            MeshError::ParseError { .. } => RecoverySuggestion::Regenerate {
                hint: "Regenerate the file as binary STL".into(),
            },
            MeshError::EmptyMesh { .. } => RecoverySuggestion::Regenerate {
                hint: "Regenerate with a lower porosity or a higher resolution".into(),
            },
        }
    }

    /// Returns the file this error refers to, if any.
    pub fn location(&self) -> Option<&PathBuf> {
        match self {
            MeshError::IoRead { path, .. }
            | MeshError::IoWrite { path, .. }
            | MeshError::ParseError { path, .. } => Some(path),
            MeshError::EmptyMesh { .. } => None,
        }
    }

    /// Create an IoRead error.
    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeshError::IoRead {
            path: path.into(),
            source,
        }
    }

    /// Create an IoWrite error.
    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeshError::IoWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a ParseError.
    pub fn parse_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        MeshError::ParseError {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Create an EmptyMesh error.
    pub fn empty_mesh(details: impl Into<String>) -> Self {
        MeshError::EmptyMesh {
            details: details.into(),
        }
    }
}
