//! Error types.

use crate::num::fdt;
use std::{io, path::PathBuf};
use thiserror::Error;

/// Result type used throughout the crate.
pub type ModalResult<T> = Result<T, ModalError>;

/// Errors that can occur while loading, combining, projecting or
/// interpolating flow fields.
#[derive(Error, Debug)]
pub enum ModalError {
    /// Point counts, quantity blocks, weight lengths or field layouts disagree.
    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Vector arithmetic on operands of unequal length.
    #[error("Dimension mismatch: {left} vs. {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("No field found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file was readable but its content could not be interpreted.
    #[error("Invalid data in {}: {message}", path.display())]
    InvalidData { path: PathBuf, message: String },

    /// A reduction was requested over an empty collection.
    #[error("Empty input to {operation}")]
    EmptyInput { operation: &'static str },

    /// Too few scattered points for the requested interpolation method.
    #[error("{method} interpolation requires at least {required} points, only {available} available")]
    Interpolation {
        method: &'static str,
        required: usize,
        available: usize,
    },

    /// The local fit of an interpolation method is singular at a target point.
    #[error("{method} interpolation fit is singular at ({x}, {y})")]
    SingularFit { method: &'static str, x: fdt, y: fdt },

    #[error("No base flow path given and none configured")]
    MissingBasePath,
}

impl ModalError {
    pub fn shape_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    pub fn invalid_data(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidData {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wraps an I/O error for the given path, turning a missing file
    /// into `NotFound`.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Whether this error signals a missing storage path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
