//! Centralized error handling for slp2ibe
//!
//! Every fallible operation in the crate returns [`Result`], so callers get a
//! single error type whether the failure came from the NetCDF layer, from the
//! array shapes, or from the physical parameters of the transform.

use thiserror::Error;

/// Main error type for slp2ibe operations
#[derive(Debug, Error)]
pub enum IbeError {
    /// NetCDF file operation errors (missing file, unreadable variable, ...)
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Array construction errors
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// Variable not found in the input file
    #[error("Variable '{var}' not found in file")]
    VariableNotFound { var: String },

    /// An array does not have the expected shape or rank
    #[error("Shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: String,
        expected: String,
        found: String,
    },

    /// Pressure field without a single time step
    #[error("Pressure field has no time steps")]
    EmptyTimeAxis,

    /// A grid dimension has length zero
    #[error("Dimension of variable '{var}' is empty")]
    EmptyDimension { var: String },

    /// rho or g is not a positive finite number
    #[error("Invalid physical constant {name} = {value}: must be positive and finite")]
    InvalidConstant { name: &'static str, value: f64 },

    /// Inconsistent conversion settings
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl IbeError {
    pub(crate) fn shape_mismatch(
        what: impl Into<String>,
        expected: impl std::fmt::Debug,
        found: impl std::fmt::Debug,
    ) -> Self {
        IbeError::ShapeMismatch {
            what: what.into(),
            expected: format!("{expected:?}"),
            found: format!("{found:?}"),
        }
    }
}

/// Result type alias for slp2ibe operations
pub type Result<T> = std::result::Result<T, IbeError>;
