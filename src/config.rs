//! Conversion settings
//!
//! Everything the conversion needs is carried by [`ConversionConfig`] and
//! passed in explicitly; there is no global state.

use crate::errors::{IbeError, Result};
use crate::ibe::{PhysicalConstants, ReferencePressure};
use std::path::{Path, PathBuf};

/// Sea-level pressure file used when no input is given (ERA-Interim, Antarctica)
pub const DEFAULT_INPUT: &str = "SLP_antarctica_3h_19900101_20170331.nc";

/// Extension of the output container
pub const OUTPUT_EXTENSION: &str = "h5";

/// Default number of time steps read per slab
pub const DEFAULT_CHUNK_STEPS: usize = 248;

/// Default deflate level of the output datasets
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 9;

/// Names of the variables in the input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableNames {
    pub longitude: String,
    pub latitude: String,
    pub time: String,
    pub pressure: String,
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            longitude: "longitude".to_string(),
            latitude: "latitude".to_string(),
            time: "time".to_string(),
            pressure: "msl".to_string(),
        }
    }
}

/// Full description of one SLP to IBE conversion
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Sea-level pressure NetCDF file
    pub input: PathBuf,
    /// Output file; derived from `input` when `None`
    pub output: Option<PathBuf>,
    pub variables: VariableNames,
    pub constants: PhysicalConstants,
    pub reference: ReferencePressure,
    /// Time steps held in memory at once
    pub chunk_steps: usize,
    /// Deflate level (0-9) of the output datasets
    pub compression_level: i32,
}

impl ConversionConfig {
    /// Configuration with default settings for the given input
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            variables: VariableNames::default(),
            constants: PhysicalConstants::default(),
            reference: ReferencePressure::default(),
            chunk_steps: DEFAULT_CHUNK_STEPS,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_constants(mut self, constants: PhysicalConstants) -> Self {
        self.constants = constants;
        self
    }

    pub fn with_reference(mut self, reference: ReferencePressure) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_chunk_steps(mut self, chunk_steps: usize) -> Self {
        self.chunk_steps = chunk_steps;
        self
    }

    /// Output path, explicit or derived from the input name
    ///
    /// # Errors
    ///
    /// Returns [`IbeError::InvalidConfig`] if the output would overwrite the input.
    pub fn output_path(&self) -> Result<PathBuf> {
        let output = match &self.output {
            Some(path) => path.clone(),
            None => derive_output_path(&self.input),
        };
        if output == self.input {
            return Err(IbeError::InvalidConfig(format!(
                "output path {} would overwrite the input",
                output.display()
            )));
        }
        Ok(output)
    }

    /// Check the settings before any file is touched
    ///
    /// # Errors
    ///
    /// Returns an error for invalid constants, a zero chunk size, a deflate
    /// level outside 0-9, or an output path equal to the input.
    pub fn validate(&self) -> Result<()> {
        self.validate_physics()?;
        if self.chunk_steps == 0 {
            return Err(IbeError::InvalidConfig(
                "chunk_steps must be at least 1".to_string(),
            ));
        }
        if !(0..=9).contains(&self.compression_level) {
            return Err(IbeError::InvalidConfig(format!(
                "compression level {} is outside 0-9",
                self.compression_level
            )));
        }
        self.output_path()?;
        Ok(())
    }

    /// Check only what the transform itself uses: constants and reference
    ///
    /// # Errors
    ///
    /// Returns an error for invalid constants or a non-finite constant
    /// reference pressure.
    pub fn validate_physics(&self) -> Result<()> {
        self.constants.validate()?;
        if let ReferencePressure::Constant(pa) = self.reference {
            if !pa.is_finite() {
                return Err(IbeError::InvalidConfig(format!(
                    "reference pressure {pa} is not finite"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT)
    }
}

/// `SLP_x_2017.nc` -> `IBE_x_2017.h5`, in the same directory
///
/// Every `SLP_` token of the file name is replaced; the directory part is
/// left alone.
pub fn derive_output_path(input: &Path) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().replace("SLP_", "IBE_"))
        .unwrap_or_default();
    input.with_file_name(file_name).with_extension(OUTPUT_EXTENSION)
}
