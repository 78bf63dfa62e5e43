//! Physical constants of the inverse barometer correction

use crate::errors::{IbeError, Result};

/// Default sea-water density [kg/m3]
pub const DEFAULT_RHO: f64 = 1028.0;

/// Standard gravitational acceleration [m/s2]
pub const DEFAULT_G: f64 = 9.80665;

/// Density and gravity used to turn a pressure anomaly into a height
///
/// The correction is `h = -(P - P_ref) / (rho * g)`, so a 1 hPa rise in
/// pressure lowers the sea surface by roughly 1 cm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalConstants {
    /// Sea-water density [kg/m3]
    pub rho: f64,
    /// Gravitational acceleration [m/s2]
    pub g: f64,
}

impl PhysicalConstants {
    /// Create constants without validating them; see [`Self::validate`]
    #[must_use]
    pub const fn new(rho: f64, g: f64) -> Self {
        Self { rho, g }
    }

    /// Both constants must be positive and finite
    ///
    /// # Errors
    ///
    /// Returns [`IbeError::InvalidConstant`] naming the offending constant.
    pub fn validate(&self) -> Result<()> {
        if !(self.rho.is_finite() && self.rho > 0.0) {
            return Err(IbeError::InvalidConstant {
                name: "rho",
                value: self.rho,
            });
        }
        if !(self.g.is_finite() && self.g > 0.0) {
            return Err(IbeError::InvalidConstant {
                name: "g",
                value: self.g,
            });
        }
        Ok(())
    }

    /// Factor applied to the pressure anomaly: `-1 / (rho * g)` [m/Pa]
    #[must_use]
    pub fn scale(&self) -> f64 {
        -1.0 / (self.rho * self.g)
    }
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self::new(DEFAULT_RHO, DEFAULT_G)
    }
}
