//! slp2ibe: sea-level pressure to Inverse Barometer Effect conversion
//!
//! Reads a gridded mean sea-level pressure product in pascals, `msl(t, y, x)`,
//! and produces the inverse barometer correction in meters:
//!
//! ```text
//! h_ibe(x, y, t) = -1 / (rho g) * [P(x, y, t) - P_ref(x, y)]
//! ```
//!
//! where `P_ref(x, y)` is the climatological mean at each location. The
//! correction is applied to a sea surface height as `h_cor = h - h_ibe`.
//! See Dorandeu and Le Traon (1999).
//!
//! ## Module Organization
//!
//! - [`ibe`]: the transform itself, on in-memory `ndarray` arrays
//! - [`config`]: conversion settings and output naming
//! - [`netcdf_io`]: decoded pressure reads and compressed output
//! - [`convert`]: streaming file-to-file conversion
//! - [`metadata`]: input summary printing
//! - [`probe`]: single-point diagnostic
//! - [`parallel`]: thread pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust
//! use ndarray::Array3;
//! use slp2ibe::prelude::*;
//!
//! let pressure = Array3::from_shape_vec(
//!     (2, 1, 1),
//!     vec![101_300.0, 101_500.0],
//! ).unwrap();
//! let ibe = compute_ibe(pressure.view(), &PhysicalConstants::default()).unwrap();
//! assert!(ibe[[0, 0, 0]] > 0.0);
//! ```
//!
//! ```rust,no_run
//! use slp2ibe::prelude::*;
//!
//! let config = ConversionConfig::new("SLP_antarctica_3h_19900101_20171031.nc");
//! let report = convert(&config).unwrap();
//! println!("{}", report.output.display());
//! ```

pub mod config;
pub mod convert;
pub mod errors;
pub mod ibe;
pub mod metadata;
pub mod netcdf_io;
pub mod parallel;
pub mod probe;

pub use errors::{IbeError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::config::{ConversionConfig, VariableNames};
    pub use crate::convert::{convert, ConversionReport};
    pub use crate::errors::{IbeError, Result};
    pub use crate::ibe::{compute_ibe, PhysicalConstants, ReferencePressure};
    pub use crate::netcdf_io::{IbeWriter, PressureSource};
    pub use crate::parallel::ParallelConfig;
}
