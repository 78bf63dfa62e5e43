//! Inverse Barometer Effect (IBE) computation
//!
//! The sea surface rises by roughly 1 cm when air pressure drops by 1 hPa.
//! The correction that has to be subtracted from a measured sea surface
//! height is
//!
//! ```text
//! h_ibe(x, y, t) = -1 / (rho g) * [P(x, y, t) - P_ref(x, y)]
//! ```
//!
//! and is applied as `h_cor = h - h_ibe`.
//!
//! # Organization
//!
//! - [`constants`]: sea-water density and gravity
//! - [`reference`]: reference pressure policies and the streaming temporal mean
//! - [`transform`]: the elementwise correction

pub mod constants;
pub mod reference;
pub mod transform;

pub use constants::{PhysicalConstants, DEFAULT_G, DEFAULT_RHO};
pub use reference::{temporal_nanmean, ReferencePressure, TemporalMean, STANDARD_ATMOSPHERE_PA};
pub use transform::{apply_correction, compute_ibe, compute_ibe_dyn, compute_ibe_with_reference};
