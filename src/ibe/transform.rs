//! The inverse barometer transform
//!
//! ```text
//! h_ibe(t, y, x) = -1 / (rho g) * (P(t, y, x) - P_ref(y, x))
//! ```
//!
//! Inputs are already-decoded pressures in pascals with NaN marking missing
//! samples; scale factors, offsets and fill values are resolved by the
//! reading layer before anything here runs.

use super::constants::PhysicalConstants;
use super::reference::ReferencePressure;
use crate::errors::{IbeError, Result};
use ndarray::{Array3, ArrayD, ArrayView2, ArrayView3, ArrayViewD, ArrayViewMut3, Axis, Ix3, Zip};

/// Convert sea-level pressure [Pa] to the inverse barometer correction [m]
///
/// `P_ref` is the climatological mean at each location, computed over the
/// time axis while ignoring NaN. The input is left untouched.
///
/// # Arguments
///
/// * `pressure` - Field indexed `(time, lat, lon)` in pascals
/// * `constants` - Sea-water density and gravity
///
/// # Errors
///
/// Returns an error if the constants are not positive or the field has no
/// time steps. Missing samples are never an error: they come out as NaN.
pub fn compute_ibe(
    pressure: ArrayView3<'_, f64>,
    constants: &PhysicalConstants,
) -> Result<Array3<f64>> {
    compute_ibe_with_reference(pressure, ReferencePressure::Climatological, constants)
}

/// Same as [`compute_ibe`] with an explicit reference pressure policy
///
/// # Errors
///
/// Returns an error if the constants are not positive or the field has no
/// time steps.
pub fn compute_ibe_with_reference(
    pressure: ArrayView3<'_, f64>,
    reference: ReferencePressure,
    constants: &PhysicalConstants,
) -> Result<Array3<f64>> {
    constants.validate()?;
    let p_ref = reference.resolve(pressure)?;

    let mut ibe = pressure.to_owned();
    apply_correction(ibe.view_mut(), p_ref.view(), constants)?;
    Ok(ibe)
}

/// Entry point for arrays of unknown rank
///
/// # Errors
///
/// Returns [`IbeError::ShapeMismatch`] unless the input is exactly 3-D, plus
/// the errors of [`compute_ibe`].
pub fn compute_ibe_dyn(
    pressure: ArrayViewD<'_, f64>,
    constants: &PhysicalConstants,
) -> Result<ArrayD<f64>> {
    let ndim = pressure.ndim();
    let pressure = pressure
        .into_dimensionality::<Ix3>()
        .map_err(|_| IbeError::shape_mismatch("pressure field rank", 3, ndim))?;
    Ok(compute_ibe(pressure, constants)?.into_dyn())
}

/// Replace a `(time, lat, lon)` slab of pressures by its correction, in place
///
/// Used by the streaming conversion, where `reference` has been computed
/// beforehand from the whole field.
///
/// # Errors
///
/// Returns [`IbeError::ShapeMismatch`] if the reference grid differs from
/// the slab grid, or an error if the constants are invalid.
pub fn apply_correction(
    mut slab: ArrayViewMut3<'_, f64>,
    reference: ArrayView2<'_, f64>,
    constants: &PhysicalConstants,
) -> Result<()> {
    constants.validate()?;
    let (_, n_lat, n_lon) = slab.dim();
    if reference.dim() != (n_lat, n_lon) {
        return Err(IbeError::shape_mismatch(
            "reference pressure",
            (n_lat, n_lon),
            reference.dim(),
        ));
    }

    let scale = constants.scale();
    for mut step in slab.axis_iter_mut(Axis(0)) {
        Zip::from(&mut step)
            .and(&reference)
            .par_for_each(|h, &p_ref| *h = scale * (*h - p_ref));
    }
    Ok(())
}
