//! Reference pressure: the baseline the pressure anomaly is measured against
//!
//! The default baseline is the climatological mean at each grid point, i.e.
//! the temporal mean of the pressure series ignoring missing (NaN) samples.
//! [`TemporalMean`] computes it incrementally so that a field too large for
//! memory can be fed one time slab at a time; the result does not depend on
//! how the field is split.

use crate::errors::{IbeError, Result};
use ndarray::{Array2, ArrayView3, Axis, Zip};

/// Mean sea-level pressure of the standard atmosphere [Pa]
pub const STANDARD_ATMOSPHERE_PA: f64 = 101_325.0;

/// How `P_ref` is obtained
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReferencePressure {
    /// Per-location temporal mean of the input field
    #[default]
    Climatological,
    /// One constant for every location [Pa]
    Constant(f64),
}

impl ReferencePressure {
    /// Human-readable description, stored as an attribute of the output
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Climatological => "climatological mean at each location".to_string(),
            Self::Constant(pa) => format!("constant {pa} Pa"),
        }
    }

    /// Build the 2-D reference for an in-memory pressure field
    ///
    /// # Errors
    ///
    /// Returns [`IbeError::EmptyTimeAxis`] if the field has no time steps.
    pub fn resolve(&self, pressure: ArrayView3<'_, f64>) -> Result<Array2<f64>> {
        match *self {
            Self::Climatological => temporal_nanmean(pressure),
            Self::Constant(pa) => {
                let (n_time, n_lat, n_lon) = pressure.dim();
                if n_time == 0 {
                    return Err(IbeError::EmptyTimeAxis);
                }
                Ok(Array2::from_elem((n_lat, n_lon), pa))
            }
        }
    }
}

/// NaN-ignoring mean over axis 0 of a `(time, lat, lon)` field
///
/// A location whose whole series is NaN gets a NaN reference.
///
/// # Errors
///
/// Returns [`IbeError::EmptyTimeAxis`] if the field has no time steps.
pub fn temporal_nanmean(pressure: ArrayView3<'_, f64>) -> Result<Array2<f64>> {
    let (n_time, n_lat, n_lon) = pressure.dim();
    if n_time == 0 {
        return Err(IbeError::EmptyTimeAxis);
    }
    let mut mean = TemporalMean::new(n_lat, n_lon);
    mean.accumulate(pressure)?;
    Ok(mean.finish())
}

/// Streaming per-cell mean over time
///
/// Sums use Neumaier compensation; each cell is reduced in time order, and
/// cells are processed in parallel.
#[derive(Debug, Clone)]
pub struct TemporalMean {
    sum: Array2<f64>,
    compensation: Array2<f64>,
    count: Array2<usize>,
    steps: usize,
}

impl TemporalMean {
    /// Empty accumulator for an `n_lat x n_lon` grid
    #[must_use]
    pub fn new(n_lat: usize, n_lon: usize) -> Self {
        Self {
            sum: Array2::zeros((n_lat, n_lon)),
            compensation: Array2::zeros((n_lat, n_lon)),
            count: Array2::zeros((n_lat, n_lon)),
            steps: 0,
        }
    }

    /// Add a `(time, lat, lon)` slab; slabs must arrive in time order
    ///
    /// # Errors
    ///
    /// Returns [`IbeError::ShapeMismatch`] if the slab grid differs from the
    /// accumulator grid.
    pub fn accumulate(&mut self, slab: ArrayView3<'_, f64>) -> Result<()> {
        let (steps, n_lat, n_lon) = slab.dim();
        if (n_lat, n_lon) != self.sum.dim() {
            return Err(IbeError::shape_mismatch(
                "pressure slab grid",
                self.sum.dim(),
                (n_lat, n_lon),
            ));
        }

        Zip::from(&mut self.sum)
            .and(&mut self.compensation)
            .and(&mut self.count)
            .and(slab.lanes(Axis(0)))
            .par_for_each(|sum, compensation, count, series| {
                for &p in series {
                    if p.is_nan() {
                        continue;
                    }
                    let t = *sum + p;
                    // Past overflow or an infinite sample the sum is exact
                    // already; compensating would give inf - inf
                    if t.is_finite() {
                        if sum.abs() >= p.abs() {
                            *compensation += (*sum - t) + p;
                        } else {
                            *compensation += (p - t) + *sum;
                        }
                    }
                    *sum = t;
                    *count += 1;
                }
            });

        self.steps += steps;
        Ok(())
    }

    /// Number of time steps seen so far
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Number of NaN samples seen so far
    #[must_use]
    pub fn missing_cells(&self) -> usize {
        self.steps * self.count.len() - self.count.sum()
    }

    /// Number of locations without a single valid sample
    #[must_use]
    pub fn empty_columns(&self) -> usize {
        self.count.iter().filter(|&&n| n == 0).count()
    }

    /// Per-cell mean; NaN where no valid sample was seen
    #[must_use]
    pub fn finish(self) -> Array2<f64> {
        Zip::from(&self.sum)
            .and(&self.compensation)
            .and(&self.count)
            .map_collect(|&sum, &compensation, &count| {
                if count == 0 {
                    f64::NAN
                } else if sum.is_finite() {
                    (sum + compensation) / count as f64
                } else {
                    sum / count as f64
                }
            })
    }
}
