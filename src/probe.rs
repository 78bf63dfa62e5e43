//! Point diagnostic
//!
//! Looks up the grid point nearest to a longitude/latitude and returns its
//! IBE time series, for checking a downloaded pressure product against
//! known plots (e.g. Larsen-C at 297.5E, 67.5S) before converting the whole
//! field. Nothing is written.

use crate::errors::{IbeError, Result};
use crate::ibe::{compute_ibe_with_reference, PhysicalConstants, ReferencePressure};
use crate::netcdf_io::PressureSource;
use ndarray::Array1;

/// Hours in a 365-day year
const HOURS_PER_YEAR: f64 = 8760.0;

/// IBE series at one grid location
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSeries {
    pub lat_index: usize,
    pub lon_index: usize,
    /// Grid longitude actually used [deg]
    pub longitude: f64,
    /// Grid latitude actually used [deg]
    pub latitude: f64,
    /// Time coordinate as stored
    pub time: Array1<f64>,
    /// IBE [m]
    pub ibe: Array1<f64>,
}

impl ProbeSeries {
    /// Print one line per time step; hours since 1900 are also shown as
    /// fractional years
    pub fn print(&self) {
        println!(
            "\n IBE at ({}, {}) [index {}, {}]",
            self.longitude, self.latitude, self.lon_index, self.lat_index
        );
        println!("==============================");
        for (t, h) in self.time.iter().zip(self.ibe.iter()) {
            println!("   {t:>12.1}  {:>10.4}  {h:>9.4} m", t / HOURS_PER_YEAR + 1900.0);
        }
    }
}

/// Index of the value closest to `target`; NaN entries are ignored
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
        .map(|(i, _)| i)
}

/// Index of the longitude closest to `target`, comparing on the circle so
/// that 297.5 and -62.5 are the same meridian; NaN entries are ignored
pub fn nearest_longitude_index(longitudes: &[f64], target: f64) -> Option<usize> {
    let distance = |lon: f64| {
        let d = (lon - target).rem_euclid(360.0);
        d.min(360.0 - d)
    };
    longitudes
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .min_by(|(_, a), (_, b)| distance(**a).total_cmp(&distance(**b)))
        .map(|(i, _)| i)
}

/// IBE series at the grid point nearest to (`longitude`, `latitude`)
///
/// The reference is resolved for that point the same way the full conversion
/// resolves it, so the series matches the converted file.
///
/// # Errors
///
/// Returns an error for invalid constants, an empty coordinate or a failed read.
pub fn probe_point(
    source: &PressureSource,
    longitude: f64,
    latitude: f64,
    reference: ReferencePressure,
    constants: &PhysicalConstants,
) -> Result<ProbeSeries> {
    let coordinates = source.coordinates()?;
    let names = source.variables();

    let lon_index = nearest_longitude_index(&coordinates.longitude.to_vec(), longitude)
        .ok_or_else(|| IbeError::EmptyDimension {
            var: names.longitude.clone(),
        })?;
    let lat_index = nearest_index(&coordinates.latitude.to_vec(), latitude).ok_or_else(|| {
        IbeError::EmptyDimension {
            var: names.latitude.clone(),
        }
    })?;

    let pressure = source.read_column(lat_index, lon_index)?;
    let n_time = pressure.len();
    let column = pressure.into_shape((n_time, 1, 1))?;
    let ibe =
        compute_ibe_with_reference(column.view(), reference, constants)?.into_shape(n_time)?;

    Ok(ProbeSeries {
        lat_index,
        lon_index,
        longitude: coordinates.longitude[lon_index],
        latitude: coordinates.latitude[lat_index],
        time: coordinates.time,
        ibe,
    })
}
