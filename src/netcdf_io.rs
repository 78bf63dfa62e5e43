//! NetCDF I/O: decoded pressure reads and compressed IBE output
//!
//! [`PressureSource`] is the reading layer. It checks the layout of the input
//! file once, then hands out coordinates and time slabs of pressure already
//! decoded to pascals (scale factor and offset applied, sentinels replaced by
//! NaN). [`IbeWriter`] produces a chunked, deflate-compressed netCDF-4 file
//! with the `lon`, `lat`, `time` and `ibe` datasets.

use crate::config::{ConversionConfig, VariableNames};
use crate::errors::{IbeError, Result};
use chrono::Utc;
use ndarray::{Array1, Array3, ArrayView3};
use netcdf::{AttributeValue, File, FileMut, Variable};
use rayon::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::{fs, io};

/// Sizes of the `(time, lat, lon)` pressure grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub n_time: usize,
    pub n_lat: usize,
    pub n_lon: usize,
}

impl GridShape {
    /// Consecutive time ranges of at most `chunk_steps` steps
    pub fn time_slabs(&self, chunk_steps: usize) -> impl Iterator<Item = Range<usize>> {
        let n_time = self.n_time;
        let step = chunk_steps.max(1);
        (0..n_time)
            .step_by(step)
            .map(move |start| start..(start + step).min(n_time))
    }
}

/// Coordinate arrays, passed through to the output unchanged
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    /// Degrees
    pub longitude: Array1<f64>,
    /// Degrees
    pub latitude: Array1<f64>,
    /// As stored in the input (hours since 1900-01-01 for ERA-Interim)
    pub time: Array1<f64>,
}

/// Packing attributes of the pressure variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packing {
    pub scale_factor: f64,
    pub add_offset: f64,
    pub missing_value: Option<f64>,
    pub fill_value: Option<f64>,
}

impl Default for Packing {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            add_offset: 0.0,
            missing_value: None,
            fill_value: None,
        }
    }
}

impl Packing {
    /// Read the packing attributes of a variable, defaulting to identity
    pub fn from_variable(var: &Variable<'_>) -> Self {
        Self {
            scale_factor: attribute_f64(var, "scale_factor").unwrap_or(1.0),
            add_offset: attribute_f64(var, "add_offset").unwrap_or(0.0),
            missing_value: attribute_f64(var, "missing_value"),
            fill_value: attribute_f64(var, "_FillValue"),
        }
    }

    /// Raw stored value to physical value; sentinels become NaN
    ///
    /// Sentinels are compared against the raw value, before unpacking.
    #[must_use]
    pub fn decode(&self, raw: f64) -> f64 {
        if self.missing_value == Some(raw) || self.fill_value == Some(raw) {
            f64::NAN
        } else {
            raw * self.scale_factor + self.add_offset
        }
    }
}

/// Read the first value of a numeric attribute as f64
pub fn attribute_f64(var: &Variable<'_>, name: &str) -> Option<f64> {
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Uchar(v) => Some(f64::from(v)),
        AttributeValue::Schar(v) => Some(f64::from(v)),
        AttributeValue::Ushort(v) => Some(f64::from(v)),
        AttributeValue::Uint(v) => Some(f64::from(v)),
        AttributeValue::Doubles(v) => v.first().copied(),
        AttributeValue::Floats(v) => v.first().map(|&x| f64::from(x)),
        AttributeValue::Ints(v) => v.first().map(|&x| f64::from(x)),
        AttributeValue::Shorts(v) => v.first().map(|&x| f64::from(x)),
        _ => None,
    }
}

fn require_variable<'f>(file: &'f File, name: &str) -> Result<Variable<'f>> {
    file.variable(name)
        .ok_or_else(|| IbeError::VariableNotFound {
            var: name.to_string(),
        })
}

fn shape_of(var: &Variable<'_>) -> Vec<usize> {
    var.dimensions().iter().map(netcdf::Dimension::len).collect()
}

/// Read-only view of a sea-level pressure file
pub struct PressureSource {
    file: File,
    path: PathBuf,
    variables: VariableNames,
    grid: GridShape,
    packing: Packing,
}

impl std::fmt::Debug for PressureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PressureSource")
            .field("path", &self.path)
            .field("variables", &self.variables)
            .field("grid", &self.grid)
            .field("packing", &self.packing)
            .finish()
    }
}

impl PressureSource {
    /// Open a pressure file and check its layout
    ///
    /// # Errors
    ///
    /// Fails if the file does not exist or cannot be read, if one of the four
    /// variables is missing, if the pressure variable is not 3-D, or if a
    /// coordinate does not match the corresponding pressure dimension.
    pub fn open(path: impl AsRef<Path>, variables: &VariableNames) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IbeError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("input file {} does not exist", path.display()),
            )));
        }
        let file = netcdf::open(path)?;

        let (grid, packing) = {
            let pressure = require_variable(&file, &variables.pressure)?;
            let shape = shape_of(&pressure);
            let &[n_time, n_lat, n_lon] = shape.as_slice() else {
                return Err(IbeError::shape_mismatch(
                    format!("rank of '{}'", variables.pressure),
                    3,
                    shape.len(),
                ));
            };
            if n_time == 0 {
                return Err(IbeError::EmptyTimeAxis);
            }
            if n_lat == 0 || n_lon == 0 {
                return Err(IbeError::EmptyDimension {
                    var: variables.pressure.clone(),
                });
            }

            for (name, expected) in [
                (&variables.time, n_time),
                (&variables.latitude, n_lat),
                (&variables.longitude, n_lon),
            ] {
                let coord = require_variable(&file, name)?;
                let found = shape_of(&coord);
                if found != [expected] {
                    return Err(IbeError::shape_mismatch(
                        format!("coordinate '{name}'"),
                        [expected],
                        found,
                    ));
                }
            }

            (
                GridShape {
                    n_time,
                    n_lat,
                    n_lon,
                },
                Packing::from_variable(&pressure),
            )
        };

        log::debug!("Opened {} with grid {:?}, packing {:?}", path.display(), grid, packing);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            variables: variables.clone(),
            grid,
            packing,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying NetCDF file, for metadata inspection
    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn variables(&self) -> &VariableNames {
        &self.variables
    }

    pub fn grid(&self) -> GridShape {
        self.grid
    }

    pub fn packing(&self) -> &Packing {
        &self.packing
    }

    /// The pressure variable itself
    ///
    /// # Errors
    ///
    /// Returns [`IbeError::VariableNotFound`] if the variable disappeared.
    pub fn pressure_variable(&self) -> Result<Variable<'_>> {
        require_variable(&self.file, &self.variables.pressure)
    }

    /// Read lon, lat and time as stored
    ///
    /// # Errors
    ///
    /// Returns an error if a coordinate cannot be read.
    pub fn coordinates(&self) -> Result<Coordinates> {
        let read = |name: &str| -> Result<Array1<f64>> {
            let values = require_variable(&self.file, name)?.get_values::<f64, _>(..)?;
            Ok(Array1::from(values))
        };
        Ok(Coordinates {
            longitude: read(&self.variables.longitude)?,
            latitude: read(&self.variables.latitude)?,
            time: read(&self.variables.time)?,
        })
    }

    /// Decoded pressure [Pa] for a range of time steps
    ///
    /// # Errors
    ///
    /// Returns an error if the range lies outside the time axis or the read fails.
    pub fn read_slab(&self, steps: Range<usize>) -> Result<Array3<f64>> {
        let GridShape {
            n_time,
            n_lat,
            n_lon,
        } = self.grid;
        if steps.start > steps.end || steps.end > n_time {
            return Err(IbeError::ShapeMismatch {
                what: "time range".to_string(),
                expected: format!("within 0..{n_time}"),
                found: format!("{steps:?}"),
            });
        }

        let var = self.pressure_variable()?;
        let mut values = var.get_values::<f64, _>((steps.clone(), 0..n_lat, 0..n_lon))?;
        let packing = self.packing;
        values.par_iter_mut().for_each(|v| *v = packing.decode(*v));

        Ok(Array3::from_shape_vec((steps.len(), n_lat, n_lon), values)?)
    }

    /// Decoded pressure series [Pa] at one grid location
    ///
    /// # Errors
    ///
    /// Returns an error if the location is outside the grid or the read fails.
    pub fn read_column(&self, lat_index: usize, lon_index: usize) -> Result<Array1<f64>> {
        let GridShape {
            n_time,
            n_lat,
            n_lon,
        } = self.grid;
        if lat_index >= n_lat || lon_index >= n_lon {
            return Err(IbeError::ShapeMismatch {
                what: "grid location".to_string(),
                expected: format!("within ({n_lat}, {n_lon})"),
                found: format!("({lat_index}, {lon_index})"),
            });
        }

        let var = self.pressure_variable()?;
        let values = var.get_values::<f64, _>((
            0..n_time,
            lat_index..lat_index + 1,
            lon_index..lon_index + 1,
        ))?;
        Ok(values.into_iter().map(|v| self.packing.decode(v)).collect())
    }
}

/// Writer for the IBE product
pub struct IbeWriter {
    file: FileMut,
    path: PathBuf,
    grid: GridShape,
}

impl IbeWriter {
    /// Create the output file and write the coordinates
    ///
    /// An existing file at the output path is replaced. The `ibe` dataset is
    /// chunked one time step per chunk and filled by [`Self::write_slab`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or a dataset cannot be
    /// defined.
    pub fn create(
        path: &Path,
        source: &PressureSource,
        coordinates: &Coordinates,
        config: &ConversionConfig,
    ) -> Result<Self> {
        if path.exists() {
            fs::remove_file(path)?;
        }

        let grid = source.grid();
        let level = config.compression_level;
        let mut file = netcdf::create(path)?;

        file.add_dimension("lon", grid.n_lon)?;
        file.add_dimension("lat", grid.n_lat)?;
        file.add_dimension("time", grid.n_time)?;

        let names = source.variables();
        for (out_name, in_name, values) in [
            ("lon", &names.longitude, &coordinates.longitude),
            ("lat", &names.latitude, &coordinates.latitude),
            ("time", &names.time, &coordinates.time),
        ] {
            let mut var = file.add_variable::<f64>(out_name, &[out_name])?;
            var.set_chunking(&[values.len()])?;
            if level > 0 {
                var.set_compression(level, true)?;
            }
            let original = require_variable(source.file(), in_name)?;
            copy_attributes(&original, &mut var)?;
            var.put(values.view(), ..)?;
        }

        {
            let mut ibe = file.add_variable::<f64>("ibe", &["time", "lat", "lon"])?;
            ibe.set_chunking(&[1, grid.n_lat, grid.n_lon])?;
            if level > 0 {
                ibe.set_compression(level, true)?;
            }
            ibe.put_attribute("_FillValue", f64::NAN)?;
            ibe.put_attribute("units", "m")?;
            ibe.put_attribute("long_name", "inverse barometer effect")?;
            ibe.put_attribute("rho", config.constants.rho)?;
            ibe.put_attribute("g", config.constants.g)?;
            ibe.put_attribute("reference_pressure", config.reference.describe())?;
        }

        file.add_attribute(
            "history",
            format!("Created by slp2ibe on {}", Utc::now().to_rfc3339()),
        )?;
        file.add_attribute("source", source.path().display().to_string())?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            grid,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write IBE values for time steps `start..start + slab.len_of(time)`
    ///
    /// # Errors
    ///
    /// Returns an error if the slab does not fit the output grid or the write fails.
    pub fn write_slab(&mut self, start: usize, slab: ArrayView3<'_, f64>) -> Result<()> {
        let (steps, n_lat, n_lon) = slab.dim();
        if (n_lat, n_lon) != (self.grid.n_lat, self.grid.n_lon)
            || start + steps > self.grid.n_time
        {
            return Err(IbeError::shape_mismatch(
                format!("IBE slab at time step {start}"),
                (self.grid.n_time, self.grid.n_lat, self.grid.n_lon),
                (start + steps, n_lat, n_lon),
            ));
        }

        let mut var = self
            .file
            .variable_mut("ibe")
            .ok_or_else(|| IbeError::VariableNotFound {
                var: "ibe".to_string(),
            })?;
        var.put(slab, (start..start + steps, 0..n_lat, 0..n_lon))?;
        Ok(())
    }

    /// Close the file and return its path
    pub fn finish(self) -> PathBuf {
        let Self { file, path, .. } = self;
        drop(file);
        path
    }
}

/// Copy descriptive attributes; packing attributes are not meaningful on the
/// f64 output and are skipped
fn copy_attributes(from: &Variable<'_>, to: &mut netcdf::VariableMut<'_>) -> Result<()> {
    const SKIPPED: [&str; 4] = ["_FillValue", "missing_value", "scale_factor", "add_offset"];

    for attr in from.attributes().filter(|a| !SKIPPED.contains(&a.name())) {
        match attr.value()? {
            AttributeValue::Str(val) => {
                to.put_attribute(attr.name(), val)?;
            }
            AttributeValue::Strs(vals) => {
                to.put_attribute(attr.name(), vals)?;
            }
            AttributeValue::Float(val) => {
                to.put_attribute(attr.name(), val)?;
            }
            AttributeValue::Floats(vals) => {
                to.put_attribute(attr.name(), vals)?;
            }
            AttributeValue::Double(val) => {
                to.put_attribute(attr.name(), val)?;
            }
            AttributeValue::Doubles(vals) => {
                to.put_attribute(attr.name(), vals)?;
            }
            AttributeValue::Int(val) => {
                to.put_attribute(attr.name(), val)?;
            }
            AttributeValue::Ints(vals) => {
                to.put_attribute(attr.name(), vals)?;
            }
            AttributeValue::Short(val) => {
                to.put_attribute(attr.name(), val)?;
            }
            AttributeValue::Shorts(vals) => {
                to.put_attribute(attr.name(), vals)?;
            }
            _ => {
                log::warn!("Skipped unsupported attribute type for '{}'", attr.name());
            }
        }
    }
    Ok(())
}
