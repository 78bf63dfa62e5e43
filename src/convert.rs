//! SLP file to IBE file conversion
//!
//! Two passes over the pressure field, one time slab at a time: the first
//! accumulates the climatological mean at every location, the second applies
//! the correction and writes it out. Only one slab and the 2-D reference are
//! ever held in memory.

use crate::config::ConversionConfig;
use crate::errors::Result;
use crate::ibe::{apply_correction, ReferencePressure, TemporalMean};
use crate::metadata::print_input_summary;
use crate::netcdf_io::{Coordinates, GridShape, IbeWriter, PressureSource};
use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};

/// What a finished conversion produced
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub output: PathBuf,
    pub grid: GridShape,
    /// NaN samples in the input field
    pub missing_cells: usize,
    /// Locations whose whole series is missing; only known when the
    /// climatological reference was computed
    pub empty_columns: Option<usize>,
}

/// Convert the sea-level pressure file of `config` into an IBE file
///
/// # Errors
///
/// Fails on invalid settings, a missing input file or variable, a pressure
/// field that is not 3-D, or any read/write error. No output file is left
/// behind on failure.
pub fn convert(config: &ConversionConfig) -> Result<ConversionReport> {
    config.validate()?;
    let output = config.output_path()?;

    println!("loading SLP file ...");
    let source = PressureSource::open(&config.input, &config.variables)?;
    let coordinates = source.coordinates()?;
    print_input_summary(&source, &coordinates)?;

    let grid = source.grid();
    let (reference, empty_columns) = reference_pressure(&source, config)?;

    println!("\nconverting SLP to IBE ...");
    let missing_cells = write_output(&source, &coordinates, &output, &reference, config)?;

    println!("Output file: {}", output.display());

    Ok(ConversionReport {
        output,
        grid,
        missing_cells,
        empty_columns,
    })
}

/// Create the output file and fill it; the file is removed again if any
/// step fails. Returns the NaN input count.
fn write_output(
    source: &PressureSource,
    coordinates: &Coordinates,
    output: &Path,
    reference: &Array2<f64>,
    config: &ConversionConfig,
) -> Result<usize> {
    let mut writer = match IbeWriter::create(output, source, coordinates, config) {
        Ok(writer) => writer,
        Err(e) => {
            discard_partial_output(output);
            return Err(e);
        }
    };
    match write_corrections(source, &mut writer, reference, config) {
        Ok(missing) => {
            writer.finish();
            Ok(missing)
        }
        Err(e) => {
            discard_partial_output(&writer.finish());
            Err(e)
        }
    }
}

fn discard_partial_output(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("Could not remove partial output {}: {}", path.display(), e);
        }
    }
}

/// First pass: the 2-D reference and, for the climatological mean, the
/// number of all-missing locations
fn reference_pressure(
    source: &PressureSource,
    config: &ConversionConfig,
) -> Result<(Array2<f64>, Option<usize>)> {
    let grid = source.grid();
    match config.reference {
        ReferencePressure::Constant(pa) => {
            log::info!("Using constant reference pressure {pa} Pa");
            Ok((Array2::from_elem((grid.n_lat, grid.n_lon), pa), None))
        }
        ReferencePressure::Climatological => {
            let mut mean = TemporalMean::new(grid.n_lat, grid.n_lon);
            for steps in grid.time_slabs(config.chunk_steps) {
                log::debug!("Accumulating reference over time steps {steps:?}");
                let slab = source.read_slab(steps)?;
                mean.accumulate(slab.view())?;
            }

            let empty = mean.empty_columns();
            if empty > 0 {
                log::warn!("{empty} locations have no valid pressure sample; their IBE is NaN");
            }
            Ok((mean.finish(), Some(empty)))
        }
    }
}

/// Second pass: correct each slab and write it; returns the NaN input count
fn write_corrections(
    source: &PressureSource,
    writer: &mut IbeWriter,
    reference: &Array2<f64>,
    config: &ConversionConfig,
) -> Result<usize> {
    let mut missing = 0;
    for steps in source.grid().time_slabs(config.chunk_steps) {
        log::debug!("Writing IBE for time steps {steps:?}");
        let start = steps.start;
        let mut slab = source.read_slab(steps)?;
        missing += slab.iter().filter(|p| p.is_nan()).count();
        apply_correction(slab.view_mut(), reference.view(), &config.constants)?;
        writer.write_slab(start, slab.view())?;
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IbeError;
    use ndarray::{Array1, Array3};
    use tempfile::tempdir;

    fn write_small_field(path: &Path) -> Result<()> {
        let mut file = netcdf::create(path)?;
        file.add_dimension("time", 3)?;
        file.add_dimension("latitude", 2)?;
        file.add_dimension("longitude", 2)?;
        for (name, values) in [("longitude", [10.0, 11.0]), ("latitude", [-60.0, -61.0])] {
            let mut var = file.add_variable::<f64>(name, &[name])?;
            var.put(Array1::from(values.to_vec()).view(), ..)?;
        }
        let mut time = file.add_variable::<f64>("time", &["time"])?;
        time.put(Array1::from(vec![0.0, 3.0, 6.0]).view(), ..)?;
        let mut msl = file.add_variable::<f64>("msl", &["time", "latitude", "longitude"])?;
        let field = Array3::from_shape_fn((3, 2, 2), |(t, y, x)| {
            100_000.0 + 100.0 * t as f64 + 10.0 * y as f64 + x as f64
        });
        msl.put(field.view(), ..)?;
        Ok(())
    }

    #[test]
    fn test_failed_write_removes_output() -> Result<()> {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let input = temp_dir.path().join("SLP_small.nc");
        write_small_field(&input)?;

        let config = ConversionConfig::new(&input).with_chunk_steps(2);
        let source = PressureSource::open(&input, &config.variables)?;
        let coordinates = source.coordinates()?;
        let output = config.output_path()?;

        // The file is created, then the first slab fails to correct
        let wrong_reference = Array2::<f64>::zeros((1, 1));
        match write_output(&source, &coordinates, &output, &wrong_reference, &config) {
            Err(IbeError::ShapeMismatch { .. }) => {}
            other => panic!("Expected ShapeMismatch error, got {other:?}"),
        }
        assert!(!output.exists());

        let reference = Array2::<f64>::from_elem((2, 2), 100_100.0);
        let missing = write_output(&source, &coordinates, &output, &reference, &config)?;
        assert_eq!(missing, 0);
        assert!(output.exists());
        Ok(())
    }

    #[test]
    fn test_discard_partial_output() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("IBE_partial.h5");
        std::fs::write(&path, b"partial").expect("write");

        discard_partial_output(&path);
        assert!(!path.exists());

        // Nothing to remove is not an error
        discard_partial_output(&path);
    }
}
