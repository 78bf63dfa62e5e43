//! Input file inspection
//!
//! Prints what is about to be converted: the variables of the file, the grid
//! resolution and the packing of the pressure variable.

use crate::errors::Result;
use crate::netcdf_io::{Coordinates, PressureSource};
use netcdf::File;

/// Differences between consecutive values (the grid spacing)
///
/// Empty for fewer than two values.
pub fn resolution_deltas(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Smallest and largest spacing, or `None` for fewer than two values
pub fn delta_range(values: &[f64]) -> Option<(f64, f64)> {
    let deltas = resolution_deltas(values);
    if deltas.is_empty() {
        return None;
    }
    let min = deltas.iter().copied().fold(f64::INFINITY, f64::min);
    let max = deltas.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((min, max))
}

/// Prints the variables of a NetCDF file with their dimensions.
pub fn print_variables(file: &File) {
    println!("\n===== Variables =====");
    for var in file.variables() {
        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| format!("{}[{}]", d.name(), d.len()))
            .collect();
        let data_type = format!("{:?}", var.vartype()).to_lowercase();
        println!("- {} {} ({})", var.name(), data_type, dims.join(", "));
    }
}

fn print_deltas(label: &str, values: &[f64]) {
    let deltas = resolution_deltas(values);
    match delta_range(values) {
        None => println!("{label}: (single value)"),
        Some((min, max)) if (max - min).abs() <= f64::EPSILON * max.abs().max(1.0) => {
            println!("{label}: {min} (uniform, {} steps)", deltas.len());
        }
        Some((min, max)) if deltas.len() <= 20 => {
            println!("{label}: {deltas:?} (min {min}, max {max})");
        }
        Some((min, max)) => {
            println!("{label}: min {min}, max {max} over {} steps", deltas.len());
        }
    }
}

/// Prints the summary shown before a conversion
///
/// # Errors
///
/// Returns an error if the pressure variable cannot be read.
pub fn print_input_summary(source: &PressureSource, coordinates: &Coordinates) -> Result<()> {
    print_variables(source.file());

    let lon = coordinates.longitude.to_vec();
    let lat = coordinates.latitude.to_vec();
    let time = coordinates.time.to_vec();

    println!("\n===== Resolution =====");
    print_deltas("delta lon (deg)", &lon);
    print_deltas("delta lat (deg)", &lat);
    print_deltas("delta time (hours)", &time);

    let grid = source.grid();
    match (time.first(), time.last()) {
        (Some(first), Some(last)) => {
            println!("time steps: {} ({first} .. {last})", grid.n_time);
        }
        _ => println!("time steps: {}", grid.n_time),
    }

    let pressure = source.pressure_variable()?;
    let packing = source.packing();
    println!(
        "\n{} pressure: {:?} [{} x {} x {}]",
        pressure.name(),
        pressure.vartype(),
        grid.n_time,
        grid.n_lat,
        grid.n_lon
    );
    println!("scale_factor: {}", packing.scale_factor);
    println!("add_offset: {}", packing.add_offset);
    match packing.missing_value {
        Some(missing) => println!("missing_value: {missing}"),
        None => println!("missing_value: (none)"),
    }
    if let Some(fill) = packing.fill_value {
        println!("_FillValue: {fill}");
    }

    Ok(())
}
