//! Creates a small ERA-Interim-like sea-level pressure file for trying slp2ibe.
//!
//! The pressure is packed as i16 with `scale_factor`, `add_offset` and
//! `missing_value`, like the ECMWF products, and a few samples are missing.

use ndarray::{Array1, Array3};
use netcdf::create;
use std::path::Path;

const SCALE: f64 = 0.2;
const OFFSET: f64 = 100_000.0;
const MISSING: i16 = -32767;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = Path::new("SLP_demo_3h_20070101_20070131.nc");

    println!("🔨 Creating test SLP file: {}", output_path.display());

    if output_path.exists() {
        std::fs::remove_file(output_path)?
    }

    let mut file = create(output_path)?;

    file.add_attribute("title", "Synthetic mean sea level pressure")?;
    file.add_attribute("created_by", "create_test_slp.rs")?;

    let n_time = 248; // 31 days at 3 h
    let n_lat = 21;
    let n_lon = 40;

    file.add_dimension("time", n_time)?;
    file.add_dimension("latitude", n_lat)?;
    file.add_dimension("longitude", n_lon)?;

    {
        let mut lon_var = file.add_variable::<f32>("longitude", &["longitude"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        lon_var.put_attribute("long_name", "longitude")?;
        let lon = Array1::from_iter((0..n_lon).map(|i| -90.0 + i as f32 * 0.75));
        lon_var.put(lon.view(), ..)?;
    }

    {
        let mut lat_var = file.add_variable::<f32>("latitude", &["latitude"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        lat_var.put_attribute("long_name", "latitude")?;
        let lat = Array1::from_iter((0..n_lat).map(|j| -60.0 - j as f32 * 0.75));
        lat_var.put(lat.view(), ..)?;
    }

    {
        let mut time_var = file.add_variable::<i32>("time", &["time"])?;
        time_var.put_attribute("units", "hours since 1900-01-01 00:00:0.0")?;
        time_var.put_attribute("long_name", "time")?;
        time_var.put_attribute("calendar", "gregorian")?;
        // 2007-01-01 00:00
        let time = Array1::from_iter((0..n_time as i32).map(|t| 937_080 + 3 * t));
        time_var.put(time.view(), ..)?;
    }

    {
        let mut msl_var = file.add_variable::<i16>("msl", &["time", "latitude", "longitude"])?;
        msl_var.put_attribute("units", "Pa")?;
        msl_var.put_attribute("long_name", "Mean sea level pressure")?;
        msl_var.put_attribute("standard_name", "air_pressure_at_mean_sea_level")?;
        msl_var.put_attribute("scale_factor", SCALE)?;
        msl_var.put_attribute("add_offset", OFFSET)?;
        msl_var.put_attribute("missing_value", MISSING)?;

        // A low passing eastward every ~5 days on top of a meridional gradient
        let packed = Array3::from_shape_fn((n_time, n_lat, n_lon), |(t, j, i)| {
            if (t + 3 * i + 7 * j) % 997 == 0 {
                return MISSING;
            }
            let phase = 2.0 * std::f64::consts::PI * (t as f64 / 40.0 - i as f64 / n_lon as f64);
            let pressure = 98_500.0 - 60.0 * j as f64 + 1_200.0 * phase.cos();
            ((pressure - OFFSET) / SCALE).round() as i16
        });
        msl_var.put(packed.view(), ..)?;
    }

    println!("✅ Successfully created test SLP file with:");
    println!("   📏 Dimensions: time({n_time}), latitude({n_lat}), longitude({n_lon})");
    println!("   📈 Variables: longitude, latitude, time, msl (packed i16)");
    println!("\n🧪 Convert it with:");
    println!("   cargo run -- {}", output_path.display());
    println!("   cargo run -- {} --probe=-60:-67.5", output_path.display());

    Ok(())
}
