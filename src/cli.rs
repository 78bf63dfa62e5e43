//! Defines command-line interface options using `clap` for slp2ibe.

use clap::Parser;
use slp2ibe::config::{ConversionConfig, VariableNames, DEFAULT_CHUNK_STEPS, DEFAULT_INPUT};
use slp2ibe::ibe::{PhysicalConstants, ReferencePressure, DEFAULT_G, DEFAULT_RHO};
use std::path::PathBuf;

/// Convert sea-level pressure [Pa] to the Inverse Barometer Effect [m]
#[derive(Parser, Debug)]
#[command(
    version,
    name = "slp2ibe",
    about = "Convert a NetCDF sea-level pressure product into an IBE correction grid",
    after_help = "Example: slp2ibe SLP_antarctica_3h_19900101_20171031.nc"
)]
pub struct Args {
    /// Sea-level pressure NetCDF file
    #[arg(default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Output file. Defaults to the input name with SLP_ -> IBE_ and a .h5 extension
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Sea-water density [kg/m3]
    #[arg(long, default_value_t = DEFAULT_RHO)]
    pub rho: f64,

    /// Gravitational acceleration [m/s2]
    #[arg(long = "gravity", short = 'g', default_value_t = DEFAULT_G)]
    pub g: f64,

    /// Use one constant reference pressure [Pa] instead of the climatological mean
    #[arg(long)]
    pub reference_pressure: Option<f64>,

    /// Longitude variable name
    #[arg(long, default_value = "longitude")]
    pub lon_var: String,

    /// Latitude variable name
    #[arg(long, default_value = "latitude")]
    pub lat_var: String,

    /// Time variable name
    #[arg(long, default_value = "time")]
    pub time_var: String,

    /// Sea-level pressure variable name
    #[arg(long, default_value = "msl")]
    pub msl_var: String,

    /// Time steps read per slab; bounds memory use
    #[arg(long, default_value_t = DEFAULT_CHUNK_STEPS)]
    pub chunk_steps: usize,

    /// Deflate level of the output datasets (0-9)
    #[arg(long, default_value_t = 9)]
    pub compression_level: i32,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Print the IBE series at the grid point nearest to <lon>:<lat> and exit
    #[arg(long, value_parser = parse_probe_arg, allow_hyphen_values = true)]
    pub probe: Option<(f64, f64)>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Settings for the conversion routine
    pub fn to_config(&self) -> ConversionConfig {
        ConversionConfig {
            input: self.input.clone(),
            output: self.output.clone(),
            variables: VariableNames {
                longitude: self.lon_var.clone(),
                latitude: self.lat_var.clone(),
                time: self.time_var.clone(),
                pressure: self.msl_var.clone(),
            },
            constants: PhysicalConstants::new(self.rho, self.g),
            reference: self
                .reference_pressure
                .map_or(ReferencePressure::Climatological, ReferencePressure::Constant),
            chunk_steps: self.chunk_steps,
            compression_level: self.compression_level,
        }
    }
}

fn parse_probe_arg(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split(':').collect();
    match parts.as_slice() {
        [lon, lat] => {
            let lon = lon
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid longitude '{lon}'"))?;
            let lat = lat
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid latitude '{lat}'"))?;
            Ok((lon, lat))
        }
        _ => Err("Invalid format: Expected '<lon>:<lat>'.".to_string()),
    }
}
