//! Entry point for slp2ibe.
//! Parses the command line, then either probes one grid point or converts the whole file.

use clap::Parser;
use log::LevelFilter;
use slp2ibe::convert::convert;
use slp2ibe::netcdf_io::PressureSource;
use slp2ibe::parallel::ParallelConfig;
use slp2ibe::probe::probe_point;

mod cli;

use cli::Args;

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let parallel = match args.threads {
        Some(n) => ParallelConfig::new(Some(n)),
        None => ParallelConfig::all_cores(),
    };
    parallel.setup_global_pool()?;
    let config = args.to_config();

    if let Some((lon, lat)) = args.probe {
        config.validate_physics()?;
        let source = PressureSource::open(&config.input, &config.variables)?;
        probe_point(&source, lon, lat, config.reference, &config.constants)?.print();
        return Ok(());
    }

    let report = convert(&config)?;
    log::info!(
        "Wrote {} x {} x {} IBE grid ({} missing samples)",
        report.grid.n_time,
        report.grid.n_lat,
        report.grid.n_lon,
        report.missing_cells
    );

    Ok(())
}
