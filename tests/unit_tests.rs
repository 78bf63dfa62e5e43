//! Unit tests for the IBE transform, its configuration and helpers
//!
//! These run on in-memory arrays only; file-based behavior is covered in
//! `integration_test.rs`.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::{s, Array2, Array3, ArrayD, IxDyn};
use slp2ibe::{
    config::{derive_output_path, ConversionConfig},
    errors::IbeError,
    ibe::{
        apply_correction, compute_ibe, compute_ibe_dyn, compute_ibe_with_reference,
        temporal_nanmean, PhysicalConstants, ReferencePressure, TemporalMean,
        STANDARD_ATMOSPHERE_PA,
    },
    metadata::{delta_range, resolution_deltas},
    netcdf_io::Packing,
    parallel::ParallelConfig,
    probe::{nearest_index, nearest_longitude_index},
};
use std::path::{Path, PathBuf};

/// Smooth synthetic pressure field (time, lat, lon) around 1013 hPa
fn synthetic_pressure(n_time: usize, n_lat: usize, n_lon: usize) -> Array3<f64> {
    Array3::from_shape_fn((n_time, n_lat, n_lon), |(t, y, x)| {
        101_325.0
            + 800.0 * (t as f64 * 0.7).sin()
            + 150.0 * y as f64
            - 40.0 * x as f64
            + 3.0 * ((t * 7 + y * 3 + x) % 5) as f64
    })
}

#[test]
fn test_concrete_two_step_scenario() {
    let pressure = Array3::from_shape_vec(
        (2, 2, 2),
        vec![
            101_300.0, 101_300.0, 101_300.0, 101_300.0, // t = 0
            101_500.0, 101_500.0, 101_500.0, 101_500.0, // t = 1
        ],
    )
    .expect("valid shape");

    let reference = temporal_nanmean(pressure.view()).expect("reference");
    assert_eq!(reference, Array2::from_elem((2, 2), 101_400.0));

    let ibe = compute_ibe(pressure.view(), &PhysicalConstants::default()).expect("ibe");
    let expected = 100.0 / (1028.0 * 9.80665);
    for &h in ibe.slice(s![0, .., ..]).iter() {
        assert_relative_eq!(h, expected, max_relative = 1e-14);
        assert_abs_diff_eq!(h, 0.00992, epsilon = 1e-5);
    }
    for &h in ibe.slice(s![1, .., ..]).iter() {
        assert_relative_eq!(h, -expected, max_relative = 1e-14);
    }
}

#[test]
fn test_shape_is_preserved() {
    for &(t, y, x) in &[(1, 1, 1), (5, 3, 4), (12, 7, 2)] {
        let pressure = synthetic_pressure(t, y, x);
        let ibe = compute_ibe(pressure.view(), &PhysicalConstants::default()).expect("ibe");
        assert_eq!(ibe.shape(), pressure.shape());
    }
}

#[test]
fn test_output_columns_have_zero_mean() {
    let pressure = synthetic_pressure(24, 3, 5);
    let ibe = compute_ibe(pressure.view(), &PhysicalConstants::default()).expect("ibe");

    for y in 0..3 {
        for x in 0..5 {
            let column = ibe.slice(s![.., y, x]);
            let mean = column.sum() / column.len() as f64;
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_single_time_step_gives_zero_correction() {
    let pressure = synthetic_pressure(1, 2, 3);
    let ibe = compute_ibe(pressure.view(), &PhysicalConstants::default()).expect("ibe");
    assert!(ibe.iter().all(|&h| h == 0.0));
}

#[test]
fn test_scaling_law() {
    let pressure = synthetic_pressure(10, 4, 4);
    let a = PhysicalConstants::new(1028.0, 9.80665);
    let b = PhysicalConstants::new(1025.0, 9.81);

    let ibe_a = compute_ibe(pressure.view(), &a).expect("ibe a");
    let ibe_b = compute_ibe(pressure.view(), &b).expect("ibe b");
    let factor = (b.rho * b.g) / (a.rho * a.g);

    for (&ha, &hb) in ibe_a.iter().zip(ibe_b.iter()) {
        assert_relative_eq!(ha, hb * factor, epsilon = 1e-15, max_relative = 1e-12);
    }
}

#[test]
fn test_missing_values_propagate() {
    let mut pressure = synthetic_pressure(6, 2, 3);
    pressure[[2, 0, 1]] = f64::NAN;
    pressure[[4, 1, 2]] = f64::NAN;
    pressure.slice_mut(s![.., 1, 0]).fill(f64::NAN);

    let ibe = compute_ibe(pressure.view(), &PhysicalConstants::default()).expect("ibe");

    assert!(ibe[[2, 0, 1]].is_nan());
    assert!(ibe[[4, 1, 2]].is_nan());
    assert!(ibe.slice(s![.., 1, 0]).iter().all(|h| h.is_nan()));

    // Everything else stays defined
    let defined = ibe.iter().filter(|h| !h.is_nan()).count();
    assert_eq!(defined, ibe.len() - 2 - 6);

    // The remaining samples of a gappy column are still mean-zero
    let column: Vec<f64> = ibe
        .slice(s![.., 0, 1])
        .iter()
        .copied()
        .filter(|h| !h.is_nan())
        .collect();
    assert_abs_diff_eq!(column.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
}

#[test]
fn test_all_missing_column_gives_nan_reference() {
    let mut pressure = synthetic_pressure(3, 2, 2);
    pressure.slice_mut(s![.., 0, 0]).fill(f64::NAN);

    let reference = temporal_nanmean(pressure.view()).expect("reference");
    assert!(reference[[0, 0]].is_nan());
    assert!(reference[[1, 1]].is_finite());
}

#[test]
fn test_input_is_not_modified() {
    let pressure = synthetic_pressure(4, 2, 2);
    let before = pressure.clone();
    let _ = compute_ibe(pressure.view(), &PhysicalConstants::default()).expect("ibe");
    assert_eq!(pressure, before);
}

#[test]
fn test_rank_must_be_three() {
    let constants = PhysicalConstants::default();

    let flat = ArrayD::<f64>::from_elem(IxDyn(&[4, 3]), 101_325.0);
    match compute_ibe_dyn(flat.view(), &constants) {
        Err(IbeError::ShapeMismatch { expected, found, .. }) => {
            assert_eq!(expected, "3");
            assert_eq!(found, "2");
        }
        other => panic!("Expected ShapeMismatch error, got {other:?}"),
    }

    let four_d = ArrayD::<f64>::from_elem(IxDyn(&[2, 2, 2, 2]), 101_325.0);
    assert!(matches!(
        compute_ibe_dyn(four_d.view(), &constants),
        Err(IbeError::ShapeMismatch { .. })
    ));

    let three_d = synthetic_pressure(3, 2, 2).into_dyn();
    let ibe = compute_ibe_dyn(three_d.view(), &constants).expect("3-D input");
    assert_eq!(ibe.shape(), &[3, 2, 2]);
}

#[test]
fn test_empty_time_axis_is_rejected() {
    let pressure = Array3::<f64>::zeros((0, 2, 2));
    assert!(matches!(
        compute_ibe(pressure.view(), &PhysicalConstants::default()),
        Err(IbeError::EmptyTimeAxis)
    ));
}

#[test]
fn test_invalid_constants_are_rejected() {
    let pressure = synthetic_pressure(2, 1, 1);
    for (constants, name) in [
        (PhysicalConstants::new(0.0, 9.8), "rho"),
        (PhysicalConstants::new(-1028.0, 9.8), "rho"),
        (PhysicalConstants::new(f64::NAN, 9.8), "rho"),
        (PhysicalConstants::new(1028.0, 0.0), "g"),
        (PhysicalConstants::new(1028.0, f64::INFINITY), "g"),
    ] {
        match compute_ibe(pressure.view(), &constants) {
            Err(IbeError::InvalidConstant { name: found, .. }) => assert_eq!(found, name),
            other => panic!("Expected InvalidConstant for {name}, got {other:?}"),
        }
    }
}

#[test]
fn test_constant_reference_pressure() {
    let pressure = synthetic_pressure(5, 2, 3);
    let constants = PhysicalConstants::default();
    let ibe = compute_ibe_with_reference(
        pressure.view(),
        ReferencePressure::Constant(STANDARD_ATMOSPHERE_PA),
        &constants,
    )
    .expect("ibe");

    for (&h, &p) in ibe.iter().zip(pressure.iter()) {
        assert_relative_eq!(h, constants.scale() * (p - STANDARD_ATMOSPHERE_PA), max_relative = 1e-14);
    }

    // Default policy is the climatological mean
    assert_eq!(ReferencePressure::default(), ReferencePressure::Climatological);
    let default = compute_ibe(pressure.view(), &constants).expect("default");
    let explicit =
        compute_ibe_with_reference(pressure.view(), ReferencePressure::Climatological, &constants)
            .expect("explicit");
    assert_eq!(default, explicit);
}

#[test]
fn test_streaming_mean_matches_in_memory_mean() {
    let mut pressure = synthetic_pressure(11, 3, 4);
    pressure[[3, 1, 1]] = f64::NAN;
    pressure[[7, 2, 0]] = f64::NAN;
    let in_memory = temporal_nanmean(pressure.view()).expect("reference");

    for chunk in [1, 2, 3, 5, 11, 20] {
        let mut mean = TemporalMean::new(3, 4);
        let mut start = 0;
        while start < 11 {
            let end = (start + chunk).min(11);
            mean.accumulate(pressure.slice(s![start..end, .., ..]))
                .expect("accumulate");
            start = end;
        }
        assert_eq!(mean.steps(), 11);
        assert_eq!(mean.missing_cells(), 2);
        assert_eq!(mean.empty_columns(), 0);
        assert_eq!(mean.finish(), in_memory, "chunk size {chunk}");
    }
}

#[test]
fn test_mean_is_stable_for_large_offsets() {
    // Small anomalies on top of a large baseline must not be swamped
    let n_time = 10_000;
    let pressure = Array3::from_shape_fn((n_time, 1, 1), |(t, _, _)| {
        1.0e8 + if t % 2 == 0 { 0.1 } else { -0.1 }
    });
    let reference = temporal_nanmean(pressure.view()).expect("reference");
    assert_abs_diff_eq!(reference[[0, 0]], 1.0e8, epsilon = 1e-7);
}

#[test]
fn test_infinite_sums_stay_infinite() {
    // Overflowing sum: the mean is +inf, not inf - inf = NaN
    let overflow = Array3::from_shape_vec((2, 1, 1), vec![f64::MAX, f64::MAX]).expect("shape");
    let reference = temporal_nanmean(overflow.view()).expect("reference");
    assert_eq!(reference[[0, 0]], f64::INFINITY);

    // An infinite sample is data, not a gap
    let spike = Array3::from_shape_vec((3, 1, 1), vec![1.0, f64::INFINITY, 2.0]).expect("shape");
    let reference = temporal_nanmean(spike.view()).expect("reference");
    assert_eq!(reference[[0, 0]], f64::INFINITY);

    let ibe = compute_ibe(spike.view(), &PhysicalConstants::default()).expect("ibe");
    assert_eq!(ibe[[0, 0, 0]], f64::INFINITY);
    assert!(ibe[[1, 0, 0]].is_nan());
    assert_eq!(ibe[[2, 0, 0]], f64::INFINITY);
}

#[test]
fn test_accumulator_rejects_other_grid() {
    let mut mean = TemporalMean::new(2, 3);
    let slab = synthetic_pressure(2, 3, 2);
    assert!(matches!(
        mean.accumulate(slab.view()),
        Err(IbeError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_apply_correction_in_place() {
    let pressure = synthetic_pressure(6, 2, 2);
    let constants = PhysicalConstants::default();
    let reference = temporal_nanmean(pressure.view()).expect("reference");

    let mut slab = pressure.slice(s![2..4, .., ..]).to_owned();
    apply_correction(slab.view_mut(), reference.view(), &constants).expect("correction");

    let full = compute_ibe(pressure.view(), &constants).expect("ibe");
    assert_eq!(slab, full.slice(s![2..4, .., ..]));

    let wrong_reference = Array2::<f64>::zeros((3, 2));
    assert!(matches!(
        apply_correction(slab.view_mut(), wrong_reference.view(), &constants),
        Err(IbeError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_constants_scale() {
    let constants = PhysicalConstants::default();
    assert_eq!(constants.rho, 1028.0);
    assert_eq!(constants.g, 9.80665);
    assert_relative_eq!(constants.scale(), -1.0 / (1028.0 * 9.80665));
    // About -1 cm per hPa
    assert_abs_diff_eq!(constants.scale() * 100.0, -0.0099, epsilon = 1e-4);
}

#[test]
fn test_derive_output_path() {
    assert_eq!(
        derive_output_path(Path::new("SLP_antarctica_3h_19900101_20170331.nc")),
        PathBuf::from("IBE_antarctica_3h_19900101_20170331.h5")
    );
    assert_eq!(
        derive_output_path(Path::new("/data/SLP_dir/SLP_era.nc")),
        PathBuf::from("/data/SLP_dir/IBE_era.h5")
    );
    assert_eq!(
        derive_output_path(Path::new("pressure.nc4")),
        PathBuf::from("pressure.h5")
    );
}

#[test]
fn test_config_validation() {
    let config = ConversionConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(
        config.output_path().expect("derived"),
        PathBuf::from("IBE_antarctica_3h_19900101_20170331.h5")
    );

    let same = ConversionConfig::new("field.h5");
    assert!(matches!(same.validate(), Err(IbeError::InvalidConfig(_))));

    let explicit = ConversionConfig::new("in.nc").with_output("in.nc");
    assert!(matches!(explicit.validate(), Err(IbeError::InvalidConfig(_))));

    let zero_chunks = ConversionConfig::new("in.nc").with_chunk_steps(0);
    assert!(matches!(zero_chunks.validate(), Err(IbeError::InvalidConfig(_))));

    let mut bad_level = ConversionConfig::new("in.nc");
    bad_level.compression_level = 10;
    assert!(matches!(bad_level.validate(), Err(IbeError::InvalidConfig(_))));

    let bad_rho = ConversionConfig::new("in.nc").with_constants(PhysicalConstants::new(0.0, 9.8));
    assert!(matches!(bad_rho.validate(), Err(IbeError::InvalidConstant { .. })));

    let bad_reference =
        ConversionConfig::new("in.nc").with_reference(ReferencePressure::Constant(f64::NAN));
    assert!(matches!(bad_reference.validate(), Err(IbeError::InvalidConfig(_))));
    assert!(matches!(bad_reference.validate_physics(), Err(IbeError::InvalidConfig(_))));
}

#[test]
fn test_physics_validation_ignores_output_settings() {
    // A point lookup writes nothing, so an input already named *.h5 is fine
    let config = ConversionConfig::new("field.h5").with_chunk_steps(0);
    assert!(config.validate().is_err());
    assert!(config.validate_physics().is_ok());

    let bad_g =
        ConversionConfig::new("field.h5").with_constants(PhysicalConstants::new(1028.0, -9.8));
    match bad_g.validate_physics() {
        Err(IbeError::InvalidConstant { name, .. }) => assert_eq!(name, "g"),
        other => panic!("Expected InvalidConstant for g, got {other:?}"),
    }
}

#[test]
fn test_resolution_deltas() {
    assert!(resolution_deltas(&[]).is_empty());
    assert!(resolution_deltas(&[1.0]).is_empty());
    assert_eq!(resolution_deltas(&[0.0, 0.75, 1.5, 3.0]), vec![0.75, 0.75, 1.5]);
    assert_eq!(delta_range(&[0.0, 3.0, 9.0]), Some((3.0, 6.0)));
    assert_eq!(delta_range(&[5.0]), None);
}

#[test]
fn test_nearest_index() {
    let lon = [-180.0, -90.0, 0.0, 90.0];
    assert_eq!(nearest_index(&lon, -62.5), Some(1));
    assert_eq!(nearest_index(&lon, 80.0), Some(3));
    assert_eq!(nearest_index(&lon, -500.0), Some(0));
    assert_eq!(nearest_index(&[f64::NAN, 2.0], 0.0), Some(1));
    assert_eq!(nearest_index(&[], 0.0), None);
}

#[test]
fn test_nearest_longitude_wraps() {
    let signed = [-180.0, -90.0, -62.5, 0.0, 90.0];
    assert_eq!(nearest_longitude_index(&signed, 297.5), Some(2));
    assert_eq!(nearest_longitude_index(&signed, -62.5), Some(2));
    assert_eq!(nearest_longitude_index(&signed, 179.0), Some(0));

    let east = [0.0, 90.0, 180.0, 297.5, 350.0];
    assert_eq!(nearest_longitude_index(&east, -62.5), Some(3));
    assert_eq!(nearest_longitude_index(&east, -8.0), Some(4));
    assert_eq!(nearest_longitude_index(&east, 358.0), Some(0));

    assert_eq!(nearest_longitude_index(&[f64::NAN, 10.0], 0.0), Some(1));
    assert_eq!(nearest_longitude_index(&[], 0.0), None);
}

#[test]
fn test_packing_decode() {
    let packing = Packing {
        scale_factor: 0.5,
        add_offset: 100_000.0,
        missing_value: Some(-32767.0),
        fill_value: Some(-32000.0),
    };
    assert_eq!(packing.decode(0.0), 100_000.0);
    assert_eq!(packing.decode(-400.0), 99_800.0);
    assert_eq!(packing.decode(2650.0), 101_325.0);
    assert!(packing.decode(-32767.0).is_nan());
    assert!(packing.decode(-32000.0).is_nan());
    // Neighbours of the sentinels are ordinary data
    assert_eq!(packing.decode(-32766.0), 100_000.0 - 16_383.0);
    assert_eq!(packing.decode(-31999.0), 100_000.0 - 15_999.5);

    let fill_only = Packing {
        fill_value: Some(-32000.0),
        ..Packing::default()
    };
    assert!(fill_only.decode(-32000.0).is_nan());
    assert_eq!(fill_only.decode(-32767.0), -32767.0);

    assert_eq!(Packing::default().decode(101_325.0), 101_325.0);
}

#[test]
fn test_error_messages() {
    let var_err = IbeError::VariableNotFound {
        var: "msl".to_string(),
    };
    assert!(format!("{var_err}").contains("Variable 'msl' not found"));

    let constant_err = IbeError::InvalidConstant {
        name: "rho",
        value: -1.0,
    };
    assert!(format!("{constant_err}").contains("rho = -1"));

    let netcdf_err = IbeError::NetCDF(netcdf::Error::NotFound("msl".to_string()));
    assert!(format!("{netcdf_err}").contains("NetCDF error"));
}

#[test]
fn test_parallel_config() {
    let default_config = ParallelConfig::default();
    assert!(default_config.num_threads.is_none());
    assert!(default_config.setup_global_pool().is_ok());

    let all_cores = ParallelConfig::all_cores();
    assert_eq!(all_cores.num_threads, Some(num_cpus::get()));
    assert!(all_cores.num_threads.unwrap_or(0) > 0);

    assert!(matches!(
        ParallelConfig::new(Some(0)).setup_global_pool(),
        Err(IbeError::ThreadPool(_))
    ));
}
