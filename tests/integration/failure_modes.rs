//! Failure scenarios: configuration errors, missing or short files, and
//! parameter-coupling mismatches between the two phases.

use std::fs;

use crossrep_rs::master::write_master;
use crossrep_rs::params::Params;
use crossrep_rs::{
    run_gather, run_scatter, ConfigError, GatherConfig, MapFileError, MasterFileError, RunError,
    ScatterConfig,
};

use crate::support::TempDir;

fn gather_config(tmp: &TempDir, params: &Params, ns: u64, test_len: u64) -> GatherConfig {
    GatherConfig {
        master_path: tmp.join("master.bin"),
        map_path: tmp.join(&params.map_file_name()),
        reference_len: ns,
        test_len,
        demo: false,
        pin_cores: None,
        params: params.clone(),
    }
}

#[test]
fn short_test_stream_is_a_config_error() {
    // Two batches cannot fill the three-stage pipeline.
    let tmp = TempDir::new("s4").unwrap();
    let params = Params::custom(5, 10, 1_000_003, 67, 8192).unwrap();
    let err = run_gather(&gather_config(&tmp, &params, 8192, 2 * 8192)).unwrap_err();
    assert!(matches!(
        err,
        RunError::Config(ConfigError::BatchCountTooSmall { batches: 2 })
    ));
    assert_eq!(err.exit_code(), 10);
}

#[test]
fn mismatched_shingle_length_degenerates_the_filter() {
    // Gather forced onto a map scattered with a different L (bypassing the
    // file-name coupling): the hashes no longer line up and the dense map
    // passes nearly everything.
    let tmp = TempDir::new("s5_degenerate").unwrap();
    let bs = 1024;
    let ns = 3 * bs as u64 + 7;
    // Tiny common modulus so ~3000 reference shingles saturate the map.
    let params_l5 = Params::custom(5, 10, 401, 67, bs).unwrap();
    write_master(&tmp.join("master.bin"), 2 * ns, 0xC0FFEE).unwrap();

    run_scatter(&ScatterConfig {
        master_path: tmp.join("master.bin"),
        map_path: tmp.join("map.bin"),
        reference_len: ns,
        seed: Some(11),
        demo: false,
        pin_cores: None,
        params: params_l5,
    })
    .unwrap();

    let params_l6 = Params::custom(6, 10, 401, 67, bs).unwrap();
    let gather = run_gather(&GatherConfig {
        master_path: tmp.join("master.bin"),
        map_path: tmp.join("map.bin"),
        reference_len: ns,
        test_len: ns,
        demo: false,
        pin_cores: None,
        params: params_l6,
    })
    .unwrap();

    assert!(
        gather.filtration_ratio() > 0.5,
        "filtration ratio {} should be degenerate",
        gather.filtration_ratio()
    );
}

#[test]
fn mismatched_parameters_miss_the_map_file() {
    // Under normal naming the coupling is caught at open time: an L = 6
    // gather looks for v1_map_67_6.txt, which an L = 5 scatter never wrote.
    let tmp = TempDir::new("s5_name").unwrap();
    let bs = 1024;
    let ns = 4 * bs as u64;
    let params_l5 = Params::custom(5, 10, 1_000_003, 67, bs).unwrap();
    write_master(&tmp.join("master.bin"), 2 * ns, 0xC0DE).unwrap();

    run_scatter(&ScatterConfig {
        master_path: tmp.join("master.bin"),
        map_path: tmp.join(&params_l5.map_file_name()),
        reference_len: ns,
        seed: Some(11),
        demo: false,
        pin_cores: None,
        params: params_l5,
    })
    .unwrap();

    let params_l6 = Params::custom(6, 10, 1_000_003, 67, bs).unwrap();
    let err = run_gather(&gather_config(&tmp, &params_l6, ns, ns)).unwrap_err();
    assert!(matches!(err, RunError::Map(MapFileError::Open(_))));
    assert_eq!(err.exit_code(), 15);
}

#[test]
fn truncated_map_file_is_rejected() {
    let tmp = TempDir::new("short_map").unwrap();
    let params = Params::custom(5, 10, 1_000_003, 67, 1024).unwrap();
    let ns = 4 * 1024;
    write_master(&tmp.join("master.bin"), 2 * ns, 0xFACE).unwrap();
    fs::write(tmp.join(&params.map_file_name()), [0u8; 32]).unwrap();

    let err = run_gather(&gather_config(&tmp, &params, ns, ns)).unwrap_err();
    assert!(matches!(err, RunError::Map(MapFileError::TooShort { .. })));
    assert_eq!(err.exit_code(), 16);
}

#[test]
fn missing_master_file_fails_scatter() {
    let tmp = TempDir::new("no_master").unwrap();
    let params = Params::custom(5, 10, 1_000_003, 67, 1024).unwrap();
    let err = run_scatter(&ScatterConfig {
        master_path: tmp.join("absent.bin"),
        map_path: tmp.join(&params.map_file_name()),
        reference_len: 4 * 1024,
        seed: Some(1),
        demo: false,
        pin_cores: None,
        params,
    })
    .unwrap_err();
    assert!(matches!(err, RunError::Master(MasterFileError::Open(_))));
    assert_eq!(err.exit_code(), 12);
}

#[test]
fn short_master_file_fails_both_phases() {
    let tmp = TempDir::new("short_master").unwrap();
    let params = Params::custom(5, 10, 1_000_003, 67, 1024).unwrap();
    let ns = 4 * 1024;
    write_master(&tmp.join("master.bin"), ns, 0xFADE).unwrap();

    let err = run_scatter(&ScatterConfig {
        master_path: tmp.join("master.bin"),
        map_path: tmp.join(&params.map_file_name()),
        reference_len: ns + 1,
        seed: Some(1),
        demo: false,
        pin_cores: None,
        params: params.clone(),
    })
    .unwrap_err();
    assert!(matches!(
        err,
        RunError::Master(MasterFileError::TooSmall { .. })
    ));
    assert_eq!(err.exit_code(), 13);

    // Gather needs ns + NS bytes; the file only covers ns.
    let err = run_gather(&gather_config(&tmp, &params, ns, ns)).unwrap_err();
    assert!(matches!(
        err,
        RunError::Master(MasterFileError::TooSmall { .. })
    ));
    assert_eq!(err.exit_code(), 13);
}
