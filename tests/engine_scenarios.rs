//! Scenarios against a real CHX build.
//!
//! Run with `CHX_EXE=/path/to/chx cargo test -- --ignored`.

use std::path::PathBuf;
use std::time::Duration;

use chx_harness::config::HarnessConfig;
use chx_harness::process::ProcessRunner;
use chx_harness::scenario::{CASTLING, EN_PASSANT};

fn engine_config() -> HarnessConfig {
    let exe = std::env::var_os("CHX_EXE")
        .map(PathBuf::from)
        .expect("CHX_EXE must point at a built chx executable");
    HarnessConfig::default()
        .with_current_exe(exe)
        .with_scratch_dir(std::env::temp_dir())
        .with_timeout(Some(Duration::from_secs(30)))
}

#[test]
#[ignore = "needs a built engine in CHX_EXE"]
fn en_passant_capture() {
    let config = engine_config();
    let runner = ProcessRunner::from_config(&config);
    if let Err(e) = EN_PASSANT.run(&runner, &config) {
        panic!("{e}");
    }
}

#[test]
#[ignore = "needs a built engine in CHX_EXE"]
fn queenside_castling() {
    let config = engine_config();
    let runner = ProcessRunner::from_config(&config);
    if let Err(e) = CASTLING.run(&runner, &config) {
        panic!("{e}");
    }
}
