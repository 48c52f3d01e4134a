//! Integration tests for configuration persistence

use std::path::PathBuf;

use cab::core::config::{BuildRecord, CabConfig};
use cab::infra::dirs::CabDirs;
use tempfile::TempDir;

fn scratch_dirs() -> (TempDir, CabDirs) {
    let tmp = TempDir::new().unwrap();
    let dirs = CabDirs::at(tmp.path().to_path_buf());
    (tmp, dirs)
}

#[test]
fn test_fresh_setup_has_no_config_and_no_builds() {
    let (_tmp, dirs) = scratch_dirs();
    assert!(!CabConfig::exists(&dirs));
    assert!(BuildRecord::list(&dirs).unwrap().is_empty());
}

#[test]
fn test_records_survive_a_reload() {
    let (_tmp, dirs) = scratch_dirs();

    let record = BuildRecord {
        name: "demo".to_string(),
        vendor: "acme".to_string(),
        release: "v1".to_string(),
        sources: PathBuf::from("/src/demo"),
        with_debug: true,
        with_tests: false,
    };
    record.create(&dirs).unwrap();

    let loaded = BuildRecord::load(&dirs, "demo").unwrap();
    assert_eq!(loaded.vendor, "acme");
    assert!(loaded.with_debug);
    assert_eq!(BuildRecord::list(&dirs).unwrap(), vec!["demo"]);

    BuildRecord::remove(&dirs, "demo").unwrap();
    assert!(BuildRecord::list(&dirs).unwrap().is_empty());
}

#[test]
fn test_global_config_round_trip_via_dirs() {
    let (_tmp, dirs) = scratch_dirs();

    let config = CabConfig {
        installs_dir: Some(PathBuf::from("/data/installs")),
        ..CabConfig::default()
    };
    config.save(&dirs).unwrap();

    assert!(CabConfig::exists(&dirs));
    let loaded = CabConfig::load(&dirs).unwrap();
    assert_eq!(
        loaded.install_dir_for("demo").unwrap(),
        PathBuf::from("/data/installs/demo")
    );
}
