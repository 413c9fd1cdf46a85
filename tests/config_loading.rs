// tests/config_loading.rs

use std::{fs, path::PathBuf, time::Duration};

use agent::config::{CollectorsConfig, ConfigError, DatabaseConfig, load};
use agent::events::SourceKind;

fn shipped_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.toml")
}

#[test]
fn shipped_config_matches_built_in_defaults() {
    let cfg = load(&shipped_config()).expect("config.toml must load");

    assert_eq!(cfg.collectors, CollectorsConfig::default());
    assert_eq!(cfg.database.synchronous, DatabaseConfig::default().synchronous);
    assert_eq!(cfg.database.checkpoint_interval, Duration::from_secs(300));
    assert_eq!(cfg.database.ttl, None);
    assert_eq!(cfg.collectors.enabled().count(), SourceKind::ALL.len());
}

#[test]
fn custom_file_is_loaded_and_validated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.toml");
    fs::write(
        &path,
        r#"
        [database]
        ttl = "7d"

        [collectors]
        buffer_capacity = 500
        restart_on_exit = true

        [collectors.execsnoop]
        enabled = false
        "#,
    )
    .unwrap();

    let cfg = load(&path).unwrap();
    assert_eq!(cfg.database.ttl, Some(Duration::from_secs(7 * 24 * 3600)));
    assert_eq!(cfg.collectors.buffer_capacity, 500);
    assert!(cfg.collectors.restart_on_exit);
    assert!(!cfg.collectors.source(SourceKind::Execsnoop).unwrap().enabled);
}

#[test]
fn invalid_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("nope.toml");
    assert!(matches!(load(&missing), Err(ConfigError::Io(_))));

    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "[collectors\nbuffer_capacity = 1").unwrap();
    assert!(matches!(load(&broken), Err(ConfigError::Toml(_))));

    let zero = dir.path().join("zero.toml");
    fs::write(&zero, "[collectors]\nbuffer_capacity = 0").unwrap();
    assert!(matches!(load(&zero), Err(ConfigError::ZeroCapacity)));
}
