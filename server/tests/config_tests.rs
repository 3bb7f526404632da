use std::path::PathBuf;

use server::config::{ServerConfig, DEFAULT_CONFIG_PATH};
use wire::CodecLimits;

fn shipped_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/wire.toml")
}

#[test]
fn test_load_shipped_config() {
    let config = ServerConfig::load_from_file(shipped_config()).expect("Failed to load config");

    assert_eq!(config.limits, CodecLimits::default());
    assert_eq!(config.logging.filter, "info");
}

#[test]
fn test_default_path_points_at_shipped_config() {
    assert!(DEFAULT_CONFIG_PATH.ends_with("config/wire.toml"));
}

#[test]
fn test_invalid_config_path() {
    let result = ServerConfig::load_from_file("nonexistent/config.toml");
    assert!(result.is_err());
}

#[test]
fn test_missing_config_falls_back_to_defaults() {
    let config =
        ServerConfig::load_or_default("nonexistent/config.toml").expect("defaults expected");
    assert_eq!(config, ServerConfig::default());
}

#[test]
fn test_malformed_config_is_an_error() {
    let path = std::env::temp_dir().join(format!("wire-config-{}.toml", std::process::id()));
    std::fs::write(&path, "[limits\nmax_command_size = 1").expect("write temp config");

    let result = ServerConfig::load_or_default(&path);
    std::fs::remove_file(&path).ok();

    let err = result.expect_err("malformed config must not load");
    assert!(err.to_string().contains("failed to parse"));
}
