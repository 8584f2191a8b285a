//! Tests for configuration loading and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate MOODWAVE_* or *_API_KEY variables are marked with
//! #[serial] so they run sequentially.

use moodwave_common::config::{
    is_valid_key, load_or_default, load_toml_config, resolve_api_key, resolve_config_path,
    resolve_root_folder, write_toml_config, TomlConfig, CONFIG_ENV_VAR, ROOT_FOLDER_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_load_full_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("moodwave.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/moodwave"

[logging]
level = "debug"
file = "/tmp/moodwave.log"

[generation]
provider = "mureka"
mock = true
listen_before_generate_ms = 4000

[api_keys]
mureka = "mk-123"

[location]
latitude = 1.29
longitude = 103.85
news_country = "sg"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/moodwave")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.max_file_bytes, 1024 * 1024);
    assert_eq!(config.generation.provider, "mureka");
    assert!(config.generation.mock);
    assert_eq!(config.generation.listen_before_generate_ms, 4000);
    assert_eq!(config.generation.poll_interval_ms, 5000);
    assert_eq!(config.api_keys.mureka.as_deref(), Some("mk-123"));
    assert_eq!(config.location.news_country, "sg");
}

#[test]
fn test_invalid_toml_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[generation\nprovider = ").unwrap();

    assert!(load_toml_config(&path).is_err());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = load_or_default(Some(&missing));
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_write_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("moodwave.toml");

    let mut config = TomlConfig::default();
    config.generation.provider = "replicate".to_string();
    config.providers.replicate_version = "abc123".to_string();

    write_toml_config(&config, &path).unwrap();
    assert!(path.exists());

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded.generation.provider, "replicate");
    assert_eq!(loaded.providers.replicate_version, "abc123");
}

#[test]
#[serial]
fn test_config_path_cli_beats_env() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");

    let cli = PathBuf::from("/from/cli.toml");
    assert_eq!(resolve_config_path(Some(&cli)), Some(cli.clone()));
    assert_eq!(
        resolve_config_path(None),
        Some(PathBuf::from("/from/env.toml"))
    );

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_root_folder_priority() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    let mut config = TomlConfig::default();
    config.root_folder = Some(PathBuf::from("/toml/root"));

    // TOML beats the platform default
    assert_eq!(
        resolve_root_folder(None, &config),
        PathBuf::from("/toml/root")
    );

    // ENV beats TOML
    env::set_var(ROOT_FOLDER_ENV_VAR, "/env/root");
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/env/root"));

    // CLI beats everything
    let cli = PathBuf::from("/cli/root");
    assert_eq!(resolve_root_folder(Some(&cli), &config), cli);

    env::remove_var(ROOT_FOLDER_ENV_VAR);

    // Nothing configured: non-empty platform default
    let fallback = resolve_root_folder(None, &TomlConfig::default());
    assert!(!fallback.as_os_str().is_empty());
}

#[test]
#[serial]
fn test_api_key_env_beats_toml() {
    env::set_var("MOODWAVE_TEST_API_KEY", "  env-key ");
    assert_eq!(
        resolve_api_key("MOODWAVE_TEST_API_KEY", Some("toml-key")),
        Some("env-key".to_string())
    );

    // Blank ENV value is treated as absent
    env::set_var("MOODWAVE_TEST_API_KEY", "   ");
    assert_eq!(
        resolve_api_key("MOODWAVE_TEST_API_KEY", Some("toml-key")),
        Some("toml-key".to_string())
    );

    env::remove_var("MOODWAVE_TEST_API_KEY");
    assert_eq!(resolve_api_key("MOODWAVE_TEST_API_KEY", Some("")), None);
    assert_eq!(resolve_api_key("MOODWAVE_TEST_API_KEY", None), None);
}

#[test]
fn test_key_validation() {
    assert!(is_valid_key("sk-live"));
    assert!(!is_valid_key(" "));
}
