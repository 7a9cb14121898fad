//! Configuration tests
//!
//! The serialized template must parse back into the same configuration,
//! and every layer (env, file, default) must win in the documented order.

use super::*;
use std::collections::HashMap;

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

/// Verify that the serialized default config parses back to itself.
#[test]
fn test_config_roundtrip_default() {
    let config = Config::default();
    let toml_str = config.to_toml();

    let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
    assert!(
        parsed.is_ok(),
        "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
        toml_str,
        parsed.err()
    );

    let resolved = Config::resolve(parsed.unwrap(), no_env).unwrap();
    assert_eq!(resolved, config);
}

#[test]
fn test_config_roundtrip_customized() {
    let mut config = Config::default();
    config.api_url = "http://localhost:9000/api".to_string();
    config.request_timeout_secs = 3;
    config.search_debounce_ms = 120;
    config.logging.level = "debug".to_string();
    config.logging.file_enabled = true;
    config.logging.file_rotation = LogRotation::Hourly;

    let file: FileConfig = toml::from_str(&config.to_toml()).unwrap();
    assert_eq!(Config::resolve(file, no_env).unwrap(), config);
}

// ─────────────────────────────────────────────────────────────────────────────
// Precedence tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_defaults_when_nothing_configured() {
    let config = Config::resolve(FileConfig::default(), no_env).unwrap();
    assert_eq!(config.api_url, DEFAULT_API_URL);
    assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    assert_eq!(config.search_debounce_ms, DEFAULT_SEARCH_DEBOUNCE_MS);
    assert_eq!(config.logging, LoggingConfig::default());
}

#[test]
fn test_file_overrides_defaults() {
    let file: FileConfig = toml::from_str(
        r#"
api_url = "http://file.example/api"
search_debounce_ms = 250

[logging]
level = "warn"
"#,
    )
    .unwrap();

    let config = Config::resolve(file, no_env).unwrap();
    assert_eq!(config.api_url, "http://file.example/api");
    assert_eq!(config.search_debounce_ms, 250);
    assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    assert_eq!(config.logging.level, "warn");
    assert!(!config.logging.file_enabled);
}

#[test]
fn test_env_overrides_file() {
    let file: FileConfig = toml::from_str(
        r#"
api_url = "http://file.example/api"
request_timeout_secs = 10
"#,
    )
    .unwrap();

    let env = env_from(&[
        ("RICKDEX_API_URL", "http://env.example/api"),
        ("RICKDEX_TIMEOUT_SECS", "2"),
    ]);

    let config = Config::resolve(file, env).unwrap();
    assert_eq!(config.api_url, "http://env.example/api");
    assert_eq!(config.request_timeout_secs, 2);
}

#[test]
fn test_invalid_env_number_is_an_error() {
    let env = env_from(&[("RICKDEX_SEARCH_DEBOUNCE_MS", "soon")]);
    assert!(Config::resolve(FileConfig::default(), env).is_err());
}

#[test]
fn test_invalid_file_is_an_error() {
    let path = std::env::temp_dir().join(format!("rickdex-bad-config-{}.toml", std::process::id()));
    std::fs::write(&path, "api_url = [not toml").unwrap();

    let result = Config::load_file_config(&path);
    let _ = std::fs::remove_file(&path);

    assert!(result.is_err());
}

#[test]
fn test_missing_file_uses_defaults() {
    let path = std::env::temp_dir().join("rickdex-definitely-missing-config.toml");
    let file = Config::load_file_config(&path).unwrap();
    assert!(file.api_url.is_none());
    assert!(file.logging.is_none());
}

#[test]
fn test_log_rotation_parse() {
    assert_eq!(LogRotation::parse("HOURLY"), LogRotation::Hourly);
    assert_eq!(LogRotation::parse("never"), LogRotation::Never);
    assert_eq!(LogRotation::parse("weekly"), LogRotation::Daily);
}

#[test]
fn test_unknown_log_level_falls_back_to_default() {
    let file: FileConfig = toml::from_str("[logging]\nlevel = \"LOUD\"\n").unwrap();
    let config = Config::resolve(file, no_env).unwrap();
    assert_eq!(config.logging.level, "info");

    let file: FileConfig = toml::from_str("[logging]\nlevel = \"WARN\"\n").unwrap();
    let config = Config::resolve(file, no_env).unwrap();
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_log_rotation_maps_to_appender_rotation() {
    use tracing_appender::rolling::Rotation;

    assert_eq!(LogRotation::Hourly.rotation(), Rotation::HOURLY);
    assert_eq!(LogRotation::default().rotation(), Rotation::DAILY);
    assert_eq!(LogRotation::Never.rotation(), Rotation::NEVER);
}
