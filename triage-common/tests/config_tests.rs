//! Tests for settings persistence and configuration path resolution
//!
//! Tests that manipulate TRIAGE_SETTINGS or TRIAGE_CONFIG are marked with
//! #[serial] so they never run in parallel.

use std::env;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;
use triage_common::config::{
    resolve_config_path, resolve_settings_path, TomlConfig, CONFIG_ENV_VAR, SETTINGS_ENV_VAR,
};
use triage_common::{ClassOfInterest, Error, Settings, SettingsCandidate, ValidationError};

fn candidate() -> SettingsCandidate {
    SettingsCandidate {
        host: "192.168.1.20".to_string(),
        port: "4000".to_string(),
        image_formats: "jpg gif".to_string(),
        min_file_size: "0".to_string(),
        min_probability: "75".to_string(),
        classes_of_interest: vec![
            ClassOfInterest::new("person", true),
            ClassOfInterest::new("knife", true),
            ClassOfInterest::new("car", false),
        ],
    }
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load(&dir.path().join("absent.json")).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_apply_then_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("settings.json");

    let applied = Settings::apply(&candidate(), &path).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let loaded = Settings::load(&path).unwrap();
    assert_eq!(loaded, applied);
    assert_eq!(loaded.server.address(), "192.168.1.20:4000");
    assert_eq!(loaded.classes_of_interest[2], ClassOfInterest::new("car", false));
}

#[test]
fn test_persisted_document_shape() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    Settings::default().save(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["server"]["host"], "127.0.0.1");
    assert_eq!(json["server"]["port"], 1337);
    assert_eq!(json["minFileSize"], 5);
    assert_eq!(json["minProbability"], 50);
    assert_eq!(json["imageFormats"].as_array().unwrap().len(), 3);
    assert_eq!(json["classesOfInterest"].as_array().unwrap().len(), 80);
    assert!(json.get("serverReachable").is_none());
}

#[test]
fn test_save_refuses_settings_without_image_formats() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    let mut settings = Settings::default();
    settings.image_extensions.clear();

    match settings.save(&path) {
        Err(Error::Validation(ValidationError::NoImageFormats)) => {}
        other => panic!("Expected NoImageFormats, got {:?}", other),
    }
    assert!(!path.exists());
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn test_apply_rejects_invalid_candidate_without_writing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    let mut bad = candidate();
    bad.min_probability = "150".to_string();

    match Settings::apply(&bad, &path) {
        Err(Error::Validation(ValidationError::InvalidMinProbability(value))) => {
            assert_eq!(value, "150");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(!path.exists());
}

#[test]
fn test_load_rejects_out_of_range_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{
            "server": {"host": "127.0.0.1", "port": 70000},
            "imageFormats": ["jpg"],
            "minFileSize": 5,
            "minProbability": 50,
            "classesOfInterest": []
        }"#,
    )
    .unwrap();

    match Settings::load(&path) {
        Err(Error::Validation(ValidationError::InvalidPort(port))) => assert_eq!(port, "70000"),
        other => panic!("expected InvalidPort, got {:?}", other),
    }
}

#[test]
fn test_load_rejects_empty_image_formats() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{
            "server": {"host": "127.0.0.1", "port": 1337},
            "imageFormats": [],
            "minFileSize": 5,
            "minProbability": 50,
            "classesOfInterest": []
        }"#,
    )
    .unwrap();

    assert!(matches!(
        Settings::load(&path),
        Err(Error::Validation(ValidationError::NoImageFormats))
    ));
}

#[test]
fn test_load_malformed_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Settings::load(&path), Err(Error::Json(_))));
}

#[test]
fn test_toml_config_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig::load(&dir.path().join("missing.toml")).unwrap();
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.transport.max_resend_attempts, 5);
}

#[test]
fn test_toml_config_reads_sections() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("triage-ic.toml");
    std::fs::write(
        &path,
        r#"
settings_path = "/cases/42/image-classification.json"

[logging]
level = "debug"

[transport]
connect_timeout_ms = 1000
io_timeout_ms = 2000
max_resend_attempts = 3
resend_backoff_ms = 10
max_payload_bytes = 1048576
"#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.transport.connect_timeout_ms, 1000);
    assert_eq!(config.transport.io_timeout_ms, 2000);
    assert_eq!(config.transport.max_resend_attempts, 3);
    assert_eq!(config.transport.resend_backoff_ms, 10);
    assert_eq!(config.transport.max_payload_bytes, 1_048_576);
    assert_eq!(
        config.settings_path,
        Some(PathBuf::from("/cases/42/image-classification.json"))
    );
}

#[test]
fn test_toml_config_invalid_syntax() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[transport\nmax_resend_attempts = ").unwrap();
    assert!(matches!(TomlConfig::load(&path), Err(Error::Toml(_))));
}

#[test]
#[serial]
fn test_settings_path_env_overrides_toml() {
    env::set_var(SETTINGS_ENV_VAR, "/tmp/triage-env-settings.json");

    let config = TomlConfig {
        settings_path: Some(PathBuf::from("/tmp/triage-toml-settings.json")),
        ..Default::default()
    };
    let path = resolve_settings_path(None, &config).unwrap();
    assert_eq!(path, PathBuf::from("/tmp/triage-env-settings.json"));

    env::remove_var(SETTINGS_ENV_VAR);
}

#[test]
#[serial]
fn test_settings_path_toml_then_default() {
    env::remove_var(SETTINGS_ENV_VAR);

    let config = TomlConfig {
        settings_path: Some(PathBuf::from("/tmp/triage-toml-settings.json")),
        ..Default::default()
    };
    assert_eq!(
        resolve_settings_path(None, &config).unwrap(),
        PathBuf::from("/tmp/triage-toml-settings.json")
    );

    let default_path = resolve_settings_path(None, &TomlConfig::default()).unwrap();
    assert!(default_path.ends_with(Path::new("triage").join("image-classification.json")));
}

#[test]
#[serial]
fn test_config_path_resolution() {
    env::remove_var(CONFIG_ENV_VAR);
    let default_path = resolve_config_path(None).unwrap();
    assert!(default_path.ends_with(Path::new("triage").join("triage-ic.toml")));

    env::set_var(CONFIG_ENV_VAR, "/tmp/triage-env.toml");
    assert_eq!(resolve_config_path(None).unwrap(), PathBuf::from("/tmp/triage-env.toml"));
    assert_eq!(
        resolve_config_path(Some(Path::new("/tmp/cli.toml"))).unwrap(),
        PathBuf::from("/tmp/cli.toml")
    );
    env::remove_var(CONFIG_ENV_VAR);
}
