//! Integration tests for launchpad-config

use launchpad_config::*;
use std::env;
use std::io::Write;

fn write_file(name: &str, content: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    dir
}

#[test]
fn test_toml_file_then_env_override() {
    let dir = write_file(
        "launchpad.toml",
        r#"
            batch_size = 20
            from_address = "Launchpad <hello@launchpad.dev>"
            retry_patterns = ["rate limit", "overloaded"]
        "#,
    );

    unsafe {
        env::set_var("LPTEST_ONE_BATCH_SIZE", "40");
    }

    let manager = ConfigManager::with_prefix("LPTEST_ONE");
    manager.load_file(dir.path().join("launchpad.toml")).unwrap();
    manager.load_env().unwrap();
    let config = manager.load_validated().unwrap();

    assert_eq!(config.batch_size, 40);
    assert_eq!(config.from_address, "Launchpad <hello@launchpad.dev>");
    assert_eq!(
        config.retry_patterns,
        Some(vec!["rate limit".to_string(), "overloaded".to_string()])
    );

    unsafe {
        env::remove_var("LPTEST_ONE_BATCH_SIZE");
    }
}

#[test]
fn test_dotenv_file_does_not_touch_process_env() {
    let dir = write_file(
        "custom.env",
        "LPTEST_TWO_MAX_ATTEMPTS=5\nLPTEST_TWO_SEND_MODE=concurrent\nUNRELATED=1\n",
    );

    let manager = ConfigManager::with_prefix("LPTEST_TWO");
    let loaded = manager
        .load_dotenv(Some(&dir.path().join("custom.env")))
        .unwrap();
    assert!(loaded);

    let config = manager.load_validated().unwrap();
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.send_mode, "concurrent");
    assert!(!manager.has("unrelated"));
    assert!(env::var("LPTEST_TWO_MAX_ATTEMPTS").is_err());
}

#[test]
fn test_invalid_values_fail_validation() {
    let dir = write_file("bad.json", r#"{"max_attempts": 0}"#);

    let manager = ConfigManager::new();
    manager.load_file(dir.path().join("bad.json")).unwrap();

    let err = manager.load_validated().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_missing_file_is_load_error() {
    let manager = ConfigManager::new();
    let err = manager.load_file("/nonexistent/launchpad.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Unreadable(_)));
}

#[test]
fn test_env_loader_with_prefix() {
    let loader = EnvLoader::new(Some("LPTEST_THREE".to_string()));

    unsafe {
        env::set_var("LPTEST_THREE_FROM_ADDRESS", "ops@launchpad.dev");
    }

    assert_eq!(loader.load_var("from_address").unwrap(), "ops@launchpad.dev");

    unsafe {
        env::remove_var("LPTEST_THREE_FROM_ADDRESS");
    }
}
