use super::common::ContentCache;
use cache_snapshot::{PersistOutcome, PersistenceConfig, PersistencePolicy, ReplaceMode};
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all CACHE_SNAPSHOT_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("CACHE_SNAPSHOT_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("persistence.toml");

    let toml_content = format!(
        r#"
directory = "{}"
replace_mode = "in_place"
sync_on_write = false
policy = "on_shutdown"
schema_version = 3
"#,
        temp_dir.path().join("state").display().to_string().replace('\\', "/")
    );
    fs::write(&config_path, toml_content).unwrap();

    let config = PersistenceConfig::try_load_from_path(Some(config_path.as_path())).unwrap();

    assert_eq!(config.replace_mode, ReplaceMode::InPlace);
    assert!(!config.sync_on_write);
    assert_eq!(config.policy, PersistencePolicy::OnShutdown);
    assert_eq!(config.schema_version, 3);
    assert!(config.directory.unwrap().ends_with("state"));
}

#[test]
fn test_config_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("persistence.toml");
    fs::write(&config_path, "policy = \"never\"\nschema_version = 2\n").unwrap();

    std::env::set_var("CACHE_SNAPSHOT_POLICY", "immediate");
    let config = PersistenceConfig::load_from_path(Some(config_path.as_path()));
    clear_env();

    assert_eq!(config.policy, PersistencePolicy::Immediate);
    assert_eq!(config.schema_version, 2);
}

#[test]
fn test_config_missing_file_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();

    let missing = temp_dir.path().join("nope.toml");
    let config = PersistenceConfig::load_from_path(Some(missing.as_path()));
    assert_eq!(config, PersistenceConfig::default());
}

#[test]
fn test_config_invalid_values_fall_back() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("persistence.toml");
    fs::write(&config_path, "replace_mode = \"sideways\"").unwrap();

    assert!(PersistenceConfig::try_load_from_path(Some(config_path.as_path())).is_err());
    assert_eq!(
        PersistenceConfig::load_from_path(Some(config_path.as_path())),
        PersistenceConfig::default()
    );
}

#[test]
fn test_config_save_then_load() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("nested").join("persistence.toml");

    let config = PersistenceConfig {
        policy: PersistencePolicy::Immediate,
        schema_version: 7,
        ..PersistenceConfig::default()
    };
    config.save(&config_path).unwrap();

    let saved = fs::read_to_string(&config_path).unwrap();
    assert!(saved.contains("policy = \"immediate\""));
    assert!(saved.contains("schema_version = 7"));

    let loaded = PersistenceConfig::try_load_from_path(Some(config_path.as_path())).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_configured_strategy_round_trip() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config = PersistenceConfig {
        directory: Some(temp_dir.path().join("cache")),
        ..PersistenceConfig::default()
    };

    let strategy = config.build_strategy().unwrap();
    let cache = ContentCache::new("configured");
    assert_eq!(strategy.persist_on_complete_update(&cache), PersistOutcome::Written);
    assert_eq!(strategy.load(), Some(cache));
    assert!(temp_dir.path().join("cache").join("cache.tmp").exists());
}
