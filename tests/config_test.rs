use freight_ai::config::secrets::ExposeSecret;
use freight_ai::config::{BatchConfig, Config, DEFAULT_MODEL};

// Env vars are process-wide, so every env case runs in this one test.
#[test]
fn config_from_env() {
    unsafe {
        std::env::remove_var("ANTHROPIC_API_KEY");
    }
    assert!(Config::from_env().is_err());

    unsafe {
        std::env::set_var("ANTHROPIC_API_KEY", "sk-test-key");
        std::env::remove_var("FREIGHT_AI_MODEL");
        std::env::remove_var("FREIGHT_AI_CONFIG");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.anthropic_api_key.expose_secret(), "sk-test-key");
    assert_eq!(config.model, DEFAULT_MODEL);
    assert!(!config.log_level.is_empty());
    assert!(config.batch_config_path.is_none());
    assert_eq!(config.batch_config().unwrap().max_batch_size, 50);

    // The key never shows up in debug output.
    assert!(!format!("{config:?}").contains("sk-test-key"));

    unsafe {
        std::env::remove_var("ANTHROPIC_API_KEY");
    }
}

#[test]
fn batch_config_defaults() {
    let config = BatchConfig::default();
    assert_eq!(config.batch_interval_secs, 300);
    assert_eq!(config.max_batch_size, 50);
    assert_eq!(config.burst_threshold, 10);
    assert_eq!(config.queue_capacity, 1000);
    assert_eq!(config.result_ttl_secs, 86_400);
    assert_eq!(config.daily_token_limit, 100_000);
}

#[test]
fn batch_config_toml_overrides_only_given_keys() {
    let config = BatchConfig::from_toml_str(
        r#"
        batch_interval_secs = 60
        daily_token_limit = 5000
        daily_cost_limit = 2.5
        "#,
    )
    .unwrap();
    assert_eq!(config.batch_interval().as_secs(), 60);
    assert_eq!(config.daily_token_limit, 5000);
    assert_eq!(config.daily_cost_limit, 2.5);
    assert_eq!(config.max_batch_size, 50);
}

#[test]
fn batch_config_rejects_bad_values() {
    assert!(BatchConfig::from_toml_str("max_batch_size = 0").is_err());
    assert!(BatchConfig::from_toml_str("queue_capacity = 0").is_err());
    assert!(BatchConfig::from_toml_str("poll_interval_ms = 0").is_err());
    assert!(BatchConfig::from_toml_str("batch_interval_secs = 0").is_err());
    assert!(BatchConfig::from_toml_str("dispatch_timeout_secs = 0").is_err());
    assert!(BatchConfig::from_toml_str("batch_interval_secs = \"soon\"").is_err());
}

#[test]
fn batch_config_loads_from_file() {
    let path = std::env::temp_dir().join(format!("freight-ai-{}.toml", std::process::id()));
    std::fs::write(&path, "burst_threshold = 4\n").unwrap();
    let config = BatchConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(config.burst_threshold, 4);

    assert!(BatchConfig::load(&path).is_err());
}
