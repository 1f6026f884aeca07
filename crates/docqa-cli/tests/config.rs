use docqa_cli::config::{DocqaConfig, Overrides, load_config, save_config};

#[test]
fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(dir.path()).unwrap();
    assert_eq!(config, DocqaConfig::default());
    assert_eq!(config.api_url, "http://localhost:8000");
    assert_eq!(config.top_k, 5);
}

#[test]
fn v0_config_is_migrated() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{ "api_url": "http://rag.internal:9000", "top_k": 10 }"#,
    )
    .unwrap();

    let config = load_config(dir.path()).unwrap();
    assert_eq!(config.config_version, 1);
    assert_eq!(config.api_url, "http://rag.internal:9000");
    assert_eq!(config.events_url, "http://127.0.0.1:8288/v1");
    assert_eq!(config.top_k, 10);
    assert_eq!(config.request_timeout_secs, 120);
}

#[test]
fn newer_config_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{ "config_version": 99, "api_url": "http://x" }"#,
    )
    .unwrap();
    assert!(load_config(dir.path()).is_err());
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = DocqaConfig::default();
    config.api_url = "https://rag.example.com".to_string();
    config.top_k = 15;
    config.poll.max_attempts = 7;

    save_config(dir.path(), &config).unwrap();
    assert!(!dir.path().join("config.json.tmp").exists());
    assert_eq!(load_config(dir.path()).unwrap(), config);
}

#[test]
fn overrides_beat_file_values() {
    let config = DocqaConfig {
        api_url: "http://from-file:8000".to_string(),
        ..DocqaConfig::default()
    };

    let settings = config.resolve(&Overrides::default()).unwrap();
    assert_eq!(settings.endpoints.api_base().as_str(), "http://from-file:8000/");

    let cli = Overrides {
        api_url: Some("http://from-flag:8000".to_string()),
        events_url: None,
    };
    let env = Overrides {
        api_url: Some("http://from-env:8000".to_string()),
        events_url: Some("http://events-env:8288/v1".to_string()),
    };
    let settings = config.resolve(&cli.or(env)).unwrap();
    assert_eq!(settings.endpoints.api_base().as_str(), "http://from-flag:8000/");
    assert_eq!(
        settings.endpoints.events_base().as_str(),
        "http://events-env:8288/v1"
    );
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let config = DocqaConfig {
        api_url: "   ".to_string(),
        ..DocqaConfig::default()
    };
    let overrides = Overrides {
        api_url: Some(String::new()),
        events_url: None,
    };
    let settings = config.resolve(&overrides).unwrap();
    assert_eq!(settings.endpoints.api_base().as_str(), "http://localhost:8000/");
}

#[test]
fn invalid_top_k_falls_back_to_default() {
    let config = DocqaConfig {
        top_k: 0,
        ..DocqaConfig::default()
    };
    assert_eq!(config.resolve(&Overrides::default()).unwrap().top_k, 5);
}
