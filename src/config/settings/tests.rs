use super::*;
use serial_test::serial;
use tempfile::TempDir;

fn set_environment_var(value: Option<&str>) {
    // SAFETY: every test touching the environment is marked #[serial]
    unsafe {
        match value {
            Some(v) => std::env::set_var(ENVIRONMENT_VAR, v),
            None => std::env::remove_var(ENVIRONMENT_VAR),
        }
    }
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.backend.environment, Environment::Deployed);
    assert_eq!(config.backend.local_url, "http://127.0.0.1:8000");
    assert_eq!(
        config.backend.deployed_url,
        "https://davidtadediji--logosai-fastapi-app.modal.run"
    );
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.backend.local_url = "not a url".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.backend.deployed_url = "ftp://example.com".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidScheme(_))
    ));

    let mut invalid_config = config;
    invalid_config.backend.deployed_url = "https://".to_string();
    assert!(invalid_config.validate().is_err());
}

#[test]
fn active_url_follows_environment() {
    let mut config = Config::default();
    let url = config.backend_url().expect("deployed url is valid");
    assert_eq!(
        url.as_str(),
        "https://davidtadediji--logosai-fastapi-app.modal.run/"
    );

    config.backend.set_environment(Environment::Local);
    let url = config.backend_url().expect("local url is valid");
    assert_eq!(url.as_str(), "http://127.0.0.1:8000/");
}

#[test]
fn environment_parsing() {
    assert_eq!("local".parse::<Environment>().ok(), Some(Environment::Local));
    assert_eq!(
        " Deployed ".parse::<Environment>().ok(),
        Some(Environment::Deployed)
    );
    assert!(matches!(
        "staging".parse::<Environment>(),
        Err(ConfigError::UnknownEnvironment(_))
    ));
    assert_eq!(Environment::Local.to_string(), "local");
}

#[test]
fn toml_serialization() {
    let mut config = Config::default();
    config.backend.environment = Environment::Local;
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    assert!(toml_str.contains("environment = \"local\""));

    let parsed: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(parsed.backend, config.backend);
}

#[test]
fn partial_config_uses_defaults() {
    let partial_toml = r#"
        [backend]
        environment = "local"
    "#;

    let config: Config = toml::from_str(partial_toml).expect("partial config should parse");
    assert_eq!(config.backend.environment, Environment::Local);
    assert_eq!(config.backend.local_url, DEFAULT_LOCAL_URL);
    assert_eq!(config.backend.deployed_url, DEFAULT_DEPLOYED_URL);

    let empty: Config = toml::from_str("").expect("empty config should parse");
    assert_eq!(empty.backend, BackendConfig::default());
}

#[test]
fn setter_validation() {
    let mut backend = BackendConfig::default();

    assert!(backend.set_local_url("http://localhost:9000".to_string()).is_ok());
    assert!(
        backend
            .set_deployed_url("https://logos.example.com".to_string())
            .is_ok()
    );
    assert_eq!(backend.local_url, "http://localhost:9000");

    assert!(backend.set_local_url("ws://localhost".to_string()).is_err());
    assert!(backend.set_deployed_url(String::new()).is_err());
    assert_eq!(backend.deployed_url, "https://logos.example.com");
}

#[test]
#[serial]
fn load_missing_config() {
    set_environment_var(None);
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("missing file should load defaults");
    assert_eq!(config.backend, BackendConfig::default());
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(
        config.session_file_path(),
        temp_dir.path().join("session.toml")
    );
}

#[test]
#[serial]
fn save_and_reload() {
    set_environment_var(None);
    let temp_dir = TempDir::new().expect("should create temp dir");
    let base_dir = temp_dir.path().join("nested");

    let mut config = Config {
        base_dir: base_dir.clone(),
        ..Default::default()
    };
    config.backend.environment = Environment::Local;
    config
        .backend
        .set_local_url("http://10.0.0.5:8000".to_string())
        .expect("valid url");
    config.save().expect("should save config");

    assert!(base_dir.join("config.toml").exists());

    let loaded = Config::load(&base_dir).expect("should reload config");
    assert_eq!(loaded, config);
}

#[test]
#[serial]
fn environment_variable_overrides_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[backend]\nenvironment = \"deployed\"\n",
    )
    .expect("should write config");

    set_environment_var(Some("local"));
    let config = Config::load(temp_dir.path());
    set_environment_var(None);

    let config = config.expect("override should load");
    assert_eq!(config.backend.environment, Environment::Local);
    assert_eq!(
        config.backend_url().expect("valid").as_str(),
        "http://127.0.0.1:8000/"
    );
}

#[test]
#[serial]
fn invalid_environment_variable_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    set_environment_var(Some("production"));
    let result = Config::load(temp_dir.path());
    set_environment_var(None);

    assert!(result.is_err());
}

#[test]
#[serial]
fn invalid_file_is_rejected() {
    set_environment_var(None);
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[backend]\nlocal_url = \"gopher://old\"\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}
