// Configuration management module
// Handles the TOML settings file and the interactive editor

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{BackendConfig, Config, ConfigError, ENVIRONMENT_VAR, Environment};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_dir()
}
