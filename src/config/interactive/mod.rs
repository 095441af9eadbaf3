
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use url::Url;

use super::settings::validate_backend_url;
use super::{BackendConfig, Config, ConfigError, Environment};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 LogosAI Client Configuration").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Backend Configuration").bold().yellow());
    eprintln!("Choose which LogosAI backend the client talks to.");
    eprintln!();

    configure_backend(&mut config.backend)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    let url = config.backend_url()?;
    if test_backend_connection(&url) {
        eprintln!("{}", style("✓ Backend is reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the backend").yellow()
        );
        eprintln!("You can continue, but searches will fail until it is running.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Backend Settings:").bold().yellow());
    eprintln!(
        "  Environment: {}",
        style(config.backend.environment).cyan()
    );
    eprintln!("  Local URL: {}", style(&config.backend.local_url).cyan());
    eprintln!(
        "  Deployed URL: {}",
        style(&config.backend.deployed_url).cyan()
    );

    eprintln!();
    match config.backend_url() {
        Ok(url) => eprintln!("  Active backend: {}", style(url).cyan()),
        Err(e) => eprintln!("  Active backend: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!(
        "Session file: {}",
        style(config.session_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load_default().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_backend(backend: &mut BackendConfig) -> Result<()> {
    let environments = [Environment::Deployed, Environment::Local];
    let default_index = environments
        .iter()
        .position(|&e| e == backend.environment)
        .unwrap_or(0);

    let environment_index = Select::new()
        .with_prompt("Backend environment")
        .default(default_index)
        .items(&environments.map(Environment::as_str))
        .interact()?;

    let local_url: String = Input::new()
        .with_prompt("Local backend URL")
        .default(backend.local_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            validate_backend_url(input).map(|_| ())
        })
        .interact_text()?;

    let deployed_url: String = Input::new()
        .with_prompt("Deployed backend URL")
        .default(backend.deployed_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            validate_backend_url(input).map(|_| ())
        })
        .interact_text()?;

    backend.set_environment(environments[environment_index]);
    backend.set_local_url(local_url)?;
    backend.set_deployed_url(deployed_url)?;

    Ok(())
}

/// Any HTTP answer counts as reachable; only transport failures do not
fn test_backend_connection(url: &Url) -> bool {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url.as_str()).call() {
        Ok(_) | Err(ureq::Error::StatusCode(_)) => true,
        Err(_) => false,
    }
}
