use thiserror::Error;

pub type Result<T> = std::result::Result<T, LogosError>;

#[derive(Error, Debug)]
pub enum LogosError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] gateway::GatewayError),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod gateway;
pub mod session;
pub mod workspace;

#[cfg(test)]
mod testing;
