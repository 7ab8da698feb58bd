use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::error::ParseError;
use crate::core::models::ids::ModelKey;
use std::time::Duration;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Could not launch the viewer from any of {attempted:?}")]
    Launch {
        attempted: Vec<String>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("I/O error while talking to the viewer: {0}")]
    Io(#[from] std::io::Error),

    #[error("The viewer process is gone")]
    Lost,

    #[error("No reply to '{command}' within {timeout:?}")]
    ReplyTimeout { command: String, timeout: Duration },

    #[error("Wait for '{command}' was cancelled")]
    Cancelled { command: String },

    #[error("The viewer is not running")]
    NotRunning,

    #[error("Gateway state is poisoned")]
    Poisoned,
}

impl GatewayError {
    /// Whether the channel to the viewer can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GatewayError::Io(_) | GatewayError::Lost | GatewayError::NotRunning | GatewayError::Poisoned
        )
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Viewer communication failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Protocol parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Model {0} is not open")]
    ModelNotFound(ModelKey),
}
