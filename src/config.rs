//! Runtime configuration
//!
//! Built from CLI arguments in `main.rs`, or directly by embedders and tests.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::ValueEnum;

use crate::error::{Result, VickyError};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// What to do with a `startup` packet once a session is already active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum GameSwitchPolicy {
    /// Treat a startup naming another game as a fresh session: clear the
    /// registry and continue as the new game
    #[default]
    Accept,
    /// A repeated startup naming a different game is a game mismatch
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub game_switch: GameSwitchPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Escalate the first fatal session error to a full server shutdown
    pub strict: bool,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            strict: false,
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loopback config on an OS-assigned port
    pub fn ephemeral() -> Self {
        Self {
            port: 0,
            ..Self::default()
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| VickyError::Config {
                message: format!("Invalid listen address {}:{}: {}", self.host, self.port, e),
            })
    }
}

/// Settings for the `run` subcommand on top of the server config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub server: ServerConfig,
    pub runner: Option<String>,
    pub test_file: String,
    pub run_id: String,
    pub log_dir: Option<PathBuf>,
    pub store_dir: Option<PathBuf>,
}
