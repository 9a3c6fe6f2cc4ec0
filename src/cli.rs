//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    GameSwitchPolicy, RunConfig, ServerConfig, SessionConfig, DEFAULT_HOST, DEFAULT_PORT,
};
use crate::error::{Result, VickyError};

/// Conformance-testing server for the game automation protocol
#[derive(Parser, Debug)]
#[command(name = "vicky")]
#[command(about = "Validates that a game speaks the automation protocol correctly")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// ============================================
// Main Commands Enum
// ============================================

/// Available subcommands for vicky
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the server until interrupted
    Serve(ServeArgs),

    /// Run the server while a test process drives a game against it
    Run(RunArgs),
}

/// Options shared by every command that starts the server
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Port to listen on
    #[arg(short, long, env = "VICKY_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Stop the whole server on the first protocol violation
    #[arg(long)]
    pub strict: bool,

    /// How to treat a second `startup` naming a different game
    #[arg(long, value_enum, default_value = "accept")]
    pub game_switch: GameSwitchPolicy,

    /// Also write the log to a per-run file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Record context and forced actions as JSON files in this directory
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Run identifier used in log and store file names
    #[arg(long, env = "GITHUB_RUN_ID", default_value = "local")]
    pub run_id: String,
}

impl ServerArgs {
    pub fn server_config(&self) -> Result<ServerConfig> {
        if self.port == 0 {
            return Err(VickyError::Config {
                message: "Port must be between 1 and 65535".to_string(),
            });
        }
        Ok(ServerConfig {
            host: self.host.clone(),
            port: self.port,
            strict: self.strict,
            session: SessionConfig {
                game_switch: self.game_switch,
            },
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    /// Test file, or the full command when no runner is given
    #[arg(long)]
    pub test_file: String,

    /// Program that runs the test file (e.g. `node`)
    #[arg(long)]
    pub runner: Option<String>,
}

impl RunArgs {
    pub fn run_config(&self) -> Result<RunConfig> {
        Ok(RunConfig {
            server: self.server.server_config()?,
            runner: self.runner.clone(),
            test_file: self.test_file.clone(),
            run_id: self.server.run_id.clone(),
            log_dir: self.server.log_dir.clone(),
            store_dir: self.server.store_dir.clone(),
        })
    }
}
