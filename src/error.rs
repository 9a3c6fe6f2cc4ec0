//! Error types and exit codes for vicky

use std::process::ExitCode;
use thiserror::Error;

/// Ordering or identity rule broken by the client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("command `{command}` received before startup")]
    CommandBeforeStartup { command: String },

    #[error("game mismatch: expected \"{expected}\", got \"{actual}\" in `{command}`")]
    GameMismatch {
        expected: String,
        actual: String,
        command: String,
    },

    #[error("unknown command `{command}`")]
    UnknownCommand { command: String },

    #[error("`{command}` packet has an invalid shape")]
    InvalidShape { command: String },
}

/// Fatal session errors.
///
/// Any of these terminates the session that produced it and closes its
/// connection. Sibling sessions and the acceptor are unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("malformed packet: {message}")]
    MalformedPacket { message: String },

    #[error("protocol violation: {0}")]
    Violation(#[from] ProtocolViolation),

    #[error("session already terminated")]
    Terminated,
}

/// Main error type for vicky operations
#[derive(Error, Debug)]
pub enum VickyError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Strict mode: session {session} violated the protocol: {reason}")]
    StrictAbort { session: String, reason: String },

    #[error("Test runner error: {message}")]
    Runner { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VickyError {
    /// Convert error to an exit code:
    /// - 0: Success
    /// - 1: Test run failed / IO error
    /// - 2: Configuration error
    /// - 3: Bind failure
    /// - 4: Strict-mode protocol violation
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config { .. } => ExitCode::from(2),
            Self::Bind { .. } => ExitCode::from(3),
            Self::StrictAbort { .. } => ExitCode::from(4),
            Self::Runner { .. } => ExitCode::from(1),
            Self::Json(_) => ExitCode::from(1),
            Self::Io(_) => ExitCode::from(1),
        }
    }
}

/// Result type alias for vicky operations
pub type Result<T> = std::result::Result<T, VickyError>;
