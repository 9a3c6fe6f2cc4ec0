//! Vicky: conformance-testing server for the game automation protocol
//!
//! A game connects over WebSocket and announces itself, registers the actions
//! it supports, narrates context, and asks for actions to be forced. Vicky
//! checks the ordering and identity rules of the protocol, keeps a registry
//! of each connection's actions, and answers force requests with synthetic
//! results so the game's result handling can be smoke-tested.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vicky::{NullStore, ServerConfig, Server, TracingSink};
//!
//! let server = Server::bind(ServerConfig::default(), Arc::new(TracingSink), Arc::new(NullStore)).await?;
//! println!("listening on {}", server.local_addr());
//! server.run().await?;
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod runner;
pub mod socket_server;
pub mod store;

// Re-export commonly used types
pub use cli::{Cli, Commands};
pub use config::{GameSwitchPolicy, RunConfig, ServerConfig, SessionConfig};
pub use error::{ProtocolViolation, Result, SessionError, VickyError};
pub use logging::{LogLevel, LogSink, MemorySink, TracingSink};
pub use protocol::{ActionDescriptor, OutgoingPacket, Packet, Phase, Session};
pub use runner::{run_test, RunResult};
pub use socket_server::{Server, ShutdownHandle};
pub use store::{JsonStore, NullStore, Store};
