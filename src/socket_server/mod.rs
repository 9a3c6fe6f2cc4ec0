//! Vicky Socket Server
//!
//! Accepts game connections over WebSocket and runs one protocol session per
//! connection.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         VICKY SOCKET SERVER                             │
//! │                 Single listener, one task per connection                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Server (TcpListener) ──► tokio task per client                         │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                           Session {                                     │
//! │                             phase, established game,                    │
//! │                             ActionRegistry, SyntheticGenerator          │
//! │                           }                                             │
//! │                                                                         │
//! │  Shared by all tasks: LogSink, Store, shutdown signal                   │
//! │  Nothing else crosses session boundaries                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A fatal protocol error closes only the offending connection (close code
//! 1008, reason = the error). With `strict` enabled the first such error also
//! stops the server.

pub mod acceptor;
pub mod connection;

pub use acceptor::{Server, ShutdownHandle};
pub use connection::{handle_connection, SessionFailure};
