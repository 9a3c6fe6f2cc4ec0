//! Game automation protocol core
//!
//! Everything here is transport-agnostic and synchronous: a [`Session`] takes
//! frames as text and returns replies. The socket server in
//! [`crate::socket_server`] owns one session per connection.

pub mod packet;
pub mod registry;
pub mod schema_guard;
pub mod session;
pub mod synth;

pub use packet::{ActionDescriptor, ForceRequest, OutgoingPacket, Packet};
pub use registry::{ActionRegistry, RegisterOutcome};
pub use schema_guard::{scan_forbidden_keys, validate, CompiledSchema, SchemaError, FORBIDDEN_SCHEMA_KEYS};
pub use session::{Phase, Session};
pub use synth::SyntheticGenerator;
