//! Common test utilities for vicky integration tests
//!
//! This module provides:
//! - `TestServer` for running a real server on an ephemeral port
//! - `TestClient` wrapping a WebSocket connection that plays the game side
//! - Assertions for reply packets and log contents

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod assertions;
pub mod test_server;

pub use assertions::*;
pub use test_server::{Received, TestClient, TestServer};
