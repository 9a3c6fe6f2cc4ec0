//! Per-connection protocol session
//!
//! A [`Session`] owns everything one connection knows: the game identity it
//! announced, the actions it registered, and where it is in the
//! `AwaitingStartup -> Active -> Terminated` lifecycle. The connection task
//! feeds it frames in arrival order through [`Session::handle_frame`] and
//! sends back whatever reply it returns. An `Err` is fatal for this session
//! only.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Map;

use crate::config::{GameSwitchPolicy, SessionConfig};
use crate::error::{ProtocolViolation, SessionError};
use crate::logging::LogSink;
use crate::protocol::packet::{ForceRequest, OutgoingPacket, Packet, STARTUP};
use crate::protocol::registry::ActionRegistry;
use crate::protocol::synth::SyntheticGenerator;
use crate::store::Store;

/// Store `source` for narration sent by the game
const GAME_SOURCE: &str = "game";
/// Store `source` for actions forced by this server
const SERVER_SOURCE: &str = "vicky";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    AwaitingStartup,
    Active { game: String },
    /// Terminal. Keeps the game identity if one was established.
    Terminated { game: Option<String> },
}

pub struct Session {
    id: String,
    config: SessionConfig,
    phase: Phase,
    registry: ActionRegistry,
    generator: SyntheticGenerator<StdRng>,
    log: Arc<dyn LogSink>,
    store: Arc<dyn Store>,
}

impl Session {
    pub fn new(config: SessionConfig, log: Arc<dyn LogSink>, store: Arc<dyn Store>) -> Self {
        Self::with_rng(config, log, store, StdRng::from_entropy())
    }

    /// Same as [`Session::new`] with a caller-chosen generator seed
    pub fn with_rng(
        config: SessionConfig,
        log: Arc<dyn LogSink>,
        store: Arc<dyn Store>,
        rng: StdRng,
    ) -> Self {
        let id = format!(
            "ses_{}",
            uuid::Uuid::new_v4().simple().to_string().get(..8).unwrap_or("0")
        );
        Self {
            id,
            config,
            phase: Phase::AwaitingStartup,
            registry: ActionRegistry::new(),
            generator: SyntheticGenerator::new(rng),
            log,
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.phase, Phase::Terminated { .. })
    }

    pub fn established_game(&self) -> Option<&str> {
        match &self.phase {
            Phase::AwaitingStartup => None,
            Phase::Active { game } => Some(game),
            Phase::Terminated { game } => game.as_deref(),
        }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Process one inbound frame.
    ///
    /// Returns the packet to send back, if any. On error the session is
    /// terminated, its registry released, and the error logged; the caller
    /// must close the connection.
    pub fn handle_frame(&mut self, frame: &str) -> Result<Option<OutgoingPacket>, SessionError> {
        if self.is_terminated() {
            return Err(SessionError::Terminated);
        }

        let result = Packet::parse(frame).and_then(|packet| self.dispatch(packet));
        if let Err(e) = &result {
            self.log.error(&e.to_string());
            self.terminate();
        }
        result
    }

    /// Like [`Session::handle_frame`] for binary frames, which must hold UTF-8
    pub fn handle_bytes(&mut self, frame: &[u8]) -> Result<Option<OutgoingPacket>, SessionError> {
        match std::str::from_utf8(frame) {
            Ok(text) => self.handle_frame(text),
            Err(_) if self.is_terminated() => Err(SessionError::Terminated),
            Err(e) => {
                let err = SessionError::MalformedPacket {
                    message: format!("frame is not UTF-8: {}", e),
                };
                self.log.error(&err.to_string());
                self.terminate();
                Err(err)
            }
        }
    }

    /// Release the registry and enter the terminal phase
    pub fn terminate(&mut self) {
        let game = self.established_game().map(str::to_owned);
        self.registry.clear();
        self.phase = Phase::Terminated { game };
    }

    fn dispatch(&mut self, packet: Packet) -> Result<Option<OutgoingPacket>, SessionError> {
        match self.phase.clone() {
            Phase::AwaitingStartup => self.on_awaiting_startup(packet).map(|_| None),
            Phase::Active { game } => self.on_active(game, packet),
            Phase::Terminated { .. } => Err(SessionError::Terminated),
        }
    }

    fn on_awaiting_startup(&mut self, packet: Packet) -> Result<(), SessionError> {
        match packet {
            Packet::Startup { game } => {
                self.registry.clear();
                self.log.info(&format!("Now playing ({})", game));
                self.phase = Phase::Active { game };
                Ok(())
            }
            other if other.is_misshapen() => Err(invalid_shape(&other)),
            other => Err(ProtocolViolation::CommandBeforeStartup {
                command: other.command().to_string(),
            }
            .into()),
        }
    }

    fn on_active(
        &mut self,
        game: String,
        packet: Packet,
    ) -> Result<Option<OutgoingPacket>, SessionError> {
        if let Packet::Startup { game: incoming } = &packet {
            self.restart(&game, incoming)?;
            return Ok(None);
        }

        if let Some(actual) = packet.game() {
            if actual != game {
                return Err(ProtocolViolation::GameMismatch {
                    expected: game,
                    actual: actual.to_string(),
                    command: packet.command().to_string(),
                }
                .into());
            }
        }

        match packet {
            Packet::Context {
                message, silent, ..
            } => {
                self.log
                    .info(&format!("Context: \"{}\" (silent: {})", message, silent));
                self.store.context_add(&message, GAME_SOURCE, &game, silent);
            }
            Packet::RegisterActions { actions, .. } => {
                self.registry.register_all(actions, self.log.as_ref());
            }
            Packet::UnregisterActions { action_names, .. } => {
                self.registry.unregister_all(&action_names, self.log.as_ref());
            }
            Packet::ForceActions { request, .. } => {
                return Ok(self.force(game, request));
            }
            Packet::ShutdownReady { .. } => {
                self.log.info("Shutdown ready command packet received");
                self.log.warn(
                    "shutdown/ready belongs to the game automation API, which most games do not need to implement",
                );
                self.log.warn(
                    "shutdown/ready is a proposed command and not part of the official protocol yet",
                );
            }
            other @ Packet::Unrecognized { .. } if other.is_misshapen() => {
                return Err(invalid_shape(&other));
            }
            Packet::Unrecognized { command, .. } => {
                return Err(ProtocolViolation::UnknownCommand { command }.into());
            }
            Packet::Startup { .. } => {}
        }
        Ok(None)
    }

    /// A `startup` while already active. Under `Accept` it starts the session
    /// over as the announced game; under `Reject` only the established game
    /// may announce itself again.
    fn restart(&mut self, established: &str, incoming: &str) -> Result<(), SessionError> {
        if incoming == established {
            self.log.warn(&format!(
                "Received another startup for ({}), clearing registered actions",
                established
            ));
            self.registry.clear();
            return Ok(());
        }

        if self.config.game_switch == GameSwitchPolicy::Reject {
            return Err(ProtocolViolation::GameMismatch {
                expected: established.to_string(),
                actual: incoming.to_string(),
                command: STARTUP.to_string(),
            }
            .into());
        }

        self.log.warn(&format!(
            "Game switched from ({}) to ({}), clearing registered actions",
            established, incoming
        ));
        self.registry.clear();
        self.log.info(&format!("Now playing ({})", incoming));
        self.phase = Phase::Active {
            game: incoming.to_string(),
        };
        Ok(())
    }

    /// Answer an `actions/force` with synthetic results for every requested
    /// action that is registered. Nothing is sent when none are.
    fn force(&mut self, game: String, request: ForceRequest) -> Option<OutgoingPacket> {
        self.log.info(&format!(
            "Force request: {}",
            serde_json::to_string(&request).unwrap_or_default()
        ));

        let (valid, missing): (Vec<&String>, Vec<&String>) = request
            .action_names
            .iter()
            .partition(|name| self.registry.contains(name));

        if valid.is_empty() {
            self.log.error(&format!(
                "None of the forced actions are registered: [{}]",
                join(&request.action_names)
            ));
            return None;
        }

        if !missing.is_empty() {
            self.log.warn(&format!(
                "Forced actions not registered, skipping: [{}]",
                join(missing)
            ));
        }

        let mut data = Map::new();
        for name in &valid {
            let (Some(action), Some(schema)) = (self.registry.get(name), self.registry.schema(name))
            else {
                continue;
            };
            let value = self.generator.generate(&action.schema);
            if !schema.is_valid(&value) {
                self.log.warn(&format!(
                    "Synthetic result for \"{}\" does not satisfy its schema: {}",
                    name, value
                ));
            }
            data.insert((*name).clone(), value);
            self.store
                .actions_add(name, SERVER_SOURCE, Some(request.query.as_str()));
        }

        self.log
            .info(&format!("Processed forced actions: [{}]", join(valid)));
        Some(OutgoingPacket::ActionResult { game, data })
    }
}

fn invalid_shape(packet: &Packet) -> SessionError {
    ProtocolViolation::InvalidShape {
        command: packet.command().to_string(),
    }
    .into()
}

fn join<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> String {
    names
        .into_iter()
        .map(|n| n.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
