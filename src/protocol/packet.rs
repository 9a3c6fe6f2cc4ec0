//! Packet model
//!
//! Every frame is a single JSON object tagged by `command`. `startup` and
//! `shutdown/ready` only carry `game`; the remaining client commands place
//! their payload under `data`.
//!
//! ```json
//! // Client -> Server
//! {"command": "startup", "game": "Vicky"}
//! {"command": "context", "game": "Vicky", "data": {"message": "...", "silent": true}}
//! {"command": "actions/register", "game": "Vicky", "data": {"actions": [...]}}
//! {"command": "actions/unregister", "game": "Vicky", "data": {"action_names": ["jump"]}}
//! {"command": "actions/force", "game": "Vicky", "data": {"query": "...", "action_names": ["jump"]}}
//! {"command": "shutdown/ready", "game": "Vicky"}
//!
//! // Server -> Client
//! {"command": "action/result", "game": "Vicky", "data": {"jump": {"height": 3}}}
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SessionError;

pub const STARTUP: &str = "startup";
pub const CONTEXT: &str = "context";
pub const ACTIONS_REGISTER: &str = "actions/register";
pub const ACTIONS_UNREGISTER: &str = "actions/unregister";
pub const ACTIONS_FORCE: &str = "actions/force";
pub const SHUTDOWN_READY: &str = "shutdown/ready";
pub const ACTION_RESULT: &str = "action/result";

/// Commands a client may send
pub const CLIENT_COMMANDS: &[&str] = &[
    STARTUP,
    CONTEXT,
    ACTIONS_REGISTER,
    ACTIONS_UNREGISTER,
    ACTIONS_FORCE,
    SHUTDOWN_READY,
];

/// An action a game declares it can perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default = "empty_schema")]
    pub schema: Value,
}

fn empty_schema() -> Value {
    Value::Object(Map::new())
}

/// Payload of an `actions/force` packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceRequest {
    pub query: String,
    pub action_names: Vec<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "ephermeral_context")]
    pub ephemeral_context: bool,
}

#[derive(Deserialize)]
struct ContextData {
    message: String,
    silent: bool,
}

#[derive(Deserialize)]
struct RegisterData {
    actions: Vec<ActionDescriptor>,
}

#[derive(Deserialize)]
struct UnregisterData {
    action_names: Vec<String>,
}

/// Client-to-server packet
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Startup {
        game: String,
    },
    Context {
        game: String,
        message: String,
        silent: bool,
    },
    RegisterActions {
        game: String,
        actions: Vec<ActionDescriptor>,
    },
    UnregisterActions {
        game: String,
        action_names: Vec<String>,
    },
    ForceActions {
        game: String,
        request: ForceRequest,
    },
    ShutdownReady {
        game: String,
    },
    /// Unknown command, or a known command whose payload does not have the
    /// expected shape. `command` is empty when the frame had none.
    Unrecognized {
        command: String,
        game: Option<String>,
        payload: Value,
    },
}

impl Packet {
    /// Parse one frame.
    ///
    /// Only text that is not JSON at all is a [`SessionError::MalformedPacket`];
    /// any JSON value that does not match a known packet shape becomes
    /// [`Packet::Unrecognized`].
    pub fn parse(text: &str) -> Result<Self, SessionError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| SessionError::MalformedPacket {
                message: e.to_string(),
            })?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        let command = value
            .get("command")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let game = value.get("game").and_then(Value::as_str).map(str::to_owned);

        let typed = match (command.as_deref(), game.clone()) {
            (Some(command), Some(game)) => Self::typed(command, game, value.get("data")),
            _ => None,
        };

        typed.unwrap_or_else(|| Packet::Unrecognized {
            command: command.unwrap_or_default(),
            game,
            payload: value,
        })
    }

    fn typed(command: &str, game: String, data: Option<&Value>) -> Option<Self> {
        let packet = match command {
            STARTUP => Packet::Startup { game },
            SHUTDOWN_READY => Packet::ShutdownReady { game },
            CONTEXT => {
                let data: ContextData = decode(data)?;
                Packet::Context {
                    game,
                    message: data.message,
                    silent: data.silent,
                }
            }
            ACTIONS_REGISTER => {
                let data: RegisterData = decode(data)?;
                Packet::RegisterActions {
                    game,
                    actions: data.actions,
                }
            }
            ACTIONS_UNREGISTER => {
                let data: UnregisterData = decode(data)?;
                Packet::UnregisterActions {
                    game,
                    action_names: data.action_names,
                }
            }
            ACTIONS_FORCE => Packet::ForceActions {
                game,
                request: decode(data)?,
            },
            _ => return None,
        };
        Some(packet)
    }

    /// The wire command string
    pub fn command(&self) -> &str {
        match self {
            Packet::Startup { .. } => STARTUP,
            Packet::Context { .. } => CONTEXT,
            Packet::RegisterActions { .. } => ACTIONS_REGISTER,
            Packet::UnregisterActions { .. } => ACTIONS_UNREGISTER,
            Packet::ForceActions { .. } => ACTIONS_FORCE,
            Packet::ShutdownReady { .. } => SHUTDOWN_READY,
            Packet::Unrecognized { command, .. } => command.as_str(),
        }
    }

    /// True for an [`Packet::Unrecognized`] whose command is a known client
    /// command, i.e. the payload had the wrong shape
    pub fn is_misshapen(&self) -> bool {
        match self {
            Packet::Unrecognized { command, .. } => CLIENT_COMMANDS.contains(&command.as_str()),
            _ => false,
        }
    }

    /// The `game` field, if the packet carries one
    pub fn game(&self) -> Option<&str> {
        match self {
            Packet::Startup { game }
            | Packet::Context { game, .. }
            | Packet::RegisterActions { game, .. }
            | Packet::UnregisterActions { game, .. }
            | Packet::ForceActions { game, .. }
            | Packet::ShutdownReady { game } => Some(game),
            Packet::Unrecognized { game, .. } => game.as_deref(),
        }
    }
}

fn decode<T: DeserializeOwned>(data: Option<&Value>) -> Option<T> {
    T::deserialize(data?).ok()
}

/// Server-to-client packet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command")]
pub enum OutgoingPacket {
    #[serde(rename = "action/result")]
    ActionResult {
        game: String,
        data: Map<String, Value>,
    },
}

impl OutgoingPacket {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
