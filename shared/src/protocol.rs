//! Message catalogue and JSON codec for the position relay
//!
//! Every logical message travels as one JSON text frame shaped as
//! `{"event": <name>, "data": <payload>}`. Client and server speak two
//! disjoint closed sets of events, so each direction gets its own enum and
//! anything outside that set fails to decode.

use crate::{ActorId, ActorState, Movement};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("frame is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("position ({x}, {y}) is not finite")]
    NonFinite { x: f32, y: f32 },
}

/// Events a client may send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// The client finished loading and wants to join the shared world
    ClientReady,
    /// The local actor moved
    PlayerMovement(Movement),
    /// The local actor came to rest
    PlayerStopped(Movement),
}

/// Events the server relays to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Everyone else already in the world, sent once to a joining client
    CurrentPlayers(HashMap<ActorId, ActorState>),
    NewPlayer(ActorState),
    PlayerDisconnected(ActorId),
    PlayerMoved(ActorState),
    PlayerStopped(ActorState),
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes and validates one text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let message: ClientMessage = decode_json(text)?;
        message.validate()?;
        Ok(message)
    }

    /// Binary frames carry the same UTF-8 JSON as text frames.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::decode(std::str::from_utf8(bytes)?)
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::ClientReady => "clientReady",
            ClientMessage::PlayerMovement(_) => "playerMovement",
            ClientMessage::PlayerStopped(_) => "playerStopped",
        }
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            ClientMessage::ClientReady => Ok(()),
            ClientMessage::PlayerMovement(movement) | ClientMessage::PlayerStopped(movement) => {
                if movement.position().is_finite() {
                    Ok(())
                } else {
                    Err(ProtocolError::NonFinite {
                        x: movement.x,
                        y: movement.y,
                    })
                }
            }
        }
    }
}

impl ServerMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        decode_json(text)
    }

    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::decode(std::str::from_utf8(bytes)?)
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::CurrentPlayers(_) => "currentPlayers",
            ServerMessage::NewPlayer(_) => "newPlayer",
            ServerMessage::PlayerDisconnected(_) => "playerDisconnected",
            ServerMessage::PlayerMoved(_) => "playerMoved",
            ServerMessage::PlayerStopped(_) => "playerStopped",
        }
    }

    /// The actor this message is about, if it concerns a single one.
    pub fn subject(&self) -> Option<ActorId> {
        match self {
            ServerMessage::CurrentPlayers(_) => None,
            ServerMessage::NewPlayer(state)
            | ServerMessage::PlayerMoved(state)
            | ServerMessage::PlayerStopped(state) => Some(state.id),
            ServerMessage::PlayerDisconnected(id) => Some(*id),
        }
    }
}

fn decode_json<T: DeserializeOwned>(text: &str) -> Result<T, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}
