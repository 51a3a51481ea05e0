//! Per-connection state machine driving the registry and the broadcasts
//!
//! A connection starts out `Connected`, becomes `Active` once the client
//! says it is ready, and ends `Disconnected` when the transport goes away.
//! Only active connections own a registry entry, and only active
//! connections may move their actor.
//!
//! Every entry point takes the id of the connection the event came from and
//! returns the messages that event produces. Nothing here touches the
//! network, which keeps the whole protocol testable without sockets.

use crate::broadcast::Dispatch;
use crate::registry::{Registry, RegistryError};
use crate::spawn::SpawnPoint;
use log::{debug, info, warn};
use shared::{ActorId, ActorState, ClientMessage, Movement, ServerMessage};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport is up, no actor yet
    Connected,
    /// Ready handshake done, the actor is in the registry
    Active,
    /// Terminal; also reported for ids that were never seen
    Disconnected,
}

pub struct LifecycleManager {
    registry: Registry,
    connections: HashMap<ActorId, ConnectionState>,
    spawn: SpawnPoint,
}

impl LifecycleManager {
    pub fn new(spawn: SpawnPoint) -> Self {
        Self {
            registry: Registry::new(),
            connections: HashMap::new(),
            spawn,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn spawn_point(&self) -> SpawnPoint {
        self.spawn
    }

    pub fn state(&self, id: ActorId) -> ConnectionState {
        self.connections
            .get(&id)
            .copied()
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Number of live connections, active or not
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    /// Transport established. Nothing is broadcast until the client is ready.
    pub fn connect(&mut self, id: ActorId) -> Vec<Dispatch> {
        if self.connections.contains_key(&id) {
            warn!("Connection {} announced twice, ignoring", id);
            return Vec::new();
        }

        info!("Connection {} established", id);
        self.connections.insert(id, ConnectionState::Connected);
        Vec::new()
    }

    pub fn handle_message(&mut self, id: ActorId, message: ClientMessage) -> Vec<Dispatch> {
        match (self.state(id), message) {
            (ConnectionState::Connected, ClientMessage::ClientReady) => self.activate(id),
            (ConnectionState::Active, ClientMessage::ClientReady) => {
                debug!("Connection {} sent a repeated ready, resending roster", id);
                vec![self.roster_for(id)]
            }
            (ConnectionState::Active, ClientMessage::PlayerMovement(movement)) => self
                .apply_intent(id, movement)
                .map(|state| vec![Dispatch::to_others(id, ServerMessage::PlayerMoved(state))])
                .unwrap_or_default(),
            (ConnectionState::Active, ClientMessage::PlayerStopped(movement)) => self
                .apply_intent(id, movement)
                .map(|state| vec![Dispatch::to_others(id, ServerMessage::PlayerStopped(state))])
                .unwrap_or_default(),
            (state, message) => {
                debug!(
                    "Dropping {} from connection {} in state {:?}",
                    message.event_name(),
                    id,
                    state
                );
                Vec::new()
            }
        }
    }

    /// Transport lost. Safe to call any number of times for the same id.
    pub fn disconnect(&mut self, id: ActorId) -> Vec<Dispatch> {
        let Some(state) = self.connections.remove(&id) else {
            debug!("Connection {} already gone", id);
            return Vec::new();
        };

        info!("Connection {} closed while {:?}", id, state);

        if state != ConnectionState::Active {
            return Vec::new();
        }

        match self.registry.remove(id) {
            Ok(_) => vec![Dispatch::to_all(ServerMessage::PlayerDisconnected(id))],
            Err(RegistryError::NotFound(_)) => {
                warn!("Active connection {} had no registry entry", id);
                Vec::new()
            }
        }
    }

    fn activate(&mut self, id: ActorId) -> Vec<Dispatch> {
        let actor = self
            .registry
            .upsert(id, self.spawn.position, self.spawn.animation);
        self.connections.insert(id, ConnectionState::Active);

        info!(
            "Connection {} is active ({} actors online)",
            id,
            self.registry.len()
        );

        vec![
            self.roster_for(id),
            Dispatch::to_others(id, ServerMessage::NewPlayer(actor.state())),
        ]
    }

    fn roster_for(&self, id: ActorId) -> Dispatch {
        Dispatch::to_sender(
            id,
            ServerMessage::CurrentPlayers(self.registry.snapshot_except(id)),
        )
    }

    fn apply_intent(&mut self, id: ActorId, movement: Movement) -> Option<ActorState> {
        match self
            .registry
            .update(id, movement.position(), movement.animation)
        {
            Ok(actor) => Some(actor.state()),
            Err(e) => {
                debug!("Dropping intent from connection {}: {}", id, e);
                None
            }
        }
    }
}
