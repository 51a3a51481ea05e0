//! Authoritative in-memory table of active actors
//!
//! The registry holds one entry per connection that has completed the ready
//! handshake. It is owned by the server's event loop and handed by reference
//! to whoever needs to read or mutate it; nothing here is global.
//!
//! Entries are written only on behalf of their own connection, so the
//! registry never arbitrates between writers. It only has to keep its key
//! set consistent under inserts and removals.

use log::info;
use shared::{ActorId, ActorState, Animation, Position};
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no actor registered for connection {0}")]
    NotFound(ActorId),
}

/// Server-side record of one connected player
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    /// Same value as the owning connection's id
    pub id: ActorId,
    pub position: Position,
    pub animation: Animation,
    /// When the last accepted intent (or the spawn) touched this entry
    pub last_update: Instant,
}

impl Actor {
    pub fn new(id: ActorId, position: Position, animation: Animation) -> Self {
        Self {
            id,
            position,
            animation,
            last_update: Instant::now(),
        }
    }

    /// Wire representation sent to peers
    pub fn state(&self) -> ActorState {
        ActorState::new(self.id, self.position, self.animation)
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    actors: HashMap<ActorId, Actor>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            actors: HashMap::new(),
        }
    }

    /// Creates the entry for `id`, or fully replaces it if one exists.
    ///
    /// Repeating the call leaves only the latest values behind.
    pub fn upsert(&mut self, id: ActorId, position: Position, animation: Animation) -> Actor {
        let actor = Actor::new(id, position, animation);
        if self.actors.insert(id, actor.clone()).is_none() {
            info!(
                "Actor {} registered at ({}, {}) facing {}",
                id, position.x, position.y, animation
            );
        }
        actor
    }

    /// Applies an intent to an existing entry.
    ///
    /// Fails with `NotFound` when the actor is gone, e.g. when the update
    /// raced with a disconnect. Callers are expected to drop it.
    pub fn update(
        &mut self,
        id: ActorId,
        position: Position,
        animation: Animation,
    ) -> Result<Actor, RegistryError> {
        let actor = self
            .actors
            .get_mut(&id)
            .ok_or(RegistryError::NotFound(id))?;
        actor.position = position;
        actor.animation = animation;
        actor.last_update = Instant::now();
        Ok(actor.clone())
    }

    /// Deletes the entry and hands back its final state for the departure
    /// broadcast.
    pub fn remove(&mut self, id: ActorId) -> Result<Actor, RegistryError> {
        let actor = self.actors.remove(&id).ok_or(RegistryError::NotFound(id))?;
        info!("Actor {} unregistered", id);
        Ok(actor)
    }

    /// Point-in-time copy of every entry.
    ///
    /// The copy is detached from the registry so it can be delivered while
    /// the registry keeps changing.
    pub fn snapshot_all(&self) -> HashMap<ActorId, Actor> {
        self.actors.clone()
    }

    /// Roster as sent to a joining connection: every entry except `id`.
    pub fn snapshot_except(&self, id: ActorId) -> HashMap<ActorId, ActorState> {
        self.actors
            .iter()
            .filter(|(actor_id, _)| **actor_id != id)
            .map(|(actor_id, actor)| (*actor_id, actor.state()))
            .collect()
    }

    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    /// Ids of every registered actor, in no particular order
    pub fn ids(&self) -> Vec<ActorId> {
        self.actors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}
