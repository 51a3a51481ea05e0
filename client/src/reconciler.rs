//! Shadow copies of remote actors, kept in step with server updates
//!
//! The table only ever reflects what the server has said. Displayed
//! positions trail the last reported target and are advanced by `tick`,
//! so a renderer can draw them every frame without waiting for the network.

use log::debug;
use shared::{ActorId, ActorState, Animation, Position, ServerMessage};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Distance under which an exponential approach lands on its target
const SETTLE_DISTANCE: f32 = 0.05;

/// How displayed positions catch up with reported ones
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interpolation {
    /// Jump straight to the reported position
    Snap,
    /// Move at a constant speed in units per second
    Linear { speed: f32 },
    /// Close a fixed fraction of the remaining gap per second
    Exponential { rate: f32 },
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::Exponential { rate: 12.0 }
    }
}

impl Interpolation {
    pub fn step(&self, from: Position, to: Position, dt: f32) -> Position {
        match *self {
            Interpolation::Snap => to,
            Interpolation::Linear { speed } => from.move_towards(&to, speed * dt),
            Interpolation::Exponential { rate } => {
                let next = from.lerp(&to, 1.0 - (-rate * dt).exp());
                if next.distance_to(&to) < SETTLE_DISTANCE {
                    to
                } else {
                    next
                }
            }
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpolation::Snap => write!(f, "snap"),
            Interpolation::Linear { speed } => write!(f, "linear:{}", speed),
            Interpolation::Exponential { rate } => write!(f, "exponential:{}", rate),
        }
    }
}

/// Parses `snap`, `linear[:speed]` or `exponential[:rate]`
impl FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = match s.split_once(':') {
            Some((kind, value)) => (kind, Some(value)),
            None => (s, None),
        };

        let parameter = |default: f32| -> Result<f32, String> {
            match value {
                None => Ok(default),
                Some(raw) => match raw.trim().parse::<f32>() {
                    Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
                    _ => Err(format!("invalid interpolation parameter '{}'", raw)),
                },
            }
        };

        match kind.trim().to_ascii_lowercase().as_str() {
            "snap" if value.is_none() => Ok(Interpolation::Snap),
            "linear" => Ok(Interpolation::Linear {
                speed: parameter(shared::PLAYER_SPEED)?,
            }),
            "exponential" | "exp" => Ok(Interpolation::Exponential {
                rate: parameter(12.0)?,
            }),
            _ => Err(format!(
                "unknown interpolation '{}' (expected snap, linear[:speed] or exponential[:rate])",
                s
            )),
        }
    }
}

/// Local view of one remote actor
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteActor {
    pub id: ActorId,
    /// Where the actor is drawn right now
    pub position: Position,
    /// Last position reported by the server
    pub target: Position,
    pub animation: Animation,
    pub moving: bool,
}

impl RemoteActor {
    fn spawn(state: &ActorState) -> Self {
        let position = state.position();
        Self {
            id: state.id,
            position,
            target: position,
            animation: state.animation,
            moving: false,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.position == self.target
    }
}

/// Visual lifecycle events a renderer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowChange {
    Spawned(ActorId),
    Despawned(ActorId),
}

#[derive(Debug, Default)]
pub struct ShadowTable {
    actors: HashMap<ActorId, RemoteActor>,
    local_id: Option<ActorId>,
    interpolation: Interpolation,
}

impl ShadowTable {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            actors: HashMap::new(),
            local_id: None,
            interpolation,
        }
    }

    /// Entries for `id` are never created; the local actor is driven locally.
    pub fn with_local_id(mut self, id: ActorId) -> Self {
        self.local_id = Some(id);
        self.actors.remove(&id);
        self
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn get(&self, id: ActorId) -> Option<&RemoteActor> {
        self.actors.get(&id)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn actors(&self) -> impl Iterator<Item = &RemoteActor> {
        self.actors.values()
    }

    /// Copy of every entry, for publishing to a renderer
    pub fn snapshot(&self) -> HashMap<ActorId, RemoteActor> {
        self.actors.clone()
    }

    pub fn apply(&mut self, message: ServerMessage) -> Vec<ShadowChange> {
        let mut changes = Vec::new();

        match message {
            ServerMessage::CurrentPlayers(roster) => {
                for (_, state) in roster {
                    if self.is_local(state.id) {
                        continue;
                    }
                    let replaced = self
                        .actors
                        .insert(state.id, RemoteActor::spawn(&state))
                        .is_some();
                    if !replaced {
                        changes.push(ShadowChange::Spawned(state.id));
                    }
                }
            }
            ServerMessage::NewPlayer(state) => {
                if !self.is_local(state.id) {
                    let replaced = self
                        .actors
                        .insert(state.id, RemoteActor::spawn(&state))
                        .is_some();
                    if !replaced {
                        changes.push(ShadowChange::Spawned(state.id));
                    }
                }
            }
            ServerMessage::PlayerDisconnected(id) => {
                if self.actors.remove(&id).is_some() {
                    changes.push(ShadowChange::Despawned(id));
                } else {
                    debug!("Disconnect for unknown actor {}", id);
                }
            }
            ServerMessage::PlayerMoved(state) => {
                if self.is_local(state.id) {
                    return changes;
                }
                match self.actors.get_mut(&state.id) {
                    Some(actor) => {
                        actor.target = state.position();
                        actor.animation = state.animation;
                        actor.moving = true;
                    }
                    None => {
                        debug!("Movement for unseen actor {}, spawning it", state.id);
                        let mut actor = RemoteActor::spawn(&state);
                        actor.moving = true;
                        self.actors.insert(state.id, actor);
                        changes.push(ShadowChange::Spawned(state.id));
                    }
                }
            }
            ServerMessage::PlayerStopped(state) => {
                if let Some(actor) = self.actors.get_mut(&state.id) {
                    actor.position = state.position();
                    actor.target = actor.position;
                    actor.animation = state.animation;
                    actor.moving = false;
                }
            }
        }

        changes
    }

    /// Advances every displayed position by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        let interpolation = self.interpolation;
        for actor in self.actors.values_mut() {
            if !actor.is_settled() {
                actor.position = interpolation.step(actor.position, actor.target, dt);
            }
        }
    }

    fn is_local(&self, id: ActorId) -> bool {
        self.local_id == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn state(id: u64, x: f32, y: f32, animation: Animation) -> ActorState {
        ActorState::new(ActorId(id), Position::new(x, y), animation)
    }

    #[test]
    fn test_current_players_populates_table() {
        let mut table = ShadowTable::default();
        let mut roster = HashMap::new();
        roster.insert(ActorId(1), state(1, 10.0, 20.0, Animation::Up));
        roster.insert(ActorId(2), state(2, 30.0, 40.0, Animation::Left));

        let mut changes = table.apply(ServerMessage::CurrentPlayers(roster));
        changes.sort_by_key(|change| match change {
            ShadowChange::Spawned(id) | ShadowChange::Despawned(id) => id.0,
        });

        assert_eq!(
            changes,
            vec![
                ShadowChange::Spawned(ActorId(1)),
                ShadowChange::Spawned(ActorId(2))
            ]
        );
        assert_eq!(table.len(), 2);
        let actor = table.get(ActorId(2)).unwrap();
        assert_eq!(actor.position, Position::new(30.0, 40.0));
        assert_eq!(actor.animation, Animation::Left);
        assert!(!actor.moving);
    }

    #[test]
    fn test_empty_roster_changes_nothing() {
        let mut table = ShadowTable::default();
        assert!(table
            .apply(ServerMessage::CurrentPlayers(HashMap::new()))
            .is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_local_id_is_never_shadowed() {
        let mut table = ShadowTable::default().with_local_id(ActorId(7));

        assert!(table
            .apply(ServerMessage::NewPlayer(state(7, 0.0, 0.0, Animation::Down)))
            .is_empty());
        assert!(table
            .apply(ServerMessage::PlayerMoved(state(7, 5.0, 0.0, Animation::Right)))
            .is_empty());
        assert!(table.get(ActorId(7)).is_none());
    }

    #[test]
    fn test_moved_for_unknown_id_spawns() {
        let mut table = ShadowTable::default();
        let changes = table.apply(ServerMessage::PlayerMoved(state(3, 5.0, 6.0, Animation::Up)));

        assert_eq!(changes, vec![ShadowChange::Spawned(ActorId(3))]);
        let actor = table.get(ActorId(3)).unwrap();
        assert_eq!(actor.position, Position::new(5.0, 6.0));
        assert!(actor.moving);
    }

    #[test]
    fn test_moved_sets_target_and_tick_approaches() {
        let mut table = ShadowTable::new(Interpolation::Linear { speed: 100.0 });
        table.apply(ServerMessage::NewPlayer(state(1, 0.0, 0.0, Animation::Down)));
        table.apply(ServerMessage::PlayerMoved(state(1, 10.0, 0.0, Animation::Right)));

        let actor = table.get(ActorId(1)).unwrap();
        assert_eq!(actor.target, Position::new(10.0, 0.0));
        assert_eq!(actor.position, Position::new(0.0, 0.0));
        assert_eq!(actor.animation, Animation::Right);

        table.tick(0.05);
        assert_approx_eq!(table.get(ActorId(1)).unwrap().position.x, 5.0, 1e-4);

        table.tick(0.05);
        table.tick(0.05);
        assert_eq!(
            table.get(ActorId(1)).unwrap().position,
            Position::new(10.0, 0.0)
        );
    }

    #[test]
    fn test_stopped_snaps_and_clears_moving() {
        let mut table = ShadowTable::default();
        table.apply(ServerMessage::NewPlayer(state(1, 0.0, 0.0, Animation::Down)));
        table.apply(ServerMessage::PlayerMoved(state(1, 50.0, 0.0, Animation::Right)));
        table.tick(0.01);

        table.apply(ServerMessage::PlayerStopped(state(1, 60.0, 0.0, Animation::Right)));

        let actor = table.get(ActorId(1)).unwrap();
        assert_eq!(actor.position, Position::new(60.0, 0.0));
        assert!(actor.is_settled());
        assert!(!actor.moving);
    }

    #[test]
    fn test_disconnect_despawns_once() {
        let mut table = ShadowTable::default();
        table.apply(ServerMessage::NewPlayer(state(4, 0.0, 0.0, Animation::Down)));

        assert_eq!(
            table.apply(ServerMessage::PlayerDisconnected(ActorId(4))),
            vec![ShadowChange::Despawned(ActorId(4))]
        );
        assert!(table
            .apply(ServerMessage::PlayerDisconnected(ActorId(4)))
            .is_empty());
    }

    #[test]
    fn test_exponential_settles() {
        let interpolation = Interpolation::default();
        let target = Position::new(100.0, 0.0);
        let mut position = Position::new(0.0, 0.0);

        position = interpolation.step(position, target, 1.0 / 60.0);
        assert!(position.x > 0.0 && position.x < 100.0);

        for _ in 0..120 {
            position = interpolation.step(position, target, 1.0 / 60.0);
        }
        assert_eq!(position, target);
    }

    #[test]
    fn test_snap_lands_immediately() {
        let target = Position::new(3.0, 4.0);
        assert_eq!(
            Interpolation::Snap.step(Position::default(), target, 0.001),
            target
        );
    }

    #[test]
    fn test_parse_interpolation() {
        assert_eq!("snap".parse::<Interpolation>(), Ok(Interpolation::Snap));
        assert_eq!(
            "linear:250".parse::<Interpolation>(),
            Ok(Interpolation::Linear { speed: 250.0 })
        );
        assert_eq!(
            "exponential".parse::<Interpolation>(),
            Ok(Interpolation::Exponential { rate: 12.0 })
        );
        tokio_test::assert_err!("linear:-1".parse::<Interpolation>());
        tokio_test::assert_err!("cubic".parse::<Interpolation>());

        let policy = Interpolation::Linear { speed: 80.0 };
        assert_eq!(policy.to_string().parse::<Interpolation>(), Ok(policy));
    }
}
