use serde::{Deserialize, Serialize};
use std::fmt;

pub mod protocol;

pub use protocol::{ClientMessage, ProtocolError, ServerMessage};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_SPAWN_X: f32 = 516.0;
pub const DEFAULT_SPAWN_Y: f32 = 230.0;
pub const MOVEMENT_SEND_INTERVAL_MS: u64 = 50;
pub const PLAYER_SPEED: f32 = 100.0;

/// Server-assigned identity of a connection and of the actor it owns.
///
/// Ids come from a monotonically increasing counter, so an id is never
/// handed out twice during the lifetime of a server process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear blend towards `target`; `t` is clamped to `[0, 1]`.
    pub fn lerp(&self, target: &Position, t: f32) -> Position {
        let t = t.clamp(0.0, 1.0);
        Position {
            x: self.x + (target.x - self.x) * t,
            y: self.y + (target.y - self.y) * t,
        }
    }

    /// Steps towards `target` by at most `max_step`, landing exactly on it
    /// when closer than that.
    pub fn move_towards(&self, target: &Position, max_step: f32) -> Position {
        let distance = self.distance_to(target);
        if distance <= max_step || distance < f32::EPSILON {
            return *target;
        }
        self.lerp(target, max_step / distance)
    }
}

/// Facing/motion label shared by every actor. The set is closed: any other
/// label on the wire makes the message malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Animation {
    #[default]
    Down,
    Up,
    Left,
    Right,
}

impl Animation {
    pub const ALL: [Animation; 4] = [
        Animation::Down,
        Animation::Up,
        Animation::Left,
        Animation::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Animation::Down => "down",
            Animation::Up => "up",
            Animation::Left => "left",
            Animation::Right => "right",
        }
    }

    /// Unit direction of travel for this facing, screen coordinates (y down).
    pub fn direction(&self) -> (f32, f32) {
        match self {
            Animation::Down => (0.0, 1.0),
            Animation::Up => (0.0, -1.0),
            Animation::Left => (-1.0, 0.0),
            Animation::Right => (1.0, 0.0),
        }
    }
}

impl fmt::Display for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intent payload a client reports about its own actor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Movement {
    pub x: f32,
    pub y: f32,
    pub animation: Animation,
}

impl Movement {
    pub fn new(position: Position, animation: Animation) -> Self {
        Self {
            x: position.x,
            y: position.y,
            animation,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Actor record as the server publishes it to peers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub x: f32,
    pub y: f32,
    #[serde(rename = "playerId")]
    pub id: ActorId,
    pub animation: Animation,
}

impl ActorState {
    pub fn new(id: ActorId, position: Position, animation: Animation) -> Self {
        Self {
            x: position.x,
            y: position.y,
            id,
            animation,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}
