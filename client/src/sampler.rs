//! Local intent sampling with rate limiting and stop-edge detection

use shared::{Animation, ClientMessage, Movement, Position, MOVEMENT_SEND_INTERVAL_MS};
use std::time::{Duration, Instant};

/// What the local actor is doing this frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocalIntent {
    pub position: Position,
    pub animation: Animation,
    pub moving: bool,
}

impl LocalIntent {
    pub fn moving(position: Position, animation: Animation) -> Self {
        Self {
            position,
            animation,
            moving: true,
        }
    }

    pub fn stationary(position: Position, animation: Animation) -> Self {
        Self {
            position,
            animation,
            moving: false,
        }
    }

    fn movement(&self) -> Movement {
        Movement::new(self.position, self.animation)
    }
}

/// Turns per-frame local state into outgoing intents.
///
/// Movement is sent at most once per interval and only when it differs from
/// the last one sent. The transition from moving to stationary always
/// produces exactly one `playerStopped`, regardless of the interval.
#[derive(Debug)]
pub struct IntentSampler {
    interval: Duration,
    last_movement_sent: Option<Instant>,
    last_sent: Option<Movement>,
    was_moving: bool,
}

impl IntentSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_movement_sent: None,
            last_sent: None,
            was_moving: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn sample(&mut self, intent: &LocalIntent, now: Instant) -> Option<ClientMessage> {
        let movement = intent.movement();

        if !intent.moving {
            if !self.was_moving {
                return None;
            }
            self.was_moving = false;
            self.last_sent = Some(movement);
            return Some(ClientMessage::PlayerStopped(movement));
        }

        self.was_moving = true;

        let due = self
            .last_movement_sent
            .map_or(true, |sent| now.duration_since(sent) >= self.interval);
        let changed = self.last_sent != Some(movement);

        if due && changed {
            self.last_movement_sent = Some(now);
            self.last_sent = Some(movement);
            Some(ClientMessage::PlayerMovement(movement))
        } else {
            None
        }
    }
}

impl Default for IntentSampler {
    fn default() -> Self {
        Self::new(Duration::from_millis(MOVEMENT_SEND_INTERVAL_MS))
    }
}
