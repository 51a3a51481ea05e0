//! Random-walk driver standing in for keyboard input

use crate::sampler::LocalIntent;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Animation, Position, PLAYER_SPEED};

/// Area the walker stays inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    pub fn contains(&self, position: &Position) -> bool {
        position.x >= self.min.x
            && position.x <= self.max.x
            && position.y >= self.min.y
            && position.y <= self.max.y
    }

    fn clamp(&self, position: Position) -> Position {
        Position::new(
            position.x.clamp(self.min.x, self.max.x),
            position.y.clamp(self.min.y, self.max.y),
        )
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: Position::new(0.0, 0.0),
            max: Position::new(1024.0, 768.0),
        }
    }
}

/// Walks in one of the four facings for a random stretch, then picks again.
/// Some stretches are spent standing still so stop events get exercised.
pub struct RandomWalker {
    rng: StdRng,
    bounds: Bounds,
    speed: f32,
    position: Position,
    animation: Animation,
    moving: bool,
    leg_remaining: f32,
}

impl RandomWalker {
    pub fn new(start: Position, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            bounds: Bounds::default(),
            speed: PLAYER_SPEED,
            position: start,
            animation: Animation::Down,
            moving: false,
            leg_remaining: 0.0,
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self.position = bounds.clamp(self.position);
        self
    }

    pub fn intent(&self) -> LocalIntent {
        LocalIntent {
            position: self.position,
            animation: self.animation,
            moving: self.moving,
        }
    }

    /// Advances the walk by `dt` seconds
    pub fn step(&mut self, dt: f32) -> LocalIntent {
        if self.leg_remaining <= 0.0 {
            self.start_leg();
        }
        self.leg_remaining -= dt;

        if self.moving {
            let (dx, dy) = self.animation.direction();
            let next = Position::new(
                self.position.x + dx * self.speed * dt,
                self.position.y + dy * self.speed * dt,
            );

            if self.bounds.contains(&next) {
                self.position = next;
            } else {
                self.position = self.bounds.clamp(next);
                self.leg_remaining = 0.0;
            }
        }

        self.intent()
    }

    fn start_leg(&mut self) {
        self.moving = self.rng.gen_bool(0.75);
        if self.moving {
            self.animation = Animation::ALL[self.rng.gen_range(0..Animation::ALL.len())];
        }
        self.leg_remaining = self.rng.gen_range(0.3..1.5);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_walker_stays_in_bounds() {
        let bounds = Bounds {
            min: Position::new(0.0, 0.0),
            max: Position::new(50.0, 50.0),
        };
        let mut walker = RandomWalker::new(Position::new(25.0, 25.0), 42).with_bounds(bounds);

        for _ in 0..5_000 {
            let intent = walker.step(1.0 / 60.0);
            assert!(bounds.contains(&intent.position), "{:?}", intent.position);
        }
    }

    #[test]
    fn test_same_seed_same_walk() {
        let mut a = RandomWalker::new(Position::new(516.0, 230.0), 7);
        let mut b = RandomWalker::new(Position::new(516.0, 230.0), 7);

        for _ in 0..600 {
            assert_eq!(a.step(1.0 / 60.0), b.step(1.0 / 60.0));
        }
    }

    #[test]
    fn test_walker_moves_at_player_speed() {
        let mut walker = RandomWalker::new(Position::new(516.0, 230.0), 1);
        let dt = 1.0 / 60.0;

        for _ in 0..600 {
            let before = walker.intent().position;
            let intent = walker.step(dt);
            let travelled = before.distance_to(&intent.position);
            if intent.moving && walker.leg_remaining > 0.0 {
                assert_approx_eq!(travelled, PLAYER_SPEED * dt, 1e-3);
            } else if !intent.moving {
                assert_eq!(travelled, 0.0);
            }
        }
    }

    #[test]
    fn test_walker_both_moves_and_rests() {
        let mut walker = RandomWalker::new(Position::new(516.0, 230.0), 99);
        let intents: Vec<LocalIntent> = (0..3_600).map(|_| walker.step(1.0 / 60.0)).collect();

        assert!(intents.iter().any(|intent| intent.moving));
        assert!(intents.iter().any(|intent| !intent.moving));
    }
}
