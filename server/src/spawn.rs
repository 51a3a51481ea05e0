//! Where freshly joined actors appear
//!
//! The default is a fixed point. When a Tiled JSON map is configured, the
//! first object named `playerSpawn` in the `spawns` object layer overrides
//! it. Any problem reading the map falls back to the default.

use log::{info, warn};
use serde::Deserialize;
use shared::{Animation, Position, DEFAULT_SPAWN_X, DEFAULT_SPAWN_Y};
use std::path::Path;
use thiserror::Error;

const SPAWN_LAYER: &str = "spawns";
const SPAWN_OBJECT: &str = "playerSpawn";

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to read map: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse map: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("map has no `playerSpawn` object in a `spawns` layer")]
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub position: Position,
    pub animation: Animation,
}

impl Default for SpawnPoint {
    fn default() -> Self {
        Self {
            position: Position::new(DEFAULT_SPAWN_X, DEFAULT_SPAWN_Y),
            animation: Animation::Down,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TiledMap {
    #[serde(default)]
    layers: Vec<TiledLayer>,
}

#[derive(Debug, Deserialize)]
struct TiledLayer {
    #[serde(default)]
    name: String,
    #[serde(default)]
    objects: Vec<TiledObject>,
}

#[derive(Debug, Deserialize)]
struct TiledObject {
    #[serde(default)]
    name: String,
    x: f32,
    y: f32,
}

impl SpawnPoint {
    /// Extracts the spawn object from Tiled map JSON.
    pub fn from_tiled_json(json: &str) -> Result<Self, SpawnError> {
        let map: TiledMap = serde_json::from_str(json)?;

        map.layers
            .iter()
            .filter(|layer| layer.name == SPAWN_LAYER)
            .flat_map(|layer| layer.objects.iter())
            .find(|object| object.name == SPAWN_OBJECT)
            .filter(|object| object.x.is_finite() && object.y.is_finite())
            .map(|object| SpawnPoint {
                position: Position::new(object.x, object.y),
                ..SpawnPoint::default()
            })
            .ok_or(SpawnError::Missing)
    }

    pub fn from_tiled_file(path: &Path) -> Result<Self, SpawnError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_tiled_json(&json)
    }

    /// Spawn point for this process: the map's, if one is configured and
    /// readable, otherwise the fixed default.
    pub fn resolve(map: Option<&Path>) -> Self {
        let Some(path) = map else {
            return SpawnPoint::default();
        };

        match Self::from_tiled_file(path) {
            Ok(spawn) => {
                info!(
                    "Using spawn point ({}, {}) from {}",
                    spawn.position.x,
                    spawn.position.y,
                    path.display()
                );
                spawn
            }
            Err(e) => {
                let fallback = SpawnPoint::default();
                warn!(
                    "{} ({}), falling back to ({}, {})",
                    e,
                    path.display(),
                    fallback.position.x,
                    fallback.position.y
                );
                fallback
            }
        }
    }
}
