//! Settings management

use serde::{Deserialize, Serialize};
use sora_core::physics::CollisionMask;
use sora_core::signal::ReceiverPolicy;
use sora_core::world::{WorldConfig, WorldError};
use sora_core::EngineOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Engine settings. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    pub world: WorldConfig,
    pub physics: PhysicsSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Paint Gun Rogue-Lite".to_string(),
            width: 1280,
            height: 720,
            target_fps: sora_core::time::DEFAULT_FPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// What a failing signal receiver does to the rest of the emission.
    pub receiver_policy: ReceiverPolicy,
    pub default_mask: CollisionMask,
    /// Fixed step in seconds; wall-clock stepping when absent.
    pub fixed_delta: Option<f32>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid world settings: {0}")]
    World(#[from] WorldError),
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.world.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json_str(&json)?;
        info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn to_json_string(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            world: self.world,
            target_fps: self.window.target_fps,
            receiver_policy: self.physics.receiver_policy,
            default_mask: self.physics.default_mask,
            fixed_delta: self.physics.fixed_delta,
        }
    }
}
