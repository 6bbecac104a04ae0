//! Sora Services Layer
//!
//! Platform-facing pieces the core stays ignorant of: settings files and
//! input state.

pub mod input;
pub mod settings;

pub use input::InputState;
pub use settings::{Settings, SettingsError};
