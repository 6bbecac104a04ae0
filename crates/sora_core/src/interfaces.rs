//! Collaborator contracts
//!
//! The core never opens windows, decodes files or reads devices. Those jobs
//! belong to whatever implements these traits: a windowed backend in a game,
//! a recording stub in tests and headless runs.

use crate::math::{Rect, Vec2};
use std::path::Path;

/// RGBA colour, 8 bits per channel.
pub type Rgba = [u8; 4];

/// Decoded raster image, tightly packed RGBA8 rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Image {
    /// Image of a single flat colour.
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let pixels = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Source of decoded images. Caching and file formats are the
/// implementor's business.
pub trait AssetLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&mut self, path: &Path) -> Result<Image, Self::Error>;
}

/// Discrete key/button identifier, backend-defined.
pub type KeyCode = u32;

pub trait InputSource {
    /// Sample device state. Called once at the start of every frame.
    fn poll(&mut self);

    fn is_pressed(&self, key: KeyCode) -> bool;

    /// Whether the platform asked the loop to stop (window closed etc.).
    fn quit_requested(&self) -> bool {
        false
    }
}

pub trait Renderer {
    fn draw_rect(&mut self, rect: Rect, color: Rgba);

    fn draw_image(&mut self, image: &Image, position: Vec2);

    /// Finish the frame.
    fn present(&mut self);
}
