//! Input state and scripted playback for headless runs

use sora_core::interfaces::{InputSource, KeyCode};
use std::collections::{BTreeMap, HashSet};
use tracing::trace;

/// Key codes used by the bundled runtime.
pub mod keys {
    use sora_core::interfaces::KeyCode;

    pub const LEFT: KeyCode = 1;
    pub const RIGHT: KeyCode = 2;
    pub const UP: KeyCode = 3;
    pub const DOWN: KeyCode = 4;
    pub const SPACE: KeyCode = 5;
    pub const ESCAPE: KeyCode = 6;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyEvent {
    Press(KeyCode),
    Release(KeyCode),
    Quit,
}

/// Pressed-key set, optionally driven by a per-frame script.
///
/// Each [`poll`](InputSource::poll) advances one frame and applies the events
/// scheduled for it.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pressed: HashSet<KeyCode>,
    script: BTreeMap<u64, Vec<KeyEvent>>,
    frame: u64,
    quit: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: KeyCode) {
        self.pressed.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.pressed.remove(&key);
    }

    /// Press `key` when frame `frame` is polled.
    pub fn press_at(mut self, frame: u64, key: KeyCode) -> Self {
        self.script.entry(frame).or_default().push(KeyEvent::Press(key));
        self
    }

    pub fn release_at(mut self, frame: u64, key: KeyCode) -> Self {
        self.script.entry(frame).or_default().push(KeyEvent::Release(key));
        self
    }

    /// Request quit when frame `frame` is polled.
    pub fn quit_at(mut self, frame: u64) -> Self {
        self.script.entry(frame).or_default().push(KeyEvent::Quit);
        self
    }

    /// Frames polled so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// `-1.0`, `0.0` or `1.0` from a pair of opposing keys.
    pub fn axis(&self, negative: KeyCode, positive: KeyCode) -> f32 {
        let mut value = 0.0;
        if self.is_pressed(negative) {
            value -= 1.0;
        }
        if self.is_pressed(positive) {
            value += 1.0;
        }
        value
    }
}

impl InputSource for InputState {
    fn poll(&mut self) {
        if let Some(events) = self.script.remove(&self.frame) {
            for event in events {
                trace!(frame = self.frame, ?event, "scripted input");
                match event {
                    KeyEvent::Press(key) => self.press(key),
                    KeyEvent::Release(key) => self.release(key),
                    KeyEvent::Quit => self.quit = true,
                }
            }
        }
        self.frame += 1;
    }

    fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}
