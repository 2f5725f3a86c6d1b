//! Key repeat suppression
//!
//! The OS reports a held key as a stream of key-down notifications. The
//! filter turns that stream into one [`KeyTransition::Down`] per physical
//! press, plus a [`KeyTransition::Pressed`] for every notification
//! (auto-repeat ticks included), and an unconditional
//! [`KeyTransition::Up`] on release.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use winit::keyboard::KeyCode;

/// Semantic keyboard notification produced by [`KeyRepeatFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransition {
    /// First raw down of a physical press
    Down,
    /// Every raw down, repeats included
    Pressed,
    /// Raw up
    Up,
}

/// Per-window key state machine, every key starting out released
#[derive(Debug, Default)]
pub struct KeyRepeatFilter {
    held: Mutex<HashMap<KeyCode, bool>>,
}

impl KeyRepeatFilter {
    /// Create a filter with every key up
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw key-down notification
    ///
    /// Yields `[Down, Pressed]` for a released key and `[Pressed]` for a held one.
    pub fn key_down(&self, key: KeyCode) -> impl Iterator<Item = KeyTransition> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        let was_held = held.insert(key, true).unwrap_or(false);
        let down = (!was_held).then_some(KeyTransition::Down);
        down.into_iter().chain(std::iter::once(KeyTransition::Pressed))
    }

    /// Feed a raw key-up notification; always yields [`KeyTransition::Up`]
    pub fn key_up(&self, key: KeyCode) -> KeyTransition {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.insert(key, false);
        KeyTransition::Up
    }

    /// Whether the filter currently considers `key` held
    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied()
            .unwrap_or(false)
    }
}
