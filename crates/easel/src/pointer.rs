//! Pointer enter/leave normalization, click detection and wheel stepping
//!
//! Raw enter can fire before any move carries a usable position, and raw
//! leave may report coordinates outside the client area. The transition
//! filter defers enter to the first move and reports leave at the last
//! position seen inside the window.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use embedded_graphics::prelude::Point;
use winit::event::MouseButton;

/// Semantic pointer boundary crossing produced by [`PointerTransitionFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTransition {
    /// Pointer entered at this position
    Enter(Point),
    /// Pointer left; position is the last one seen inside the window
    Leave(Point),
}

#[derive(Debug, Default)]
struct MotionState {
    last: Option<Point>,
    pending_enter: bool,
}

/// Enter/leave normalization for one window
///
/// All state sits behind one mutex so the ordering contract holds even when
/// raw callbacks are delivered from more than one thread.
#[derive(Debug, Default)]
pub struct PointerTransitionFilter {
    state: Mutex<MotionState>,
}

impl PointerTransitionFilter {
    /// Create a filter that has seen no pointer activity yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw enter: defer until the next move
    pub fn enter(&self) -> Option<PointerTransition> {
        self.lock().pending_enter = true;
        None
    }

    /// Raw move: records the position, emits the deferred enter if pending
    pub fn moved(&self, position: Point) -> Option<PointerTransition> {
        let mut state = self.lock();
        state.last = Some(position);
        if std::mem::take(&mut state.pending_enter) {
            Some(PointerTransition::Enter(position))
        } else {
            None
        }
    }

    /// Raw leave: emits leave at the last recorded position, if any
    pub fn leave(&self) -> Option<PointerTransition> {
        self.lock().last.map(PointerTransition::Leave)
    }

    /// Last position recorded by [`moved`](Self::moved)
    pub fn last_position(&self) -> Option<Point> {
        self.lock().last
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MotionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Derives clicks from press/release pairs
///
/// A release counts as a click only when the same button was pressed inside
/// the window first.
#[derive(Debug, Default)]
pub struct ClickTracker {
    pressed: HashSet<MouseButton>,
}

impl ClickTracker {
    /// Create a tracker with no buttons held
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw button press
    pub fn press(&mut self, button: MouseButton) {
        self.pressed.insert(button);
    }

    /// Raw button release; returns `true` when it completes a click
    pub fn release(&mut self, button: MouseButton) -> bool {
        self.pressed.remove(&button)
    }
}

/// Pixel deltas (touchpads) are converted to notches at this rate.
pub const PIXELS_PER_NOTCH: f64 = 40.0;

/// Accumulates fractional wheel deltas and yields whole notches
///
/// Positive = scroll up / away from the user. The fractional remainder is
/// kept across calls so slow touchpad scrolling still produces notches.
#[derive(Debug, Default)]
pub struct WheelAccumulator {
    acc: f64,
}

impl WheelAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` notches; returns the whole notches completed, if any
    #[allow(clippy::cast_possible_truncation)] // trunc() of a bounded accumulator
    pub fn push(&mut self, delta: f64) -> Option<i32> {
        self.acc += delta;
        let steps = self.acc.trunc() as i32;
        if steps != 0 {
            self.acc -= f64::from(steps);
            Some(steps)
        } else {
            None
        }
    }
}
