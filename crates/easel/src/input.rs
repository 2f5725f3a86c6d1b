//! Raw input → semantic events
//!
//! Backends deliver [`RawEvent`]s into a window's queue. The UI thread runs
//! them through an [`InputPipeline`], which owns the per-window filters
//! ([`KeyRepeatFilter`], [`PointerTransitionFilter`], click and wheel
//! tracking) and yields the [`Event`]s to publish.
//!
//! | Raw                | Published (in order)                          |
//! |--------------------|-----------------------------------------------|
//! | key down           | key-down (first of a press), key-pressed      |
//! | key up             | key-up                                        |
//! | pointer enter      | nothing (deferred)                            |
//! | pointer move       | mouse-enter (if deferred), mouse-move         |
//! | pointer leave      | mouse-leave at the last move, if any          |
//! | button down        | mouse-down                                    |
//! | button up          | mouse-click (if pressed inside), mouse-up     |
//! | wheel              | mouse-wheel per whole notch accumulated       |
//! | window moved       | window-move                                   |

use embedded_graphics::prelude::Point;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::events::{Event, KeyArgs, MouseArgs};
use crate::keys::{KeyRepeatFilter, KeyTransition};
use crate::pointer::{ClickTracker, PointerTransition, PointerTransitionFilter, WheelAccumulator};

/// Notification straight from the windowing system
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    /// Key went down (auto-repeats arrive as further `KeyDown`s)
    KeyDown(KeyArgs),
    /// Key released
    KeyUp(KeyArgs),
    /// Pointer crossed into the client area
    PointerEnter,
    /// Pointer left the client area
    PointerLeave,
    /// Pointer moved, client coordinates
    PointerMove(Point),
    /// Mouse button pressed
    ButtonDown(MouseButton),
    /// Mouse button released
    ButtonUp(MouseButton),
    /// Wheel turned by this many notches (fractional for touchpads)
    Wheel(f64),
    /// Window moved on the desktop
    Moved(Point),
    /// The OS wants the visible contents repainted
    Redraw,
    /// The user asked to close the window
    CloseRequested,
}

/// What the UI loop must do with one raw event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Publish these events, in order
    Publish(Vec<Event>),
    /// Repaint the last presented contents
    Redraw,
    /// Tear the window down
    Close,
}

/// Per-window filter chain, owned by the UI thread
#[derive(Debug, Default)]
pub struct InputPipeline {
    keys: KeyRepeatFilter,
    pointer: PointerTransitionFilter,
    clicks: ClickTracker,
    wheel: WheelAccumulator,
}

impl InputPipeline {
    /// Create a pipeline with no input seen yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one raw event
    pub fn route(&mut self, raw: RawEvent) -> Routed {
        let events = match raw {
            RawEvent::KeyDown(args) => self
                .keys
                .key_down(args.key)
                .map(|transition| key_event(transition, args.clone()))
                .collect(),
            RawEvent::KeyUp(args) => vec![key_event(self.keys.key_up(args.key), args)],
            RawEvent::PointerEnter => self.pointer.enter().map(pointer_event).into_iter().collect(),
            RawEvent::PointerMove(position) => {
                let mut events: Vec<Event> =
                    self.pointer.moved(position).map(pointer_event).into_iter().collect();
                events.push(Event::MouseMove(MouseArgs::at(position)));
                events
            }
            RawEvent::PointerLeave => self.pointer.leave().map(pointer_event).into_iter().collect(),
            RawEvent::ButtonDown(button) => {
                self.clicks.press(button);
                vec![Event::MouseDown(MouseArgs::button(self.position(), button))]
            }
            RawEvent::ButtonUp(button) => {
                let args = MouseArgs::button(self.position(), button);
                if self.clicks.release(button) {
                    vec![Event::MouseClick(args), Event::MouseUp(args)]
                } else {
                    vec![Event::MouseUp(args)]
                }
            }
            RawEvent::Wheel(delta) => self
                .wheel
                .push(delta)
                .map(|notches| Event::MouseWheel(MouseArgs::wheel(self.position(), notches)))
                .into_iter()
                .collect(),
            RawEvent::Moved(_) => vec![Event::WindowMove],
            RawEvent::Redraw => return Routed::Redraw,
            RawEvent::CloseRequested => return Routed::Close,
        };
        Routed::Publish(events)
    }

    /// Whether the pipeline considers `key` held
    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys.is_held(key)
    }

    /// Buttons carry no position of their own; use the last move.
    fn position(&self) -> Point {
        self.pointer.last_position().unwrap_or_default()
    }
}

fn key_event(transition: KeyTransition, args: KeyArgs) -> Event {
    match transition {
        KeyTransition::Down => Event::KeyDown(args),
        KeyTransition::Pressed => Event::KeyPressed(args),
        KeyTransition::Up => Event::KeyUp(args),
    }
}

fn pointer_event(transition: PointerTransition) -> Event {
    match transition {
        PointerTransition::Enter(position) => Event::MouseEnter(MouseArgs::at(position)),
        PointerTransition::Leave(position) => Event::MouseLeave(MouseArgs::at(position)),
    }
}
