//! Typed event channels
//!
//! [`EventRouter`] holds one [`SubscriberList`] per channel. The UI thread
//! publishes into it; handlers run on the publishing thread, never on the
//! thread that subscribed them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use embedded_graphics::prelude::Point;
use winit::event::MouseButton;
use winit::keyboard::{KeyCode, ModifiersState};

/// Payload of pointer channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseArgs {
    /// Pointer position in canvas coordinates
    pub position: Point,
    /// Button involved (down/up/click only)
    pub button: Option<MouseButton>,
    /// Whole wheel notches, positive away from the user (wheel only)
    pub wheel_delta: i32,
}

impl MouseArgs {
    /// Payload carrying only a position
    pub fn at(position: Point) -> Self {
        Self {
            position,
            button: None,
            wheel_delta: 0,
        }
    }

    /// Payload for a button notification
    pub fn button(position: Point, button: MouseButton) -> Self {
        Self {
            button: Some(button),
            ..Self::at(position)
        }
    }

    /// Payload for a wheel notification
    pub fn wheel(position: Point, notches: i32) -> Self {
        Self {
            wheel_delta: notches,
            ..Self::at(position)
        }
    }
}

/// Payload of keyboard channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyArgs {
    /// Physical key
    pub key: KeyCode,
    /// Modifiers held when the notification arrived
    pub modifiers: ModifiersState,
    /// Text produced by the key, if any (key-pressed carries it on repeats too)
    pub text: Option<String>,
}

impl KeyArgs {
    /// Key without modifiers or text
    pub fn new(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: ModifiersState::empty(),
            text: None,
        }
    }

    /// Same key with `modifiers` held
    pub fn with_modifiers(mut self, modifiers: ModifiersState) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Same key producing `text`
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// A semantic event, tagged with the channel it is published on
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Event {
    MouseClick(MouseArgs),
    MouseMove(MouseArgs),
    MouseDown(MouseArgs),
    MouseUp(MouseArgs),
    MouseWheel(MouseArgs),
    MouseEnter(MouseArgs),
    MouseLeave(MouseArgs),
    KeyDown(KeyArgs),
    KeyPressed(KeyArgs),
    KeyUp(KeyArgs),
    WindowMove,
}

impl Event {
    /// Channel name, for logs
    pub fn channel(&self) -> &'static str {
        match self {
            Event::MouseClick(_) => "mouse-click",
            Event::MouseMove(_) => "mouse-move",
            Event::MouseDown(_) => "mouse-down",
            Event::MouseUp(_) => "mouse-up",
            Event::MouseWheel(_) => "mouse-wheel",
            Event::MouseEnter(_) => "mouse-enter",
            Event::MouseLeave(_) => "mouse-leave",
            Event::KeyDown(_) => "key-down",
            Event::KeyPressed(_) => "key-pressed",
            Event::KeyUp(_) => "key-up",
            Event::WindowMove => "window-move",
        }
    }
}

/// Token returned by [`SubscriberList::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler<S, A> = Arc<dyn Fn(&S, &A) + Send + Sync>;

/// Ordered handler list for one channel
///
/// Publishing takes a snapshot of the list (an `Arc` clone) and runs the
/// handlers without holding the lock, so handlers may subscribe or
/// unsubscribe anything, including themselves. Changes take effect from the
/// next publish; the current one neither skips nor repeats a handler.
pub struct SubscriberList<S, A> {
    next_id: AtomicU64,
    handlers: Mutex<Arc<BTreeMap<SubscriptionId, Handler<S, A>>>>,
}

impl<S, A> SubscriberList<S, A> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            handlers: Mutex::new(Arc::new(BTreeMap::new())),
        }
    }

    /// Append a handler; it runs after every handler subscribed before it
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&S, &A) + Send + Sync + 'static,
    {
        // Ids are monotonic, so map order is subscription order.
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut handlers).insert(id, Arc::new(handler));
        id
    }

    /// Remove a handler; returns `false` if it was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        if !handlers.contains_key(&id) {
            return false;
        }
        Arc::make_mut(&mut handlers).remove(&id).is_some()
    }

    /// Invoke every handler, in subscription order, on the calling thread
    pub fn publish(&self, sender: &S, args: &A) {
        let snapshot = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in snapshot.values() {
            handler(sender, args);
        }
    }

    /// Number of subscribed handlers
    pub fn len(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// `true` when nobody is subscribed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S, A> Default for SubscriberList<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> std::fmt::Debug for SubscriberList<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberList")
            .field("handlers", &self.len())
            .finish()
    }
}

/// The fixed table of channels one window publishes into
///
/// `S` is the object handed to handlers as the event's origin.
#[derive(Debug)]
#[allow(missing_docs)]
pub struct EventRouter<S> {
    pub mouse_click: SubscriberList<S, MouseArgs>,
    pub mouse_move: SubscriberList<S, MouseArgs>,
    pub mouse_down: SubscriberList<S, MouseArgs>,
    pub mouse_up: SubscriberList<S, MouseArgs>,
    pub mouse_wheel: SubscriberList<S, MouseArgs>,
    pub mouse_enter: SubscriberList<S, MouseArgs>,
    pub mouse_leave: SubscriberList<S, MouseArgs>,
    pub key_down: SubscriberList<S, KeyArgs>,
    pub key_pressed: SubscriberList<S, KeyArgs>,
    pub key_up: SubscriberList<S, KeyArgs>,
    pub window_move: SubscriberList<S, ()>,
}

impl<S> EventRouter<S> {
    /// Router with every channel empty
    pub fn new() -> Self {
        Self {
            mouse_click: SubscriberList::new(),
            mouse_move: SubscriberList::new(),
            mouse_down: SubscriberList::new(),
            mouse_up: SubscriberList::new(),
            mouse_wheel: SubscriberList::new(),
            mouse_enter: SubscriberList::new(),
            mouse_leave: SubscriberList::new(),
            key_down: SubscriberList::new(),
            key_pressed: SubscriberList::new(),
            key_up: SubscriberList::new(),
            window_move: SubscriberList::new(),
        }
    }

    /// Deliver `event` to its channel's handlers
    pub fn publish(&self, sender: &S, event: &Event) {
        match event {
            Event::MouseClick(args) => self.mouse_click.publish(sender, args),
            Event::MouseMove(args) => self.mouse_move.publish(sender, args),
            Event::MouseDown(args) => self.mouse_down.publish(sender, args),
            Event::MouseUp(args) => self.mouse_up.publish(sender, args),
            Event::MouseWheel(args) => self.mouse_wheel.publish(sender, args),
            Event::MouseEnter(args) => self.mouse_enter.publish(sender, args),
            Event::MouseLeave(args) => self.mouse_leave.publish(sender, args),
            Event::KeyDown(args) => self.key_down.publish(sender, args),
            Event::KeyPressed(args) => self.key_pressed.publish(sender, args),
            Event::KeyUp(args) => self.key_up.publish(sender, args),
            Event::WindowMove => self.window_move.publish(sender, &()),
        }
    }
}

impl<S> Default for EventRouter<S> {
    fn default() -> Self {
        Self::new()
    }
}
