use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Keys the viewer can bind. Anything else the platform reports is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Space,
    LeftShift,
    LeftCtrl,
    Escape,
    Up,
    Down,
    Left,
    Right,
}

/// Something the platform layer observed since the last poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    CloseRequested,
    KeyPressed(Key),
    KeyReleased(Key),
    /// Relative pointer motion in device units.
    PointerMoved(Vec2),
}

/// What the camera and engine need from the outside world.
pub trait InputSource {
    /// Drain everything queued since the last call, applying it to the held
    /// key set and pointer accumulator before returning it.
    fn poll_events(&mut self) -> Vec<InputEvent>;

    /// Pointer motion accumulated since the last call. Reading resets it.
    fn take_pointer_delta(&mut self) -> Vec2;

    fn is_held(&self, key: Key) -> bool;

    /// Move the OS cursor back to its anchor so the next delta is relative.
    /// Sources without a cursor have nothing to do.
    fn recenter_pointer(&mut self) {}
}

/// Event-fed input snapshot.
///
/// The platform layer pushes events as they arrive; the engine drains them
/// once per frame through [`InputSource::poll_events`].
#[derive(Debug, Default)]
pub struct InputState {
    pending: VecDeque<InputEvent>,
    held: BTreeSet<Key>,
    pointer: Vec2,
    recenters: u64,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.pending.push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// How many times the pointer was re-centered.
    pub fn recenter_count(&self) -> u64 {
        self.recenters
    }

    fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyPressed(key) => {
                self.held.insert(key);
            }
            InputEvent::KeyReleased(key) => {
                self.held.remove(&key);
            }
            InputEvent::PointerMoved(delta) => self.pointer += delta,
            InputEvent::CloseRequested => {}
        }
    }
}

impl InputSource for InputState {
    fn poll_events(&mut self) -> Vec<InputEvent> {
        let events: Vec<InputEvent> = self.pending.drain(..).collect();
        for event in &events {
            self.apply(*event);
        }
        if !events.is_empty() {
            tracing::trace!(count = events.len(), "drained input events");
        }
        events
    }

    fn take_pointer_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.pointer)
    }

    fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    fn recenter_pointer(&mut self) {
        self.recenters += 1;
    }
}
