use crate::state::Key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A camera movement the user can hold down.
///
/// The camera consumes actions, never raw keys, so rebinding is a config
/// change only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    Up,
    Down,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Forward,
        Action::Back,
        Action::StrafeLeft,
        Action::StrafeRight,
        Action::Up,
        Action::Down,
    ];
}

/// Maps each [`Action`] to the key that triggers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBindings(BTreeMap<Action, Key>);

impl KeyBindings {
    pub fn key_for(&self, action: Action) -> Option<Key> {
        self.0.get(&action).copied()
    }

    /// Rebind `action`, returning the previously bound key.
    pub fn bind(&mut self, action: Action, key: Key) -> Option<Key> {
        self.0.insert(action, key)
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self(BTreeMap::from([
            (Action::Forward, Key::W),
            (Action::Back, Key::S),
            (Action::StrafeLeft, Key::A),
            (Action::StrafeRight, Key::D),
            (Action::Up, Key::Space),
            (Action::Down, Key::LeftShift),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_cover_every_action() {
        let bindings = KeyBindings::default();
        for action in Action::ALL {
            assert!(bindings.key_for(action).is_some(), "{action:?} unbound");
        }
    }

    #[test]
    fn default_bindings_are_wasd_space_shift() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.key_for(Action::Forward), Some(Key::W));
        assert_eq!(bindings.key_for(Action::StrafeLeft), Some(Key::A));
        assert_eq!(bindings.key_for(Action::Up), Some(Key::Space));
        assert_eq!(bindings.key_for(Action::Down), Some(Key::LeftShift));
    }

    #[test]
    fn rebinding_returns_previous_key() {
        let mut bindings = KeyBindings::default();
        let old = bindings.bind(Action::Forward, Key::Up);
        assert_eq!(old, Some(Key::W));
        assert_eq!(bindings.key_for(Action::Forward), Some(Key::Up));
    }
}
