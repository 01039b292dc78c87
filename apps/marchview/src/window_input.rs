use glam::Vec2;
use marchview_input::{InputEvent, InputSource, InputState, Key};
use std::sync::Arc;
use winit::dpi::PhysicalPosition;
use winit::keyboard::KeyCode;
use winit::window::{CursorGrabMode, Window};

/// Input source fed by the winit event loop.
///
/// Events are buffered in an [`InputState`] until the engine polls; pointer
/// re-centering moves the real OS cursor.
pub struct WindowInput {
    state: InputState,
    window: Arc<Window>,
    warned_recenter: bool,
}

impl WindowInput {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            state: InputState::new(),
            window,
            warned_recenter: false,
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.state.push(event);
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

impl InputSource for WindowInput {
    fn poll_events(&mut self) -> Vec<InputEvent> {
        self.state.poll_events()
    }

    fn take_pointer_delta(&mut self) -> Vec2 {
        self.state.take_pointer_delta()
    }

    fn is_held(&self, key: Key) -> bool {
        self.state.is_held(key)
    }

    fn recenter_pointer(&mut self) {
        let size = self.window.inner_size();
        let center = PhysicalPosition::new(size.width / 2, size.height / 2);
        if let Err(err) = self.window.set_cursor_position(center) {
            // Wayland and some compositors refuse; relative motion still works.
            if !self.warned_recenter {
                tracing::warn!(%err, "cannot re-center cursor");
                self.warned_recenter = true;
            }
        }
    }
}

/// Hide the cursor and keep it inside the window.
pub fn capture_cursor(window: &Window) {
    window.set_cursor_visible(false);
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Confined)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
    if let Err(err) = grabbed {
        tracing::warn!(%err, "cursor grab unavailable");
    }
}

pub fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyE => Key::E,
        KeyCode::Space => Key::Space,
        KeyCode::ShiftLeft => Key::LeftShift,
        KeyCode::ControlLeft => Key::LeftCtrl,
        KeyCode::Escape => Key::Escape,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_keys_map() {
        assert_eq!(map_key(KeyCode::KeyW), Some(Key::W));
        assert_eq!(map_key(KeyCode::ShiftLeft), Some(Key::LeftShift));
        assert_eq!(map_key(KeyCode::Escape), Some(Key::Escape));
    }

    #[test]
    fn right_hand_modifiers_are_not_bound() {
        assert_eq!(map_key(KeyCode::ShiftRight), None);
        assert_eq!(map_key(KeyCode::F1), None);
    }
}
