//! Input queue, pressed-state tracking, and action mapping.

use crate::event::{InputEvent, Key, MouseButton};
use std::collections::{HashMap, HashSet};

/// A single source an action can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    Key(Key),
    MouseButton(MouseButton),
    MouseWheelUp,
    MouseWheelDown,
}

/// Input action mapping - maps action names to input sources.
pub type InputMap = HashMap<String, Vec<InputSource>>;

/// Current input state, rebuilt incrementally as events are drained.
#[derive(Debug, Default)]
pub struct InputState {
    /// Currently pressed keys.
    pub keys_pressed: HashSet<Key>,
    /// Currently pressed mouse buttons.
    pub mouse_buttons_pressed: HashSet<MouseButton>,
    /// Mouse position in screen coordinates (pixels).
    pub mouse_position: [f32; 2],
    /// Scroll wheel delta accumulated this frame.
    pub scroll_delta: f32,
    /// Whether the wheel scrolled up this frame.
    pub mouse_wheel_up: bool,
    /// Whether the wheel scrolled down this frame.
    pub mouse_wheel_down: bool,
}

impl InputState {
    /// Reset the per-frame accumulators. Pressed sets persist across frames.
    pub fn begin_frame(&mut self) {
        self.scroll_delta = 0.0;
        self.mouse_wheel_up = false;
        self.mouse_wheel_down = false;
    }

    pub fn apply(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::KeyPressed { key } => {
                self.keys_pressed.insert(key);
            }
            InputEvent::KeyReleased { key } => {
                self.keys_pressed.remove(&key);
            }
            InputEvent::MouseMoved { position } => {
                self.mouse_position = position;
            }
            InputEvent::MouseButtonPressed { button } => {
                self.mouse_buttons_pressed.insert(button);
            }
            InputEvent::MouseButtonReleased { button } => {
                self.mouse_buttons_pressed.remove(&button);
            }
            InputEvent::MouseWheel { delta } => {
                self.scroll_delta += delta;
                if delta > 0.0 {
                    self.mouse_wheel_up = true;
                } else if delta < 0.0 {
                    self.mouse_wheel_down = true;
                }
            }
        }
    }
}

/// Host-fed event queue plus the state and action map built from it.
/// The scene tree drains this once per tick, before the physics pass.
#[derive(Debug, Default)]
pub struct InputQueue {
    pending: Vec<InputEvent>,
    state: InputState,
    action_map: InputMap,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one event for the next tick's input pass.
    pub fn push(&mut self, event: InputEvent) {
        self.pending.push(event);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Move all queued events into `out`, applying each to the tracked
    /// state on the way through. Per-frame wheel state resets first.
    pub fn drain_into(&mut self, out: &mut Vec<InputEvent>) {
        self.state.begin_frame();
        for event in &self.pending {
            self.state.apply(event);
        }
        out.append(&mut self.pending);
    }

    /// Load input mappings from a map.
    pub fn load_action_map(&mut self, map: InputMap) {
        self.action_map = map;
    }

    /// Bind one more source to an action.
    pub fn bind_action(&mut self, action: &str, source: InputSource) {
        self.action_map
            .entry(action.to_string())
            .or_default()
            .push(source);
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    /// Check if an action is currently pressed.
    pub fn is_action_pressed(&self, action: &str) -> bool {
        let Some(sources) = self.action_map.get(action) else {
            return false;
        };
        sources.iter().any(|source| match source {
            InputSource::Key(key) => self.state.keys_pressed.contains(key),
            InputSource::MouseButton(btn) => self.state.mouse_buttons_pressed.contains(btn),
            InputSource::MouseWheelUp => self.state.mouse_wheel_up,
            InputSource::MouseWheelDown => self.state.mouse_wheel_down,
        })
    }

    /// Check if a key is pressed (raw key access).
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.state.keys_pressed.contains(&key)
    }

    /// Check if a mouse button is pressed (raw button access).
    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.state.mouse_buttons_pressed.contains(&button)
    }
}
