// Keyboard state tracking
// Folds winit events into a held-key set and maps it to movement intent

use std::collections::HashSet;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use crate::world::MovementIntent;

pub struct InputState {
    keys_held: HashSet<KeyCode>,
    // Keys pressed since the last end_frame(), for one-shot toggles
    keys_pressed: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_held: HashSet::new(),
            keys_pressed: HashSet::new(),
        }
    }

    /// Feed a winit WindowEvent into the input state. Presses the UI already
    /// consumed are dropped; releases always apply so no key stays stuck.
    pub fn process_event(&mut self, event: &WindowEvent, ui_consumed: bool) {
        if let WindowEvent::KeyboardInput { event, .. } = event {
            if let PhysicalKey::Code(key) = event.physical_key {
                self.apply_key(key, event.state, ui_consumed);
            }
        }
    }

    fn apply_key(&mut self, key: KeyCode, state: ElementState, ui_consumed: bool) {
        if ui_consumed && state == ElementState::Pressed {
            return;
        }
        self.set_key(key, state);
    }

    fn set_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.keys_held.insert(key) {
                    self.keys_pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
            }
        }
    }

    /// Call once per frame after the frame has consumed input.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    pub fn was_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Arrow keys or WASD steer and run, Space ascends.
    pub fn movement_intent(&self) -> MovementIntent {
        let any = |keys: &[KeyCode]| keys.iter().any(|k| self.is_key_held(*k));
        MovementIntent {
            turn_left: any(&[KeyCode::ArrowLeft, KeyCode::KeyA]),
            turn_right: any(&[KeyCode::ArrowRight, KeyCode::KeyD]),
            advance: any(&[KeyCode::ArrowUp, KeyCode::KeyW]),
            retreat: any(&[KeyCode::ArrowDown, KeyCode::KeyS]),
            ascend: any(&[KeyCode::Space]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_keys_map_to_intent() {
        let mut input = InputState::new();
        input.set_key(KeyCode::ArrowUp, ElementState::Pressed);
        input.set_key(KeyCode::KeyA, ElementState::Pressed);
        input.set_key(KeyCode::Space, ElementState::Pressed);

        let intent = input.movement_intent();
        assert!(intent.advance && intent.turn_left && intent.ascend);
        assert!(!intent.turn_right && !intent.retreat);

        input.set_key(KeyCode::Space, ElementState::Released);
        assert!(!input.movement_intent().ascend);
    }

    #[test]
    fn ui_consumed_presses_do_not_steer() {
        let mut input = InputState::new();
        input.apply_key(KeyCode::KeyW, ElementState::Pressed, true);
        assert!(!input.movement_intent().advance);
        assert!(!input.was_pressed(KeyCode::KeyW));

        input.apply_key(KeyCode::KeyW, ElementState::Pressed, false);
        assert!(input.movement_intent().advance);

        // A release the UI swallowed still lets go of the key.
        input.apply_key(KeyCode::KeyW, ElementState::Released, true);
        assert!(!input.movement_intent().advance);
    }

    #[test]
    fn pressed_is_one_shot_and_ignores_repeats() {
        let mut input = InputState::new();
        input.set_key(KeyCode::F3, ElementState::Pressed);
        assert!(input.was_pressed(KeyCode::F3));

        input.end_frame();
        // Key repeat while still held
        input.set_key(KeyCode::F3, ElementState::Pressed);
        assert!(!input.was_pressed(KeyCode::F3));
        assert!(input.is_key_held(KeyCode::F3));
    }
}
