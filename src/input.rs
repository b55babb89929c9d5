use std::collections::HashSet;
use winit::keyboard::KeyCode;

pub struct InputState {
    pressed_keys: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            pressed_keys: HashSet::new(),
        }
    }

    pub fn handle_key_press(&mut self, key: KeyCode) {
        self.pressed_keys.insert(key);
    }

    pub fn handle_key_release(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn accelerate(&self) -> bool {
        self.is_pressed(KeyCode::ArrowUp)
    }

    pub fn reverse(&self) -> bool {
        self.is_pressed(KeyCode::ArrowDown)
    }

    pub fn steer_left(&self) -> bool {
        self.is_pressed(KeyCode::ArrowLeft)
    }

    pub fn steer_right(&self) -> bool {
        self.is_pressed(KeyCode::ArrowRight)
    }

    /// Any directional input; the first frame this is true starts the race.
    pub fn any_direction(&self) -> bool {
        self.accelerate() || self.reverse() || self.steer_left() || self.steer_right()
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latches_press_and_release() {
        let mut input = InputState::new();
        assert!(!input.any_direction());

        input.handle_key_press(KeyCode::ArrowUp);
        assert!(input.accelerate());
        assert!(input.any_direction());

        input.handle_key_release(KeyCode::ArrowUp);
        assert!(!input.accelerate());
        assert!(!input.any_direction());
    }

    #[test]
    fn directions_are_independent() {
        let mut input = InputState::new();
        input.handle_key_press(KeyCode::ArrowLeft);
        input.handle_key_press(KeyCode::ArrowDown);
        assert!(input.steer_left());
        assert!(input.reverse());
        assert!(!input.steer_right());
        assert!(!input.accelerate());
    }
}
