use crate::{camera::Direction, types::KeyboardHandler};
use ahash::AHashSet;
use winit::event::{ElementState, VirtualKeyCode};

/// Movement keys in the order they are checked. When several are held the
/// first one wins.
const MOVEMENT: [(VirtualKeyCode, Direction); 4] = [
    (VirtualKeyCode::W, Direction::Forward),
    (VirtualKeyCode::S, Direction::Back),
    (VirtualKeyCode::A, Direction::Left),
    (VirtualKeyCode::D, Direction::Right),
];

/// Held key state. The event loop feeds it through `KeyboardHandler` and the
/// frame reads it. Call `tick` once per frame so `is_just_pressed` sees
/// edges.
#[derive(Clone, Debug, Default)]
pub struct Keyboard {
    current: AHashSet<VirtualKeyCode>,
    previous: AHashSet<VirtualKeyCode>,
}

impl KeyboardHandler for Keyboard {
    fn input(&mut self, keycode: VirtualKeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.current.insert(keycode);
            }
            ElementState::Released => {
                self.current.remove(&keycode);
            }
        }
    }
}

impl Keyboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) {
        self.previous.clone_from(&self.current);
    }

    #[must_use]
    pub fn is_pressed(&self, keycode: VirtualKeyCode) -> bool {
        self.current.contains(&keycode)
    }

    /// Pressed now but not at the last `tick`
    #[must_use]
    pub fn is_just_pressed(&self, keycode: VirtualKeyCode) -> bool {
        self.current.contains(&keycode) && !self.previous.contains(&keycode)
    }

    /// Camera direction of the held movement key, if any
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        MOVEMENT
            .iter()
            .find(|(key, _)| self.is_pressed(*key))
            .map(|(_, direction)| *direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn just_pressed_lasts_one_tick() {
        let mut k = Keyboard::new();
        k.input(VirtualKeyCode::M, ElementState::Pressed);
        assert!(k.is_just_pressed(VirtualKeyCode::M));
        k.tick();
        assert!(k.is_pressed(VirtualKeyCode::M));
        assert!(!k.is_just_pressed(VirtualKeyCode::M));
        k.input(VirtualKeyCode::M, ElementState::Released);
        assert!(!k.is_pressed(VirtualKeyCode::M));
    }

    #[test]
    fn forward_wins_over_strafe() {
        let mut k = Keyboard::new();
        assert_eq!(k.direction(), None);
        k.input(VirtualKeyCode::D, ElementState::Pressed);
        assert_eq!(k.direction(), Some(Direction::Right));
        k.input(VirtualKeyCode::W, ElementState::Pressed);
        assert_eq!(k.direction(), Some(Direction::Forward));
    }
}
