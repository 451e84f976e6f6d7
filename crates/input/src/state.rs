use crate::action::Action;
use glam::{Vec2, Vec3};
use std::collections::HashSet;

/// Everything the camera needs from one frame of input.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameInput {
    /// Summed direction of the held movement actions, camera-local
    /// (x = right, y = up, z = forward). Not normalised.
    pub movement: Vec3,
    /// Mouse motion since the last frame, in pixels (+y is down).
    pub look: Vec2,
    /// Scroll since the last frame, in lines (+ is away from the user).
    pub scroll: f32,
    pub sprint: bool,
}

/// Accumulates input events between frames.
#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<Action>,
    look: Vec2,
    scroll: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press or release of `action`.
    pub fn set_action(&mut self, action: Action, pressed: bool) {
        let changed = if pressed {
            self.held.insert(action)
        } else {
            self.held.remove(&action)
        };
        if changed {
            tracing::trace!(?action, pressed, "action state changed");
        }
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    pub fn add_mouse_motion(&mut self, dx: f32, dy: f32) {
        self.look += Vec2::new(dx, dy);
    }

    pub fn add_scroll(&mut self, lines: f32) {
        self.scroll += lines;
    }

    /// Drop held actions, e.g. when the window loses focus and release
    /// events may never arrive.
    pub fn release_all(&mut self) {
        self.held.clear();
    }

    /// Snapshot this frame's input and reset the per-frame deltas.
    pub fn take_frame(&mut self) -> FrameInput {
        let movement: Vec3 = self.held.iter().map(|a| a.direction()).sum();
        FrameInput {
            movement,
            look: std::mem::take(&mut self.look),
            scroll: std::mem::take(&mut self.scroll),
            sprint: self.is_held(Action::Sprint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_is_idle() {
        let mut input = InputState::new();
        assert_eq!(input.take_frame(), FrameInput::default());
    }

    #[test]
    fn held_actions_persist() {
        let mut input = InputState::new();
        input.set_action(Action::MoveForward, true);
        input.set_action(Action::StrafeRight, true);

        let first = input.take_frame();
        assert_eq!(first.movement, Vec3::new(1.0, 0.0, 1.0));
        let second = input.take_frame();
        assert_eq!(second.movement, first.movement);

        input.set_action(Action::MoveForward, false);
        assert_eq!(input.take_frame().movement, Vec3::X);
    }

    #[test]
    fn deltas_are_consumed_once() {
        let mut input = InputState::new();
        input.add_mouse_motion(3.0, -1.0);
        input.add_mouse_motion(2.0, 4.0);
        input.add_scroll(1.0);
        input.add_scroll(0.5);

        let frame = input.take_frame();
        assert_eq!(frame.look, Vec2::new(5.0, 3.0));
        assert_eq!(frame.scroll, 1.5);

        let next = input.take_frame();
        assert_eq!(next.look, Vec2::ZERO);
        assert_eq!(next.scroll, 0.0);
    }

    #[test]
    fn sprint_flag() {
        let mut input = InputState::new();
        input.set_action(Action::Sprint, true);
        let frame = input.take_frame();
        assert!(frame.sprint);
        assert_eq!(frame.movement, Vec3::ZERO);
    }

    #[test]
    fn repeated_press_counts_once() {
        let mut input = InputState::new();
        input.set_action(Action::Ascend, true);
        input.set_action(Action::Ascend, true);
        assert_eq!(input.take_frame().movement, Vec3::Y);
    }

    #[test]
    fn release_all_clears_held() {
        let mut input = InputState::new();
        input.set_action(Action::Descend, true);
        input.set_action(Action::Sprint, true);
        input.release_all();
        assert!(!input.is_held(Action::Descend));
        assert_eq!(input.take_frame(), FrameInput::default());
    }
}
