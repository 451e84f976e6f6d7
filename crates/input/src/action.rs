use glam::Vec3;

/// A held camera action. The windowing layer maps physical keys onto these;
/// nothing below it sees raw key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveForward,
    MoveBackward,
    StrafeLeft,
    StrafeRight,
    Ascend,
    Descend,
    /// Boost movement speed while held.
    Sprint,
}

impl Action {
    /// Direction this action pushes the camera in its local frame
    /// (x = right, y = up, z = forward). Zero for non-movement actions.
    pub fn direction(self) -> Vec3 {
        match self {
            Action::MoveForward => Vec3::Z,
            Action::MoveBackward => Vec3::NEG_Z,
            Action::StrafeLeft => Vec3::NEG_X,
            Action::StrafeRight => Vec3::X,
            Action::Ascend => Vec3::Y,
            Action::Descend => Vec3::NEG_Y,
            Action::Sprint => Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_actions_cancel() {
        assert_eq!(
            Action::MoveForward.direction() + Action::MoveBackward.direction(),
            Vec3::ZERO
        );
        assert_eq!(
            Action::StrafeLeft.direction() + Action::StrafeRight.direction(),
            Vec3::ZERO
        );
        assert_eq!(
            Action::Ascend.direction() + Action::Descend.direction(),
            Vec3::ZERO
        );
    }

    #[test]
    fn sprint_does_not_move() {
        assert_eq!(Action::Sprint.direction(), Vec3::ZERO);
    }
}
