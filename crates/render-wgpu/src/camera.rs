use glam::{Mat4, Vec3};
use sierpinski_input::FrameInput;
use sierpinski_render::{ProjectionError, build_projection};

/// Narrowest field of view reachable by scrolling, in degrees.
pub const ZOOM_MIN: f32 = 1.0;
/// Widest field of view, and the starting one, in degrees.
pub const ZOOM_MAX: f32 = 45.0;

/// Free-fly camera. `zoom` is the horizontal field of view in degrees.
#[derive(Debug, Clone)]
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub zoom: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub speed: f32,
    pub sprint_speed: f32,
    /// Radians of rotation per pixel of mouse motion.
    pub sensitivity: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            yaw: -90.0_f32.to_radians(),
            pitch: 0.0,
            zoom: ZOOM_MAX,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 5000.0,
            speed: 10.0,
            sprint_speed: 100.0,
            sensitivity: 0.1_f32.to_radians(),
        }
    }
}

impl FlyCamera {
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Advance the camera by one frame of input.
    pub fn apply_input(&mut self, input: &FrameInput, dt: f32) {
        let speed = if input.sprint {
            self.sprint_speed
        } else {
            self.speed
        };
        self.translate(input.movement, speed * dt);
        self.rotate(input.look.x, input.look.y);
        self.zoom_by(input.scroll);
    }

    /// Move along camera-local axes: x along `right`, y along world up,
    /// z along `forward` (pitch included).
    pub fn translate(&mut self, local: Vec3, distance: f32) {
        let delta = self.right() * local.x + Vec3::Y * local.y + self.forward() * local.z;
        self.position += delta * distance;
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch -= dy * self.sensitivity;
        self.pitch = self.pitch.clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
    }

    /// Scrolling away narrows the field of view.
    pub fn zoom_by(&mut self, scroll: f32) {
        self.zoom = (self.zoom - scroll).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    /// OpenGL-convention projection from the current zoom.
    pub fn projection_matrix(&self) -> Result<Mat4, ProjectionError> {
        build_projection(self.zoom, self.aspect, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let cam = FlyCamera::default();
        assert!(close(cam.forward(), Vec3::NEG_Z));
        assert!(close(cam.right(), Vec3::X));
        let proj = cam.projection_matrix().unwrap();
        assert!(!proj.col(0).x.is_nan());
    }

    #[test]
    fn forward_input_moves_along_view() {
        let mut cam = FlyCamera::default();
        let input = FrameInput {
            movement: Vec3::Z,
            ..Default::default()
        };
        cam.apply_input(&input, 0.5);
        assert!(close(cam.position, Vec3::new(0.0, 0.0, 3.0 - 5.0)));
    }

    #[test]
    fn sprint_uses_sprint_speed() {
        let mut cam = FlyCamera::default();
        let input = FrameInput {
            movement: Vec3::X,
            sprint: true,
            ..Default::default()
        };
        cam.apply_input(&input, 0.1);
        assert!(close(cam.position, Vec3::new(10.0, 0.0, 3.0)));
    }

    #[test]
    fn vertical_movement_ignores_pitch() {
        let mut cam = FlyCamera {
            pitch: 0.5,
            ..Default::default()
        };
        cam.translate(Vec3::Y, 2.0);
        assert!(close(cam.position, Vec3::new(0.0, 2.0, 3.0)));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = FlyCamera::default();
        cam.rotate(0.0, -1.0e6);
        assert!(cam.pitch <= 89.0_f32.to_radians());
        cam.rotate(0.0, 1.0e6);
        assert!(cam.pitch >= -89.0_f32.to_radians());
    }

    #[test]
    fn mouse_up_pitches_up() {
        let mut cam = FlyCamera::default();
        let input = FrameInput {
            look: Vec2::new(0.0, -10.0),
            ..Default::default()
        };
        cam.apply_input(&input, 0.016);
        assert!(cam.pitch > 0.0);
        assert!(cam.forward().y > 0.0);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut cam = FlyCamera::default();
        cam.zoom_by(-10.0);
        assert_eq!(cam.zoom, ZOOM_MAX);
        cam.zoom_by(20.0);
        assert_eq!(cam.zoom, 25.0);
        cam.zoom_by(100.0);
        assert_eq!(cam.zoom, ZOOM_MIN);
    }

    #[test]
    fn viewport_sets_aspect() {
        let mut cam = FlyCamera::default();
        cam.set_viewport(800, 400);
        assert_eq!(cam.aspect, 2.0);
        cam.set_viewport(800, 0);
        assert_eq!(cam.aspect, 800.0);
    }

    #[test]
    fn widening_viewport_keeps_horizontal_scale() {
        let mut cam = FlyCamera::default();
        cam.set_viewport(1000, 1000);
        let square = cam.projection_matrix().unwrap();
        cam.set_viewport(2000, 1000);
        let wide = cam.projection_matrix().unwrap();
        assert_eq!(square.x_axis.x, wide.x_axis.x);
        assert!(wide.y_axis.y > square.y_axis.y);
    }
}
