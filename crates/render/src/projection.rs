use glam::{Mat4, Vec4};

/// Rejected projection parameters.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error("horizontal field of view must be in (0, 180) degrees, got {0}")]
    InvalidFov(f32),
    #[error("aspect ratio must be positive and finite, got {0}")]
    InvalidAspect(f32),
    #[error("near plane must be positive and finite, got {0}")]
    InvalidNear(f32),
    #[error("far plane ({far}) must be finite and beyond the near plane ({near})")]
    InvalidFar { near: f32, far: f32 },
}

/// View-space clip volume: the extents of the near plane plus the near and
/// far distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl Frustum {
    /// Frustum whose width is fixed by a horizontal field of view; the
    /// height follows from the aspect ratio (width / height).
    pub fn from_horizontal_fov(
        fov_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<Self, ProjectionError> {
        validate(fov_degrees, aspect, near, far)?;

        let a = 1.0 / aspect;
        let e = 1.0 / (fov_degrees.to_radians() / 2.0).tan();
        let half_width = near / e;

        Ok(Self {
            left: -half_width,
            right: half_width,
            bottom: -a * half_width,
            top: a * half_width,
            near,
            far,
        })
    }

    /// Right-handed, column-major projection onto OpenGL clip space
    /// (z in [-1, 1], perspective divide by -z).
    pub fn to_matrix(&self) -> Mat4 {
        let Self {
            left: l,
            right: r,
            bottom: b,
            top: t,
            near: n,
            far: f,
        } = *self;

        Mat4::from_cols(
            Vec4::new(2.0 * n / (r - l), 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 * n / (t - b), 0.0, 0.0),
            Vec4::new(
                (r + l) / (r - l),
                (t + b) / (t - b),
                -(f + n) / (f - n),
                -1.0,
            ),
            Vec4::new(0.0, 0.0, -2.0 * n * f / (f - n), 0.0),
        )
    }
}

/// Perspective projection from a horizontal field of view in degrees.
pub fn build_projection(
    horizontal_fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
) -> Result<Mat4, ProjectionError> {
    Frustum::from_horizontal_fov(horizontal_fov_degrees, aspect, near, far)
        .map(|frustum| frustum.to_matrix())
        .inspect_err(|e| tracing::debug!("projection rejected: {e}"))
}

fn validate(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Result<(), ProjectionError> {
    if !(fov_degrees > 0.0 && fov_degrees < 180.0) {
        return Err(ProjectionError::InvalidFov(fov_degrees));
    }
    if !(aspect > 0.0 && aspect.is_finite()) {
        return Err(ProjectionError::InvalidAspect(aspect));
    }
    if !(near > 0.0 && near.is_finite()) {
        return Err(ProjectionError::InvalidNear(near));
    }
    if !(far > near && far.is_finite()) {
        return Err(ProjectionError::InvalidFar { near, far });
    }
    Ok(())
}
