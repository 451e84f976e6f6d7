//! wgpu render backend for the Sierpinski pyramid viewer.
//!
//! Uploads the fractal mesh once and redraws it every frame with a single
//! indexed draw. The fly camera supplies the view and a horizontal-FOV
//! projection.
//!
//! # Invariants
//! - The mesh buffers are immutable after upload.
//! - Only the camera uniforms change between frames.
//! - Camera state lives outside the renderer and is passed in per frame.

mod camera;
mod gpu;
mod shaders;

pub use camera::{FlyCamera, ZOOM_MAX, ZOOM_MIN};
pub use gpu::{OPENGL_TO_WGPU, PyramidRenderer, RenderError, VERTEX_LAYOUT, check_buffer_limits};
