//! Rendering math shared by every backend.
//!
//! # Invariants
//! - Projection is pure; it holds no state between frames.
//! - Field of view is horizontal: widening the window widens the view,
//!   making it taller narrows the vertical extent instead.

mod projection;

pub use projection::{Frustum, ProjectionError, build_projection};

pub fn crate_info() -> &'static str {
    "sierpinski-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
