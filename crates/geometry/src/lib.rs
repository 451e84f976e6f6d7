//! Sierpinski pyramid geometry: recursive placement and mesh flattening.
//!
//! The fractal is generated once, up front, as a single static mesh. Every
//! leaf pyramid shares the same five-vertex base shape; the generator only
//! decides where each copy goes.
//!
//! # Invariants
//! - Depth `d` yields exactly `5^d` leaves, `5 * 5^d` vertices and
//!   `18 * 5^d` indices.
//! - Instance `i` owns vertices `[5i, 5i + 5)`; every index is in range.
//! - Generation is pure: the same depth always yields bit-identical buffers.

mod error;
mod fractal;
mod mesh;
mod stats;

pub use error::GeometryError;
pub use fractal::{Depth, PlacementTransform, child_offsets, generate_placements};
pub use mesh::{
    BASE_INDEX_COUNT, BASE_INDICES, BASE_VERTEX_COUNT, BASE_VERTICES, FractalMesh, Vertex, flatten,
    flatten_into, generate_fractal_mesh,
};
pub use stats::MeshStats;

pub fn crate_info() -> &'static str {
    "sierpinski-geometry v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("geometry"));
    }
}
