use crate::error::GeometryError;
use glam::{Mat4, Vec3};
use std::f32::consts::SQRT_2;
use std::fmt;

/// World-space placement of one leaf pyramid. Translation only.
pub type PlacementTransform = Mat4;

/// Validated recursion depth of the fractal.
///
/// The root pyramid has edge length `2^depth` and is halved at every level
/// until it reaches 1, so depth alone fixes both the root size and the
/// number of leaves (`5^depth`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Depth(u32);

impl Depth {
    /// Depth the viewer opens with.
    pub const DEFAULT: Depth = Depth(9);

    /// Largest accepted depth. Depth 10 is already ~9.7M leaves and well over
    /// a gigabyte of host-side buffers.
    pub const MAX: u32 = 10;

    pub fn new(depth: u32) -> Result<Self, GeometryError> {
        if depth > Self::MAX {
            return Err(GeometryError::DepthTooLarge {
                depth,
                max: Self::MAX,
            });
        }
        Ok(Self(depth))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Edge length of the root pyramid.
    pub fn root_size(self) -> u32 {
        1 << self.0
    }

    /// Number of leaf pyramids, `5^depth`.
    pub fn leaf_count(self) -> usize {
        5usize.pow(self.0)
    }
}

impl Default for Depth {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for Depth {
    type Error = GeometryError;

    fn try_from(depth: u32) -> Result<Self, Self::Error> {
        Self::new(depth)
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Offsets of the five children of a pyramid with edge `size`, relative to
/// the parent's centre.
///
/// The four base quadrants come first (-x-z, +x-z, -x+z, +x+z), all dropped
/// below the parent's midpoint; the apex child is last and raised above it.
pub fn child_offsets(size: u32) -> [Vec3; 5] {
    let s = size as f32;
    let quarter = s / 4.0;
    let rise = s * SQRT_2 / 8.0;
    [
        Vec3::new(-quarter, -rise, -quarter),
        Vec3::new(quarter, -rise, -quarter),
        Vec3::new(-quarter, -rise, quarter),
        Vec3::new(quarter, -rise, quarter),
        Vec3::new(0.0, rise, 0.0),
    ]
}

/// Compute the placement of every leaf pyramid at `depth`.
///
/// Leaves are emitted depth-first in [`child_offsets`] order, so the output is
/// stable from run to run.
pub fn generate_placements(depth: Depth) -> Result<Vec<PlacementTransform>, GeometryError> {
    let _span = tracing::info_span!("generate_placements", depth = depth.get()).entered();

    let leaf_count = depth.leaf_count();
    let mut placements = Vec::new();
    placements
        .try_reserve_exact(leaf_count)
        .map_err(|source| GeometryError::Allocation {
            what: "placement transforms",
            leaf_count,
            source,
        })?;

    subdivide(Vec3::ZERO, depth.root_size(), &mut placements);
    debug_assert_eq!(placements.len(), leaf_count);

    tracing::debug!(leaves = placements.len(), "placements generated");
    Ok(placements)
}

fn subdivide(translation: Vec3, size: u32, out: &mut Vec<PlacementTransform>) {
    assert!(
        size.is_power_of_two(),
        "pyramid size {size} is not a power of two"
    );

    if size == 1 {
        out.push(Mat4::from_translation(translation));
        return;
    }

    for offset in child_offsets(size) {
        subdivide(translation + offset, size / 2, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn depth_bounds() {
        assert_eq!(Depth::new(0).unwrap().get(), 0);
        assert_eq!(Depth::new(Depth::MAX).unwrap().get(), Depth::MAX);
        assert!(matches!(
            Depth::new(Depth::MAX + 1),
            Err(GeometryError::DepthTooLarge { depth, max }) if depth == Depth::MAX + 1 && max == Depth::MAX
        ));
    }

    #[test]
    fn depth_derives_size_and_leaves() {
        let d = Depth::new(3).unwrap();
        assert_eq!(d.root_size(), 8);
        assert_eq!(d.leaf_count(), 125);
        assert_eq!(Depth::default(), Depth::DEFAULT);
        assert_eq!(Depth::DEFAULT.leaf_count(), 1_953_125);
    }

    #[test]
    fn depth_zero_is_identity() {
        let placements = generate_placements(Depth::new(0).unwrap()).unwrap();
        assert_eq!(placements, vec![Mat4::IDENTITY]);
    }

    #[test]
    fn leaf_count_is_power_of_five() {
        for d in 0..=5 {
            let depth = Depth::new(d).unwrap();
            let placements = generate_placements(depth).unwrap();
            assert_eq!(placements.len(), 5usize.pow(d));
        }
    }

    #[test]
    fn depth_one_order() {
        let placements = generate_placements(Depth::new(1).unwrap()).unwrap();
        let expected = child_offsets(2);
        assert_eq!(placements.len(), 5);
        for (placement, offset) in placements.iter().zip(expected) {
            assert_eq!(placement.w_axis.truncate(), offset);
        }
        // First leaf is the -x -z quadrant, last is the apex.
        let rise = 2.0 * SQRT_2 / 8.0;
        assert!(approx(
            placements[0].w_axis.truncate(),
            Vec3::new(-0.5, -rise, -0.5)
        ));
        assert!(approx(
            placements[4].w_axis.truncate(),
            Vec3::new(0.0, rise, 0.0)
        ));
    }

    #[test]
    fn placements_are_translation_only() {
        let placements = generate_placements(Depth::new(2).unwrap()).unwrap();
        for p in &placements {
            assert_eq!(p.x_axis, glam::Vec4::X);
            assert_eq!(p.y_axis, glam::Vec4::Y);
            assert_eq!(p.z_axis, glam::Vec4::Z);
            assert_eq!(p.w_axis.w, 1.0);
        }
    }

    #[test]
    fn child_offsets_sum() {
        // Four quadrant children below the midpoint, one apex child above it.
        for size in [2u32, 4, 8, 64, 512] {
            let sum: Vec3 = child_offsets(size).iter().copied().sum();
            let s = size as f32;
            assert!(approx(sum, Vec3::new(0.0, -3.0 * s * SQRT_2 / 8.0, 0.0)));
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let d = Depth::new(4).unwrap();
        assert_eq!(generate_placements(d).unwrap(), generate_placements(d).unwrap());
    }

    #[test]
    fn leaves_stay_inside_root_footprint() {
        let d = Depth::new(4).unwrap();
        let half = d.root_size() as f32 / 2.0;
        for p in generate_placements(d).unwrap() {
            let t = p.w_axis.truncate();
            assert!(t.x.abs() < half && t.z.abs() < half);
        }
    }
}
