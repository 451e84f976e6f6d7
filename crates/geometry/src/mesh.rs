use crate::error::GeometryError;
use crate::fractal::{Depth, PlacementTransform, generate_placements};
use crate::stats::MeshStats;
use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use std::f32::consts::FRAC_1_SQRT_2;

/// One homogeneous vertex position. Tightly packed, 16 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 4],
}

impl Vertex {
    /// Bytes between consecutive vertices in the vertex buffer.
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();
}

impl From<Vec4> for Vertex {
    fn from(v: Vec4) -> Self {
        Self {
            position: v.to_array(),
        }
    }
}

pub const BASE_VERTEX_COUNT: usize = 5;
pub const BASE_INDEX_COUNT: usize = 18;

/// Unit-base square pyramid: four base corners on y = 0, apex at
/// y = sqrt(2)/2.
pub const BASE_VERTICES: [Vec4; BASE_VERTEX_COUNT] = [
    Vec4::new(-0.5, 0.0, -0.5, 1.0),
    Vec4::new(0.5, 0.0, -0.5, 1.0),
    Vec4::new(0.5, 0.0, 0.5, 1.0),
    Vec4::new(-0.5, 0.0, 0.5, 1.0),
    Vec4::new(0.0, FRAC_1_SQRT_2, 0.0, 1.0),
];

#[rustfmt::skip]
pub const BASE_INDICES: [u32; BASE_INDEX_COUNT] = [
    0, 1, 2,
    0, 2, 3,
    0, 1, 4,
    1, 2, 4,
    2, 3, 4,
    0, 4, 3,
];

/// The whole fractal as one indexed triangle list.
#[derive(Debug, Clone, PartialEq)]
pub struct FractalMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    leaf_count: usize,
}

impl FractalMesh {
    /// Number of pyramid instances in the mesh.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Index count for the single `draw_indexed` call.
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn stats(&self) -> MeshStats {
        MeshStats::from_leaf_count(self.leaf_count)
    }

    /// True if every index addresses a vertex inside the buffer.
    pub fn indices_in_bounds(&self) -> bool {
        let len = self.vertices.len();
        self.indices.iter().all(|&i| (i as usize) < len)
    }
}

/// Generate the full fractal mesh for a recursion depth.
pub fn generate_fractal_mesh(depth: u32) -> Result<FractalMesh, GeometryError> {
    let depth = Depth::new(depth)?;
    let placements = generate_placements(depth)?;
    let mesh = flatten(&placements)?;

    tracing::info!(
        depth = depth.get(),
        leaves = mesh.leaf_count(),
        vertices = mesh.vertices.len(),
        indices = mesh.indices.len(),
        "fractal mesh generated"
    );
    Ok(mesh)
}

/// Flatten placement transforms into freshly allocated vertex and index
/// buffers sized exactly for `placements.len()` instances.
pub fn flatten(placements: &[PlacementTransform]) -> Result<FractalMesh, GeometryError> {
    let _span = tracing::info_span!("flatten", instances = placements.len()).entered();

    let leaf_count = placements.len();
    let (vertex_len, index_len) = buffer_lengths(leaf_count)?;
    let mut vertices = allocate::<Vertex>(vertex_len, "vertex buffer", leaf_count)?;
    let mut indices = allocate::<u32>(index_len, "index buffer", leaf_count)?;

    flatten_into(placements, &mut vertices, &mut indices)?;

    Ok(FractalMesh {
        vertices,
        indices,
        leaf_count,
    })
}

/// Flatten into caller-provided buffers.
///
/// Instance `i` writes vertices `[5i, 5i + 5)` and indices `[18i, 18i + 18)`,
/// each index rebased by `5i`. Both buffers are checked before anything is
/// written; slots past the required length are left untouched.
pub fn flatten_into(
    placements: &[PlacementTransform],
    vertices: &mut [Vertex],
    indices: &mut [u32],
) -> Result<(), GeometryError> {
    let (vertex_len, index_len) = buffer_lengths(placements.len())?;
    if vertices.len() < vertex_len {
        return Err(GeometryError::BufferTooSmall {
            buffer: "vertex",
            required: vertex_len,
            provided: vertices.len(),
        });
    }
    if indices.len() < index_len {
        return Err(GeometryError::BufferTooSmall {
            buffer: "index",
            required: index_len,
            provided: indices.len(),
        });
    }

    let instances = placements
        .iter()
        .zip(vertices.chunks_exact_mut(BASE_VERTEX_COUNT))
        .zip(indices.chunks_exact_mut(BASE_INDEX_COUNT));

    for (instance, ((placement, verts), idxs)) in instances.enumerate() {
        let base = (instance * BASE_VERTEX_COUNT) as u32;
        for (slot, corner) in verts.iter_mut().zip(BASE_VERTICES) {
            *slot = Vertex::from(*placement * corner);
        }
        for (slot, index) in idxs.iter_mut().zip(BASE_INDICES) {
            *slot = index + base;
        }
    }

    Ok(())
}

/// Vertex and index counts for `leaf_count` instances, or an error if the
/// vertices could not be addressed by `u32` indices.
fn buffer_lengths(leaf_count: usize) -> Result<(usize, usize), GeometryError> {
    let too_many = || GeometryError::TooManyInstances { leaf_count };
    let vertex_len = leaf_count
        .checked_mul(BASE_VERTEX_COUNT)
        .ok_or_else(too_many)?;
    if vertex_len > u32::MAX as usize {
        return Err(too_many());
    }
    let index_len = leaf_count
        .checked_mul(BASE_INDEX_COUNT)
        .ok_or_else(too_many)?;
    if index_len > u32::MAX as usize {
        return Err(too_many());
    }
    Ok((vertex_len, index_len))
}

fn allocate<T: Zeroable + Clone>(
    len: usize,
    what: &'static str,
    leaf_count: usize,
) -> Result<Vec<T>, GeometryError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|source| GeometryError::Allocation {
            what,
            leaf_count,
            source,
        })?;
    buf.resize(len, T::zeroed());
    Ok(buf)
}
