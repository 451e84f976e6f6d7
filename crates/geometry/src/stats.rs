use crate::fractal::Depth;
use crate::mesh::{BASE_INDEX_COUNT, BASE_VERTEX_COUNT, Vertex};
use serde::Serialize;

/// Buffer sizes for a fractal mesh, derivable without generating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeshStats {
    pub leaf_count: usize,
    pub vertex_count: usize,
    pub index_count: usize,
    pub vertex_bytes: u64,
    pub index_bytes: u64,
}

impl MeshStats {
    pub fn from_leaf_count(leaf_count: usize) -> Self {
        let vertex_count = leaf_count * BASE_VERTEX_COUNT;
        let index_count = leaf_count * BASE_INDEX_COUNT;
        Self {
            leaf_count,
            vertex_count,
            index_count,
            vertex_bytes: (vertex_count * Vertex::STRIDE) as u64,
            index_bytes: (index_count * std::mem::size_of::<u32>()) as u64,
        }
    }

    pub fn for_depth(depth: Depth) -> Self {
        Self::from_leaf_count(depth.leaf_count())
    }

    /// Host memory needed to hold both buffers at once.
    pub fn total_bytes(&self) -> u64 {
        self.vertex_bytes + self.index_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_fractal_mesh;

    #[test]
    fn default_depth_counts() {
        let stats = MeshStats::for_depth(Depth::DEFAULT);
        assert_eq!(stats.leaf_count, 1_953_125);
        assert_eq!(stats.vertex_count, 9_765_625);
        assert_eq!(stats.index_count, 35_156_250);
        assert_eq!(stats.vertex_bytes, 9_765_625 * 16);
        assert_eq!(stats.index_bytes, 35_156_250 * 4);
    }

    #[test]
    fn matches_generated_mesh() {
        let mesh = generate_fractal_mesh(3).unwrap();
        let stats = mesh.stats();
        assert_eq!(stats, MeshStats::for_depth(Depth::new(3).unwrap()));
        assert_eq!(stats.vertex_count, mesh.vertices.len());
        assert_eq!(stats.index_count, mesh.indices.len());
        assert_eq!(stats.vertex_count, 625);
        assert_eq!(stats.index_count, 2250);
        assert_eq!(
            stats.total_bytes(),
            (stats.vertex_count * 16 + stats.index_count * 4) as u64
        );
    }

    #[test]
    fn serializes_field_names() {
        let stats = MeshStats::from_leaf_count(1);
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"leaf_count\":1"));
        assert!(json.contains("\"index_count\":18"));
    }
}
