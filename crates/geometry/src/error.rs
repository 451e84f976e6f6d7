use std::collections::TryReserveError;

/// Errors from fractal generation and mesh flattening.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("recursion depth {depth} exceeds the supported maximum of {max}")]
    DepthTooLarge { depth: u32, max: u32 },
    #[error("{leaf_count} pyramid instances cannot be addressed with 32-bit indices")]
    TooManyInstances { leaf_count: usize },
    #[error("failed to allocate {what} for {leaf_count} pyramid instances: {source}")]
    Allocation {
        what: &'static str,
        leaf_count: usize,
        #[source]
        source: TryReserveError,
    },
    #[error("{buffer} buffer too small: need {required} elements, got {provided}")]
    BufferTooSmall {
        buffer: &'static str,
        required: usize,
        provided: usize,
    },
}
