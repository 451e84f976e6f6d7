use crate::camera::FlyCamera;
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use sierpinski_geometry::{FractalMesh, MeshStats, Vertex};
use sierpinski_render::ProjectionError;
use wgpu::util::DeviceExt;

/// Remaps OpenGL clip depth ([-1, 1]) onto wgpu's [0, 1].
pub const OPENGL_TO_WGPU: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 1.0),
);

/// Background colour, in sRGB.
const CLEAR_COLOR: [f64; 3] = [0.2, 0.3, 0.3];

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x4];

/// One attribute per vertex: four floats, tightly packed.
pub const VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: Vertex::STRIDE as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &VERTEX_ATTRIBUTES,
};

/// Errors from GPU resource creation and frame submission.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{buffer} buffer needs {size} bytes but the device allows at most {limit}")]
    BufferTooLarge {
        buffer: &'static str,
        size: u64,
        limit: u64,
    },
    #[error("invalid projection: {0}")]
    Projection(#[from] ProjectionError),
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
}

/// Reject meshes whose buffers would not fit in a single device buffer.
pub fn check_buffer_limits(stats: &MeshStats, max_buffer_size: u64) -> Result<(), RenderError> {
    for (buffer, size) in [("vertex", stats.vertex_bytes), ("index", stats.index_bytes)] {
        if size > max_buffer_size {
            return Err(RenderError::BufferTooLarge {
                buffer,
                size,
                limit: max_buffer_size,
            });
        }
    }
    Ok(())
}

/// Clear colour for the given target format. sRGB targets expect linear
/// values and encode on write.
fn clear_color(format: wgpu::TextureFormat) -> wgpu::Color {
    let channel = |c: f64| if format.is_srgb() { srgb_to_linear(c) } else { c };
    wgpu::Color {
        r: channel(CLEAR_COLOR[0]),
        g: channel(CLEAR_COLOR[1]),
        b: channel(CLEAR_COLOR[2]),
        a: 1.0,
    }
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Draws the fractal mesh with a single indexed draw call per frame.
///
/// The vertex and index buffers are uploaded once in [`PyramidRenderer::new`]
/// and never touched again; only the camera uniforms change per frame.
pub struct PyramidRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
}

impl PyramidRenderer {
    /// Upload `mesh` and build the pipeline. The caller may drop its host-side
    /// copy of the mesh afterwards.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        mesh: &FractalMesh,
    ) -> Result<Self, RenderError> {
        let _span = tracing::info_span!("upload_mesh", leaves = mesh.leaf_count()).entered();
        check_buffer_limits(&mesh.stats(), device.limits().max_buffer_size)?;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform_buffer"),
            contents: bytemuck::bytes_of(&Uniforms {
                view: Mat4::IDENTITY.to_cols_array_2d(),
                projection: Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pyramid_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::PYRAMID_SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pyramid_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[VERTEX_LAYOUT],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            // Base triangles mix windings, so nothing is culled.
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pyramid_vertex_buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pyramid_index_buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let index_count = mesh.index_count();

        tracing::info!(
            vertices = mesh.vertices.len(),
            indices = index_count,
            "fractal mesh uploaded"
        );

        let depth_texture = Self::create_depth_texture(device, width, height);

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            vertex_buffer,
            index_buffer,
            index_count,
            depth_texture,
            surface_format,
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Render one frame of the fractal from `camera`.
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        camera: &FlyCamera,
    ) -> Result<(), RenderError> {
        let projection = OPENGL_TO_WGPU * camera.projection_matrix()?;
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms {
                view: camera.view_matrix().to_cols_array_2d(),
                projection: projection.to_cols_array_2d(),
            }),
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(self.surface_format)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..self.index_count, 0, 0..1);
        }

        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sierpinski_geometry::Depth;

    #[test]
    fn vertex_layout_matches_mesh() {
        assert_eq!(VERTEX_LAYOUT.array_stride, 16);
        assert_eq!(VERTEX_LAYOUT.attributes.len(), 1);
        let attr = VERTEX_LAYOUT.attributes[0];
        assert_eq!(attr.format, wgpu::VertexFormat::Float32x4);
        assert_eq!(attr.offset, 0);
        assert_eq!(attr.shader_location, 0);
    }

    #[test]
    fn depth_remap_targets_unit_range() {
        let proj = OPENGL_TO_WGPU
            * sierpinski_render::build_projection(45.0, 1.0, 0.1, 100.0).unwrap();
        let near = proj * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn default_depth_fits_default_limits() {
        let stats = MeshStats::for_depth(Depth::DEFAULT);
        assert!(check_buffer_limits(&stats, wgpu::Limits::default().max_buffer_size).is_ok());
    }

    #[test]
    fn oversized_mesh_is_rejected() {
        let stats = MeshStats::for_depth(Depth::new(Depth::MAX).unwrap());
        let err = check_buffer_limits(&stats, 256 << 20).unwrap_err();
        assert!(matches!(err, RenderError::BufferTooLarge { buffer: "vertex", .. }));
    }

    #[test]
    fn clear_color_follows_surface_encoding() {
        let linear = clear_color(wgpu::TextureFormat::Bgra8Unorm);
        assert_eq!(linear.r, 0.2);
        let srgb = clear_color(wgpu::TextureFormat::Bgra8UnormSrgb);
        assert!(srgb.r < 0.2 && srgb.r > 0.0);
        assert_eq!(srgb.a, 1.0);
    }
}
