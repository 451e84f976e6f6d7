/// WGSL shader for the fractal mesh.
///
/// Vertices carry only a homogeneous position, so faces are flat-shaded from
/// screen-space derivatives of the world position.
pub const PYRAMID_SHADER: &str = r#"
struct Uniforms {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = uniforms.projection * uniforms.view * position;
    out.world_position = position.xyz / position.w;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(cross(dpdx(in.world_position), dpdy(in.world_position)));
    let light_dir = normalize(vec3<f32>(0.3, 1.0, 0.5));
    let ambient = 0.3;
    let diffuse = abs(dot(normal, light_dir));
    let lighting = ambient + diffuse * 0.7;
    let base = vec3<f32>(0.95, 0.65, 0.25);
    return vec4<f32>(base * lighting, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_declares_entry_points() {
        assert!(PYRAMID_SHADER.contains("fn vs_main"));
        assert!(PYRAMID_SHADER.contains("fn fs_main"));
        assert!(PYRAMID_SHADER.contains("@location(0) position: vec4<f32>"));
    }
}
