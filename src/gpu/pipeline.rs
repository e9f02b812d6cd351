//! Text pipeline: WGSL shader, bind group layouts and render pipeline.

use crate::error::GpuError;

use super::quad_writer::QUAD_STRIDE;

/// Uniform block size: projection matrix, elapsed time, padding.
pub const UNIFORM_SIZE: u64 = 80;

/// Quad instance attributes: pos, size, uv_pos, uv_size, color.
const QUAD_ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x2,
    1 => Float32x2,
    2 => Float32x2,
    3 => Float32x2,
    4 => Float32x4,
];

pub fn quad_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: QUAD_STRIDE,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &QUAD_ATTRS,
    }
}

// --- WGSL Shaders ---

/// Bindings, vertex stage and the `VertexOutput` contract. A fragment stage
/// named `fs_main` is appended to form the full module.
const TEXT_SHADER_COMMON: &str = "
struct Uniforms {
    projection: mat4x4<f32>,
    time: f32,
    _pad0: f32,
    _pad: vec2<f32>,
}

@group(0) @binding(0) var<uniform> uniforms: Uniforms;
@group(1) @binding(0) var glyph_texture: texture_2d<f32>;
@group(1) @binding(1) var glyph_sampler: sampler;

struct QuadInput {
    @location(0) pos: vec2<f32>,
    @location(1) size: vec2<f32>,
    @location(2) uv_pos: vec2<f32>,
    @location(3) uv_size: vec2<f32>,
    @location(4) color: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vi: u32, input: QuadInput) -> VertexOutput {
    let corner = vec2<f32>(f32(vi & 1u), f32((vi >> 1u) & 1u));
    let pixel_pos = input.pos + input.size * corner;

    var out: VertexOutput;
    out.position = uniforms.projection * vec4<f32>(pixel_pos, 0.0, 1.0);
    out.uv = input.uv_pos + input.uv_size * corner;
    out.color = input.color;
    return out;
}
";

const TEXT_FRAGMENT_DEFAULT: &str = "
@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let a = textureSample(glyph_texture, glyph_sampler, input.uv).r;
    // Premultiplied alpha output
    return vec4<f32>(input.color.rgb * a, a) * input.color.a;
}
";

/// Assemble the text shader, using `custom_fragment` when it defines `fs_main`.
pub fn text_shader_source(custom_fragment: Option<&str>) -> String {
    let fragment = match custom_fragment {
        Some(src) if src.contains("fn fs_main") => src,
        Some(_) => {
            log::warn!("pipeline: custom shader has no fs_main, using the default");
            TEXT_FRAGMENT_DEFAULT
        }
        None => TEXT_FRAGMENT_DEFAULT,
    };
    format!("{TEXT_SHADER_COMMON}\n{fragment}")
}

/// Run `build` on the shader assembled from `custom_fragment`. If that
/// source is rejected and differs from the default, build once more from the
/// default fragment stage.
pub fn with_default_fallback<T, E: std::fmt::Display>(
    custom_fragment: Option<&str>,
    mut build: impl FnMut(&str) -> Result<T, E>,
) -> Result<T, E> {
    let source = text_shader_source(custom_fragment);
    let default = text_shader_source(None);
    match build(&source) {
        Err(e) if source != default => {
            log::warn!("pipeline: custom shader rejected, using the default: {e}");
            build(&default)
        }
        result => result,
    }
}

/// Orthographic projection mapping pixels (origin top-left) to NDC.
pub fn ortho_projection(w: f32, h: f32) -> [f32; 16] {
    [
        2.0 / w,
        0.0,
        0.0,
        0.0,
        0.0,
        -2.0 / h,
        0.0,
        0.0,
        0.0,
        0.0,
        1.0,
        0.0,
        -1.0,
        1.0,
        0.0,
        1.0,
    ]
}

/// Serialize the uniform block: projection for a `w` × `h` viewport, then time.
pub fn uniform_bytes(w: f32, h: f32, time: f32) -> [u8; UNIFORM_SIZE as usize] {
    let mut bytes = [0u8; UNIFORM_SIZE as usize];
    for (i, v) in ortho_projection(w, h).into_iter().chain([time]).enumerate() {
        bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_ne_bytes());
    }
    bytes
}

// --- Pipeline creation ---

/// Uniform bind group layout: group(0) binding(0) = projection + time.
pub fn create_uniform_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("uniform_bind_group_layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
            },
            count: None,
        }],
    })
}

/// Atlas texture bind group layout: group(1) binding(0) = texture, binding(1) = sampler.
pub fn create_atlas_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("atlas_bind_group_layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Text pipeline: alpha-blended textured glyph quads, one instance per glyph.
pub fn create_text_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    uniform_layout: &wgpu::BindGroupLayout,
    atlas_layout: &wgpu::BindGroupLayout,
    shader_source: &str,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("text_shader"),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("text_pipeline_layout"),
        bind_group_layouts: &[uniform_layout, atlas_layout],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("text_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[quad_buffer_layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                // Fragment output is premultiplied.
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Text pipeline from `custom_fragment`, or from the default fragment stage
/// when the custom one fails validation. Validation errors are captured in
/// an error scope instead of reaching the device's uncaptured-error handler.
pub fn create_text_pipeline_checked(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    uniform_layout: &wgpu::BindGroupLayout,
    atlas_layout: &wgpu::BindGroupLayout,
    custom_fragment: Option<&str>,
) -> Result<wgpu::RenderPipeline, GpuError> {
    with_default_fallback(custom_fragment, |source| {
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = create_text_pipeline(device, format, uniform_layout, atlas_layout, source);
        match pollster::block_on(scope.pop()) {
            Some(e) => Err(GpuError::Backend(e.to_string())),
            None => Ok(pipeline),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_maps_corners_to_ndc() {
        let m = ortho_projection(800.0, 600.0);
        // Column-major: x' = m[0] * x + m[12], y' = m[5] * y + m[13].
        assert_eq!(m[0] * 0.0 + m[12], -1.0);
        assert_eq!(m[0] * 800.0 + m[12], 1.0);
        assert_eq!(m[5] * 0.0 + m[13], 1.0);
        assert_eq!(m[5] * 600.0 + m[13], -1.0);
    }

    #[test]
    fn uniform_bytes_carry_time_after_matrix() {
        let b = uniform_bytes(2.0, 2.0, 1.5);
        let mut t = [0u8; 4];
        t.copy_from_slice(&b[64..68]);
        assert_eq!(f32::from_ne_bytes(t), 1.5);
        assert!(b[68..].iter().all(|&x| x == 0));
    }

    #[test]
    fn shader_source_falls_back_without_fs_main() {
        let default = text_shader_source(None);
        assert!(default.contains("textureSample"));
        assert_eq!(text_shader_source(Some("fn nope() {}")), default);

        let custom = "@fragment\nfn fs_main(input: VertexOutput) -> @location(0) vec4<f32> { return input.color; }";
        let src = text_shader_source(Some(custom));
        assert!(src.contains("return input.color;"));
        assert!(src.contains("fn vs_main"));
    }

    /// Accepts only sources that sample the atlas, like the default stage.
    fn picky_build(calls: &mut Vec<String>) -> impl FnMut(&str) -> Result<usize, String> + '_ {
        move |src: &str| {
            calls.push(src.to_owned());
            if src.contains("textureSample") {
                Ok(calls.len())
            } else {
                Err("fs_main does not sample the atlas".to_owned())
            }
        }
    }

    #[test]
    fn rejected_custom_shader_falls_back_to_default() {
        let mut calls = Vec::new();
        let custom = "@fragment\nfn fs_main(input: VertexOutput) -> @location(0) vec4<f32> { oops }";
        let built = with_default_fallback(Some(custom), picky_build(&mut calls));
        assert_eq!(built, Ok(2));
        assert!(calls[0].contains("oops"));
        assert_eq!(calls[1], text_shader_source(None));
    }

    #[test]
    fn accepted_custom_shader_builds_once() {
        let mut calls = Vec::new();
        let custom = "@fragment\nfn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {\n    return input.color * textureSample(glyph_texture, glyph_sampler, input.uv).r;\n}";
        assert_eq!(with_default_fallback(Some(custom), picky_build(&mut calls)), Ok(1));
        assert_eq!(calls.len(), 1);
    }

    #[test]
    fn default_shader_failure_is_not_retried() {
        let mut calls = 0;
        let built: Result<(), String> = with_default_fallback(None, |_| {
            calls += 1;
            Err("no device".to_owned())
        });
        assert!(built.is_err());
        assert_eq!(calls, 1);
    }
}
