use std::{borrow::Cow, fmt};

use crate::{GpuContext, RenderError, geometry::GeometryBuffer, mode::PlaneSpec};

pub const VERTEX_SOURCE: &str = include_str!("shaders/quad.wgsl");
pub const RGB_FRAGMENT_SOURCE: &str = include_str!("shaders/rgb.wgsl");
pub const YUV420P_FRAGMENT_SOURCE: &str = include_str!("shaders/yuv420p.wgsl");

/// Binding of the shared plane sampler. Plane textures use their texture unit as binding.
pub const SAMPLER_BINDING: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Vertex => "vs_main",
            Self::Fragment => "fs_main",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Fragment => write!(f, "fragment"),
        }
    }
}

pub struct CompiledShader {
    module: wgpu::ShaderModule,
    stage: ShaderStage,
    label: String,
}

impl CompiledShader {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Sampler uniform of one plane, resolved once at link time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerBinding {
    pub plane: &'static str,
    pub unit: u32,
}

/// A linked vertex + fragment program and the bind group layouts it reads.
///
/// Group 0 holds the plane textures and their sampler, group 1 the quad's texture coordinate
/// transform. Built once per renderer and never recompiled.
pub struct ShaderPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    transform_layout: wgpu::BindGroupLayout,
    sampler_bindings: Vec<SamplerBinding>,
}

impl ShaderPipeline {
    pub fn compile(
        context: &GpuContext,
        label: &str,
        source: &str,
        stage: ShaderStage,
    ) -> Result<CompiledShader, RenderError> {
        let (module, error) = context.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
            })
        });

        if let Some(error) = error {
            tracing::error!(%stage, label, "Shader compilation failed: {error}");
            return Err(RenderError::ShaderCompile {
                stage,
                label: label.to_string(),
                diagnostic: error.to_string(),
            });
        }

        tracing::debug!(%stage, label, "Compiled shader");

        Ok(CompiledShader {
            module,
            stage,
            label: label.to_string(),
        })
    }

    /// Links a vertex and fragment unit into a render pipeline drawing into `target_format`.
    pub fn link(
        context: &GpuContext,
        vertex: &CompiledShader,
        fragment: &CompiledShader,
        planes: &[PlaneSpec],
        target_format: wgpu::TextureFormat,
    ) -> Result<Self, RenderError> {
        for (unit, expected) in [
            (vertex, ShaderStage::Vertex),
            (fragment, ShaderStage::Fragment),
        ] {
            if unit.stage() != expected {
                let diagnostic = format!(
                    "'{}' is a {} shader, expected a {expected} shader",
                    unit.label(),
                    unit.stage()
                );
                tracing::error!("Shader link failed: {diagnostic}");
                return Err(RenderError::ShaderLink { diagnostic });
            }
        }

        let ((bind_group_layout, transform_layout, pipeline), error) = context.scoped(|device| {
            let bind_group_layout = Self::create_bind_group_layout(device, planes);
            let transform_layout = GeometryBuffer::create_transform_layout(device);
            let pipeline = Self::create_render_pipeline(
                device,
                &[&bind_group_layout, &transform_layout],
                vertex,
                fragment,
                target_format,
            );
            (bind_group_layout, transform_layout, pipeline)
        });

        if let Some(error) = error {
            tracing::error!(
                vertex = %vertex.label,
                fragment = %fragment.label,
                "Shader link failed: {error}"
            );
            return Err(RenderError::ShaderLink {
                diagnostic: error.to_string(),
            });
        }

        let sampler_bindings = planes
            .iter()
            .map(|plane| SamplerBinding {
                plane: plane.label,
                unit: plane.unit,
            })
            .collect();

        tracing::debug!(
            vertex = %vertex.label,
            fragment = %fragment.label,
            "Linked shader program"
        );

        Ok(Self {
            pipeline,
            bind_group_layout,
            transform_layout,
            sampler_bindings,
        })
    }

    /// Compiles the shared vertex program and the given fragment program, then links them.
    pub(crate) fn build(
        context: &GpuContext,
        fragment_label: &str,
        fragment_source: &str,
        planes: &[PlaneSpec],
        target_format: wgpu::TextureFormat,
    ) -> Result<Self, RenderError> {
        let vertex = Self::compile(context, "quad.wgsl", VERTEX_SOURCE, ShaderStage::Vertex)?;
        let fragment =
            Self::compile(context, fragment_label, fragment_source, ShaderStage::Fragment)?;

        Self::link(context, &vertex, &fragment, planes, target_format)
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn transform_layout(&self) -> &wgpu::BindGroupLayout {
        &self.transform_layout
    }

    pub fn sampler_bindings(&self) -> &[SamplerBinding] {
        &self.sampler_bindings
    }

    fn create_bind_group_layout(
        device: &wgpu::Device,
        planes: &[PlaneSpec],
    ) -> wgpu::BindGroupLayout {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = planes
            .iter()
            .map(|plane| wgpu::BindGroupLayoutEntry {
                binding: plane.unit,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .chain(std::iter::once(wgpu::BindGroupLayoutEntry {
                binding: SAMPLER_BINDING,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            }))
            .collect();

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Plane Bind Group Layout"),
            entries: &entries,
        })
    }

    fn create_render_pipeline(
        device: &wgpu::Device,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
        vertex: &CompiledShader,
        fragment: &CompiledShader,
        target_format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Frame Pipeline Layout"),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Frame Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex.module,
                entry_point: Some(ShaderStage::Vertex.entry_point()),
                buffers: &GeometryBuffer::LAYOUTS,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment.module,
                entry_point: Some(ShaderStage::Fragment.entry_point()),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }
}
