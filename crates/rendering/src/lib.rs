//! GPU presentation of decoded video frames.
//!
//! A [`FrameRenderer`] draws either packed RGB frames or planar YUV 4:2:0 frames onto a
//! [`RenderSurface`], converting them to display color in a fragment shader. The pixel format
//! is picked once, at construction, through the renderer's [`RenderMode`] type parameter.
//! [`Screen`] wraps both variants behind a runtime flag for callers that only learn the format
//! at runtime.

pub mod color;
pub mod config;
mod context;
mod frame;
mod geometry;
mod mode;
mod readback;
mod renderer;
mod screen;
mod shader;
mod surface;
mod texture;

pub use config::{GpuPreference, PresentModePreference, RendererConfig, TextureFilter};
pub use context::{GpuContext, available_adapters};
pub use frame::{
    FrameDescriptor, PixelFormat, PixelFrame, RgbFrame, Yuv420pFrame, chroma_extent,
    chroma_plane_len, luma_plane_len, rgb_frame_len,
};
pub use geometry::{
    GeometryBuffer, QUAD_POSITIONS, QUAD_TEX_COORDS, QUAD_VERTEX_COUNT, TexCoordTransform,
};
pub use mode::{PlaneSpec, RenderMode, Rgb, Yuv420p};
pub use readback::RenderedFrame;
pub use renderer::{FrameRenderer, RenderStats, RendererState, Viewport};
pub use screen::Screen;
pub use shader::{
    CompiledShader, RGB_FRAGMENT_SOURCE, SAMPLER_BINDING, SamplerBinding, ShaderPipeline,
    ShaderStage, VERTEX_SOURCE, YUV420P_FRAGMENT_SOURCE,
};
pub use surface::{RenderSurface, SurfaceSizer};
pub use texture::{BoundTextureSet, PixelStore, TexturePlaneSet, UNPACK_ROW_ALIGNMENT};

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("No GPU rendering context available: {reason}")]
    ContextUnavailable { reason: String },
    #[error("GPU context was lost, the renderer must be reconstructed")]
    ContextLost,
    #[error("Failed to compile {stage} shader '{label}': {diagnostic}")]
    ShaderCompile {
        stage: ShaderStage,
        label: String,
        diagnostic: String,
    },
    #[error("Failed to link shader program: {diagnostic}")]
    ShaderLink { diagnostic: String },
    #[error("Invalid frame dimensions {width}x{height}")]
    InvalidFrameDimensions { width: u32, height: u32 },
    #[error("{plane} plane too short: expected at least {expected} bytes, got {actual}")]
    PlaneTooShort {
        plane: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{plane} plane is required for this frame")]
    MissingPlane { plane: &'static str },
    #[error("No texture plane bound to unit {unit}")]
    InvalidTextureUnit { unit: u32 },
    #[error("Renderer expects {expected:?} frames, got {actual:?}")]
    ModeMismatch {
        expected: PixelFormat,
        actual: PixelFormat,
    },
    #[error("Renderer has been destroyed")]
    Destroyed,
    #[error("Readback is only available on headless surfaces")]
    ReadbackUnsupported,
    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),
    #[error("GPU validation failed: {0}")]
    Gpu(String),
    #[error("Failed to wait for buffer mapping")]
    BufferMapWaitingFailed,
    #[error(transparent)]
    BufferMap(#[from] wgpu::BufferAsyncError),
    #[error(transparent)]
    Poll(#[from] wgpu::PollError),
}

impl From<wgpu::RequestAdapterError> for RenderError {
    fn from(value: wgpu::RequestAdapterError) -> Self {
        Self::ContextUnavailable {
            reason: value.to_string(),
        }
    }
}

impl From<wgpu::RequestDeviceError> for RenderError {
    fn from(value: wgpu::RequestDeviceError) -> Self {
        Self::ContextUnavailable {
            reason: value.to_string(),
        }
    }
}

impl From<wgpu::CreateSurfaceError> for RenderError {
    fn from(value: wgpu::CreateSurfaceError) -> Self {
        Self::ContextUnavailable {
            reason: value.to_string(),
        }
    }
}
