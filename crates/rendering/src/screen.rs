use crate::{
    FrameRenderer, RenderError, RenderStats, RendererConfig, RendererState,
    frame::{FrameDescriptor, PixelFormat},
    mode::{Rgb, Yuv420p},
    readback::RenderedFrame,
    surface::RenderSurface,
};

/// A [`FrameRenderer`] whose pixel format is chosen at runtime.
pub enum Screen {
    Rgb(FrameRenderer<Rgb>),
    Yuv420p(FrameRenderer<Yuv420p>),
}

impl Screen {
    pub fn new(surface: RenderSurface, rgb: bool) -> Result<Self, RenderError> {
        Self::with_config(surface, rgb, RendererConfig::default())
    }

    pub fn with_config(
        surface: RenderSurface,
        rgb: bool,
        config: RendererConfig,
    ) -> Result<Self, RenderError> {
        Ok(if rgb {
            Self::Rgb(FrameRenderer::with_config(surface, config)?)
        } else {
            Self::Yuv420p(FrameRenderer::with_config(surface, config)?)
        })
    }

    pub fn mode(&self) -> PixelFormat {
        match self {
            Self::Rgb(_) => PixelFormat::RgbPacked,
            Self::Yuv420p(_) => PixelFormat::Yuv420Planar,
        }
    }

    /// Renders a frame given as loose planes. `plane_u` and `plane_v` are only read in YUV mode.
    pub fn render_image(
        &mut self,
        width: u32,
        height: u32,
        plane_y: &[u8],
        plane_u: Option<&[u8]>,
        plane_v: Option<&[u8]>,
    ) -> Result<(), RenderError> {
        let frame = FrameDescriptor::from_planes(width, height, plane_y, plane_u, plane_v)?;
        self.render_frame(frame)
    }

    pub fn render_frame(&mut self, frame: FrameDescriptor<'_>) -> Result<(), RenderError> {
        match (self, frame) {
            (Self::Rgb(renderer), FrameDescriptor::Rgb(frame)) => renderer.render_image(frame),
            (Self::Yuv420p(renderer), FrameDescriptor::Yuv420p(frame)) => {
                renderer.render_image(frame)
            }
            (screen, frame) => {
                let expected = screen.mode();
                let actual = frame.pixel_format();
                tracing::error!(?expected, ?actual, "Frame does not match screen mode");
                Err(RenderError::ModeMismatch { expected, actual })
            }
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        match self {
            Self::Rgb(renderer) => renderer.set_size(width, height),
            Self::Yuv420p(renderer) => renderer.set_size(width, height),
        }
    }

    pub fn destroy(&mut self) -> Result<(), RenderError> {
        match self {
            Self::Rgb(renderer) => renderer.destroy(),
            Self::Yuv420p(renderer) => renderer.destroy(),
        }
    }

    pub fn read_pixels(&self) -> Result<RenderedFrame, RenderError> {
        match self {
            Self::Rgb(renderer) => renderer.read_pixels(),
            Self::Yuv420p(renderer) => renderer.read_pixels(),
        }
    }

    pub fn state(&self) -> RendererState {
        match self {
            Self::Rgb(renderer) => renderer.state(),
            Self::Yuv420p(renderer) => renderer.state(),
        }
    }

    pub fn stats(&self) -> RenderStats {
        match self {
            Self::Rgb(renderer) => renderer.stats(),
            Self::Yuv420p(renderer) => renderer.stats(),
        }
    }

    pub fn bound_units(&self) -> &[u32] {
        match self {
            Self::Rgb(renderer) => renderer.bound_units(),
            Self::Yuv420p(renderer) => renderer.bound_units(),
        }
    }
}
