use crate::{RenderError, RendererConfig};

/// Format of headless render targets. Not sRGB, so shader output is stored verbatim.
pub(crate) const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Where a renderer presents its frames.
pub struct RenderSurface {
    target: Target,
    width: u32,
    height: u32,
}

enum Target {
    Headless,
    Window(wgpu::SurfaceTarget<'static>),
}

impl RenderSurface {
    /// An offscreen render target whose contents can be read back.
    pub fn headless(width: u32, height: u32) -> Self {
        Self {
            target: Target::Headless,
            width,
            height,
        }
    }

    /// A presentable surface backed by a window handle.
    pub fn window(target: impl Into<wgpu::SurfaceTarget<'static>>, width: u32, height: u32) -> Self {
        Self {
            target: Target::Window(target.into()),
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_headless(&self) -> bool {
        matches!(self.target, Target::Headless)
    }

    pub(crate) fn create_window_surface(
        self,
        instance: &wgpu::Instance,
    ) -> Result<Option<wgpu::Surface<'static>>, RenderError> {
        match self.target {
            Target::Headless => Ok(None),
            Target::Window(target) => Ok(Some(instance.create_surface(target)?)),
        }
    }
}

/// Owns the backing surface and its pixel dimensions.
///
/// Resizing here never touches the viewport, which each render call sets from its frame.
pub struct SurfaceSizer {
    backing: Backing,
    width: u32,
    height: u32,
}

enum Backing {
    Offscreen(wgpu::Texture),
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
}

impl SurfaceSizer {
    pub(crate) fn new(
        device: &wgpu::Device,
        adapter: &wgpu::Adapter,
        window: Option<wgpu::Surface<'static>>,
        width: u32,
        height: u32,
        config: &RendererConfig,
    ) -> Result<Self, RenderError> {
        let width = width.max(1);
        let height = height.max(1);

        let backing = match window {
            None => Backing::Offscreen(create_offscreen_texture(device, width, height)),
            Some(surface) => {
                let capabilities = surface.get_capabilities(adapter);
                let Some(format) = capabilities
                    .formats
                    .iter()
                    .find(|format| !format.is_srgb())
                    .or_else(|| capabilities.formats.first())
                    .copied()
                else {
                    return Err(RenderError::ContextUnavailable {
                        reason: "surface is not supported by the selected adapter".to_string(),
                    });
                };

                let present_mode = config.present_mode.resolve(&capabilities.present_modes);
                tracing::info!(?format, ?present_mode, "Configuring window surface");

                let config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width,
                    height,
                    present_mode,
                    desired_maximum_frame_latency: 2,
                    alpha_mode: wgpu::CompositeAlphaMode::Auto,
                    view_formats: vec![],
                };
                surface.configure(device, &config);

                Backing::Window { surface, config }
            }
        };

        Ok(Self {
            backing,
            width,
            height,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match &self.backing {
            Backing::Offscreen(texture) => texture.format(),
            Backing::Window { config, .. } => config.format,
        }
    }

    pub fn is_headless(&self) -> bool {
        matches!(self.backing, Backing::Offscreen(_))
    }

    pub(crate) fn offscreen_texture(&self) -> Option<&wgpu::Texture> {
        match &self.backing {
            Backing::Offscreen(texture) => Some(texture),
            Backing::Window { .. } => None,
        }
    }

    pub(crate) fn set_size(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            tracing::warn!(width, height, "Ignoring resize to an empty surface");
            return;
        }

        if (width, height) == (self.width, self.height) {
            return;
        }

        tracing::debug!(
            old_width = self.width,
            old_height = self.height,
            new_width = width,
            new_height = height,
            "Resizing surface"
        );

        match &mut self.backing {
            Backing::Offscreen(texture) => {
                *texture = create_offscreen_texture(device, width, height);
            }
            Backing::Window { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(device, config);
            }
        }

        self.width = width;
        self.height = height;
    }

    /// Returns the texture to draw the next frame into, or `None` if the swapchain timed out.
    pub(crate) fn acquire(
        &mut self,
        device: &wgpu::Device,
    ) -> Result<Option<FrameTarget>, RenderError> {
        match &self.backing {
            Backing::Offscreen(texture) => Ok(Some(FrameTarget {
                view: texture.create_view(&Default::default()),
                width: texture.width(),
                height: texture.height(),
                surface_texture: None,
            })),
            Backing::Window { surface, config } => {
                let surface_texture = match surface.get_current_texture() {
                    Ok(surface_texture) => surface_texture,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        tracing::debug!("Surface lost or outdated, reconfiguring");
                        surface.configure(device, config);
                        surface.get_current_texture()?
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        tracing::warn!("Timed out acquiring surface texture");
                        return Ok(None);
                    }
                    Err(e) => return Err(e.into()),
                };

                Ok(Some(FrameTarget {
                    view: surface_texture.texture.create_view(&Default::default()),
                    width: surface_texture.texture.width(),
                    height: surface_texture.texture.height(),
                    surface_texture: Some(surface_texture),
                }))
            }
        }
    }
}

pub(crate) struct FrameTarget {
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl FrameTarget {
    pub fn present(self) {
        if let Some(surface_texture) = self.surface_texture {
            surface_texture.present();
        }
    }
}

fn create_offscreen_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Surface Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
