use std::marker::PhantomData;

use crate::{
    GpuContext, RenderError, RendererConfig,
    frame::PixelFrame,
    geometry::{GeometryBuffer, TexCoordTransform},
    mode::RenderMode,
    readback::{self, RenderedFrame},
    shader::ShaderPipeline,
    surface::{RenderSurface, SurfaceSizer},
    texture::{BoundTextureSet, TexturePlaneSet},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Initialized,
    Rendering,
    Destroyed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_rendered: u64,
    pub frames_skipped: u64,
    pub last_extent: Option<(u32, u32)>,
}

/// Target region of a draw, in wgpu's top-left pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Places a `frame` sized viewport at the bottom-left corner of `target`.
    ///
    /// The viewport stops at the target's edges. The part of the frame beyond them is cropped
    /// through [`Viewport::tex_coord_transform`], never scaled.
    pub fn for_frame(frame: (u32, u32), target: (u32, u32)) -> Self {
        let width = frame.0.min(target.0);
        let height = frame.1.min(target.1);

        Self {
            x: 0,
            y: target.1 - height,
            width,
            height,
        }
    }

    /// Texture coordinates that keep `frame` at one texel per pixel inside this viewport.
    pub fn tex_coord_transform(&self, frame: (u32, u32)) -> TexCoordTransform {
        TexCoordTransform::crop(frame, (self.width, self.height))
    }
}

struct Resources {
    pipeline: ShaderPipeline,
    geometry: GeometryBuffer,
    textures: TexturePlaneSet,
    bound: Option<BoundTextureSet>,
}

/// Draws frames of one pixel format onto a surface.
///
/// Every call is synchronous: uploads and the draw are submitted before `render_image` returns.
pub struct FrameRenderer<M: RenderMode> {
    context: GpuContext,
    surface: SurfaceSizer,
    resources: Option<Resources>,
    config: RendererConfig,
    state: RendererState,
    stats: RenderStats,
    _mode: PhantomData<M>,
}

impl<M: RenderMode> FrameRenderer<M> {
    pub fn new(surface: RenderSurface) -> Result<Self, RenderError> {
        Self::with_config(surface, RendererConfig::default())
    }

    pub fn with_config(surface: RenderSurface, config: RendererConfig) -> Result<Self, RenderError> {
        let (context, surface) = GpuContext::acquire(surface, &config)?;

        let pipeline = ShaderPipeline::build(
            &context,
            M::FRAGMENT_LABEL,
            M::FRAGMENT_SOURCE,
            M::PLANES,
            surface.format(),
        )?;
        let geometry = GeometryBuffer::new(&context.device, pipeline.transform_layout());
        let textures = TexturePlaneSet::allocate(&context.device, M::PLANES, config.filter);

        let (width, height) = surface.size();
        tracing::info!(
            mode = ?M::FORMAT,
            adapter = %context.adapter_info().name,
            width,
            height,
            headless = surface.is_headless(),
            "Frame renderer initialized"
        );

        Ok(Self {
            context,
            surface,
            resources: Some(Resources {
                pipeline,
                geometry,
                textures,
                bound: None,
            }),
            config,
            state: RendererState::Initialized,
            stats: RenderStats::default(),
            _mode: PhantomData,
        })
    }

    /// Uploads `frame` and draws it into the bottom-left `width`x`height` region of the surface.
    ///
    /// Frames with a zero dimension are skipped with a warning.
    pub fn render_image(&mut self, frame: M::Frame<'_>) -> Result<(), RenderError> {
        self.ensure_usable()?;

        let (width, height) = (frame.width(), frame.height());
        if frame.is_empty() {
            tracing::warn!(width, height, "Skipping frame with empty dimensions");
            self.stats.frames_skipped += 1;
            return Ok(());
        }

        frame.validate()?;

        let max_dimension = self.context.max_texture_dimension();
        if width > max_dimension || height > max_dimension {
            tracing::error!(width, height, max_dimension, "Frame exceeds texture limits");
            return Err(RenderError::InvalidFrameDimensions { width, height });
        }

        let Some(resources) = self.resources.as_mut() else {
            return Err(RenderError::Destroyed);
        };

        let Some(target) = self.surface.acquire(&self.context.device)? else {
            self.stats.frames_skipped += 1;
            return Ok(());
        };

        let viewport = Viewport::for_frame((width, height), (target.width, target.height));
        let transform = viewport.tex_coord_transform((width, height));
        let clear_color = self.config.clear_color();
        let context = &self.context;

        let (result, error) = context.scoped(|device| {
            M::upload(&mut resources.textures, context, &frame)?;
            let bound = resources
                .textures
                .bind(device, resources.pipeline.bind_group_layout());
            resources.geometry.set_transform(&context.queue, transform);

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Render Encoder"),
            });

            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Frame Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &target.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(clear_color),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                pass.set_viewport(
                    viewport.x as f32,
                    viewport.y as f32,
                    viewport.width as f32,
                    viewport.height as f32,
                    0.0,
                    1.0,
                );
                pass.set_pipeline(resources.pipeline.pipeline());
                pass.set_bind_group(0, bound.bind_group(), &[]);
                resources.geometry.draw(&mut pass);
            }

            context.queue.submit(std::iter::once(encoder.finish()));

            Ok::<_, RenderError>(bound)
        });

        let bound = result?;
        if let Some(error) = error {
            tracing::error!(width, height, "Frame render failed: {error}");
            return Err(RenderError::Gpu(error.to_string()));
        }

        target.present();

        tracing::trace!(width, height, ?viewport, "Rendered frame");

        resources.bound = Some(bound);
        self.state = RendererState::Rendering;
        self.stats.frames_rendered += 1;
        self.stats.last_extent = Some((width, height));

        Ok(())
    }

    /// Resizes the backing surface. The viewport is left to the next `render_image`.
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.ensure_usable()?;
        self.surface.set_size(&self.context.device, width, height);
        Ok(())
    }

    /// Clears the surface and frees every GPU object the renderer created.
    ///
    /// The renderer is unusable afterwards and every call returns [`RenderError::Destroyed`].
    pub fn destroy(&mut self) -> Result<(), RenderError> {
        if self.state == RendererState::Destroyed {
            return Err(RenderError::Destroyed);
        }

        if !self.context.is_lost()
            && let Err(e) = self.clear_target()
        {
            tracing::warn!("Failed to clear surface on destroy: {e}");
        }

        if let Some(mut resources) = self.resources.take() {
            resources.bound = None;
            resources.textures.release();
        }

        self.state = RendererState::Destroyed;
        tracing::info!(
            frames_rendered = self.stats.frames_rendered,
            frames_skipped = self.stats.frames_skipped,
            "Frame renderer destroyed"
        );

        Ok(())
    }

    /// Reads the current contents of a headless surface.
    pub fn read_pixels(&self) -> Result<RenderedFrame, RenderError> {
        self.ensure_usable()?;

        let texture = self
            .surface
            .offscreen_texture()
            .ok_or(RenderError::ReadbackUnsupported)?;

        readback::read_texture(&self.context, texture)
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn surface(&self) -> &SurfaceSizer {
        &self.surface
    }

    pub fn shader_pipeline(&self) -> Option<&ShaderPipeline> {
        self.resources.as_ref().map(|resources| &resources.pipeline)
    }

    pub fn plane_count(&self) -> usize {
        self.resources
            .as_ref()
            .map(|resources| resources.textures.plane_count())
            .unwrap_or_default()
    }

    /// Size of the texture the most recent draw sampled on `unit`.
    pub fn bound_extent(&self, unit: u32) -> Option<(u32, u32)> {
        self.resources
            .as_ref()
            .and_then(|resources| resources.bound.as_ref())
            .and_then(|bound| bound.extent(unit))
    }

    /// Texture units used by the most recent draw.
    pub fn bound_units(&self) -> &[u32] {
        self.resources
            .as_ref()
            .and_then(|resources| resources.bound.as_ref())
            .map(BoundTextureSet::units)
            .unwrap_or_default()
    }

    fn ensure_usable(&self) -> Result<(), RenderError> {
        if self.state == RendererState::Destroyed {
            return Err(RenderError::Destroyed);
        }

        if self.context.is_lost() {
            return Err(RenderError::ContextLost);
        }

        Ok(())
    }

    fn clear_target(&mut self) -> Result<(), RenderError> {
        let Some(target) = self.surface.acquire(&self.context.device)? else {
            return Ok(());
        };

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });

        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        target.present();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn viewport_covers_matching_target() {
        assert_eq!(
            Viewport::for_frame((640, 480), (640, 480)),
            Viewport {
                x: 0,
                y: 0,
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn smaller_frame_sits_at_bottom_left() {
        assert_eq!(
            Viewport::for_frame((32, 16), (64, 64)),
            Viewport {
                x: 0,
                y: 48,
                width: 32,
                height: 16
            }
        );
    }

    #[test]
    fn larger_frame_is_cropped_not_scaled() {
        let viewport = Viewport::for_frame((128, 100), (64, 64));
        assert_eq!(
            viewport,
            Viewport {
                x: 0,
                y: 0,
                width: 64,
                height: 64
            }
        );

        let transform = viewport.tex_coord_transform((128, 100));
        let texels_per_pixel = (
            transform.scale[0] * 128.0 / viewport.width as f32,
            transform.scale[1] * 100.0 / viewport.height as f32,
        );
        assert!((texels_per_pixel.0 - 1.0).abs() < 1e-6);
        assert!((texels_per_pixel.1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn smaller_frame_samples_whole_texture() {
        let viewport = Viewport::for_frame((32, 16), (64, 64));

        assert_eq!(
            viewport.tex_coord_transform((32, 16)),
            TexCoordTransform::IDENTITY
        );
    }
}
