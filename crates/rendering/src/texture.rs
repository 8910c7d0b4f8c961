use crate::{GpuContext, RenderError, TextureFilter, mode::PlaneSpec, shader::SAMPLER_BINDING};

/// Row alignment of uploaded plane data. Rows are tightly packed.
pub const UNPACK_ROW_ALIGNMENT: u32 = 1;

/// Host-side layout of uploaded pixel rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelStore {
    row_alignment: u32,
}

impl PixelStore {
    pub const fn new(row_alignment: u32) -> Self {
        Self { row_alignment }
    }

    pub fn row_alignment(&self) -> u32 {
        self.row_alignment
    }

    pub fn bytes_per_row(&self, width: u32, bytes_per_pixel: u32) -> u32 {
        (width * bytes_per_pixel).div_ceil(self.row_alignment) * self.row_alignment
    }
}

impl Default for PixelStore {
    fn default() -> Self {
        Self::new(UNPACK_ROW_ALIGNMENT)
    }
}

struct PlaneTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// One texture per plane of the render mode, each on a fixed texture unit.
///
/// Every upload reallocates the plane's texture at the incoming size, so frames of varying
/// dimensions never see the previous frame's storage.
pub struct TexturePlaneSet {
    planes: &'static [PlaneSpec],
    textures: Vec<PlaneTexture>,
    sampler: wgpu::Sampler,
    pixel_store: PixelStore,
    rgba_scratch: Vec<u8>,
}

impl TexturePlaneSet {
    pub fn allocate(
        device: &wgpu::Device,
        planes: &'static [PlaneSpec],
        filter: TextureFilter,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Plane Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter.into(),
            min_filter: filter.into(),
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let textures = planes
            .iter()
            .map(|plane| create_plane_texture(device, plane, 1, 1))
            .collect();

        tracing::debug!(planes = planes.len(), ?filter, "Allocated texture planes");

        Self {
            planes,
            textures,
            sampler,
            pixel_store: PixelStore::default(),
            rgba_scratch: Vec::new(),
        }
    }

    pub fn plane_count(&self) -> usize {
        self.textures.len()
    }

    /// Size of the texture currently bound to `unit`.
    pub fn extent(&self, unit: u32) -> Option<(u32, u32)> {
        let index = self.index_of(unit)?;
        let texture = &self.textures[index].texture;
        Some((texture.width(), texture.height()))
    }

    /// Replaces the texture at `unit` with a `width`x`height` one holding `buffer`.
    ///
    /// `single_channel` buffers are one byte per pixel, otherwise three packed bytes per pixel.
    pub fn upload(
        &mut self,
        context: &GpuContext,
        unit: u32,
        width: u32,
        height: u32,
        buffer: &[u8],
        single_channel: bool,
    ) -> Result<(), RenderError> {
        let index = self
            .index_of(unit)
            .ok_or(RenderError::InvalidTextureUnit { unit })?;
        let plane = self.planes[index];

        let source_bytes_per_pixel = if single_channel { 1 } else { 3 };
        let expected = width as usize * height as usize * source_bytes_per_pixel;
        if buffer.len() < expected {
            return Err(RenderError::PlaneTooShort {
                plane: plane.label,
                expected,
                actual: buffer.len(),
            });
        }

        let format = if single_channel {
            wgpu::TextureFormat::R8Unorm
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };

        let previous = std::mem::replace(
            &mut self.textures[index],
            create_texture(&context.device, plane.label, width, height, format),
        );
        previous.texture.destroy();

        let (data, bytes_per_pixel) = if single_channel {
            (&buffer[..expected], 1)
        } else {
            expand_rgb_to_rgba(&buffer[..expected], &mut self.rgba_scratch);
            (self.rgba_scratch.as_slice(), 4)
        };

        context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.textures[index].texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.pixel_store.bytes_per_row(width, bytes_per_pixel)),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        tracing::trace!(unit, width, height, plane = plane.label, "Uploaded plane");

        Ok(())
    }

    /// Records which texture sits on which unit for the next draw.
    pub fn bind(&self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> BoundTextureSet {
        let entries: Vec<wgpu::BindGroupEntry> = self
            .planes
            .iter()
            .zip(&self.textures)
            .map(|(plane, texture)| wgpu::BindGroupEntry {
                binding: plane.unit,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            })
            .chain(std::iter::once(wgpu::BindGroupEntry {
                binding: SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            }))
            .collect();

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Plane Bind Group"),
            layout,
            entries: &entries,
        });

        let (units, extents) = self
            .planes
            .iter()
            .filter_map(|plane| Some((plane.unit, self.extent(plane.unit)?)))
            .unzip();

        BoundTextureSet {
            bind_group,
            units,
            extents,
        }
    }

    /// Frees every plane texture. The set is unusable afterwards.
    pub fn release(&mut self) {
        for plane in self.textures.drain(..) {
            plane.texture.destroy();
        }
        self.rgba_scratch = Vec::new();
    }

    fn index_of(&self, unit: u32) -> Option<usize> {
        self.planes
            .iter()
            .position(|plane| plane.unit == unit)
            .filter(|&index| index < self.textures.len())
    }
}

/// The textures and bind group one draw call used.
pub struct BoundTextureSet {
    bind_group: wgpu::BindGroup,
    units: Vec<u32>,
    extents: Vec<(u32, u32)>,
}

impl BoundTextureSet {
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn units(&self) -> &[u32] {
        &self.units
    }

    /// Size of the texture bound to `unit` when the set was built.
    pub fn extent(&self, unit: u32) -> Option<(u32, u32)> {
        let index = self.units.iter().position(|&bound| bound == unit)?;
        self.extents.get(index).copied()
    }
}

fn create_plane_texture(
    device: &wgpu::Device,
    plane: &PlaneSpec,
    width: u32,
    height: u32,
) -> PlaneTexture {
    let format = if plane.single_channel {
        wgpu::TextureFormat::R8Unorm
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    };
    create_texture(device, plane.label, width, height, format)
}

fn create_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> PlaneTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&Default::default());

    PlaneTexture { texture, view }
}

/// wgpu has no 3 byte texel format, so packed RGB is widened with an opaque alpha byte.
fn expand_rgb_to_rgba(rgb: &[u8], rgba: &mut Vec<u8>) {
    rgba.clear();
    rgba.reserve(rgb.len() / 3 * 4);
    for pixel in rgb.chunks_exact(3) {
        rgba.extend_from_slice(pixel);
        rgba.push(u8::MAX);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_store_packs_rows_tightly() {
        let store = PixelStore::default();

        assert_eq!(store.row_alignment(), 1);
        assert_eq!(store.bytes_per_row(1921, 1), 1921);
        assert_eq!(store.bytes_per_row(333, 4), 1332);
    }

    #[test]
    fn wider_alignment_pads_rows() {
        let store = PixelStore::new(4);

        assert_eq!(store.bytes_per_row(5, 1), 8);
        assert_eq!(store.bytes_per_row(8, 1), 8);
    }

    #[test]
    fn rgb_expansion_keeps_channel_order() {
        let mut scratch = vec![9; 32];
        expand_rgb_to_rgba(&[1, 2, 3, 4, 5, 6], &mut scratch);

        assert_eq!(scratch, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }
}
