use wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

use crate::{GpuContext, RenderError};

const BYTES_PER_PIXEL: u32 = 4;

/// RGBA8 pixels of a headless surface, rows tightly packed and top row first.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RenderedFrame {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let offset = ((y * self.width + x) * BYTES_PER_PIXEL) as usize;
        let mut pixel = [0; 4];
        pixel.copy_from_slice(&self.data[offset..offset + 4]);
        Some(pixel)
    }
}

pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    unpadded.div_ceil(COPY_BYTES_PER_ROW_ALIGNMENT) * COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Copies an RGBA8 texture back to host memory and waits for the copy to finish.
pub(crate) fn read_texture(
    context: &GpuContext,
    texture: &wgpu::Texture,
) -> Result<RenderedFrame, RenderError> {
    let (width, height) = (texture.width(), texture.height());
    let padded_bytes_per_row = padded_bytes_per_row(width);

    let output_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: (padded_bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = context
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });

    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    context.queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = output_buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).ok();
    });

    context.device.poll(wgpu::PollType::Wait)?;
    rx.recv()
        .map_err(|_| RenderError::BufferMapWaitingFailed)??;

    let row_len = (width * BYTES_PER_PIXEL) as usize;
    let mut data = Vec::with_capacity(row_len * height as usize);
    {
        let mapped = buffer_slice.get_mapped_range();
        for row in mapped.chunks(padded_bytes_per_row as usize) {
            data.extend_from_slice(&row[..row_len]);
        }
    }
    output_buffer.unmap();

    Ok(RenderedFrame {
        data,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
    }

    #[test]
    fn pixel_lookup_is_row_major() {
        let frame = RenderedFrame {
            data: (0..2 * 2 * 4).collect(),
            width: 2,
            height: 2,
        };

        assert_eq!(frame.pixel(1, 0), Some([4, 5, 6, 7]));
        assert_eq!(frame.pixel(0, 1), Some([8, 9, 10, 11]));
        assert_eq!(frame.pixel(2, 0), None);
    }
}
