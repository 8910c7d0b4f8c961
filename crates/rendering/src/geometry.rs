use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Triangle strip covering all of clip space.
pub const QUAD_POSITIONS: [[f32; 3]; 4] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
];

/// The first source row is at `v = 0`, so it lands on the top edge of the quad.
pub const QUAD_TEX_COORDS: [[f32; 2]; 4] = [[1.0, 0.0], [0.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

pub const QUAD_VERTEX_COUNT: u32 = QUAD_POSITIONS.len() as u32;

/// Maps the quad's texture coordinates onto a sub-rectangle of the frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TexCoordTransform {
    pub scale: [f32; 2],
    pub offset: [f32; 2],
}

impl TexCoordTransform {
    pub const IDENTITY: Self = Self {
        scale: [1.0, 1.0],
        offset: [0.0, 0.0],
    };

    /// Samples a `frame` sized texture at 1:1 inside a `visible` sized viewport.
    ///
    /// The frame's bottom-left corner is pinned to the viewport's, so a frame larger than the
    /// viewport loses its right columns and top rows.
    pub fn crop(frame: (u32, u32), visible: (u32, u32)) -> Self {
        let scale_x = visible.0.min(frame.0) as f32 / frame.0 as f32;
        let scale_y = visible.1.min(frame.1) as f32 / frame.1 as f32;

        Self {
            scale: [scale_x, scale_y],
            offset: [0.0, 1.0 - scale_y],
        }
    }
}

impl Default for TexCoordTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Full-screen quad, uploaded once at renderer construction.
///
/// Only the texture coordinate transform changes between draws.
pub struct GeometryBuffer {
    positions: wgpu::Buffer,
    tex_coords: wgpu::Buffer,
    transform: wgpu::Buffer,
    transform_bind_group: wgpu::BindGroup,
}

impl GeometryBuffer {
    pub const LAYOUTS: [wgpu::VertexBufferLayout<'static>; 2] = [
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3],
        },
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![1 => Float32x2],
        },
    ];

    /// Bind group 1 of the vertex program: the [`TexCoordTransform`] uniform.
    pub fn create_transform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Quad Transform Bind Group Layout"),
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
        })
    }

    pub fn new(device: &wgpu::Device, transform_layout: &wgpu::BindGroupLayout) -> Self {
        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Position Buffer"),
            contents: bytemuck::cast_slice(&QUAD_POSITIONS),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let tex_coords = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Texture Coordinate Buffer"),
            contents: bytemuck::cast_slice(&QUAD_TEX_COORDS),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let transform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Transform Buffer"),
            contents: bytemuck::bytes_of(&TexCoordTransform::IDENTITY),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let transform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Transform Bind Group"),
            layout: transform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: transform.as_entire_binding(),
            }],
        });

        Self {
            positions,
            tex_coords,
            transform,
            transform_bind_group,
        }
    }

    /// Staged on the queue, so it applies to the next submitted draw.
    pub fn set_transform(&self, queue: &wgpu::Queue, transform: TexCoordTransform) {
        queue.write_buffer(&self.transform, 0, bytemuck::bytes_of(&transform));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(1, &self.transform_bind_group, &[]);
        pass.set_vertex_buffer(0, self.positions.slice(..));
        pass.set_vertex_buffer(1, self.tex_coords.slice(..));
        pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn quad_corners_map_to_flipped_texture_corners() {
        let pairs: Vec<([f32; 2], [f32; 2])> = QUAD_POSITIONS
            .iter()
            .zip(QUAD_TEX_COORDS.iter())
            .map(|(position, tex_coord)| ([position[0], position[1]], *tex_coord))
            .collect();

        assert_eq!(
            pairs,
            vec![
                ([1.0, 1.0], [1.0, 0.0]),
                ([-1.0, 1.0], [0.0, 0.0]),
                ([1.0, -1.0], [1.0, 1.0]),
                ([-1.0, -1.0], [0.0, 1.0]),
            ]
        );
    }

    #[test]
    fn fitting_frame_samples_whole_texture() {
        assert_eq!(
            TexCoordTransform::crop((64, 48), (64, 48)),
            TexCoordTransform::IDENTITY
        );
    }

    #[test]
    fn oversized_frame_keeps_bottom_left_at_one_to_one() {
        let transform = TexCoordTransform::crop((128, 100), (64, 64));

        assert_eq!(transform.scale[0], 0.5);
        assert!((transform.scale[1] - 0.64).abs() < 1e-6);
        assert_eq!(transform.offset[0], 0.0);
        assert!((transform.offset[1] - 0.36).abs() < 1e-6);

        // One source texel per viewport pixel on both axes.
        assert_eq!(transform.scale[0] * 128.0, 64.0);
        assert!((transform.scale[1] * 100.0 - 64.0).abs() < 1e-4);
    }

    #[test]
    fn layouts_match_vertex_data() {
        let [positions, tex_coords] = &GeometryBuffer::LAYOUTS;

        assert_eq!(positions.array_stride, 12);
        assert_eq!(positions.attributes[0].shader_location, 0);
        assert_eq!(tex_coords.array_stride, 8);
        assert_eq!(tex_coords.attributes[0].shader_location, 1);
        assert_eq!(
            bytemuck::cast_slice::<_, u8>(&QUAD_POSITIONS).len(),
            QUAD_VERTEX_COUNT as usize * 12
        );
    }
}
