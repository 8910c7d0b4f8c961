use crate::{
    GpuContext, RenderError,
    frame::{PixelFormat, PixelFrame, RgbFrame, Yuv420pFrame, chroma_extent},
    shader::{RGB_FRAGMENT_SOURCE, YUV420P_FRAGMENT_SOURCE},
    texture::TexturePlaneSet,
};

/// One texture plane of a render mode, bound to a fixed texture unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneSpec {
    pub unit: u32,
    pub label: &'static str,
    /// Luminance style plane, one byte per pixel. Otherwise packed 3-channel RGB.
    pub single_channel: bool,
    /// Plane is half width and half height of the frame.
    pub subsampled: bool,
}

impl PlaneSpec {
    pub fn extent(&self, width: u32, height: u32) -> (u32, u32) {
        if self.subsampled {
            chroma_extent(width, height)
        } else {
            (width, height)
        }
    }

    /// Uploads this plane of a `width`x`height` frame to its texture unit.
    fn upload(
        &self,
        textures: &mut TexturePlaneSet,
        context: &GpuContext,
        (width, height): (u32, u32),
        data: &[u8],
    ) -> Result<(), RenderError> {
        let (plane_width, plane_height) = self.extent(width, height);
        textures.upload(
            context,
            self.unit,
            plane_width,
            plane_height,
            data,
            self.single_channel,
        )
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Pixel format a [`crate::FrameRenderer`] is built for.
///
/// Implemented by [`Rgb`] and [`Yuv420p`] only. The mode is a type parameter so a renderer can
/// never be handed frames of the other format.
pub trait RenderMode: sealed::Sealed + 'static {
    const FORMAT: PixelFormat;
    const PLANES: &'static [PlaneSpec];
    const FRAGMENT_LABEL: &'static str;
    const FRAGMENT_SOURCE: &'static str;

    type Frame<'a>: PixelFrame + Copy;

    /// Reallocates every plane texture to the frame's size and uploads its contents.
    fn upload(
        textures: &mut TexturePlaneSet,
        context: &GpuContext,
        frame: &Self::Frame<'_>,
    ) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Copy)]
pub struct Rgb;

impl sealed::Sealed for Rgb {}

impl RenderMode for Rgb {
    const FORMAT: PixelFormat = PixelFormat::RgbPacked;
    const PLANES: &'static [PlaneSpec] = &[PlaneSpec {
        unit: 0,
        label: "RGB",
        single_channel: false,
        subsampled: false,
    }];
    const FRAGMENT_LABEL: &'static str = "rgb.wgsl";
    const FRAGMENT_SOURCE: &'static str = RGB_FRAGMENT_SOURCE;

    type Frame<'a> = RgbFrame<'a>;

    fn upload(
        textures: &mut TexturePlaneSet,
        context: &GpuContext,
        frame: &RgbFrame<'_>,
    ) -> Result<(), RenderError> {
        Self::PLANES[0].upload(textures, context, (frame.width, frame.height), frame.data)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Yuv420p;

impl sealed::Sealed for Yuv420p {}

impl RenderMode for Yuv420p {
    const FORMAT: PixelFormat = PixelFormat::Yuv420Planar;
    const PLANES: &'static [PlaneSpec] = &[
        PlaneSpec {
            unit: 0,
            label: "Y",
            single_channel: true,
            subsampled: false,
        },
        PlaneSpec {
            unit: 1,
            label: "U",
            single_channel: true,
            subsampled: true,
        },
        PlaneSpec {
            unit: 2,
            label: "V",
            single_channel: true,
            subsampled: true,
        },
    ];
    const FRAGMENT_LABEL: &'static str = "yuv420p.wgsl";
    const FRAGMENT_SOURCE: &'static str = YUV420P_FRAGMENT_SOURCE;

    type Frame<'a> = Yuv420pFrame<'a>;

    fn upload(
        textures: &mut TexturePlaneSet,
        context: &GpuContext,
        frame: &Yuv420pFrame<'_>,
    ) -> Result<(), RenderError> {
        for (plane, data) in Self::PLANES.iter().zip([frame.y, frame.u, frame.v]) {
            plane.upload(textures, context, (frame.width, frame.height), data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn rgb_binds_exactly_one_unit() {
        let units: Vec<u32> = Rgb::PLANES.iter().map(|plane| plane.unit).collect();
        assert_eq!(units, vec![0]);
        assert!(!Rgb::PLANES[0].single_channel);
    }

    #[test]
    fn yuv_binds_exactly_three_units() {
        let units: Vec<u32> = Yuv420p::PLANES.iter().map(|plane| plane.unit).collect();
        assert_eq!(units, vec![0, 1, 2]);
        assert!(Yuv420p::PLANES.iter().all(|plane| plane.single_channel));
    }

    #[test]
    fn chroma_planes_are_subsampled() {
        let [y, u, v] = Yuv420p::PLANES else {
            panic!("expected three planes");
        };

        assert_eq!(y.extent(640, 480), (640, 480));
        assert_eq!(u.extent(640, 480), (320, 240));
        assert_eq!(v.extent(640, 480), (320, 240));
    }
}
