use crate::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Interleaved 3 bytes per pixel, red and blue swapped relative to upload order.
    RgbPacked,
    /// Full resolution luma plane followed by two quarter resolution chroma planes.
    Yuv420Planar,
}

/// Dimensions of each chroma plane for a YUV 4:2:0 frame.
pub fn chroma_extent(width: u32, height: u32) -> (u32, u32) {
    (width >> 1, height >> 1)
}

pub fn chroma_plane_len(width: u32, height: u32) -> usize {
    let (chroma_width, chroma_height) = chroma_extent(width, height);
    chroma_width as usize * chroma_height as usize
}

pub fn luma_plane_len(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

pub fn rgb_frame_len(width: u32, height: u32) -> usize {
    luma_plane_len(width, height) * 3
}

/// A frame borrowed from its producer for the duration of one render call.
pub trait PixelFrame {
    const FORMAT: PixelFormat;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Checks that every plane holds enough bytes for the frame's dimensions.
    fn validate(&self) -> Result<(), RenderError>;

    fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RgbFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8],
}

impl<'a> RgbFrame<'a> {
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            data,
        }
    }
}

impl PixelFrame for RgbFrame<'_> {
    const FORMAT: PixelFormat = PixelFormat::RgbPacked;

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn validate(&self) -> Result<(), RenderError> {
        check_plane("rgb", self.data, rgb_frame_len(self.width, self.height))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Yuv420pFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub y: &'a [u8],
    pub u: &'a [u8],
    pub v: &'a [u8],
}

impl<'a> Yuv420pFrame<'a> {
    pub fn new(width: u32, height: u32, y: &'a [u8], u: &'a [u8], v: &'a [u8]) -> Self {
        Self {
            width,
            height,
            y,
            u,
            v,
        }
    }
}

impl PixelFrame for Yuv420pFrame<'_> {
    const FORMAT: PixelFormat = PixelFormat::Yuv420Planar;

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn validate(&self) -> Result<(), RenderError> {
        let (chroma_width, chroma_height) = chroma_extent(self.width, self.height);
        if chroma_width == 0 || chroma_height == 0 {
            return Err(RenderError::InvalidFrameDimensions {
                width: self.width,
                height: self.height,
            });
        }

        let chroma_len = chroma_plane_len(self.width, self.height);
        check_plane("Y", self.y, luma_plane_len(self.width, self.height))?;
        check_plane("U", self.u, chroma_len)?;
        check_plane("V", self.v, chroma_len)
    }
}

/// A frame of either pixel format, for callers that pick the format at runtime.
#[derive(Debug, Clone, Copy)]
pub enum FrameDescriptor<'a> {
    Rgb(RgbFrame<'a>),
    Yuv420p(Yuv420pFrame<'a>),
}

impl<'a> FrameDescriptor<'a> {
    /// Builds a descriptor from the flat `(width, height, y, u?, v?)` form.
    ///
    /// Both chroma planes present means YUV 4:2:0, neither means packed RGB.
    pub fn from_planes(
        width: u32,
        height: u32,
        plane_y: &'a [u8],
        plane_u: Option<&'a [u8]>,
        plane_v: Option<&'a [u8]>,
    ) -> Result<Self, RenderError> {
        match (plane_u, plane_v) {
            (Some(u), Some(v)) => Ok(Self::Yuv420p(Yuv420pFrame::new(
                width, height, plane_y, u, v,
            ))),
            (None, None) => Ok(Self::Rgb(RgbFrame::new(width, height, plane_y))),
            (Some(_), None) => Err(RenderError::MissingPlane { plane: "V" }),
            (None, Some(_)) => Err(RenderError::MissingPlane { plane: "U" }),
        }
    }

    pub fn pixel_format(&self) -> PixelFormat {
        match self {
            Self::Rgb(_) => PixelFormat::RgbPacked,
            Self::Yuv420p(_) => PixelFormat::Yuv420Planar,
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Self::Rgb(frame) => frame.width,
            Self::Yuv420p(frame) => frame.width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Rgb(frame) => frame.height,
            Self::Yuv420p(frame) => frame.height,
        }
    }
}

fn check_plane(plane: &'static str, data: &[u8], expected: usize) -> Result<(), RenderError> {
    if data.len() < expected {
        return Err(RenderError::PlaneTooShort {
            plane,
            expected,
            actual: data.len(),
        });
    }

    Ok(())
}
