use std::time::Duration;

use anyhow::{Context, bail};
use framescreen_rendering::{
    FrameDescriptor, RgbFrame, Yuv420pFrame, chroma_extent, chroma_plane_len, color::swap_red_blue,
    luma_plane_len,
};

/// Pixel buffers of one decoded frame.
pub enum FramePlanes {
    /// Packed BGR, 3 bytes per pixel.
    Rgb(Vec<u8>),
    Yuv420p { y: Vec<u8>, u: Vec<u8>, v: Vec<u8> },
}

pub struct TimedFrame {
    pub width: u32,
    pub height: u32,
    /// Presentation time in seconds.
    pub pts: f64,
    pub planes: FramePlanes,
}

impl TimedFrame {
    pub fn descriptor(&self) -> FrameDescriptor<'_> {
        match &self.planes {
            FramePlanes::Rgb(data) => {
                FrameDescriptor::Rgb(RgbFrame::new(self.width, self.height, data))
            }
            FramePlanes::Yuv420p { y, u, v } => {
                FrameDescriptor::Yuv420p(Yuv420pFrame::new(self.width, self.height, y, u, v))
            }
        }
    }
}

/// A decoder that hands out frames as they become ready.
pub trait FrameSource {
    fn load(&mut self, source: &str) -> anyhow::Result<()>;

    fn start(&mut self) -> anyhow::Result<()>;

    fn eof(&self) -> bool;

    /// Next frame as planar YUV 4:2:0, or `None` if nothing arrived within `timeout`.
    fn frame(&mut self, timeout: Duration) -> Option<TimedFrame>;

    /// Next frame as packed BGR, or `None` if nothing arrived within `timeout`.
    fn rgb_frame(&mut self, timeout: Duration) -> Option<TimedFrame>;
}

const BAR_COLORS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

const FRAME_RATE: f64 = 30.0;

/// Every nth poll comes back empty, like a decoder that has fallen behind.
const STARVATION_INTERVAL: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pattern {
    width: u32,
    height: u32,
    frames: u32,
}

impl Pattern {
    /// Parses `bars:WIDTHxHEIGHT@FRAMES`.
    fn parse(source: &str) -> anyhow::Result<Self> {
        let Some(spec) = source.strip_prefix("bars:") else {
            bail!("Unknown source '{source}', expected bars:WIDTHxHEIGHT@FRAMES");
        };

        let (size, frames) = spec
            .split_once('@')
            .with_context(|| format!("Missing frame count in '{source}'"))?;
        let (width, height) = size
            .split_once('x')
            .with_context(|| format!("Missing dimensions in '{source}'"))?;

        let pattern = Self {
            width: width.parse().context("Invalid width")?,
            height: height.parse().context("Invalid height")?,
            frames: frames.parse().context("Invalid frame count")?,
        };

        if pattern.width == 0 || pattern.height == 0 {
            bail!("Pattern dimensions must be non-zero");
        }

        Ok(pattern)
    }

    fn pixel(&self, x: u32, offset: u32) -> [u8; 3] {
        let width = self.width as usize;
        let bar = (x as usize + offset as usize) % width * BAR_COLORS.len() / width;
        BAR_COLORS[bar]
    }
}

/// Synthesizes scrolling color bars instead of decoding a file.
#[derive(Default)]
pub struct TestPatternSource {
    pattern: Option<Pattern>,
    started: bool,
    next_frame: u32,
    polls: u64,
}

impl TestPatternSource {
    fn next(&mut self, timeout: Duration) -> Option<(Pattern, u32)> {
        let pattern = self.pattern.filter(|_| self.started)?;
        if self.next_frame >= pattern.frames {
            return None;
        }

        self.polls += 1;
        if self.polls.is_multiple_of(STARVATION_INTERVAL) {
            std::thread::sleep(timeout);
            return None;
        }

        let index = self.next_frame;
        self.next_frame += 1;
        Some((pattern, index))
    }
}

impl FrameSource for TestPatternSource {
    fn load(&mut self, source: &str) -> anyhow::Result<()> {
        let pattern = Pattern::parse(source)?;
        tracing::info!(
            width = pattern.width,
            height = pattern.height,
            frames = pattern.frames,
            "Loaded test pattern"
        );

        *self = Self {
            pattern: Some(pattern),
            ..Default::default()
        };
        Ok(())
    }

    fn start(&mut self) -> anyhow::Result<()> {
        if self.pattern.is_none() {
            bail!("No source loaded");
        }
        self.started = true;
        Ok(())
    }

    fn eof(&self) -> bool {
        match self.pattern {
            Some(pattern) => self.started && self.next_frame >= pattern.frames,
            None => true,
        }
    }

    fn frame(&mut self, timeout: Duration) -> Option<TimedFrame> {
        let (pattern, index) = self.next(timeout)?;
        let (width, height) = (pattern.width, pattern.height);
        let (chroma_width, chroma_height) = chroma_extent(width, height);

        let mut y = Vec::with_capacity(luma_plane_len(width, height));
        for _ in 0..height {
            y.extend((0..width).map(|x| rgb_to_yuv(pattern.pixel(x, index))[0]));
        }

        let mut u = Vec::with_capacity(chroma_plane_len(width, height));
        let mut v = Vec::with_capacity(chroma_plane_len(width, height));
        for _ in 0..chroma_height {
            for x in 0..chroma_width {
                let [_, cb, cr] = rgb_to_yuv(pattern.pixel(x * 2, index));
                u.push(cb);
                v.push(cr);
            }
        }

        Some(TimedFrame {
            width,
            height,
            pts: index as f64 / FRAME_RATE,
            planes: FramePlanes::Yuv420p { y, u, v },
        })
    }

    fn rgb_frame(&mut self, timeout: Duration) -> Option<TimedFrame> {
        let (pattern, index) = self.next(timeout)?;
        let (width, height) = (pattern.width, pattern.height);

        let row: Vec<u8> = (0..width)
            .flat_map(|x| swap_red_blue(pattern.pixel(x, index)))
            .collect();
        let data = row.repeat(height as usize);

        Some(TimedFrame {
            width,
            height,
            pts: index as f64 / FRAME_RATE,
            planes: FramePlanes::Rgb(data),
        })
    }
}

/// Studio-range BT.601.
fn rgb_to_yuv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (r as i32, g as i32, b as i32);

    let y = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
    let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
    let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;

    [y, u, v].map(|channel| channel.clamp(0, 255) as u8)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const NO_WAIT: Duration = Duration::ZERO;

    #[test]
    fn parses_bar_pattern() {
        assert_eq!(
            Pattern::parse("bars:64x48@10").unwrap(),
            Pattern {
                width: 64,
                height: 48,
                frames: 10
            }
        );
        assert!(Pattern::parse("movie.mp4").is_err());
        assert!(Pattern::parse("bars:64x48").is_err());
        assert!(Pattern::parse("bars:0x48@1").is_err());
    }

    #[test]
    fn yuv_frames_carry_subsampled_chroma() {
        let mut source = TestPatternSource::default();
        source.load("bars:16x8@1").unwrap();
        source.start().unwrap();

        let frame = source.frame(NO_WAIT).unwrap();
        let FramePlanes::Yuv420p { y, u, v } = &frame.planes else {
            panic!("expected planar frame");
        };

        assert_eq!(y.len(), 128);
        assert_eq!(u.len(), 32);
        assert_eq!(v.len(), 32);
        assert_eq!(frame.descriptor().width(), 16);
        assert!(source.eof());
    }

    #[test]
    fn rgb_frames_are_bgr_ordered() {
        let mut source = TestPatternSource::default();
        source.load("bars:8x2@1").unwrap();
        source.start().unwrap();

        let frame = source.rgb_frame(NO_WAIT).unwrap();
        let FramePlanes::Rgb(data) = &frame.planes else {
            panic!("expected packed frame");
        };

        assert_eq!(data.len(), 8 * 2 * 3);
        // Second bar is yellow, which has no blue.
        assert_eq!(&data[3..6], &[16, 235, 235]);
    }

    #[test]
    fn starves_periodically_until_eof() {
        let mut source = TestPatternSource::default();
        source.load("bars:4x4@6").unwrap();
        assert!(source.frame(NO_WAIT).is_none());
        source.start().unwrap();

        let mut delivered = Vec::new();
        let mut empty_polls = 0;
        while !source.eof() {
            match source.rgb_frame(NO_WAIT) {
                Some(frame) => delivered.push(frame.pts),
                None => empty_polls += 1,
            }
        }

        assert_eq!(delivered.len(), 6);
        assert_eq!(delivered[1], 1.0 / FRAME_RATE);
        assert_eq!(empty_polls, 1);
    }

    #[test]
    fn bars_near_the_u32_limit_do_not_wrap() {
        let pattern = Pattern {
            width: 70_000,
            height: 70_000,
            frames: 1,
        };

        assert_eq!(luma_plane_len(pattern.width, pattern.height), 4_900_000_000);
        assert_eq!(chroma_plane_len(pattern.width, pattern.height), 1_225_000_000);
        assert_eq!(pattern.pixel(69_999, u32::MAX), BAR_COLORS[5]);
    }

    #[test]
    fn gray_converts_to_neutral_chroma() {
        assert_eq!(rgb_to_yuv([128, 128, 128]), [126, 128, 128]);
    }
}
