//! CPU mirror of the color math in `shaders/rgb.wgsl` and `shaders/yuv420p.wgsl`.
//!
//! The YUV constants are a fixed-point derived matrix, not the textbook BT.601 one. They are
//! kept exactly as the shader uses them.

#![allow(clippy::excessive_precision)]

pub const LUMA_SCALE: f32 = 1.1643828125;

pub const V_TO_RED: f32 = 1.59602734375;
pub const RED_OFFSET: f32 = 0.870787598;

pub const U_TO_GREEN: f32 = 0.39176171875;
pub const V_TO_GREEN: f32 = 0.81296875;
pub const GREEN_OFFSET: f32 = 0.52959375;

pub const U_TO_BLUE: f32 = 2.01723046875;
pub const BLUE_OFFSET: f32 = 1.081389160375;

/// Converts normalized (0..=1) samples to unclamped normalized RGB.
pub fn yuv_to_rgb(y: f32, u: f32, v: f32) -> [f32; 3] {
    let y_scaled = y * LUMA_SCALE;

    [
        y_scaled + V_TO_RED * v - RED_OFFSET,
        y_scaled - U_TO_GREEN * u - V_TO_GREEN * v + GREEN_OFFSET,
        y_scaled + U_TO_BLUE * u - BLUE_OFFSET,
    ]
}

/// Same conversion as [`yuv_to_rgb`], quantized the way a unorm8 render target stores it.
pub fn yuv_to_rgb8(y: u8, u: u8, v: u8) -> [u8; 3] {
    yuv_to_rgb(unorm(y), unorm(u), unorm(v)).map(quantize)
}

/// The RGB fragment program writes channels back in reverse order.
pub fn swap_red_blue([r, g, b]: [u8; 3]) -> [u8; 3] {
    [b, g, r]
}

fn unorm(value: u8) -> f32 {
    value as f32 / 255.0
}

fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-5;

    #[test]
    fn full_luma_mid_chroma_is_gray() {
        let [r, g, b] = yuv_to_rgb(1.0, 0.5, 0.5);

        assert!((r - g).abs() < TOLERANCE, "r={r} g={g}");
        assert!((g - b).abs() < TOLERANCE, "g={g} b={b}");
        assert!((r - b).abs() < TOLERANCE, "r={r} b={b}");
    }

    #[test]
    fn mid_gray_stays_neutral_after_quantization() {
        let [r, g, b] = yuv_to_rgb8(128, 128, 128);

        assert!(r.abs_diff(g) <= 2);
        assert!(g.abs_diff(b) <= 2);
        assert!((125..=136).contains(&r));
    }

    #[test]
    fn black_level_is_near_zero() {
        for channel in yuv_to_rgb8(16, 128, 128) {
            assert!(channel <= 2, "channel={channel}");
        }
    }

    #[test]
    fn saturated_red_source() {
        // BT.601 limited-range red: Y=81 U=90 V=240
        let [r, g, b] = yuv_to_rgb8(81, 90, 240);

        assert!(r > 250, "r={r}");
        assert!(g < 5, "g={g}");
        assert!(b < 5, "b={b}");
    }

    #[test]
    fn swap_reverses_channels() {
        assert_eq!(swap_red_blue([10, 20, 30]), [30, 20, 10]);
    }
}
