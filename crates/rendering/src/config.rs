use serde::{Deserialize, Serialize};

/// Renderer settings that are fixed for the lifetime of a [`crate::FrameRenderer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererConfig {
    /// Minification and magnification filter of every plane texture.
    pub filter: TextureFilter,
    pub power_preference: GpuPreference,
    pub force_fallback_adapter: bool,
    /// Only consulted for window surfaces.
    pub present_mode: PresentModePreference,
    /// Color written by the per-frame clear and by `destroy`.
    pub clear_color: [f64; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            filter: TextureFilter::Linear,
            power_preference: GpuPreference::HighPerformance,
            force_fallback_adapter: false,
            present_mode: PresentModePreference::Fifo,
            clear_color: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl RendererConfig {
    pub(crate) fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
}

impl From<TextureFilter> for wgpu::FilterMode {
    fn from(value: TextureFilter) -> Self {
        match value {
            TextureFilter::Linear => wgpu::FilterMode::Linear,
            TextureFilter::Nearest => wgpu::FilterMode::Nearest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GpuPreference {
    None,
    LowPower,
    #[default]
    HighPerformance,
}

impl From<GpuPreference> for wgpu::PowerPreference {
    fn from(value: GpuPreference) -> Self {
        match value {
            GpuPreference::None => wgpu::PowerPreference::None,
            GpuPreference::LowPower => wgpu::PowerPreference::LowPower,
            GpuPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PresentModePreference {
    #[default]
    Fifo,
    Mailbox,
    Immediate,
    Auto,
}

impl PresentModePreference {
    /// Picks the preferred mode if the surface supports it, Fifo otherwise.
    pub(crate) fn resolve(self, supported: &[wgpu::PresentMode]) -> wgpu::PresentMode {
        let preferred = match self {
            Self::Fifo => wgpu::PresentMode::Fifo,
            Self::Mailbox => wgpu::PresentMode::Mailbox,
            Self::Immediate => wgpu::PresentMode::Immediate,
            Self::Auto => return wgpu::PresentMode::AutoVsync,
        };

        if supported.contains(&preferred) {
            preferred
        } else {
            wgpu::PresentMode::Fifo
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: RendererConfig = serde_json::from_str(r#"{ "filter": "nearest" }"#).unwrap();

        assert_eq!(
            config,
            RendererConfig {
                filter: TextureFilter::Nearest,
                ..Default::default()
            }
        );
    }

    #[test]
    fn camel_case_fields() {
        let config: RendererConfig = serde_json::from_str(
            r#"{
                "powerPreference": "lowPower",
                "forceFallbackAdapter": true,
                "presentMode": "mailbox",
                "clearColor": [0.0, 0.0, 0.0, 1.0]
            }"#,
        )
        .unwrap();

        assert_eq!(config.power_preference, GpuPreference::LowPower);
        assert!(config.force_fallback_adapter);
        assert_eq!(config.present_mode, PresentModePreference::Mailbox);
        assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(config.filter, TextureFilter::Linear);
    }

    #[test]
    fn unsupported_present_mode_falls_back_to_fifo() {
        let supported = [wgpu::PresentMode::Fifo, wgpu::PresentMode::Immediate];

        assert_eq!(
            PresentModePreference::Mailbox.resolve(&supported),
            wgpu::PresentMode::Fifo
        );
        assert_eq!(
            PresentModePreference::Immediate.resolve(&supported),
            wgpu::PresentMode::Immediate
        );
    }
}
