mod source;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use framescreen_rendering::{RenderSurface, RendererConfig, Screen, available_adapters};
use source::{FramePlanes, FrameSource, TestPatternSource, TimedFrame};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every frame of a source on a headless screen
    Play {
        /// Test pattern to play, e.g. bars:640x360@90
        source: String,
        /// Pull packed RGB frames instead of planar YUV
        #[arg(long)]
        rgb: bool,
        /// Renderer configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the last rendered frame to this PNG
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        timeout_ms: u64,
    },
    /// List the GPU adapters wgpu can see
    Adapters,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            source,
            rgb,
            config,
            output,
            timeout_ms,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => RendererConfig::default(),
            };

            play(
                &source,
                rgb,
                config,
                output.as_deref(),
                Duration::from_millis(timeout_ms),
            )
        }
        Commands::Adapters => {
            let adapters = available_adapters();
            if adapters.is_empty() {
                tracing::warn!("No GPU adapters found");
            }

            for adapter in adapters {
                println!(
                    "{} ({:?}, {:?}, driver: {})",
                    adapter.name, adapter.backend, adapter.device_type, adapter.driver
                );
            }

            Ok(())
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<RendererConfig> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open config '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("Failed to parse config '{}'", path.display()))
}

fn play(
    source: &str,
    rgb: bool,
    config: RendererConfig,
    output: Option<&Path>,
    timeout: Duration,
) -> anyhow::Result<()> {
    let mut frames = TestPatternSource::default();
    frames.load(source)?;
    frames.start()?;

    let mut screen: Option<Screen> = None;
    let mut surface_size = (0, 0);

    while !frames.eof() {
        let frame = if rgb {
            frames.rgb_frame(timeout)
        } else {
            frames.frame(timeout)
        };

        let Some(frame) = frame else {
            tracing::info!("....waiting...");
            continue;
        };

        log_frame(&frame);

        let size = (frame.width, frame.height);
        let screen = match &mut screen {
            Some(screen) => {
                if size != surface_size {
                    screen.set_size(size.0, size.1)?;
                }
                screen
            }
            slot @ None => slot.insert(
                Screen::with_config(RenderSurface::headless(size.0, size.1), rgb, config.clone())
                    .context("Failed to create screen")?,
            ),
        };
        surface_size = size;

        screen.render_frame(frame.descriptor())?;
    }

    let Some(mut screen) = screen else {
        tracing::warn!("Source produced no frames");
        return Ok(());
    };

    if let Some(output) = output {
        let pixels = screen.read_pixels()?;
        let image = image::RgbaImage::from_raw(pixels.width, pixels.height, pixels.data)
            .context("Readback size does not match its dimensions")?;
        image
            .save(output)
            .with_context(|| format!("Failed to write '{}'", output.display()))?;
        tracing::info!(path = %output.display(), "Saved last frame");
    }

    let stats = screen.stats();
    screen.destroy()?;

    tracing::info!(
        rendered = stats.frames_rendered,
        skipped = stats.frames_skipped,
        "Playback finished"
    );

    Ok(())
}

fn log_frame(frame: &TimedFrame) {
    match &frame.planes {
        FramePlanes::Rgb(data) => tracing::info!(
            "RGB Frame: {}x{} pts: {} data:{}",
            frame.width,
            frame.height,
            frame.pts,
            data.len()
        ),
        FramePlanes::Yuv420p { y, u, v } => tracing::info!(
            "YUV Frame: {}x{} pts: {} dataY:{} dataU:{} dataV:{}",
            frame.width,
            frame.height,
            frame.pts,
            y.len(),
            u.len(),
            v.len()
        ),
    }
}
