use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{
    RenderError, RendererConfig,
    surface::{RenderSurface, SurfaceSizer},
};

/// The device and queue a renderer issues all of its work on.
pub struct GpuContext {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
    lost: Arc<AtomicBool>,
}

impl GpuContext {
    /// Requests an adapter able to drive `surface` and opens a device on it.
    ///
    /// There is no retry: any failure along the way is reported as
    /// [`RenderError::ContextUnavailable`].
    pub(crate) fn acquire(
        surface: RenderSurface,
        config: &RendererConfig,
    ) -> Result<(Self, SurfaceSizer), RenderError> {
        let instance = create_instance();
        let (width, height) = surface.size();
        let window = surface.create_window_surface(&instance)?;

        let adapter = futures::executor::block_on(instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: config.power_preference.into(),
                force_fallback_adapter: config.force_fallback_adapter,
                compatible_surface: window.as_ref(),
            },
        ))
        .inspect_err(|e| tracing::error!("No compatible GPU adapter: {e}"))?;

        let adapter_info = adapter.get_info();
        tracing::info!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            "Using GPU adapter"
        );

        let (device, queue) = futures::executor::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("framescreen device"),
                ..Default::default()
            },
        ))
        .inspect_err(|e| tracing::error!("Failed to open GPU device: {e}"))?;

        let lost = Arc::new(AtomicBool::new(false));
        device.set_device_lost_callback({
            let lost = lost.clone();
            move |reason, message| {
                lost.store(true, Ordering::Release);
                if matches!(reason, wgpu::DeviceLostReason::Destroyed) {
                    tracing::debug!("GPU device destroyed: {message}");
                } else {
                    tracing::error!(?reason, "GPU device lost: {message}");
                }
            }
        });
        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            tracing::error!("Uncaptured GPU error: {error}");
        }));

        let sizer = SurfaceSizer::new(&device, &adapter, window, width, height, config)?;

        Ok((
            Self {
                device,
                queue,
                adapter_info,
                lost,
            },
            sizer,
        ))
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Runs `f` inside a validation error scope and returns the first error it raised.
    pub(crate) fn scoped<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let error = futures::executor::block_on(self.device.pop_error_scope());
        (value, error)
    }
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::from_env().unwrap_or_default(),
        ..Default::default()
    })
}

/// Adapters visible to this process, honouring `WGPU_BACKEND`.
pub fn available_adapters() -> Vec<wgpu::AdapterInfo> {
    let instance = create_instance();
    instance
        .enumerate_adapters(wgpu::Backends::from_env().unwrap_or_default())
        .into_iter()
        .map(|adapter| adapter.get_info())
        .collect()
}
