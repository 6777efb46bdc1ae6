use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use wgpu::{Adapter, Device, DeviceDescriptor, Instance, Limits, Queue, Surface};
use winit::window::Window;

/// Device and queue shared by everything drawing into one window
///
/// Cloning is cheap (Arc).
#[derive(Clone)]
pub struct GpuContext {
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl GpuContext {
    /// Create a surface for `window` and a device able to present to it
    ///
    /// Blocks on the adapter and device futures; meant to run on the viewer thread.
    pub fn for_window(window: Arc<Window>) -> Result<(Self, Surface<'static>, Adapter)> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY | wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create window surface")?;
        let adapter = pollster::block_on(Self::request_adapter(&instance, &surface))?;
        let (device, queue) = pollster::block_on(Self::request_device(&adapter))?;

        let info = adapter.get_info();
        log::debug!("using adapter {} ({:?})", info.name, info.backend);

        Ok((
            Self {
                device: Arc::new(device),
                queue: Arc::new(queue),
            },
            surface,
            adapter,
        ))
    }

    /// Get reference to the device
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Get reference to the queue
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Request adapter with surface compatibility
    async fn request_adapter(instance: &Instance, surface: &Surface<'_>) -> Result<Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("failed to find an adapter for the window surface: {e:?}"))
    }

    /// Request device and queue
    async fn request_device(adapter: &Adapter) -> Result<(Device, Queue)> {
        // Downlevel limits keep GL-only machines working; texture size comes from the adapter
        let limits = Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits());

        adapter
            .request_device(&DeviceDescriptor {
                label: Some("Viewer Device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::Performance,
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| anyhow!("failed to create device: {e:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_semantics() {
        // Creating a context needs a window and a GPU; check the handle stays cheap to share
        fn assert_clone<T: Clone + Send + Sync>() {}
        assert_clone::<GpuContext>();
    }
}
