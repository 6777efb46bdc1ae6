use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::{DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH};
use crate::core::geometry::{initial_window_size, SCREEN_FRACTION};
use crate::core::input::Command;
use crate::core::input_adapter::key_from_event;
use crate::core::render_loop::{RenderLoop, TickOutcome, WindowSettings};
use crate::core::surface_renderer::SurfaceRenderer;
use crate::core::timer::TickTimer;
use crate::error::ViewerError;
use crate::traits::{Backend, Painter};

static EVENT_LOOP_HELD: AtomicBool = AtomicBool::new(false);

/// Exclusive right to run the process' event loop
///
/// Windowing systems allow a single event loop per process. Whoever holds the
/// lease may create and run it; it is released on drop.
#[derive(Debug)]
pub struct EventLoopLease {
    _private: (),
}

impl EventLoopLease {
    pub fn acquire() -> Result<Self, ViewerError> {
        EVENT_LOOP_HELD
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self { _private: () })
            .map_err(|_| ViewerError::Setup("another viewer already owns the event loop".into()))
    }

    /// True while some viewer holds the lease
    pub fn is_held() -> bool {
        EVENT_LOOP_HELD.load(Ordering::Acquire)
    }
}

impl Drop for EventLoopLease {
    fn drop(&mut self) {
        EVENT_LOOP_HELD.store(false, Ordering::Release);
    }
}

/// Fail fast when no windowing system can be reached
pub fn display_available() -> Result<(), ViewerError> {
    #[cfg(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android"))))]
    {
        let has_var = |name: &str| std::env::var_os(name).is_some_and(|value| !value.is_empty());
        if !has_var("DISPLAY") && !has_var("WAYLAND_DISPLAY") && !has_var("WAYLAND_SOCKET") {
            return Err(ViewerError::NoDisplay(
                "neither DISPLAY nor WAYLAND_DISPLAY is set".into(),
            ));
        }
    }
    Ok(())
}

/// Build the event loop. `any_thread` allows it off the main thread where the
/// platform supports that.
pub(crate) fn build_event_loop(any_thread: bool) -> Result<EventLoop<()>> {
    #[allow(unused_mut)]
    let mut builder = EventLoop::builder();

    #[cfg(any(
        target_os = "linux",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, any_thread);
        EventLoopBuilderExtX11::with_any_thread(&mut builder, any_thread);
    }

    #[cfg(target_os = "windows")]
    {
        use winit::platform::windows::EventLoopBuilderExtWindows;
        EventLoopBuilderExtWindows::with_any_thread(&mut builder, any_thread);
    }

    #[cfg(target_os = "macos")]
    {
        if any_thread {
            return Err(ViewerError::Setup(
                "macOS only runs the event loop on the main thread; use imshow instead".into(),
            )
            .into());
        }
    }

    builder
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))
}

/// Initial inner size for a new window
///
/// An explicit size wins. Otherwise the first frame's aspect ratio decides,
/// within `SCREEN_FRACTION` of the screen. Without a frame the default size is
/// used, shrunk to fit the same box.
pub fn window_size(
    requested: Option<[u32; 2]>,
    frame: Option<(u32, u32)>,
    screen: Option<(u32, u32)>,
) -> (u32, u32) {
    if let Some([width, height]) = requested {
        return (width.max(1), height.max(1));
    }

    match (frame, screen) {
        (Some((width, height)), Some(screen)) => {
            initial_window_size(width as f32 / height.max(1) as f32, screen)
        }
        (Some((width, height)), None) => {
            let aspect = width as f32 / height.max(1) as f32;
            let default = (
                (DEFAULT_WINDOW_WIDTH as f32 / SCREEN_FRACTION) as u32,
                (DEFAULT_WINDOW_HEIGHT as f32 / SCREEN_FRACTION) as u32,
            );
            initial_window_size(aspect, default)
        }
        (None, Some((screen_w, screen_h))) => {
            let max_w = (screen_w as f32 * SCREEN_FRACTION) as u32;
            let max_h = (screen_h as f32 * SCREEN_FRACTION) as u32;
            (
                DEFAULT_WINDOW_WIDTH.min(max_w).max(1),
                DEFAULT_WINDOW_HEIGHT.min(max_h).max(1),
            )
        }
        (None, None) => (DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT),
    }
}

/// Screen size of the primary monitor, or the first one the platform reports
pub(crate) fn screen_size(event_loop: &ActiveEventLoop) -> Option<(u32, u32)> {
    event_loop
        .primary_monitor()
        .or_else(|| event_loop.available_monitors().next())
        .map(|monitor| monitor.size())
        .filter(|size| size.width > 0 && size.height > 0)
        .map(|size| (size.width, size.height))
}

/// Create a window and a surface renderer for it
pub(crate) fn open_window(
    event_loop: &ActiveEventLoop,
    settings: &WindowSettings,
    frame: Option<(u32, u32)>,
) -> Result<(Arc<Window>, SurfaceRenderer)> {
    let (width, height) = window_size(settings.size, frame, screen_size(event_loop));
    let attributes = Window::default_attributes()
        .with_title(settings.title.clone())
        .with_inner_size(PhysicalSize::new(width, height))
        .with_resizable(settings.resizable);

    let window = Arc::new(
        event_loop
            .create_window(attributes)
            .context("failed to create viewer window")?,
    );
    let renderer = SurfaceRenderer::new(window.clone(), settings.margin)
        .context("failed to initialise window renderer")?;

    log::debug!("opened {width}x{height} window '{}'", settings.title);
    Ok((window, renderer))
}

/// Backend - a real window: winit event loop plus the wgpu surface renderer
#[derive(Debug, Default, Clone, Copy)]
pub struct WinitBackend;

impl WinitBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for WinitBackend {
    fn run(self: Box<Self>, render_loop: RenderLoop) -> Result<()> {
        let _lease = EventLoopLease::acquire()?;
        display_available()?;

        let event_loop = build_event_loop(true)?;
        let mut app = ViewerApp::new(render_loop);
        event_loop
            .run_app(&mut app)
            .map_err(|err| anyhow!("event loop failed: {err}"))?;

        match app.setup_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Event loop handler of the threaded viewer
struct ViewerApp {
    render_loop: RenderLoop,
    window: Option<Arc<Window>>,
    renderer: Option<SurfaceRenderer>,
    timer: TickTimer,
    setup_error: Option<anyhow::Error>,
}

impl ViewerApp {
    fn new(render_loop: RenderLoop) -> Self {
        let timer = TickTimer::new(render_loop.period(), Instant::now());
        Self {
            render_loop,
            window: None,
            renderer: None,
            timer,
            setup_error: None,
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let frame = self.render_loop.frame_dimensions();
        match open_window(event_loop, self.render_loop.settings(), frame) {
            Ok((window, renderer)) => {
                window.request_redraw();
                self.window = Some(window);
                self.renderer = Some(renderer);
                self.timer.reset(Instant::now());
                self.render_loop.window_opened();
            }
            Err(err) => {
                log::error!("{err:#}");
                self.setup_error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.render_loop.close();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(key) = key_from_event(&event) {
                    if self.render_loop.handle_key(key) == Command::Quit {
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(renderer) = self.renderer.as_mut() {
                    if self.render_loop.tick(renderer) == TickOutcome::Closed {
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // Close requests from the producer side are noticed here
        if self.render_loop.is_closed() {
            event_loop.exit();
            return;
        }

        if self.timer.poll(Instant::now()) {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.timer.next_deadline()));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.render_loop.close();
        self.renderer = None;
        self.window = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_size_wins() {
        assert_eq!(window_size(Some([320, 200]), Some((10, 1000)), Some((1920, 1080))), (320, 200));
        assert_eq!(window_size(Some([0, 0]), None, None), (1, 1));
    }

    #[test]
    fn test_size_from_first_frame() {
        assert_eq!(window_size(None, Some((640, 480)), Some((1920, 1080))), (1080, 810));
    }

    #[test]
    fn test_default_size_fits_small_screens() {
        assert_eq!(window_size(None, None, None), (800, 600));
        assert_eq!(window_size(None, None, Some((1920, 1080))), (800, 600));
        assert_eq!(window_size(None, None, Some((800, 600))), (600, 450));
    }

    #[test]
    fn test_frame_without_monitor_uses_default_box() {
        // the default 800x600 box, a square frame gets its short side
        assert_eq!(window_size(None, Some((100, 100)), None), (600, 600));
    }

    #[test]
    fn test_lease_is_exclusive() {
        let lease = EventLoopLease::acquire().expect("free");
        assert!(EventLoopLease::is_held());
        assert!(matches!(EventLoopLease::acquire(), Err(ViewerError::Setup(_))));
        drop(lease);
        assert!(EventLoopLease::acquire().is_ok());
    }
}
