use crate::core::render_loop::RenderLoop;

/// Backend - owns the window and event loop on the viewer thread
///
/// `run` is called on the dedicated viewer thread. It must call
/// `RenderLoop::window_opened` once the window is up, drive `RenderLoop::tick`
/// every `RenderLoop::period`, forward key presses to `RenderLoop::handle_key`
/// and return once `RenderLoop::is_closed` turns true. An error returned before
/// `window_opened` is reported to the caller as a setup failure.
pub trait Backend: Send + 'static {
    fn run(self: Box<Self>, render_loop: RenderLoop) -> anyhow::Result<()>;
}
