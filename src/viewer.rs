use crossbeam_channel::bounded;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::ViewerConfig;
use crate::core::frame::{Bitmap, Frame};
use crate::core::input::Key;
use crate::core::render_loop::{ReadySender, RenderLoop, WindowSettings};
use crate::core::shared::SharedViewer;
use crate::error::ViewerError;
use crate::traits::Backend;
use crate::window::WinitBackend;

const VIEWER_THREAD_NAME: &str = "imgviz-viewer";

/// Lifecycle of the viewer thread
enum Launcher {
    /// Lazy mode, nothing shown yet
    Pending(Box<dyn Backend>),
    Running(JoinHandle<()>),
    /// Window creation failed; reported again on every later call
    Failed(ViewerError),
    Stopped,
}

/// Threaded live image viewer
///
/// The window lives on its own thread and repaints the latest frame at a fixed
/// tick rate. The caller pushes frames with `show` and paces itself with
/// `wait`, which honours the play/pause/step state the user controls with the
/// keyboard (`s` toggles play, `n` steps while paused, `q` quits, `h` help).
///
/// ```no_run
/// use imgviz::{Frame, Viewer};
/// use std::time::Duration;
///
/// let viewer = Viewer::new(true, Duration::from_millis(100))?;
/// for i in 0..=255u8 {
///     viewer.show(Frame::filled(64, 64, [i, 0, 255 - i]))?;
///     viewer.wait()?;
/// }
/// viewer.close();
/// # Ok::<(), imgviz::ViewerError>(())
/// ```
pub struct Viewer {
    shared: Arc<SharedViewer>,
    launcher: Mutex<Launcher>,
    config: ViewerConfig,
}

impl Viewer {
    /// Viewer with a real window and default settings
    pub fn new(play: bool, interval: Duration) -> Result<Self, ViewerError> {
        Self::with_config(ViewerConfig::default().play(play).interval(interval))
    }

    pub fn with_config(config: ViewerConfig) -> Result<Self, ViewerError> {
        Self::with_backend(config, Box::new(WinitBackend::new()))
    }

    /// Viewer driven by an arbitrary backend
    ///
    /// With `config.eager` the viewer thread starts here and this blocks until
    /// the window is up, so setup failures surface immediately. Otherwise the
    /// thread starts on the first `show`.
    pub fn with_backend(config: ViewerConfig, backend: Box<dyn Backend>) -> Result<Self, ViewerError> {
        config.validate()?;

        let viewer = Self {
            shared: Arc::new(SharedViewer::new(config.play, config.interval_duration())),
            launcher: Mutex::new(Launcher::Pending(backend)),
            config,
        };
        if viewer.config.eager {
            viewer.ensure_started()?;
        }
        Ok(viewer)
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Hand a frame to the viewer, replacing the one on screen
    ///
    /// Never waits for a paint. An invalid frame is rejected and the previous
    /// frame stays up.
    pub fn show(&self, frame: Frame) -> Result<(), ViewerError> {
        if self.shared.is_closed() {
            return Err(self.closed_error());
        }

        let bitmap = Bitmap::try_from(frame).inspect_err(|err| log::warn!("rejected frame: {err}"))?;
        self.shared
            .put(Arc::new(bitmap))
            .map_err(|_| self.closed_error())?;

        // after the put, so a lazily created window can size itself to the frame
        self.ensure_started()
    }

    /// Block until the producer may send the next frame
    ///
    /// Playing: until the current frame has been up for the interval.
    /// Paused: until the user steps (`n`). Returns `Err(Closed)` as soon as the
    /// viewer closes.
    pub fn wait(&self) -> Result<(), ViewerError> {
        self.shared.wait().map_err(|_| self.closed_error())
    }

    /// Block until the next key press in the viewer window and return it
    ///
    /// The captured key is not interpreted as a command.
    pub fn wait_key(&self) -> Result<Key, ViewerError> {
        self.ensure_started()?;
        self.shared.wait_key().map_err(|_| self.closed_error())
    }

    /// Same as pressing `s`
    pub fn toggle_play(&self) -> bool {
        self.shared.toggle_play()
    }

    /// Same as pressing `n`. Only has an effect while paused.
    pub fn request_step(&self) -> bool {
        self.shared.request_step()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Close the window and release blocked producers. Safe to call repeatedly.
    pub fn close(&self) {
        if self.shared.close() {
            log::debug!("closing viewer '{}'", self.config.title);
        }

        let mut launcher = self.lock_launcher();
        match mem::replace(&mut *launcher, Launcher::Stopped) {
            Launcher::Running(handle) => {
                if handle.join().is_err() {
                    log::error!("viewer thread panicked");
                }
            }
            Launcher::Failed(err) => *launcher = Launcher::Failed(err),
            Launcher::Pending(_) | Launcher::Stopped => {}
        }
    }

    fn lock_launcher(&self) -> MutexGuard<'_, Launcher> {
        self.launcher.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Error to report once the shared state is closed
    fn closed_error(&self) -> ViewerError {
        match &*self.lock_launcher() {
            Launcher::Failed(err) => err.clone(),
            _ => ViewerError::Closed,
        }
    }

    /// Start the viewer thread unless it already runs
    fn ensure_started(&self) -> Result<(), ViewerError> {
        let mut launcher = self.lock_launcher();
        match mem::replace(&mut *launcher, Launcher::Stopped) {
            Launcher::Pending(backend) => match self.launch(backend) {
                Ok(handle) => {
                    *launcher = Launcher::Running(handle);
                    Ok(())
                }
                Err(err) => {
                    self.shared.close();
                    *launcher = Launcher::Failed(err.clone());
                    Err(err)
                }
            },
            Launcher::Failed(err) => {
                *launcher = Launcher::Failed(err.clone());
                Err(err)
            }
            Launcher::Stopped => Err(ViewerError::Closed),
            running @ Launcher::Running(_) => {
                *launcher = running;
                Ok(())
            }
        }
    }

    /// Spawn the viewer thread and wait until its window is up
    fn launch(&self, backend: Box<dyn Backend>) -> Result<JoinHandle<()>, ViewerError> {
        let (ready_tx, ready_rx) = bounded(1);
        let render_loop = RenderLoop::new(
            self.shared.clone(),
            WindowSettings::from(&self.config),
            self.config.tick_period(),
            ready_tx.clone(),
        );
        let shared = self.shared.clone();

        let handle = thread::Builder::new()
            .name(VIEWER_THREAD_NAME.into())
            .spawn(move || run_viewer_thread(backend, render_loop, shared, ready_tx))
            .map_err(|err| ViewerError::Setup(format!("failed to spawn viewer thread: {err}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(handle),
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                let _ = handle.join();
                Err(ViewerError::Setup(
                    "viewer thread exited before the window opened".into(),
                ))
            }
        }
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.close();
    }
}

/// Closes the shared state when the viewer thread ends, panics included
struct CloseOnExit(Arc<SharedViewer>);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        self.0.close();
    }
}

fn run_viewer_thread(
    backend: Box<dyn Backend>,
    render_loop: RenderLoop,
    shared: Arc<SharedViewer>,
    ready: ReadySender,
) {
    let _close = CloseOnExit(shared);
    if let Err(err) = backend.run(render_loop) {
        let err = ViewerError::from_backend(&err);
        log::error!("viewer backend failed: {err}");
        // only lands if the window never opened
        let _ = ready.try_send(Err(err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Opens immediately, then idles until closed
    struct IdleBackend {
        launches: Arc<AtomicUsize>,
    }

    impl Backend for IdleBackend {
        fn run(self: Box<Self>, mut render_loop: RenderLoop) -> anyhow::Result<()> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            render_loop.window_opened();
            while !render_loop.is_closed() {
                thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        }
    }

    fn idle_viewer(eager: bool) -> (Viewer, Arc<AtomicUsize>) {
        let launches = Arc::new(AtomicUsize::new(0));
        let backend = IdleBackend { launches: launches.clone() };
        let config = ViewerConfig::default().eager(eager).interval(Duration::ZERO);
        let viewer = Viewer::with_backend(config, Box::new(backend)).expect("viewer");
        (viewer, launches)
    }

    #[test]
    fn test_eager_launches_at_construction() {
        let (viewer, launches) = idle_viewer(true);
        assert_eq!(launches.load(Ordering::SeqCst), 1);
        viewer.close();
    }

    #[test]
    fn test_lazy_launches_on_first_show() {
        let (viewer, launches) = idle_viewer(false);
        assert_eq!(launches.load(Ordering::SeqCst), 0);

        viewer.show(Frame::filled(2, 2, [0, 0, 0])).expect("show");
        viewer.show(Frame::filled(2, 2, [1, 1, 1])).expect("show");
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_close_before_show_never_launches() {
        let (viewer, launches) = idle_viewer(false);
        viewer.close();
        assert_eq!(viewer.show(Frame::filled(1, 1, [0, 0, 0])), Err(ViewerError::Closed));
        assert_eq!(launches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ViewerConfig::default().tick_hz(0.0);
        let result = Viewer::with_backend(config, Box::new(WinitBackend::new()));
        assert!(matches!(result, Err(ViewerError::Config(_))));
    }

    #[test]
    fn test_viewer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Viewer>();
    }
}
