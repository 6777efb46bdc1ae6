use crossbeam_channel::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::input::{Command, InputHandler, Key};
use super::shared::SharedViewer;
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::traits::Painter;

/// Reports the outcome of window creation back to the constructing thread
pub(crate) type ReadySender = Sender<Result<(), ViewerError>>;

/// Window parameters a backend needs to create its window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSettings {
    pub title: String,
    pub size: Option<[u32; 2]>,
    pub resizable: bool,
    pub margin: f32,
}

impl From<&ViewerConfig> for WindowSettings {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            title: config.title.clone(),
            size: config.size,
            resizable: config.resizable,
            margin: config.margin,
        }
    }
}

/// Result of one paint tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Painted,
    /// Nothing submitted yet
    Idle,
    /// The painter failed; the loop keeps going
    PaintFailed,
    /// The viewer is closed, the backend should shut down
    Closed,
}

/// Viewer-thread side of the viewer: paint ticks, key handling, lifecycle
///
/// Handed to a `Backend`, which owns the window and calls into this from its
/// event loop. Never touches the window itself.
pub struct RenderLoop {
    shared: Arc<SharedViewer>,
    input: InputHandler,
    settings: WindowSettings,
    period: Duration,
    ready: Option<ReadySender>,
    paint_failures: u64,
}

impl RenderLoop {
    pub(crate) fn new(
        shared: Arc<SharedViewer>,
        settings: WindowSettings,
        period: Duration,
        ready: ReadySender,
    ) -> Self {
        Self {
            shared,
            input: InputHandler::threaded(),
            settings,
            period,
            ready: Some(ready),
            paint_failures: 0,
        }
    }

    pub fn settings(&self) -> &WindowSettings {
        &self.settings
    }

    /// Paint tick period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Size of the frame currently in the slot, used to size a lazily created window
    pub fn frame_dimensions(&self) -> Option<(u32, u32)> {
        self.shared.frame_dimensions()
    }

    /// Tell the constructing thread the window is up. Only the first call counts.
    pub fn window_opened(&mut self) {
        if let Some(ready) = self.ready.take() {
            log::debug!("viewer window '{}' opened", self.settings.title);
            let _ = ready.send(Ok(()));
        }
    }

    /// Repaint whatever is in the frame slot
    pub fn tick(&mut self, painter: &mut dyn Painter) -> TickOutcome {
        let bitmap = match self.shared.peek() {
            Ok(Some(bitmap)) => bitmap,
            Ok(None) => return TickOutcome::Idle,
            Err(_) => return TickOutcome::Closed,
        };

        match painter.paint(&bitmap) {
            Ok(()) => {
                self.shared.mark_painted(Instant::now());
                TickOutcome::Painted
            }
            Err(err) => {
                self.paint_failures += 1;
                log::warn!("paint failed ({} so far): {err:#}", self.paint_failures);
                TickOutcome::PaintFailed
            }
        }
    }

    /// Apply a key press and return the command it mapped to
    pub fn handle_key(&mut self, key: Key) -> Command {
        if self.shared.capture_key(key) {
            return Command::Captured(key);
        }

        let command = self.input.handle(key);
        match command {
            Command::Quit => {
                self.close();
            }
            Command::TogglePlay => {
                self.shared.toggle_play();
                log::debug!("playing: {}", self.shared.is_playing());
            }
            Command::Next => {
                if !self.shared.request_step() {
                    log::debug!("step ignored while playing");
                }
            }
            Command::Help => eprintln!("{}", self.input.usage()),
            Command::Unbound(_) => eprintln!("Press 'h' to show help"),
            Command::Previous | Command::Captured(_) | Command::Custom(_) => {}
        }
        command
    }

    /// Close the viewer and release blocked producers. Safe to call repeatedly.
    pub fn close(&mut self) -> bool {
        let closed_now = self.shared.close();
        if closed_now {
            log::debug!("viewer '{}' closed", self.settings.title);
        }
        closed_now
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    pub fn paint_failures(&self) -> u64 {
        self.paint_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::{Bitmap, Frame};
    use crossbeam_channel::{bounded, Receiver};

    #[derive(Default)]
    struct CountingPainter {
        painted: Vec<[u8; 4]>,
        fail: bool,
    }

    impl Painter for CountingPainter {
        fn paint(&mut self, bitmap: &Arc<Bitmap>) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("device lost");
            }
            self.painted.push(bitmap.pixel(0, 0).unwrap_or_default());
            Ok(())
        }
    }

    fn render_loop(play: bool) -> (RenderLoop, Arc<SharedViewer>, Receiver<Result<(), ViewerError>>) {
        let shared = Arc::new(SharedViewer::new(play, Duration::ZERO));
        let (tx, rx) = bounded(1);
        let settings = WindowSettings::from(&ViewerConfig::default());
        let render_loop = RenderLoop::new(shared.clone(), settings, Duration::from_millis(10), tx);
        (render_loop, shared, rx)
    }

    fn bitmap(value: u8) -> Arc<Bitmap> {
        Arc::new(Bitmap::try_from(Frame::filled(1, 1, [value; 3])).expect("valid"))
    }

    #[test]
    fn test_no_frame_no_paint() {
        let (mut render_loop, _shared, _rx) = render_loop(true);
        let mut painter = CountingPainter::default();

        assert_eq!(render_loop.tick(&mut painter), TickOutcome::Idle);
        assert!(painter.painted.is_empty());
    }

    #[test]
    fn test_paints_latest_frame() {
        let (mut render_loop, shared, _rx) = render_loop(true);
        let mut painter = CountingPainter::default();

        shared.put(bitmap(1)).expect("open");
        shared.put(bitmap(2)).expect("open");
        assert_eq!(render_loop.tick(&mut painter), TickOutcome::Painted);
        assert_eq!(painter.painted, vec![[2, 2, 2, 255]]);
        assert!(shared.painted_at().is_some());
    }

    #[test]
    fn test_paint_failure_does_not_stop_loop() {
        let (mut render_loop, shared, _rx) = render_loop(true);
        let mut painter = CountingPainter { fail: true, ..Default::default() };

        shared.put(bitmap(1)).expect("open");
        assert_eq!(render_loop.tick(&mut painter), TickOutcome::PaintFailed);
        assert_eq!(render_loop.paint_failures(), 1);
        assert!(shared.painted_at().is_none());

        painter.fail = false;
        assert_eq!(render_loop.tick(&mut painter), TickOutcome::Painted);
    }

    #[test]
    fn test_ready_is_sent_once() {
        let (mut render_loop, _shared, rx) = render_loop(true);
        render_loop.window_opened();
        render_loop.window_opened();

        assert_eq!(rx.try_recv(), Ok(Ok(())));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_keys_drive_playback() {
        let (mut render_loop, shared, _rx) = render_loop(true);

        assert_eq!(render_loop.handle_key(Key::Char('s')), Command::TogglePlay);
        assert!(!shared.is_playing());

        assert_eq!(render_loop.handle_key(Key::Char('n')), Command::Next);
        assert!(shared.wait().is_ok());

        assert_eq!(render_loop.handle_key(Key::Char('z')), Command::Unbound(Key::Char('z')));
        assert_eq!(render_loop.handle_key(Key::Char('q')), Command::Quit);
        assert!(render_loop.is_closed());
    }

    #[test]
    fn test_close_is_idempotent_and_stops_ticks() {
        let (mut render_loop, shared, _rx) = render_loop(true);
        let mut painter = CountingPainter::default();
        shared.put(bitmap(1)).expect("open");

        assert!(render_loop.close());
        assert!(!render_loop.close());
        assert_eq!(render_loop.tick(&mut painter), TickOutcome::Closed);
        assert!(painter.painted.is_empty());
    }
}
