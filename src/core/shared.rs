use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::frame::Bitmap;
use super::frame_slot::FrameSlot;
use super::input::Key;
use super::playback::{Playback, PlaybackMode};
use crate::error::ViewerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyCapture {
    Idle,
    Waiting,
    Captured(Key),
}

/// Everything the producer and viewer threads share, behind one mutex
#[derive(Debug)]
struct ViewerState {
    slot: FrameSlot,
    playback: Playback,
    capture: KeyCapture,
}

/// Viewer state shared between the producer thread and the viewer thread
///
/// One mutex guards the frame slot, playback state and the closed flag, so
/// there is no lock ordering to get wrong. The condvar is notified on every
/// change a blocked `wait` or `wait_key` could care about: new frame, paint
/// tick, play/pause, step, captured key and close.
#[derive(Debug)]
pub struct SharedViewer {
    state: Mutex<ViewerState>,
    changed: Condvar,
    interval: Duration,
}

impl SharedViewer {
    pub fn new(play: bool, interval: Duration) -> Self {
        Self {
            state: Mutex::new(ViewerState {
                slot: FrameSlot::new(),
                playback: Playback::new(play),
                capture: KeyCapture::Idle,
            }),
            changed: Condvar::new(),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    // Every critical section leaves the state whole, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, ViewerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a new bitmap, replacing whatever was there
    pub fn put(&self, bitmap: Arc<Bitmap>) -> Result<(), ViewerError> {
        let mut state = self.lock();
        if state.playback.is_closed() {
            return Err(ViewerError::Closed);
        }
        state.slot.put(bitmap, Instant::now());
        drop(state);
        self.changed.notify_all();
        Ok(())
    }

    /// Current bitmap for painting, `Err(Closed)` once the viewer is closed
    pub fn peek(&self) -> Result<Option<Arc<Bitmap>>, ViewerError> {
        let state = self.lock();
        if state.playback.is_closed() {
            return Err(ViewerError::Closed);
        }
        Ok(state.slot.peek())
    }

    pub fn mark_painted(&self, now: Instant) {
        self.lock().slot.mark_painted(now);
        self.changed.notify_all();
    }

    pub fn toggle_play(&self) -> bool {
        let changed = self.lock().playback.toggle_play();
        self.changed.notify_all();
        changed
    }

    pub fn request_step(&self) -> bool {
        let latched = self.lock().playback.request_step();
        self.changed.notify_all();
        latched
    }

    /// Enter the closed state and release every blocked caller.
    /// Returns false if the viewer was already closed.
    pub fn close(&self) -> bool {
        let closed_now = self.lock().playback.close();
        self.changed.notify_all();
        closed_now
    }

    pub fn is_closed(&self) -> bool {
        self.lock().playback.is_closed()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playback.is_playing()
    }

    pub fn frame_dimensions(&self) -> Option<(u32, u32)> {
        self.lock().slot.dimensions()
    }

    pub fn painted_at(&self) -> Option<Instant> {
        self.lock().slot.painted_at()
    }

    /// Block until the current frame may be replaced
    ///
    /// Playing: returns once the frame has been up for the interval.
    /// Paused: returns when a step is requested, consuming it.
    /// Closed (before or during the wait): `Err(ViewerError::Closed)`.
    pub fn wait(&self) -> Result<(), ViewerError> {
        let mut state = self.lock();
        loop {
            match state.playback.mode() {
                PlaybackMode::Closed => return Err(ViewerError::Closed),
                PlaybackMode::Playing => {
                    let remaining = state.slot.remaining(self.interval, Instant::now());
                    if remaining.is_zero() {
                        return Ok(());
                    }
                    state = self
                        .changed
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
                PlaybackMode::Paused => {
                    if state.playback.take_step() {
                        return Ok(());
                    }
                    state = self.changed.wait(state).unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Block until the next key press and return it instead of running its command
    pub fn wait_key(&self) -> Result<Key, ViewerError> {
        let mut state = self.lock();
        state.capture = KeyCapture::Waiting;
        loop {
            if state.playback.is_closed() {
                state.capture = KeyCapture::Idle;
                return Err(ViewerError::Closed);
            }
            if let KeyCapture::Captured(key) = state.capture {
                state.capture = KeyCapture::Idle;
                return Ok(key);
            }
            state = self.changed.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Hand a key press to a pending `wait_key`. Returns true if it was consumed.
    pub fn capture_key(&self, key: Key) -> bool {
        let mut state = self.lock();
        if state.capture != KeyCapture::Waiting {
            return false;
        }
        state.capture = KeyCapture::Captured(key);
        drop(state);
        self.changed.notify_all();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::Frame;
    use std::sync::mpsc;
    use std::thread;

    fn bitmap(value: u8) -> Arc<Bitmap> {
        Arc::new(Bitmap::try_from(Frame::filled(2, 2, [value; 3])).expect("valid"))
    }

    fn spawn_wait(shared: &Arc<SharedViewer>) -> mpsc::Receiver<Result<(), ViewerError>> {
        let (tx, rx) = mpsc::channel();
        let shared = shared.clone();
        thread::spawn(move || {
            let _ = tx.send(shared.wait());
        });
        rx
    }

    #[test]
    fn test_playing_wait_without_frame_returns_immediately() {
        let shared = SharedViewer::new(true, Duration::from_secs(10));
        assert!(shared.wait().is_ok());
    }

    #[test]
    fn test_playing_wait_honours_interval() {
        let shared = SharedViewer::new(true, Duration::from_millis(100));
        let start = Instant::now();
        shared.put(bitmap(1)).expect("open");
        shared.wait().expect("released");
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_paused_wait_needs_step() {
        let shared = Arc::new(SharedViewer::new(false, Duration::ZERO));
        shared.put(bitmap(1)).expect("open");

        let rx = spawn_wait(&shared);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        assert!(shared.request_step());
        let result = rx.recv_timeout(Duration::from_secs(2)).expect("wait returned");
        assert!(result.is_ok());
    }

    #[test]
    fn test_latched_step_releases_next_wait() {
        let shared = SharedViewer::new(false, Duration::ZERO);
        shared.request_step();
        assert!(shared.wait().is_ok());
    }

    #[test]
    fn test_one_step_releases_one_wait() {
        let shared = Arc::new(SharedViewer::new(false, Duration::ZERO));
        shared.put(bitmap(1)).expect("open");

        let first = spawn_wait(&shared);
        assert!(first.recv_timeout(Duration::from_millis(50)).is_err());
        assert!(shared.request_step());
        assert!(first.recv_timeout(Duration::from_secs(2)).expect("wait returned").is_ok());

        // the step was consumed; the next wait blocks again
        let second = spawn_wait(&shared);
        assert!(second.recv_timeout(Duration::from_millis(150)).is_err());

        assert!(shared.close());
        assert_eq!(
            second.recv_timeout(Duration::from_secs(2)).expect("wait returned"),
            Err(ViewerError::Closed)
        );
    }

    #[test]
    fn test_one_step_wakes_only_one_of_two_waiters() {
        let shared = Arc::new(SharedViewer::new(false, Duration::ZERO));
        let (tx, rx) = mpsc::channel();
        for _ in 0..2 {
            let (tx, shared) = (tx.clone(), shared.clone());
            thread::spawn(move || {
                let _ = tx.send(shared.wait());
            });
        }
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        assert!(shared.request_step());
        assert!(rx.recv_timeout(Duration::from_secs(2)).expect("one released").is_ok());
        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());

        shared.close();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)).expect("other released"),
            Err(ViewerError::Closed)
        );
    }

    #[test]
    fn test_toggle_to_playing_releases_waiter() {
        let shared = Arc::new(SharedViewer::new(false, Duration::from_millis(20)));
        shared.put(bitmap(1)).expect("open");

        let rx = spawn_wait(&shared);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        shared.toggle_play();
        assert!(rx.recv_timeout(Duration::from_secs(2)).expect("wait returned").is_ok());
    }

    #[test]
    fn test_close_releases_waiter() {
        let shared = Arc::new(SharedViewer::new(false, Duration::ZERO));
        let rx = spawn_wait(&shared);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        assert!(shared.close());
        let result = rx.recv_timeout(Duration::from_secs(2)).expect("wait returned");
        assert_eq!(result, Err(ViewerError::Closed));
    }

    #[test]
    fn test_closed_rejects_everything() {
        let shared = SharedViewer::new(true, Duration::ZERO);
        assert!(shared.close());
        assert!(!shared.close());

        assert_eq!(shared.put(bitmap(1)), Err(ViewerError::Closed));
        assert_eq!(shared.peek(), Err(ViewerError::Closed));
        assert_eq!(shared.wait(), Err(ViewerError::Closed));
        assert_eq!(shared.wait_key(), Err(ViewerError::Closed));
        assert!(!shared.toggle_play());
        assert!(!shared.request_step());
    }

    #[test]
    fn test_key_capture_only_while_waiting() {
        let shared = Arc::new(SharedViewer::new(true, Duration::ZERO));
        assert!(!shared.capture_key(Key::Char('a')));

        let (tx, rx) = mpsc::channel();
        let waiter = shared.clone();
        thread::spawn(move || {
            let _ = tx.send(waiter.wait_key());
        });

        // retry until the waiter has registered
        let deadline = Instant::now() + Duration::from_secs(2);
        while !shared.capture_key(Key::Char('x')) {
            assert!(Instant::now() < deadline, "wait_key never registered");
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).expect("returned"), Ok(Key::Char('x')));
        assert!(!shared.capture_key(Key::Char('y')));
    }
}
