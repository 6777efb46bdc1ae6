/// Playback mode of the threaded viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Playing,
    Paused,
    /// Terminal - entered only when the viewer closes
    Closed,
}

/// Play/pause state plus the one-shot step latch
#[derive(Debug, Clone)]
pub struct Playback {
    mode: PlaybackMode,
    step_pending: bool,
}

impl Playback {
    pub fn new(play: bool) -> Self {
        Self {
            mode: if play { PlaybackMode::Playing } else { PlaybackMode::Paused },
            step_pending: false,
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn is_playing(&self) -> bool {
        self.mode == PlaybackMode::Playing
    }

    pub fn is_closed(&self) -> bool {
        self.mode == PlaybackMode::Closed
    }

    pub fn step_pending(&self) -> bool {
        self.step_pending
    }

    /// Playing <-> Paused. Returns true if the mode changed.
    pub fn toggle_play(&mut self) -> bool {
        self.mode = match self.mode {
            PlaybackMode::Playing => PlaybackMode::Paused,
            PlaybackMode::Paused => {
                // a latched step has no meaning once playing resumes
                self.step_pending = false;
                PlaybackMode::Playing
            }
            PlaybackMode::Closed => return false,
        };
        true
    }

    /// Latch a step. Only effective while paused.
    pub fn request_step(&mut self) -> bool {
        if self.mode != PlaybackMode::Paused {
            return false;
        }
        self.step_pending = true;
        true
    }

    /// Consume a latched step
    pub fn take_step(&mut self) -> bool {
        std::mem::take(&mut self.step_pending)
    }

    /// Enter the terminal state. Returns false if already closed.
    pub fn close(&mut self) -> bool {
        if self.mode == PlaybackMode::Closed {
            return false;
        }
        self.mode = PlaybackMode::Closed;
        self.step_pending = false;
        true
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(true)
    }
}
