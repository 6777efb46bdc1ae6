use thiserror::Error;

/// Errors surfaced to callers of the viewer API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    /// The window or event loop could not be brought up
    #[error("viewer setup failed: {0}")]
    Setup(String),

    /// No windowing system is reachable from this process
    #[error("no display available: {0}")]
    NoDisplay(String),

    /// The submitted frame cannot be turned into a displayable bitmap
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The viewer was closed (quit key, window close or `Viewer::close`)
    #[error("viewer closed")]
    Closed,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ViewerError {
    /// True for failures that happen while creating the window
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, ViewerError::Setup(_) | ViewerError::NoDisplay(_))
    }

    pub(crate) fn from_backend(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ViewerError>() {
            Some(inner) => inner.clone(),
            None => ViewerError::Setup(format!("{err:#}")),
        }
    }
}
