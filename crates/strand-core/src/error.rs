use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrandError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to spawn executor thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Task panicked: {message}")]
    TaskPanicked { message: String },

    #[error("Executor has shut down")]
    Shutdown,
}

impl StrandError {
    /// Short, stable error code suitable for logs and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            StrandError::Config(_) => "CONFIG_ERROR",
            StrandError::Spawn(_) => "SPAWN_ERROR",
            StrandError::TaskPanicked { .. } => "TASK_PANICKED",
            StrandError::Shutdown => "SHUTDOWN",
        }
    }

    /// Build a `TaskPanicked` error from a payload returned by `catch_unwind`.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        StrandError::TaskPanicked {
            message: panic_message(payload),
        }
    }
}

/// Extract a human-readable message from a panic payload.
///
/// `panic!` with a literal yields `&'static str`, with format arguments a
/// `String`; anything else is reported as opaque.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

pub type Result<T> = std::result::Result<T, StrandError>;
