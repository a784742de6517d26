use std::io;

// Represents errors that can occur within the platform layer.
//
// Centralizes error handling for the front-end: terminal I/O and startup
// failures.
#[derive(Debug)]
pub enum PlatformError {
    Io(io::Error),
    /// Failure during the initialization of the platform layer.
    InitializationFailed(String),
}

impl From<io::Error> for PlatformError {
    fn from(err: io::Error) -> Self {
        PlatformError::Io(err)
    }
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::Io(e) => write!(f, "Platform I/O error: {e}"),
            PlatformError::InitializationFailed(s) => write!(f, "Initialization failed: {s}"),
        }
    }
}

impl std::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlatformError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// A specialized `Result` type for platform layer operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
