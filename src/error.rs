//! Error taxonomy for chart packaging and registry delivery.
//!
//! Every internal step reports a [`PackError`]. The push services wrap it in a
//! [`PushError`] naming the image being delivered, so a caller sees exactly one
//! failure per attempt together with its original cause. Connection checks
//! push nothing and report a [`VerifyError`] naming the server instead.

use thiserror::Error;

/// Failure raised by one packaging or delivery step.
#[derive(Debug, Error)]
pub enum PackError {
    /// Input rejected before any network traffic (bad extension, broken
    /// archive container, unsupported manifest shape).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A required archive entry was not located.
    #[error("not found: {0}")]
    NotFound(String),

    /// A descriptor or JSON document could not be decoded.
    #[error("failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    /// A digest string is malformed.
    #[error("invalid digest: {0}")]
    Digest(String),

    /// The registry endpoint failed or rejected the request.
    #[error("registry transport failed: {0}")]
    Transport(String),

    /// Staging or reading a local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`PackError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Parse,
    Digest,
    Transport,
    Io,
}

impl PackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PackError::Validation(_) => ErrorKind::Validation,
            PackError::NotFound(_) => ErrorKind::NotFound,
            PackError::Parse { .. } => ErrorKind::Parse,
            PackError::Digest(_) => ErrorKind::Digest,
            PackError::Transport(_) => ErrorKind::Transport,
            PackError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn parse(what: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        PackError::Parse {
            what: what.into(),
            reason: reason.to_string(),
        }
    }
}

/// Operation-level failure of a single push attempt.
#[derive(Debug, Error)]
#[error("failed to push chart as '{image}': {source}")]
pub struct PushError {
    image: String,
    #[source]
    source: PackError,
}

impl PushError {
    pub fn new(image: impl Into<String>, source: PackError) -> Self {
        Self {
            image: image.into(),
            source,
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn cause(&self) -> &PackError {
        &self.source
    }
}

/// Failure of a registry connection check.
#[derive(Debug, Error)]
#[error("connection check against '{server}' failed: {source}")]
pub struct VerifyError {
    server: String,
    #[source]
    source: PackError,
}

impl VerifyError {
    pub fn new(server: impl Into<String>, source: PackError) -> Self {
        Self {
            server: server.into(),
            source,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn cause(&self) -> &PackError {
        &self.source
    }
}

/// Result type alias using [`PackError`].
pub type Result<T> = std::result::Result<T, PackError>;
