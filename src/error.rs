//! Error types for the handles crate.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::HandleKind;

/// Result type alias for handle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for handle operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The union already owns a live resource.
    #[error("handle already holds a live {0}")]
    AlreadyOpen(HandleKind),

    /// Nothing to close or read: the union is invalid.
    #[error("handle is not open")]
    NotOpen,

    /// Operation requires a different representation than the one held.
    #[error("expected a {expected} but the handle holds a {actual}")]
    WrongKind {
        /// Representation the operation works on.
        expected: HandleKind,
        /// Representation actually held.
        actual: HandleKind,
    },

    /// Descriptor open flags that no platform accepts together.
    #[error("invalid open flags: {0}")]
    InvalidFlags(&'static str),

    /// Stream mode string that fopen would reject.
    #[error("invalid stream mode {0:?}")]
    InvalidMode(String),

    /// The OS refused to open the path.
    #[error("failed to open {} as {kind}: {source}", .path.display())]
    Open {
        /// Representation that was requested.
        kind: HandleKind,
        /// Path passed to the open call.
        path: PathBuf,
        /// OS error.
        #[source]
        source: io::Error,
    },

    /// The OS close call failed. The handle is invalid regardless.
    #[error("failed to close {kind}: {source}")]
    Close {
        /// Representation that was closed.
        kind: HandleKind,
        /// OS error.
        #[source]
        source: io::Error,
    },

    /// Deriving one representation from another failed.
    #[error("failed to convert {from} to {to}: {source}")]
    Convert {
        /// Representation that was consumed.
        from: HandleKind,
        /// Representation that was requested.
        to: HandleKind,
        /// OS error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Check if this is a wrong-representation error.
    pub fn is_wrong_kind(&self) -> bool {
        matches!(self, Error::WrongKind { .. })
    }

    /// Check if this is a not-open error.
    pub fn is_not_open(&self) -> bool {
        matches!(self, Error::NotOpen)
    }

    /// Check if the union was left untouched by the failed call.
    ///
    /// Every other error leaves the union invalid.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::AlreadyOpen(_) | Error::NotOpen | Error::WrongKind { .. }
        )
    }

    /// Get the underlying OS error, if the failure came from the OS.
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            Error::Open { source, .. }
            | Error::Close { source, .. }
            | Error::Convert { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::NotOpen => io::ErrorKind::NotConnected,
            Error::InvalidFlags(_) | Error::InvalidMode(_) => io::ErrorKind::InvalidInput,
            _ => err.os_error().map_or(io::ErrorKind::Other, io::Error::kind),
        };
        io::Error::new(kind, err)
    }
}
