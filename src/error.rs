//! Typed error hierarchy for vod-dl
//!
//! Every error carries enough context to build a caller-facing message.
//! Workers surface these as typed outcomes; the download manager turns
//! them into history records instead of propagating them.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the client
#[derive(Debug, Error)]
pub enum Error {
    /// Network-related errors (connection, timeout, HTTP status)
    #[error("Network error: {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    /// Playlist content could not be parsed
    #[error("{0}")]
    Format(FormatErrorKind),

    /// Filesystem errors
    #[error("File system error at {path:?}: {message}")]
    FileSystem {
        kind: FileSystemErrorKind,
        path: PathBuf,
        message: String,
    },

    /// Server did not announce a usable Content-Length
    #[error("Unable to determine the file size")]
    SizeUnknown,

    /// The operation was stopped by the caller
    #[error("Cancelled")]
    Cancelled,

    /// Invalid input from the caller
    #[error("Invalid input for '{field}': {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    /// Configuration could not be loaded or saved
    #[error("Configuration error: {0}")]
    Config(String),

    /// The coordination task is gone
    #[error("Download manager is shutting down")]
    Shutdown,

    /// Anything else
    #[error("Unexpected error: {0}")]
    Unknown(String),
}

/// Network error subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// Could not reach or connect to the server
    Connection,
    /// Server took too long to respond
    Timeout,
    /// Server returned an error status
    HttpStatus(u16),
    /// Other network error (broken stream, decode failure)
    Other,
}

/// Playlist format error subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatErrorKind {
    /// Content is empty or whitespace only
    #[error("The playlist content is empty")]
    Empty,
    /// No entry directive anywhere in the content
    #[error("The file does not look like a valid M3U playlist")]
    InvalidFormat,
    /// Directives were present but none produced an entry
    #[error("No VOD entries were found in the playlist")]
    NoEntriesFound,
}

/// Filesystem error subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSystemErrorKind {
    /// Permission denied
    PermissionDenied,
    /// Path is not usable (not a directory, invalid component)
    PathInvalid,
    /// Other I/O error
    Io,
}

impl Error {
    /// Create a network error
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self::Network {
            kind,
            message: message.into(),
        }
    }

    /// Create a filesystem error
    pub fn file_system(
        kind: FileSystemErrorKind,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self::FileSystem {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a filesystem error from an I/O error, keeping the path
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => FileSystemErrorKind::PermissionDenied,
            std::io::ErrorKind::NotFound | std::io::ErrorKind::InvalidInput => {
                FileSystemErrorKind::PathInvalid
            }
            _ => FileSystemErrorKind::Io,
        };
        Self::file_system(kind, path, err.to_string())
    }

    /// Create an invalid input error
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Check whether this error reports a caller-requested stop
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status code, if the server answered with an error status
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Network {
                kind: NetworkErrorKind::HttpStatus(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }

    /// Message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { kind, .. } => match kind {
                NetworkErrorKind::Connection => {
                    "Could not connect to the server. Check your internet connection and the URL."
                        .to_string()
                }
                NetworkErrorKind::Timeout => {
                    "The server is taking too long to respond. Try again later.".to_string()
                }
                NetworkErrorKind::HttpStatus(404) => {
                    "The playlist URL is not valid (404 Not Found)".to_string()
                }
                NetworkErrorKind::HttpStatus(403) => {
                    "Access to the playlist was denied (403 Forbidden)".to_string()
                }
                NetworkErrorKind::HttpStatus(code) => {
                    format!("HTTP error {} while loading the playlist", code)
                }
                NetworkErrorKind::Other => self.to_string(),
            },
            Self::Format(kind) => kind.to_string(),
            Self::Unknown(message) => {
                format!("Unexpected error while loading the playlist: {}", message)
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<FormatErrorKind> for Error {
    fn from(kind: FormatErrorKind) -> Self {
        Self::Format(kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::io(PathBuf::new(), err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::Connection
        } else if let Some(status) = err.status() {
            NetworkErrorKind::HttpStatus(status.as_u16())
        } else {
            NetworkErrorKind::Other
        };

        Self::Network {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {}", err))
    }
}
