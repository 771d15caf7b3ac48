//! Error type shared across the request pipeline.
//!
//! Every failure carries a kind plus optional diagnostics: a numeric code
//! (HTTP status or transport error code) and the raw response bytes when the
//! server sent any.

use std::fmt;
use std::path::Path;

/// Failure kinds produced by the pipeline and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// A caller-supplied value was rejected during request construction.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A required value was absent (missing status code, empty payload, ...).
    #[error("{0} missing")]
    MissingValue(String),
    /// Body encode or response decode failed.
    #[error("serialization failure: {0}")]
    Serialization(String),
    /// Network/transport-level failure reported by the transport session.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Response arrived with a non-200 status.
    #[error("bad status code {0}")]
    BadStatus(u32),
    /// Download target already exists and overwrite was off.
    #[error("file already exists: {0}")]
    FileExists(String),
    /// Moving the downloaded file into place failed.
    #[error("file copy failure: {0}")]
    FileCopy(String),
    /// A session with this task id is already registered.
    #[error("task id {0} already registered")]
    TaskIdCollision(i64),
    /// Registry lookup found no session (closed, stopped, or never opened).
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("unknown error")]
    Unknown,
}

/// Pipeline error: a kind with optional code and raw response bytes.
#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: Option<i64>,
    pub body: Option<Vec<u8>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            code: None,
            body: None,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn invalid_parameter(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter(what.into()))
    }

    pub fn missing_value(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingValue(what.into()))
    }

    pub fn serialization(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization(what.into()))
    }

    pub fn transport(message: impl Into<String>, code: Option<i64>) -> Self {
        Self {
            kind: ErrorKind::Transport(message.into()),
            code,
            body: None,
        }
    }

    /// Non-200 response; the status doubles as the error code.
    pub fn bad_status(status: u32, body: Option<Vec<u8>>) -> Self {
        Self {
            kind: ErrorKind::BadStatus(status),
            code: Some(i64::from(status)),
            body,
        }
    }

    pub fn file_exists(path: &Path) -> Self {
        Self::new(ErrorKind::FileExists(path.display().to_string()))
    }

    pub fn file_copy(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileCopy(what.into()))
    }

    pub fn task_id_collision(task_id: i64) -> Self {
        Self::new(ErrorKind::TaskIdCollision(task_id))
    }

    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::new(ErrorKind::SessionNotFound(session_id.into()))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(code) = self.code {
            write!(f, ", code: {}", code)?;
        }
        if let Some(body) = &self.body {
            write!(f, ", response bytes: {}", body.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}
