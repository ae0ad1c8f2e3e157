use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Transport phase whose deadline was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    Connect,
    Read,
    Write,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutPhase::Connect => f.write_str("connect"),
            TimeoutPhase::Read => f.write_str("read"),
            TimeoutPhase::Write => f.write_str("write"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    /// No connection could be established; nothing was sent
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Request timed out during {phase} after {after:?}")]
    Timeout { phase: TimeoutPhase, after: Duration },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether this error is a transport deadline being exceeded.
    ///
    /// A read deadline hit while a streamed body is being drained surfaces
    /// as an I/O error of kind `TimedOut`.
    pub fn is_timeout(&self) -> bool {
        match self {
            BridgeError::Timeout { .. } => true,
            BridgeError::Io(err) => err.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    /// Whether the request never reached the server, so sending it again
    /// cannot duplicate work.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, BridgeError::ConnectionFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
