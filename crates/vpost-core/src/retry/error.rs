//! Chunk-level error type for retry classification.

use std::fmt;

/// Low-level transport failure kinds that are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Peer reset or closed the connection mid-exchange.
    ConnectionReset,
    /// Response body ended before the advertised length.
    IncompleteRead,
    /// Connection was in a state that could not carry the request.
    ImproperConnectionState,
    /// Request could not be written (headers or body).
    CannotSend,
    /// No connection could be established.
    NotConnected,
    /// Connection went quiet before a response arrived.
    ResponseNotReady,
    /// Status line of the response could not be parsed.
    BadStatusLine,
    /// Local or socket I/O failure.
    Io,
    /// Per-chunk deadline elapsed.
    Timeout,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportKind::ConnectionReset => "connection reset",
            TransportKind::IncompleteRead => "incomplete read",
            TransportKind::ImproperConnectionState => "improper connection state",
            TransportKind::CannotSend => "cannot send request",
            TransportKind::NotConnected => "not connected",
            TransportKind::ResponseNotReady => "response not ready",
            TransportKind::BadStatusLine => "bad status line",
            TransportKind::Io => "i/o error",
            TransportKind::Timeout => "timed out",
        };
        f.write_str(s)
    }
}

/// Error returned by a single "send next chunk" call.
/// Kept separate from [`crate::upload::UploadError`] so the policy can
/// classify it before the driver decides whether the upload is over.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    /// Connection-level failure reported by the transport.
    #[error("{kind}: {message}")]
    Transport { kind: TransportKind, message: String },
    /// Server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// Anything else (bad request setup, malformed reply, local misuse).
    #[error("{0}")]
    Other(String),
}

impl ChunkError {
    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        ChunkError::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        ChunkError::Http {
            status,
            body: body.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        ChunkError::Other(message.into())
    }
}

impl From<std::io::Error> for ChunkError {
    fn from(e: std::io::Error) -> Self {
        ChunkError::transport(TransportKind::Io, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_status_and_body() {
        let e = ChunkError::http(503, "backend unavailable");
        assert_eq!(e.to_string(), "HTTP 503: backend unavailable");
    }

    #[test]
    fn io_errors_become_transport_io() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        match ChunkError::from(io) {
            ChunkError::Transport { kind, message } => {
                assert_eq!(kind, TransportKind::Io);
                assert!(message.contains("short read"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
