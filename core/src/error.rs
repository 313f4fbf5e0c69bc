//! Error types for the web client.
//!
//! # Design
//! Every network-phase failure carries the originating `Request` so callers
//! can log or replay it without threading the request alongside the error.
//! `CanNotParseResponse` instead retains the raw head text — at that point
//! the interesting diagnostic is what the server actually sent.
//!
//! Failures discovered lazily inside a body stream cross the `std::io::Read`
//! boundary as `io::Error` values wrapping an `Error`; `Error::from_io`
//! recovers the typed value on the other side.

use std::fmt;
use std::io;

use crate::http::Request;

/// Errors returned by `Webclient::send` and by lazy body reads.
#[derive(Debug)]
pub enum Error {
    /// The request has neither a URI host nor a `Host` header. Raised before
    /// any socket is opened.
    InvalidRequest { request: Request, message: String },

    /// TCP connect or address resolution failed for a reason other than a
    /// timeout. `code` is the platform errno when one was reported.
    ConnectionError {
        request: Request,
        code: Option<i32>,
        message: String,
    },

    /// Connect, head read, or a lazy body read/seek exceeded the configured
    /// timeout.
    ConnectionTimedOut { request: Request, message: String },

    /// TLS negotiation failed after the TCP connect succeeded.
    SslConnectionError { request: Request, message: String },

    /// A head was received but the status line is malformed. The raw head is
    /// retained as diagnostic payload.
    CanNotParseResponse { head: String },

    /// A chunk-encoded body contained a non-hexadecimal size token, an
    /// oversized size line, or a missing CRLF terminator.
    MalformedChunk { request: Request, message: String },
}

impl Error {
    /// The originating request, when the failure phase had one.
    pub fn request(&self) -> Option<&Request> {
        match self {
            Error::InvalidRequest { request, .. }
            | Error::ConnectionError { request, .. }
            | Error::ConnectionTimedOut { request, .. }
            | Error::SslConnectionError { request, .. }
            | Error::MalformedChunk { request, .. } => Some(request),
            Error::CanNotParseResponse { .. } => None,
        }
    }

    /// Wrap into an `io::Error` for surfacing through `Read`/`Seek`.
    pub(crate) fn into_io(self) -> io::Error {
        let kind = match &self {
            Error::ConnectionTimedOut { .. } => io::ErrorKind::TimedOut,
            Error::MalformedChunk { .. } => io::ErrorKind::InvalidData,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, self)
    }

    /// Recover a typed `Error` carried inside an `io::Error`, if any.
    pub fn from_io(err: &io::Error) -> Option<&Error> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<Error>())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRequest { message, .. } => {
                write!(f, "invalid request: {message}")
            }
            Error::ConnectionError { code, message, .. } => match code {
                Some(code) => write!(f, "connection error ({code}): {message}"),
                None => write!(f, "connection error: {message}"),
            },
            Error::ConnectionTimedOut { message, .. } => {
                write!(f, "connection timed out: {message}")
            }
            Error::SslConnectionError { message, .. } => {
                write!(f, "ssl connection error: {message}")
            }
            Error::CanNotParseResponse { .. } => {
                write!(f, "can not parse response head")
            }
            Error::MalformedChunk { message, .. } => {
                write!(f, "malformed chunked body: {message}")
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, Request, Uri};

    fn request() -> Request {
        Request::new(Method::Get, Uri::http("example.com", "/"))
    }

    #[test]
    fn request_is_recoverable_from_network_errors() {
        let err = Error::ConnectionTimedOut {
            request: request(),
            message: "connection timed out".to_string(),
        };
        assert_eq!(err.request().unwrap().uri.host, "example.com");
    }

    #[test]
    fn parse_error_has_no_request() {
        let err = Error::CanNotParseResponse {
            head: "garbage".to_string(),
        };
        assert!(err.request().is_none());
    }

    #[test]
    fn timeout_round_trips_through_io_error() {
        let err = Error::ConnectionTimedOut {
            request: request(),
            message: "connection timed out".to_string(),
        };
        let io_err = err.into_io();
        assert_eq!(io_err.kind(), std::io::ErrorKind::TimedOut);
        let typed = Error::from_io(&io_err).unwrap();
        assert!(matches!(typed, Error::ConnectionTimedOut { .. }));
    }

    #[test]
    fn malformed_chunk_maps_to_invalid_data() {
        let err = Error::MalformedChunk {
            request: request(),
            message: "bad size token".to_string(),
        };
        assert_eq!(err.into_io().kind(), std::io::ErrorKind::InvalidData);
    }
}
