//! The request/response orchestrator.
//!
//! # Design
//! `Webclient` holds only the configured timeout; every `send` opens a fresh
//! connection and never reuses one, which is why `Connection: close` is
//! forced onto every request. The request body is already buffered in the
//! `Request`, so an exact `Content-Length` is always known before any byte
//! hits the socket.
//!
//! `send` returns as soon as the head is parsed and a framing is chosen; the
//! body is decoded lazily as the caller reads it.

use std::io::{self, Write};
use std::time::Duration;

use crate::body::{BodyStream, Framing};
use crate::connection::{ConnectFailure, Connection};
use crate::encoding::Body;
use crate::error::Error;
use crate::head;
use crate::http::{Request, Response};

/// Ambient read timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Blocking HTTP/1.1 client over raw TCP/TLS sockets.
#[derive(Debug, Clone)]
pub struct Webclient {
    timeout: Duration,
}

impl Default for Webclient {
    fn default() -> Self {
        Self::new()
    }
}

impl Webclient {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Socket timeout for connect and for every blocking read, including
    /// lazy body reads. Fractional seconds are expressible via `Duration`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Execute one request/response exchange on a fresh connection.
    pub fn send(&self, request: &Request) -> Result<Response, Error> {
        let host = self.resolve_host(request)?;
        let wire = serialize(request, &host);

        let secure = request.uri.scheme.eq_ignore_ascii_case("https");
        let port = request.uri.port.unwrap_or(if secure { 443 } else { 80 });

        let mut conn =
            Connection::open(&host, port, secure, self.timeout).map_err(|failure| {
                match failure {
                    ConnectFailure::TimedOut(message) => Error::ConnectionTimedOut {
                        request: request.clone(),
                        message,
                    },
                    ConnectFailure::Tls(message) => Error::SslConnectionError {
                        request: request.clone(),
                        message: format!("ssl connection error: {message}"),
                    },
                    ConnectFailure::Other { code, message } => Error::ConnectionError {
                        request: request.clone(),
                        code,
                        message,
                    },
                }
            })?;

        tracing::debug!(
            method = request.method.as_str(),
            host = %host,
            port,
            target = %request.uri.request_target(),
            "sending request"
        );
        conn.write_all(&wire)
            .and_then(|()| conn.flush())
            .map_err(|e| self.io_failure(request, e))?;

        let raw_head =
            head::read_raw_head(&mut conn).map_err(|e| self.io_failure(request, e))?;
        let parsed = head::parse(&raw_head)?;
        tracing::debug!(status = parsed.status, "response head parsed");

        let framing = select_framing(&parsed.headers, &raw_head)?;
        let stream = BodyStream::new(conn, framing, request.clone());
        let encodings = parsed.headers.tokens("content-encoding");
        let body = Body::with_encodings(stream, &encodings);

        Ok(Response {
            status: parsed.status,
            reason: parsed.reason,
            version: parsed.version.unwrap_or_else(|| request.version.clone()),
            headers: parsed.headers,
            body,
        })
    }

    /// Target host: the URI authority, or the first `Host` header. Fails
    /// before any I/O when neither is present.
    fn resolve_host(&self, request: &Request) -> Result<String, Error> {
        if !request.uri.host.is_empty() {
            return Ok(request.uri.host.clone());
        }
        if let Some(host) = request.header("host") {
            return Ok(host.to_string());
        }
        Err(Error::InvalidRequest {
            request: request.clone(),
            message: "request has no host".to_string(),
        })
    }

    fn io_failure(&self, request: &Request, err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::TimedOut {
            Error::ConnectionTimedOut {
                request: request.clone(),
                message: "connection timed out".to_string(),
            }
        } else {
            Error::ConnectionError {
                request: request.clone(),
                code: err.raw_os_error(),
                message: err.to_string(),
            }
        }
    }
}

/// Length-delimited when `content-length` is present (first value), else
/// chunk-decoded when `transfer-encoding` lists `chunked`, else the body runs
/// until the transport closes.
fn select_framing(headers: &crate::http::Headers, raw_head: &str) -> Result<Framing, Error> {
    if let Some(value) = headers.first("content-length") {
        let declared = value.parse().map_err(|_| Error::CanNotParseResponse {
            head: raw_head.to_string(),
        })?;
        return Ok(Framing::Length { declared });
    }
    let chunked = headers
        .tokens("transfer-encoding")
        .iter()
        .any(|t| t.eq_ignore_ascii_case("chunked"));
    if chunked {
        return Ok(Framing::Chunked);
    }
    Ok(Framing::UntilClose)
}

/// Serialize request line, headers, blank line, body. `Host` is injected
/// when absent; `Connection: close` is always present; caller-supplied
/// `Connection` and `Content-Length` headers are dropped because the client
/// owns both.
fn serialize(request: &Request, host: &str) -> Vec<u8> {
    let mut wire = Vec::with_capacity(256);
    wire.extend_from_slice(request.method.as_str().as_bytes());
    wire.push(b' ');
    wire.extend_from_slice(request.uri.request_target().as_bytes());
    wire.extend_from_slice(b" HTTP/");
    wire.extend_from_slice(request.version.as_bytes());
    wire.extend_from_slice(b"\r\n");

    if request.header("host").is_none() {
        wire.extend_from_slice(b"Host: ");
        wire.extend_from_slice(host.as_bytes());
        wire.extend_from_slice(b"\r\n");
    }
    wire.extend_from_slice(b"Connection: close\r\n");

    for (name, value) in &request.headers {
        if name.eq_ignore_ascii_case("connection") || name.eq_ignore_ascii_case("content-length")
        {
            continue;
        }
        wire.extend_from_slice(name.as_bytes());
        wire.extend_from_slice(b": ");
        wire.extend_from_slice(value.as_bytes());
        wire.extend_from_slice(b"\r\n");
    }

    if !request.body.is_empty() {
        wire.extend_from_slice(b"Content-Length: ");
        wire.extend_from_slice(request.body.len().to_string().as_bytes());
        wire.extend_from_slice(b"\r\n");
    }
    wire.extend_from_slice(b"\r\n");
    wire.extend_from_slice(&request.body);
    wire
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, Uri};

    fn text(wire: Vec<u8>) -> String {
        String::from_utf8(wire).unwrap()
    }

    #[test]
    fn serializes_request_line_with_query_and_fragment() {
        let mut uri = Uri::http("example.com", "/search").with_query("q=rust");
        uri.fragment = "top".to_string();
        let req = Request::new(Method::Get, uri);
        let wire = text(serialize(&req, "example.com"));
        assert!(wire.starts_with("GET /search?q=rust#top HTTP/1.1\r\n"));
    }

    #[test]
    fn injects_host_when_absent() {
        let req = Request::new(Method::Get, Uri::http("example.com", "/"));
        let wire = text(serialize(&req, "example.com"));
        assert!(wire.contains("Host: example.com\r\n"));
    }

    #[test]
    fn keeps_caller_host_header() {
        let req = Request::new(Method::Get, Uri::http("", "/"))
            .with_header("Host", "other.example");
        let wire = text(serialize(&req, "other.example"));
        assert_eq!(wire.matches("Host").count(), 1);
        assert!(wire.contains("Host: other.example\r\n"));
    }

    #[test]
    fn forces_connection_close() {
        let req = Request::new(Method::Get, Uri::http("example.com", "/"))
            .with_header("Connection", "keep-alive");
        let wire = text(serialize(&req, "example.com"));
        assert!(wire.contains("Connection: close\r\n"));
        assert!(!wire.contains("keep-alive"));
    }

    #[test]
    fn computes_content_length_from_buffered_body() {
        let req = Request::new(Method::Post, Uri::http("example.com", "/submit"))
            .with_header("Content-Length", "999")
            .with_body("data=1");
        let wire = text(serialize(&req, "example.com"));
        assert!(wire.contains("Content-Length: 6\r\n"));
        assert!(!wire.contains("999"));
        assert!(wire.ends_with("\r\n\r\ndata=1"));
    }

    #[test]
    fn empty_body_has_no_content_length() {
        let req = Request::new(Method::Get, Uri::http("example.com", "/"));
        let wire = text(serialize(&req, "example.com"));
        assert!(!wire.contains("Content-Length"));
    }

    #[test]
    fn empty_path_becomes_slash() {
        let req = Request::new(Method::Get, Uri::http("example.com", ""));
        let wire = text(serialize(&req, "example.com"));
        assert!(wire.starts_with("GET / HTTP/1.1\r\n"));
    }

    #[test]
    fn request_without_any_host_fails_before_io() {
        let client = Webclient::new();
        let req = Request::new(Method::Get, Uri::http("", "/"));
        match client.send(&req) {
            Err(Error::InvalidRequest { request, .. }) => {
                assert_eq!(request.uri.path, "/");
            }
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn framing_prefers_content_length() {
        let mut headers = crate::http::Headers::new();
        headers.append("content-length", "12");
        headers.append("transfer-encoding", "chunked");
        let framing = select_framing(&headers, "").unwrap();
        assert_eq!(framing, Framing::Length { declared: 12 });
    }

    #[test]
    fn framing_detects_chunked_token_in_list() {
        let mut headers = crate::http::Headers::new();
        headers.append("transfer-encoding", "gzip, Chunked");
        assert_eq!(select_framing(&headers, "").unwrap(), Framing::Chunked);
    }

    #[test]
    fn framing_defaults_to_until_close() {
        let headers = crate::http::Headers::new();
        assert_eq!(select_framing(&headers, "").unwrap(), Framing::UntilClose);
    }

    #[test]
    fn unparsable_content_length_is_a_parse_error() {
        let mut headers = crate::http::Headers::new();
        headers.append("content-length", "abc");
        assert!(matches!(
            select_framing(&headers, "raw"),
            Err(Error::CanNotParseResponse { .. })
        ));
    }
}
