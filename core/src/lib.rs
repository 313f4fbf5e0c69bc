//! Minimal blocking HTTP/1.1 client over raw TCP/TLS sockets.
//!
//! # Overview
//! One call, one connection: `Webclient::send` serializes the request, opens
//! a fresh TCP (or TLS) connection, parses the response head, and hands back
//! a `Response` whose body is decoded lazily as it is read. The body stream
//! is seekable even though the socket is not — every decoded byte is spooled,
//! so backward seeks replay locally and forward seeks decode just enough new
//! bytes off the wire.
//!
//! # Design
//! - `Webclient` holds only a timeout; there is no pooling, keep-alive, or
//!   redirect following.
//! - `BodyStream` implements `Read + Seek` over length-delimited, chunked,
//!   and close-delimited framings.
//! - `Content-Encoding` tokens chain `flate2` inflate readers on top of the
//!   stream, in header order.
//! - Errors are typed values carrying the originating request; failures
//!   discovered mid-body surface as `io::Error`s that downcast to `Error`.

pub mod body;
pub mod client;
pub mod connection;
pub mod encoding;
pub mod error;
mod head;
pub mod http;

pub use body::{BodyStream, Framing};
pub use client::{Webclient, DEFAULT_TIMEOUT};
pub use encoding::Body;
pub use error::Error;
pub use http::{Headers, Method, Request, Response, Uri};
