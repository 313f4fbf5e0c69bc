//! Scripted raw-TCP server for wire-level HTTP client tests.
//!
//! # Design
//! Client tests need byte-exact control over what arrives on the socket:
//! precise chunk boundaries, malformed heads, stalls that trip the read
//! timeout. A real HTTP framework normalizes all of that away, so this
//! server speaks raw bytes: each `MockServer` accepts exactly one
//! connection, reads the request, captures it for assertions, and then plays
//! its `Script`.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

/// What the server does after reading the request.
#[derive(Debug, Clone)]
pub enum Script {
    /// Write these bytes, then close the connection.
    Respond(Vec<u8>),
    /// Go silent for the given duration, then close without responding.
    Stall(Duration),
    /// Write `first`, hold the connection silently for `stall`, then close.
    RespondThenStall { first: Vec<u8>, stall: Duration },
}

/// A one-shot scripted server on an ephemeral local port.
pub struct MockServer {
    addr: SocketAddr,
    requests: Receiver<Vec<u8>>,
}

impl MockServer {
    /// Bind an ephemeral port and serve one connection with `script`.
    pub fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let (tx, requests) = mpsc::channel();

        thread::spawn(move || {
            let (mut stream, peer) = match listener.accept() {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "mock server accept failed");
                    return;
                }
            };
            tracing::debug!(%peer, "mock server accepted connection");

            let request = read_request(&mut stream).unwrap_or_default();
            let _ = tx.send(request);

            match script {
                Script::Respond(bytes) => {
                    let _ = stream.write_all(&bytes);
                }
                Script::Stall(duration) => {
                    thread::sleep(duration);
                }
                Script::RespondThenStall { first, stall } => {
                    let _ = stream.write_all(&first);
                    let _ = stream.flush();
                    thread::sleep(stall);
                }
            }
        });

        Self { addr, requests }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// The raw request bytes the server captured, as text.
    pub fn received_request(&self) -> String {
        let bytes = self
            .requests
            .recv_timeout(Duration::from_secs(5))
            .expect("mock server never received a request");
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Read one HTTP request: head up to `\r\n\r\n`, then `Content-Length` body
/// bytes when the header is present.
fn read_request(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;

    let mut request: Vec<u8> = Vec::new();
    let mut byte = [0u8; 1];
    while !request.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut byte)?;
        if n == 0 {
            return Ok(request);
        }
        request.push(byte[0]);
    }

    let body_len = content_length(&request);
    let mut remaining = body_len;
    let mut buf = [0u8; 1024];
    while remaining > 0 {
        let want = remaining.min(buf.len());
        let n = stream.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
        remaining -= n;
    }
    Ok(request)
}

/// `Content-Length` value from a raw request head, or zero.
fn content_length(head: &[u8]) -> usize {
    let text = String::from_utf8_lossy(head);
    for line in text.split("\r\n") {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                return value.trim().parse().unwrap_or(0);
            }
        }
    }
    0
}
