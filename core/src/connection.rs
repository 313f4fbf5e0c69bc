//! Blocking transport for one request/response exchange.
//!
//! # Design
//! A `Connection` is opened fresh for every call and owned exclusively by the
//! exchange it serves; there is no pooling. The read timeout is plumbed onto
//! the TCP socket, so every blocking read either returns data or fails with a
//! timeout kind. A timed-out read also sets a sticky `timed_out` flag that
//! the lazy body layer checks before pulling new bytes.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use native_tls::TlsConnector;

/// Why opening a connection failed. Mapped onto the public error taxonomy by
/// the client, which owns the request payload.
#[derive(Debug)]
pub(crate) enum ConnectFailure {
    TimedOut(String),
    Tls(String),
    Other { code: Option<i32>, message: String },
}

#[derive(Debug)]
enum Transport {
    Plain(TcpStream),
    Tls(Box<native_tls::TlsStream<TcpStream>>),
}

/// The raw duplex transport: TCP, optionally upgraded to TLS.
#[derive(Debug)]
pub struct Connection {
    transport: Transport,
    timed_out: bool,
}

impl Connection {
    /// Connect to `host:port`, negotiate TLS when `secure`, and apply the
    /// read timeout to the socket.
    pub(crate) fn open(
        host: &str,
        port: u16,
        secure: bool,
        timeout: Duration,
    ) -> Result<Self, ConnectFailure> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| ConnectFailure::Other {
                code: e.raw_os_error(),
                message: e.to_string(),
            })?
            .next()
            .ok_or_else(|| ConnectFailure::Other {
                code: None,
                message: format!("no address found for {host}:{port}"),
            })?;

        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            if e.kind() == io::ErrorKind::TimedOut {
                ConnectFailure::TimedOut(e.to_string())
            } else {
                ConnectFailure::Other {
                    code: e.raw_os_error(),
                    message: e.to_string(),
                }
            }
        })?;

        stream
            .set_read_timeout(Some(timeout))
            .map_err(|e| ConnectFailure::Other {
                code: e.raw_os_error(),
                message: e.to_string(),
            })?;

        let transport = if secure {
            let connector = TlsConnector::new().map_err(|e| ConnectFailure::Tls(e.to_string()))?;
            let tls = connector
                .connect(host, stream)
                .map_err(|e| ConnectFailure::Tls(e.to_string()))?;
            Transport::Tls(Box::new(tls))
        } else {
            Transport::Plain(stream)
        };

        tracing::debug!(host, port, secure, "connection opened");
        Ok(Self {
            transport,
            timed_out: false,
        })
    }

    /// True once any read on this connection has hit the timeout. Sticky.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    fn is_timeout(kind: io::ErrorKind) -> bool {
        // set_read_timeout surfaces as WouldBlock on unix, TimedOut on windows
        matches!(kind, io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let result = match &mut self.transport {
            Transport::Plain(stream) => stream.read(buf),
            Transport::Tls(stream) => stream.read(buf),
        };
        if let Err(e) = &result {
            if Self::is_timeout(e.kind()) {
                self.timed_out = true;
                return Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
            }
        }
        result
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.transport {
            Transport::Plain(stream) => stream.write(buf),
            Transport::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.transport {
            Transport::Plain(stream) => stream.flush(),
            Transport::Tls(stream) => stream.flush(),
        }
    }
}
