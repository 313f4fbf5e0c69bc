//! Lazily-spooled, seekable response body stream.
//!
//! # Design
//! The socket only moves forward, but callers expect `Read + Seek`. The
//! stream keeps a spool of every decoded byte fetched so far; reads and
//! forward seeks pull just enough new bytes off the wire to cover the
//! requested range, and everything already spooled is served locally without
//! touching the connection again. Once the framing observes its end indicator
//! the connection is released and the stream serves purely from the spool.
//!
//! Backward seeks are always satisfiable; a forward seek past the spooled
//! prefix decodes (and discards positionally) up to the target, because bytes
//! cannot be skipped without being decoded off the wire.

use std::io::{self, Read, Seek, SeekFrom};

use crate::connection::Connection;
use crate::error::Error;
use crate::http::Request;

/// Network pull granularity for verbatim framings.
const PULL_CHUNK: usize = 2048;

/// Upper bound on a chunk size line; a longer line is malformed, never an
/// unbounded byte-at-a-time loop on a hostile stream.
const MAX_CHUNK_SIZE_LINE: usize = 128;

/// How the body's byte boundaries are delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Content-Length` body: exactly `declared` verbatim bytes.
    Length { declared: u64 },
    /// `Transfer-Encoding: chunked` body, terminated by a zero-size chunk.
    Chunked,
    /// No framing declared: the body ends when the transport closes.
    UntilClose,
}

/// Seekable stream over decoded body bytes, backed by a `Connection` and an
/// append-only spool.
#[derive(Debug)]
pub struct BodyStream {
    conn: Option<Connection>,
    spool: Vec<u8>,
    pos: u64,
    ready: bool,
    closed: bool,
    framing: Framing,
    request: Request,
}

impl BodyStream {
    pub(crate) fn new(conn: Connection, framing: Framing, request: Request) -> Self {
        let mut stream = Self {
            conn: Some(conn),
            spool: Vec::new(),
            pos: 0,
            ready: false,
            closed: false,
            framing,
            request,
        };
        // A declared length of zero needs no wire bytes at all.
        if framing == (Framing::Length { declared: 0 }) {
            stream.finish();
        }
        stream
    }

    /// Bytes decoded and spooled so far. Final body length once `is_ready`.
    pub fn fetched(&self) -> u64 {
        self.spool.len() as u64
    }

    /// True once the framing's end indicator has been consumed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Consumer's logical cursor. Callable after close.
    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// True when no further bytes will ever be produced at the cursor.
    pub fn eof(&self) -> bool {
        self.closed || (self.ready && self.pos >= self.fetched())
    }

    /// Release the connection and the spool. Idempotent; subsequent reads
    /// return empty and `eof`/`tell` keep working.
    pub fn close(&mut self) {
        self.conn = None;
        self.spool = Vec::new();
        self.closed = true;
    }

    fn finish(&mut self) {
        self.ready = true;
        self.conn = None;
        tracing::trace!(fetched = self.spool.len(), "body fully decoded");
    }

    fn timeout_error(&self) -> io::Error {
        Error::ConnectionTimedOut {
            request: self.request.clone(),
            message: "connection timed out".to_string(),
        }
        .into_io()
    }

    fn malformed(&self, message: &str) -> io::Error {
        Error::MalformedChunk {
            request: self.request.clone(),
            message: message.to_string(),
        }
        .into_io()
    }

    /// Fail fast when a previous operation already hit the read timeout.
    fn check_timeout(&self) -> io::Result<()> {
        if self.conn.as_ref().is_some_and(Connection::timed_out) {
            return Err(self.timeout_error());
        }
        Ok(())
    }

    /// One bounded read from the connection, with timeouts mapped onto the
    /// typed error carrying the originating request.
    fn pull(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "connection already released"))?;
        match conn.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Err(self.timeout_error()),
            Err(e) => Err(e),
        }
    }

    fn pull_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.pull(&mut buf[filled..])?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "transport closed mid-body",
                ));
            }
            filled += n;
        }
        Ok(())
    }

    fn pull_byte(&mut self) -> io::Result<u8> {
        let mut b = [0u8; 1];
        self.pull_exact(&mut b)?;
        Ok(b[0])
    }

    /// Pull from the connection until `fetched() >= target` or the framing's
    /// end indicator is observed.
    fn fetch_to(&mut self, target: u64) -> io::Result<()> {
        match self.framing {
            Framing::Length { declared } => self.fetch_length(target, declared),
            Framing::Chunked => self.fetch_chunked(target),
            Framing::UntilClose => self.fetch_until_close(target),
        }
    }

    fn fetch_length(&mut self, target: u64, declared: u64) -> io::Result<()> {
        let cap = target.min(declared);
        let mut buf = [0u8; PULL_CHUNK];
        while self.fetched() < cap {
            let want = ((cap - self.fetched()) as usize).min(PULL_CHUNK);
            let n = self.pull(&mut buf[..want])?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "transport closed before declared length",
                ));
            }
            self.spool.extend_from_slice(&buf[..n]);
        }
        if self.fetched() >= declared {
            self.finish();
        }
        Ok(())
    }

    fn fetch_chunked(&mut self, target: u64) -> io::Result<()> {
        while !self.ready && self.fetched() < target {
            let size = self.read_chunk_size()?;
            if size == 0 {
                self.expect_crlf()?;
                self.finish();
                break;
            }
            // Chunks are consumed atomically, so the spool may overshoot the
            // target by up to one chunk.
            let mut remaining = size as usize;
            let mut buf = [0u8; PULL_CHUNK];
            while remaining > 0 {
                let want = remaining.min(PULL_CHUNK);
                let n = self.pull(&mut buf[..want])?;
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "transport closed mid-chunk",
                    ));
                }
                self.spool.extend_from_slice(&buf[..n]);
                remaining -= n;
            }
            self.expect_crlf()?;
        }
        Ok(())
    }

    fn fetch_until_close(&mut self, target: u64) -> io::Result<()> {
        let mut buf = [0u8; PULL_CHUNK];
        while !self.ready && self.fetched() < target {
            let n = self.pull(&mut buf)?;
            if n == 0 {
                self.finish();
                break;
            }
            self.spool.extend_from_slice(&buf[..n]);
        }
        Ok(())
    }

    /// Read one `<hex-size>[;ext]CRLF` line. Mixed-case hex is accepted;
    /// anything else fails instead of looping.
    fn read_chunk_size(&mut self) -> io::Result<u64> {
        let mut line: Vec<u8> = Vec::new();
        loop {
            line.push(self.pull_byte()?);
            if line.ends_with(b"\r\n") {
                break;
            }
            if line.len() > MAX_CHUNK_SIZE_LINE {
                return Err(self.malformed("chunk size line too long"));
            }
        }
        line.truncate(line.len() - 2);
        let text = match std::str::from_utf8(&line) {
            Ok(text) => text,
            Err(_) => return Err(self.malformed("chunk size line is not valid text")),
        };
        let token = text.split(';').next().unwrap_or("").trim();
        match u64::from_str_radix(token, 16) {
            Ok(size) => Ok(size),
            Err(_) => Err(self.malformed(&format!("invalid chunk size token {token:?}"))),
        }
    }

    fn expect_crlf(&mut self) -> io::Result<()> {
        let mut b = [0u8; 2];
        self.pull_exact(&mut b)?;
        if &b != b"\r\n" {
            return Err(self.malformed("missing CRLF chunk terminator"));
        }
        Ok(())
    }
}

impl Read for BodyStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.eof() {
            return Ok(0);
        }
        if !self.ready {
            let target = self.pos.saturating_add(buf.len() as u64);
            if target > self.fetched() {
                self.check_timeout()?;
                self.fetch_to(target)?;
            }
        }
        let fetched = self.fetched();
        if self.pos >= fetched {
            return Ok(0);
        }
        let start = self.pos as usize;
        let n = ((fetched - self.pos) as usize).min(buf.len());
        buf[..n].copy_from_slice(&self.spool[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for BodyStream {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::Other, "stream is closed"));
        }
        // SeekFrom::End is relative to bytes fetched so far; only once the
        // stream is ready does it mean the true body end.
        let target = match from {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(offset) => self.pos as i128 + offset as i128,
            SeekFrom::End(offset) => self.fetched() as i128 + offset as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of stream",
            ));
        }
        let target = target as u64;
        if target > self.fetched() && !self.ready {
            self.check_timeout()?;
            self.fetch_to(target)?;
        }
        // The cursor may legally land past the terminated end; reads there
        // just return empty.
        self.pos = target;
        Ok(self.pos)
    }
}
