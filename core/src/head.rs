//! Response head reading and parsing.
//!
//! # Design
//! The head is read one byte at a time so that not a single body byte is
//! consumed past the blank-line terminator — the body decoder must see the
//! stream positioned exactly at its first byte. Parsing is deliberately
//! lenient about junk lines (no colon → skipped, empty value → skipped) and
//! strict about the status line: without a parseable `HTTP/<ver> <code>` the
//! whole head is unusable and is kept as the error's diagnostic payload.

use std::io::{self, Read};

use crate::connection::Connection;
use crate::error::Error;
use crate::http::Headers;

/// A parsed response head. `version` is `None` when the status line carried
/// no version text; the caller falls back to the request's version.
#[derive(Debug)]
pub(crate) struct ParsedHead {
    pub status: u16,
    pub reason: String,
    pub version: Option<String>,
    pub headers: Headers,
}

/// Read raw bytes up to and including the `\r\n\r\n` terminator. Transport
/// EOF ends the read early; the parser then fails on the partial head.
pub(crate) fn read_raw_head(conn: &mut Connection) -> io::Result<String> {
    let mut head: Vec<u8> = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = conn.read(&mut byte)?;
        if n == 0 {
            break;
        }
        head.push(byte[0]);
        if head.ends_with(b"\r\n\r\n") {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&head).into_owned())
}

/// Parse the status line and headers out of a raw head.
pub(crate) fn parse(raw: &str) -> Result<ParsedHead, Error> {
    let head = raw.strip_suffix("\r\n\r\n").unwrap_or(raw);

    let mut status: Option<u16> = None;
    let mut reason = String::new();
    let mut version: Option<String> = None;
    let mut headers = Headers::new();

    for line in head.split("\r\n") {
        if line.starts_with("HTTP/") {
            let mut parts = line.splitn(3, ' ');
            let proto = parts.next().unwrap_or("");
            let code = parts.next().ok_or_else(|| Error::CanNotParseResponse {
                head: raw.to_string(),
            })?;
            status = Some(code.parse().map_err(|_| Error::CanNotParseResponse {
                head: raw.to_string(),
            })?);
            version = proto.split_once('/').map(|(_, v)| v.trim().to_string());
            reason = parts.next().map(str::trim).unwrap_or("").to_string();
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        headers.append(name.trim(), value);
    }

    let status = status.ok_or_else(|| Error::CanNotParseResponse {
        head: raw.to_string(),
    })?;

    Ok(ParsedHead {
        status,
        reason,
        version,
        headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_line_and_headers() {
        let head = "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nServer: test\r\n\r\n";
        let parsed = parse(head).unwrap();
        assert_eq!(parsed.status, 200);
        assert_eq!(parsed.reason, "OK");
        assert_eq!(parsed.version.as_deref(), Some("1.1"));
        assert_eq!(parsed.headers.first("content-length"), Some("5"));
        assert_eq!(parsed.headers.first("SERVER"), Some("test"));
    }

    #[test]
    fn reason_phrase_is_optional() {
        let parsed = parse("HTTP/1.0 204\r\n\r\n").unwrap();
        assert_eq!(parsed.status, 204);
        assert_eq!(parsed.reason, "");
        assert_eq!(parsed.version.as_deref(), Some("1.0"));
    }

    #[test]
    fn multi_word_reason_is_kept_whole() {
        let parsed = parse("HTTP/1.1 404 Not Found\r\n\r\n").unwrap();
        assert_eq!(parsed.reason, "Not Found");
    }

    #[test]
    fn repeated_headers_collect_values_in_order() {
        let head = "HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n\r\n";
        let parsed = parse(head).unwrap();
        assert_eq!(parsed.headers.get("set-cookie"), ["a=1", "b=2"]);
    }

    #[test]
    fn lines_without_colon_are_skipped() {
        let head = "HTTP/1.1 200 OK\r\nthis is junk\r\nServer: test\r\n\r\n";
        let parsed = parse(head).unwrap();
        assert_eq!(parsed.headers.first("server"), Some("test"));
    }

    #[test]
    fn empty_header_values_are_skipped() {
        let head = "HTTP/1.1 200 OK\r\nX-Empty:   \r\n\r\n";
        let parsed = parse(head).unwrap();
        assert!(!parsed.headers.contains("x-empty"));
    }

    #[test]
    fn missing_status_line_fails_with_raw_head() {
        let head = "garbage first line\r\nServer: test\r\n\r\n";
        match parse(head) {
            Err(Error::CanNotParseResponse { head: raw }) => {
                assert!(raw.contains("garbage first line"));
            }
            other => panic!("expected CanNotParseResponse, got {other:?}"),
        }
    }

    #[test]
    fn status_line_without_code_fails() {
        assert!(matches!(
            parse("HTTP/1.1\r\n\r\n"),
            Err(Error::CanNotParseResponse { .. })
        ));
    }

    #[test]
    fn non_numeric_status_code_fails() {
        assert!(matches!(
            parse("HTTP/1.1 abc OK\r\n\r\n"),
            Err(Error::CanNotParseResponse { .. })
        ));
    }
}
