//! Plain-data HTTP message model.
//!
//! # Design
//! Requests are described as plain data with owned fields; the caller fills a
//! `Request` and hands it to `Webclient::send`. There is no URI parser and no
//! builder machinery — the transport layer only needs the components, not a
//! validated URL type. The request body is an already-buffered `Vec<u8>` so
//! an exact `Content-Length` can always be computed before any I/O.
//!
//! Response headers get a dedicated `Headers` map because HTTP header lookup
//! is case-insensitive and multi-valued; request headers stay a plain ordered
//! `Vec` so they are serialized exactly as given.

use crate::encoding::Body;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

/// URI components of a request target.
///
/// `host` may be empty when the caller supplies a `Host` header instead.
/// An empty `path` is serialized as `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uri {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub query: String,
    pub fragment: String,
}

impl Uri {
    /// A plain `http` URI for the given host and path.
    pub fn http(host: &str, path: &str) -> Self {
        Self {
            scheme: "http".to_string(),
            host: host.to_string(),
            path: path.to_string(),
            ..Self::default()
        }
    }

    /// An `https` URI for the given host and path.
    pub fn https(host: &str, path: &str) -> Self {
        Self {
            scheme: "https".to_string(),
            host: host.to_string(),
            path: path.to_string(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = query.to_string();
        self
    }

    /// Request target as written on the wire: path, query, fragment.
    pub fn request_target(&self) -> String {
        let mut target = if self.path.is_empty() {
            "/".to_string()
        } else {
            self.path.clone()
        };
        if !self.query.is_empty() {
            target.push('?');
            target.push_str(&self.query);
        }
        if !self.fragment.is_empty() {
            target.push('#');
            target.push_str(&self.fragment);
        }
        target
    }
}

/// An HTTP request described as plain data.
///
/// Headers are emitted in the order given; `Connection` and `Content-Length`
/// entries are ignored during serialization because the client controls both.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: "1.1".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First header value whose name matches case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Case-insensitive, multi-valued response header map.
///
/// Names are stored lowercased; the value list for a name preserves the order
/// in which values were encountered in the response head.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, lowercasing the name. Empty values are kept out by the
    /// head parser, not here.
    pub fn append(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value.to_string()),
            None => self.entries.push((name, vec![value.to_string()])),
        }
    }

    /// All values for a header, in encounter order.
    pub fn get(&self, name: &str) -> &[String] {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// First value for a header.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).first().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.get(name).is_empty()
    }

    /// Comma-split, trimmed, non-empty tokens across all values of a header.
    pub fn tokens(&self, name: &str) -> Vec<String> {
        self.get(name)
            .iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }
}

/// An HTTP response: parsed head plus a lazily-read body stream.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub version: String,
    pub headers: Headers,
    pub body: Body,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_target_defaults_to_slash() {
        let uri = Uri::http("example.com", "");
        assert_eq!(uri.request_target(), "/");
    }

    #[test]
    fn request_target_includes_query_and_fragment() {
        let mut uri = Uri::http("example.com", "/search").with_query("q=rust");
        uri.fragment = "top".to_string();
        assert_eq!(uri.request_target(), "/search?q=rust#top");
    }

    #[test]
    fn request_header_lookup_is_case_insensitive() {
        let req = Request::new(Method::Get, Uri::http("example.com", "/"))
            .with_header("X-Token", "abc");
        assert_eq!(req.header("x-token"), Some("abc"));
        assert_eq!(req.header("X-TOKEN"), Some("abc"));
        assert_eq!(req.header("missing"), None);
    }

    #[test]
    fn headers_lowercase_names_and_preserve_value_order() {
        let mut headers = Headers::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("SET-COOKIE", "b=2");
        assert_eq!(headers.get("set-cookie"), ["a=1", "b=2"]);
        assert_eq!(headers.first("Set-Cookie"), Some("a=1"));
    }

    #[test]
    fn headers_tokens_split_and_trim() {
        let mut headers = Headers::new();
        headers.append("Transfer-Encoding", "gzip , chunked");
        headers.append("Transfer-Encoding", " ");
        assert_eq!(headers.tokens("transfer-encoding"), ["gzip", "chunked"]);
    }

    #[test]
    fn headers_missing_name_is_empty() {
        let headers = Headers::new();
        assert!(headers.get("anything").is_empty());
        assert!(!headers.contains("anything"));
    }
}
