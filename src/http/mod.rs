//! http — transport-neutral request/reply model and the handlers built on it.
//!
//! The `tiny_http` listener lives in `server`; everything here works on plain
//! `HttpRequest`/`Reply` values so handlers can be driven directly in tests.
//!
//! - `Handler`: anything that turns a request into a reply (Send + Sync, shared by workers).
//! - `NoCache`: forces revalidation headers on every reply.
//! - `FileServer`: read-only file serving rooted at a mount point.
//! - `pages`: index / partition list / health / metrics pages.

use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, CONTROLS};
use std::fs::File;
use std::io::{self, Read};
use std::sync::Arc;

mod fileserver;
mod nocache;
pub mod pages;

pub use fileserver::FileServer;
pub use nocache::NoCache;

use crate::consts::ENDPOINT_FILESYSTEM;

/// Inbound request as seen by handlers.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    /// Path exactly as received (still percent-encoded, no query).
    pub raw_path: String,
    /// Query string without the leading '?'.
    pub query: Option<String>,
    /// Percent-decoded path used for routing. Bytes that are not UTF-8 are
    /// replaced here; file lookup goes through `path_bytes`.
    pub path: String,
}

impl HttpRequest {
    pub fn new<M: Into<String>>(method: M, url: &str) -> Self {
        let (raw_path, query) = match url.split_once('?') {
            Some((p, q)) => (p, Some(q.to_string())),
            None => (url, None),
        };
        let raw_path = if raw_path.is_empty() { "/" } else { raw_path };
        let path = percent_decode_str(raw_path).decode_utf8_lossy().into_owned();
        Self {
            method: method.into(),
            raw_path: raw_path.to_string(),
            query,
            path,
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }

    /// Percent-decoded path as raw bytes (file names need not be UTF-8).
    pub fn path_bytes(&self) -> Vec<u8> {
        percent_decode_str(&self.raw_path).collect()
    }

    /// Location for a redirect to `raw_path`, keeping the query string.
    pub(crate) fn location(&self, raw_path: &str) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", raw_path, q),
            None => raw_path.to_string(),
        }
    }
}

pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    /// Opened file streamed to the client; `len` is the Content-Length.
    File { file: File, len: u64 },
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => write!(f, "Empty"),
            Body::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Body::File { len, .. } => write!(f, "File({} bytes)", len),
        }
    }
}

#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn text<S: Into<String>>(status: u16, s: S) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(s.into().into_bytes())
    }

    pub fn html<S: Into<String>>(status: u16, s: S) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body(s.into().into_bytes())
    }

    pub fn not_found() -> Self {
        Self::text(404, "404 page not found\n").with_header("X-Content-Type-Options", "nosniff")
    }

    pub fn forbidden() -> Self {
        Self::text(403, "403 Forbidden\n").with_header("X-Content-Type-Options", "nosniff")
    }

    pub fn internal_error() -> Self {
        Self::text(500, "500 Internal Server Error\n")
            .with_header("X-Content-Type-Options", "nosniff")
    }

    /// 301 Moved Permanently to an already-encoded location.
    pub fn redirect<S: Into<String>>(location: S) -> Self {
        let location = location.into();
        let body = format!("<a href=\"{}\">Moved Permanently</a>.\n\n", html_escape(&location));
        Self::html(301, body).with_header("Location", location)
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_body(mut self, bytes: Vec<u8>) -> Self {
        self.body = Body::Bytes(bytes);
        self
    }

    /// Set a header, replacing any existing value (names compare case-insensitively).
    pub fn set_header<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Drain the body into memory (files are read to the end).
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        match self.body {
            Body::Empty => Ok(Vec::new()),
            Body::Bytes(b) => Ok(b),
            Body::File { mut file, len } => {
                let mut out = Vec::with_capacity(len as usize);
                file.read_to_end(&mut out)?;
                Ok(out)
            }
        }
    }
}

/// Request handler shared between HTTP workers.
pub trait Handler: Send + Sync {
    fn serve(&self, rq: &HttpRequest) -> Reply;
}

impl<F> Handler for F
where
    F: Fn(&HttpRequest) -> Reply + Send + Sync,
{
    fn serve(&self, rq: &HttpRequest) -> Reply {
        self(rq)
    }
}

/// Handler registered for a volume: file serving under `/filesystem/{id}`,
/// wrapped so that no cache ever stores the replies.
pub fn volume_handler(mount_point: &str, id: &str) -> Arc<dyn Handler> {
    let prefix = format!("{}/{}", ENDPOINT_FILESYSTEM, id);
    let fs: Arc<dyn Handler> = Arc::new(FileServer::new(mount_point, prefix));
    Arc::new(NoCache::new(fs))
}

// RFC 3986 path segment: everything except unreserved + sub-delims + ':' '@'.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

pub(crate) fn encode_segment<B: AsRef<[u8]>>(s: B) -> String {
    percent_encode(s.as_ref(), SEGMENT).to_string()
}

pub(crate) fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
