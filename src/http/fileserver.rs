//! FileServer — read-only file serving rooted at a mount point.
//!
//! Behaviour follows the usual static file server conventions:
//! - the fixed prefix (`/filesystem/{id}`) is stripped, the rest is cleaned
//!   (`.`/`..`/`//` collapsed) and resolved below the root, so `..` never escapes it;
//! - `.../index.html` -> 301 to the directory;
//! - directory without trailing '/' -> 301 to the slash form, file with a
//!   trailing '/' -> 301 to the slash-less form;
//! - directory with index.html -> that file, otherwise an HTML listing;
//! - missing -> 404, permission denied -> 403, other I/O errors -> 500.
//!
//! Paths are handled as raw bytes end to end (Unix file names need not be
//! UTF-8): decoded from the request, resolved through `OsStr::from_bytes`,
//! percent-encoded byte-wise in listings.

use log::debug;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use super::{encode_segment, html_escape, Body, Handler, HttpRequest, Reply};
use crate::consts::INDEX_FILE;

const SNIFF_LEN: usize = 512;

#[derive(Clone, Debug)]
pub struct FileServer {
    root: PathBuf,
    prefix: String,
}

impl FileServer {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(root: P, prefix: S) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    fn resolve(&self, clean: &[u8]) -> PathBuf {
        match clean.iter().position(|&c| c != b'/') {
            Some(i) => self.root.join(OsStr::from_bytes(&clean[i..])),
            None => self.root.clone(),
        }
    }
}

impl Handler for FileServer {
    fn serve(&self, rq: &HttpRequest) -> Reply {
        let decoded = rq.path_bytes();
        // "" (nothing after the prefix) is the root directory without its '/'
        let url_path = match decoded.strip_prefix(self.prefix.as_bytes()) {
            Some(r) => r,
            None => return Reply::not_found(),
        };

        if url_path.ends_with(format!("/{}", INDEX_FILE).as_bytes()) {
            let dir = match rq.raw_path.rfind('/') {
                Some(i) => &rq.raw_path[..=i],
                None => "/",
            };
            return Reply::redirect(rq.location(dir));
        }

        let clean = clean_path(url_path);
        let fs_path = self.resolve(&clean);

        let meta = match fs::metadata(&fs_path) {
            Ok(m) => m,
            Err(e) => return error_reply(&fs_path, &e),
        };

        if meta.is_dir() {
            if !url_path.ends_with(b"/") {
                return Reply::redirect(rq.location(&format!("{}/", rq.raw_path)));
            }
            let index = fs_path.join(INDEX_FILE);
            if let Ok(im) = fs::metadata(&index) {
                if im.is_file() {
                    return serve_file(&index, &im);
                }
            }
            return dir_list(&fs_path);
        }

        if url_path.ends_with(b"/") {
            let trimmed = rq.raw_path.trim_end_matches('/');
            return Reply::redirect(rq.location(trimmed));
        }
        serve_file(&fs_path, &meta)
    }
}

/// Rooted lexical clean: "/a/./b/../c//" -> "/a/c". Result always starts with '/'.
pub(crate) fn clean_path(p: &[u8]) -> Vec<u8> {
    let mut parts: Vec<&[u8]> = Vec::new();
    for seg in p.split(|&c| c == b'/') {
        match seg {
            b"" | b"." => {}
            b".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    let mut out = Vec::with_capacity(p.len() + 1);
    out.push(b'/');
    out.extend_from_slice(&parts.join(&b'/'));
    out
}

fn error_reply(path: &Path, e: &io::Error) -> Reply {
    match e.kind() {
        ErrorKind::NotFound | ErrorKind::NotADirectory => Reply::not_found(),
        ErrorKind::PermissionDenied => Reply::forbidden(),
        _ => {
            debug!("fileserver: {}: {}", path.display(), e);
            Reply::internal_error()
        }
    }
}

fn serve_file(path: &Path, meta: &fs::Metadata) -> Reply {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) => return error_reply(path, &e),
    };
    let content_type = match content_type_by_ext(path) {
        Some(ct) => ct.to_string(),
        None => match sniff(&mut file) {
            Ok(ct) => ct.to_string(),
            Err(e) => return error_reply(path, &e),
        },
    };
    let mut reply = Reply::new(200).with_header("Content-Type", content_type);
    if let Ok(mtime) = meta.modified() {
        reply.set_header("Last-Modified", httpdate::fmt_http_date(mtime));
    }
    reply.body = Body::File {
        file,
        len: meta.len(),
    };
    reply
}

// HTML-теги, после которых идёт пробел или '>' (как в WHATWG mime sniffing).
const HTML_TAGS: &[&[u8]] = &[
    b"<!doctype html", b"<html", b"<head", b"<script", b"<iframe", b"<h1", b"<div",
    b"<font", b"<table", b"<a", b"<style", b"<title", b"<b", b"<body", b"<br", b"<p",
    b"<!--",
];

const MAGIC: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"BM", "image/bmp"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"\x00asm", "application/wasm"),
];

/// Content type from the first bytes of a file with no known extension:
/// markup and magic prefixes first, then UTF-8 text, otherwise octet-stream.
pub(crate) fn sniff_bytes(head: &[u8]) -> &'static str {
    let start = head
        .iter()
        .position(|c| !matches!(c, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(head.len());
    let markup = &head[start..];
    for tag in HTML_TAGS {
        if markup.len() > tag.len()
            && markup[..tag.len()].eq_ignore_ascii_case(tag)
            && matches!(markup[tag.len()], b' ' | b'>')
        {
            return "text/html; charset=utf-8";
        }
    }
    if markup.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }
    for (magic, ct) in MAGIC {
        if head.starts_with(magic) {
            return *ct;
        }
    }
    if head.contains(&0) {
        return "application/octet-stream";
    }
    let text = match std::str::from_utf8(head) {
        Ok(_) => true,
        // a multi-byte char cut at the sniff boundary is still text
        Err(e) => e.error_len().is_none() && head.len() == SNIFF_LEN,
    };
    if text {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

fn sniff(file: &mut File) -> io::Result<&'static str> {
    let mut buf = [0u8; SNIFF_LEN];
    let mut n = 0usize;
    while n < buf.len() {
        match file.read(&mut buf[n..]) {
            Ok(0) => break,
            Ok(k) => n += k,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    file.seek(SeekFrom::Start(0))?;
    Ok(sniff_bytes(&buf[..n]))
}

fn content_type_by_ext(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let ct = match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "xml" => "text/xml; charset=utf-8",
        "txt" | "log" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/vnd.microsoft.icon",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(ct)
}

fn dir_list(dir: &Path) -> Reply {
    let rd = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => return error_reply(dir, &e),
    };
    let mut names: Vec<(Vec<u8>, bool)> = Vec::new();
    for entry in rd {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("fileserver: read_dir {}: {}", dir.display(), e);
                return Reply::internal_error();
            }
        };
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        names.push((entry.file_name().as_bytes().to_vec(), is_dir));
    }
    names.sort();

    let mut out = String::from("<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n");
    for (name, is_dir) in &names {
        let slash = if *is_dir { "/" } else { "" };
        let mut href = encode_segment(name);
        // "a:b" would otherwise read as a URL scheme
        if href.contains(':') {
            href = format!("./{}", href);
        }
        out.push_str(&format!(
            "<a href=\"{}{}\">{}{}</a>\n",
            href,
            slash,
            html_escape(&String::from_utf8_lossy(name)),
            slash
        ));
    }
    out.push_str("</pre>\n");
    Reply::html(200, out)
}
