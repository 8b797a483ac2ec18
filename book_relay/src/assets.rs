//! Plain HTTP file serving for the frontend bundle.
//!
//! Only what a browser needs to load the viewer: `GET`/`HEAD` of files below the asset
//! root, `/` mapped to `index.html`, one response per connection.

use book_common::Result;
use log::debug;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::path::{Component, Path, PathBuf};

/// Directory of static frontend assets.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
}

/// MIME type for a file, by extension.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") | Some("map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

impl StaticAssets {
    /// Serve files from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Asset root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path to a file below the root, refusing anything that would leave it.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let relative = request_path.trim_start_matches('/');
        let relative = if relative.is_empty() || relative.ends_with('/') {
            format!("{}index.html", relative)
        } else {
            relative.to_string()
        };

        let mut resolved = self.root.clone();
        for component in Path::new(&relative).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(resolved)
    }

    /// Answer one request on `stream` and close it.
    pub fn serve(&self, stream: TcpStream, method: &str, request_path: &str) -> Result<()> {
        drain_request_head(&stream)?;
        let mut stream = stream;

        if method != "GET" && method != "HEAD" {
            return write_response(&mut stream, "405 Method Not Allowed", "text/plain", b"method not allowed", true);
        }

        let file = self
            .resolve(request_path)
            .and_then(|path| fs::read(&path).ok().map(|body| (path, body)));
        match file {
            Some((path, body)) => {
                debug!("Serving {} ({} bytes)", path.display(), body.len());
                write_response(&mut stream, "200 OK", content_type(&path), &body, method == "GET")
            }
            None => write_response(&mut stream, "404 Not Found", "text/plain", b"not found", true),
        }
    }
}

/// Consume request header lines up to the blank line that ends them.
fn drain_request_head(stream: &TcpStream) -> Result<()> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 || line == "\r\n" || line == "\n" {
            return Ok(());
        }
    }
}

/// Write a complete `Connection: close` response.
pub(crate) fn write_response(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &[u8],
    include_body: bool,
) -> Result<()> {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    stream.write_all(head.as_bytes())?;
    if include_body {
        stream.write_all(body)?;
    }
    stream.flush()?;
    Ok(())
}
