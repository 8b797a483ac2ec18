//! Streaming endpoint.
//!
//! One TCP listener serves both the WebSocket upgrade path and the static frontend. Each
//! accepted connection gets its own thread:
//! - `GET /ws` is upgraded and the client is registered with the hub. The thread then
//!   only reads from the socket to notice the peer going away, skipping over the frames
//!   it sends, and unregisters the client on EOF, a read error or a Close frame.
//! - Anything else is answered from the static asset directory.
//!
//! After the upgrade the hub writes text frames straight to the socket: the frame header
//! is built per client, the payload bytes are shared by every client of a broadcast.

use crate::assets::{StaticAssets, write_response};
use crate::hub::{ClientSink, Hub};
use book_common::net::WS_PATH;
use book_common::{FeedError, Result};
use log::{debug, error, info, warn};
use std::io::{Cursor, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tungstenite::protocol::frame::FrameHeader;
use tungstenite::protocol::frame::coding::{Control, Data, OpCode};

/// Bytes peeked to find the request line.
const REQUEST_PEEK: usize = 2048;
/// How long a client may take to deliver its request line.
const REQUEST_LINE_WAIT: Duration = Duration::from_secs(5);
/// Pause between peeks while the request line is incomplete.
const PEEK_RETRY: Duration = Duration::from_millis(5);
/// Largest server frame header: 2 bytes plus a 64-bit length.
const MAX_FRAME_HEADER: usize = 10;

fn ws_error(e: tungstenite::Error) -> FeedError {
    FeedError::Transport(e.to_string())
}

/// Upgraded connection registered with the hub. Payloads must be UTF-8 JSON.
struct WsSink {
    stream: TcpStream,
}

impl ClientSink for WsSink {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        let header = FrameHeader {
            opcode: OpCode::Data(Data::Text),
            ..FrameHeader::default()
        };
        let mut head = Vec::with_capacity(MAX_FRAME_HEADER);
        header.format(payload.len() as u64, &mut head).map_err(ws_error)?;
        self.stream.write_all(&head)?;
        self.stream.write_all(payload)?;
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Follows the frames a client sends, without buffering their payloads, until a Close
/// frame shows up.
#[derive(Debug, Default)]
struct CloseWatch {
    pending: Vec<u8>,
    skip: u64,
}

impl CloseWatch {
    /// Consume bytes read from the client. Returns `true` once a Close frame starts.
    fn feed(&mut self, bytes: &[u8]) -> Result<bool> {
        self.pending.extend_from_slice(bytes);
        let mut offset = 0usize;
        let closed = loop {
            if self.skip > 0 {
                let available = (self.pending.len() - offset) as u64;
                let step = available.min(self.skip);
                offset += step as usize;
                self.skip -= step;
                if self.skip > 0 {
                    break false;
                }
            }

            let mut cursor = Cursor::new(&self.pending[offset..]);
            match FrameHeader::parse(&mut cursor).map_err(ws_error)? {
                None => break false,
                Some((header, length)) => {
                    if header.opcode == OpCode::Control(Control::Close) {
                        break true;
                    }
                    offset += cursor.position() as usize;
                    self.skip = length;
                }
            }
        };
        self.pending.drain(..offset);
        Ok(closed)
    }
}

/// Extract method and path (query and fragment stripped) from the request line.
pub(crate) fn parse_request_line(head: &[u8]) -> Option<(&str, &str)> {
    let line_end = head.windows(2).position(|w| w == b"\r\n")?;
    let line = std::str::from_utf8(&head[..line_end]).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    let path = target.split(['?', '#']).next()?;
    Some((method, path))
}

/// HTTP + WebSocket server feeding the hub.
pub struct StreamServer {
    listener: TcpListener,
    hub: Arc<Hub>,
    assets: Arc<StaticAssets>,
}

impl StreamServer {
    /// Bind the listener.
    pub fn bind(addr: &str, hub: Arc<Hub>, assets: StaticAssets) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            hub,
            assets: Arc::new(assets),
        })
    }

    /// Bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the listener fails.
    pub fn serve(self) -> Result<()> {
        info!(
            "Listening on {} (streaming at {}, assets from {})",
            self.local_addr()?,
            WS_PATH,
            self.assets.root().display()
        );
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let hub = Arc::clone(&self.hub);
                    let assets = Arc::clone(&self.assets);
                    thread::spawn(move || {
                        if let Err(e) = handle_connection(stream, &hub, &assets) {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => error!("Accept error: {}", e),
            }
        }
        Ok(())
    }
}

/// Peek until the request line is complete, the peek buffer is full, the peer closes
/// or the wait runs out. Returns the number of bytes available.
fn peek_request_line(stream: &TcpStream, head: &mut [u8]) -> Result<usize> {
    let deadline = Instant::now() + REQUEST_LINE_WAIT;
    loop {
        let size = stream.peek(head)?;
        let line_done = head[..size].windows(2).any(|w| w == b"\r\n");
        if size == 0 || size == head.len() || line_done || Instant::now() >= deadline {
            return Ok(size);
        }
        thread::sleep(PEEK_RETRY);
    }
}

fn handle_connection(mut stream: TcpStream, hub: &Hub, assets: &StaticAssets) -> Result<()> {
    let mut head = [0u8; REQUEST_PEEK];
    let size = peek_request_line(&stream, &mut head)?;
    let Some((method, path)) = parse_request_line(&head[..size]) else {
        return write_response(&mut stream, "400 Bad Request", "text/plain", b"bad request", true);
    };

    if path == WS_PATH {
        stream_client(stream, hub)
    } else {
        assets.serve(stream, method, path)
    }
}

/// Upgrade, register, then block until the peer disconnects or asks to close.
fn stream_client(stream: TcpStream, hub: &Hub) -> Result<()> {
    let peer = stream.peer_addr()?;
    let socket = tungstenite::accept(stream)
        .map_err(|e| FeedError::Transport(format!("ws upgrade from {}: {}", peer, e)))?;
    let mut read_half = socket.get_ref().try_clone()?;
    let write_half = socket.get_ref().try_clone()?;
    drop(socket);

    let handle = hub.add(Box::new(WsSink { stream: write_half }))?;
    info!("Client {} connected from {} ({} total)", handle.id(), peer, hub.client_count()?);

    let mut frames = CloseWatch::default();
    let mut buf = [0u8; 1024];
    loop {
        match read_half.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => match frames.feed(&buf[..n]) {
                Ok(false) => {}
                Ok(true) => {
                    debug!("Client {} sent Close", handle.id());
                    break;
                }
                Err(e) => {
                    debug!("Client {} sent an invalid frame: {}", handle.id(), e);
                    break;
                }
            },
            Err(e) => {
                debug!("Client {} read error: {}", handle.id(), e);
                break;
            }
        }
    }

    hub.remove(handle)?;
    let _ = read_half.shutdown(Shutdown::Both);
    info!("Client {} disconnected ({} total)", handle.id(), hub.client_count()?);
    Ok(())
}
