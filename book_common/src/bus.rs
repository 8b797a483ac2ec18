//! Publish/subscribe bus between the feeder and the relay.
//!
//! The bus is fire-and-forget and at-most-once. Two transports implement the
//! [`Publisher`] / [`Subscriber`] traits:
//! - [`UdpPublisher`] / [`UdpSubscriber`] — one datagram per frame, prefixed with its
//!   topic (`topic_len:u8 | topic | payload`). The subscriber binds the bus endpoint.
//! - [`MemoryBus`] — in-process transport with the same delivery semantics.
//!
//! Every subscription gets its own bounded queue and worker thread, so handlers for
//! different topics run concurrently and a slow handler never stalls the receive loop:
//! when its queue is full, new frames for that topic are dropped.

use crate::error::FeedError;
use crate::net::MAX_DATAGRAM;
use crate::result::Result;
use crossbeam_channel::{Sender, TrySendError, bounded};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Frames buffered per subscription before new ones are dropped.
pub const TOPIC_QUEUE_DEPTH: usize = 1024;

/// Callback invoked with each frame published on a subscribed topic.
pub type FrameHandler = Box<dyn Fn(&[u8]) + Send + 'static>;

/// First pause after a failed receive; doubles per consecutive failure.
const RECV_BACKOFF_BASE: Duration = Duration::from_millis(10);
/// Longest pause between receive attempts.
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);

type Routes = HashMap<String, Vec<Sender<Vec<u8>>>>;

/// Sending half of the bus.
pub trait Publisher {
    /// Publish `payload` on `topic` without waiting for any subscriber.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;
}

/// Receiving half of the bus.
pub trait Subscriber {
    /// Register `handler` for every frame that arrives on `topic`.
    fn subscribe(&mut self, topic: &str, handler: FrameHandler) -> Result<()>;
}

/// Prefix `payload` with its topic for transmission as one datagram.
pub fn encode_datagram(topic: &str, payload: &[u8]) -> Result<Vec<u8>> {
    if topic.is_empty() || topic.len() > u8::MAX as usize {
        return Err(FeedError::Format(format!(
            "topic length must be 1..=255 bytes, got {}",
            topic.len()
        )));
    }
    let total = 1 + topic.len() + payload.len();
    if total > MAX_DATAGRAM {
        return Err(FeedError::Format(format!(
            "datagram of {} bytes exceeds {} byte limit",
            total, MAX_DATAGRAM
        )));
    }

    let mut datagram = Vec::with_capacity(total);
    datagram.push(topic.len() as u8);
    datagram.extend_from_slice(topic.as_bytes());
    datagram.extend_from_slice(payload);
    Ok(datagram)
}

/// Split a datagram into its topic and payload.
pub fn decode_datagram(datagram: &[u8]) -> Result<(&str, &[u8])> {
    let (&topic_len, rest) = datagram
        .split_first()
        .ok_or_else(|| FeedError::Format("empty datagram".to_string()))?;
    let topic_len = topic_len as usize;
    if topic_len == 0 || rest.len() < topic_len {
        return Err(FeedError::Format(format!(
            "datagram of {} bytes cannot hold a {} byte topic",
            datagram.len(),
            topic_len
        )));
    }
    let (topic, payload) = rest.split_at(topic_len);
    let topic = std::str::from_utf8(topic)
        .map_err(|e| FeedError::Format(format!("topic is not UTF-8: {}", e)))?;
    Ok((topic, payload))
}

/// Spawn the worker thread that runs `handler` for one subscription.
fn spawn_topic_worker(topic: &str, handler: FrameHandler) -> Result<Sender<Vec<u8>>> {
    let (frame_tx, frame_rx) = bounded::<Vec<u8>>(TOPIC_QUEUE_DEPTH);
    let name = topic.to_string();
    thread::Builder::new()
        .name(format!("bus-{}", topic))
        .spawn(move || {
            for frame in frame_rx {
                handler(&frame);
            }
            debug!("Subscription worker for {} stopped", name);
        })?;
    Ok(frame_tx)
}

/// Hand a frame to every subscription of `topic`, dropping it where a queue is full.
fn dispatch(routes: &Routes, topic: &str, payload: &[u8]) {
    let Some(subscriptions) = routes.get(topic) else {
        debug!("No subscriber for topic {}, dropping {} bytes", topic, payload.len());
        return;
    };
    for frame_tx in subscriptions {
        match frame_tx.try_send(payload.to_vec()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Subscriber queue for {} is full, dropping frame", topic)
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Subscriber for {} has stopped, dropping frame", topic)
            }
        }
    }
}

/// Pause before the next receive after `failures` consecutive errors.
fn recv_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    RECV_BACKOFF_BASE
        .saturating_mul(1 << shift)
        .min(RECV_BACKOFF_MAX)
}

/// Datagram publisher pointed at the bus endpoint.
pub struct UdpPublisher {
    socket: UdpSocket,
    endpoint: SocketAddr,
}

impl UdpPublisher {
    /// Resolve `endpoint` and open an ephemeral socket to publish from.
    pub fn connect(endpoint: &str) -> Result<Self> {
        let endpoint = endpoint
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| FeedError::InvalidConfig(format!("cannot resolve {}", endpoint)))?;
        let local = if endpoint.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local)?;
        info!("Publishing to bus at {} from {}", endpoint, socket.local_addr()?);
        Ok(Self { socket, endpoint })
    }

    /// Address frames are sent to.
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }
}

impl Publisher for UdpPublisher {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let datagram = encode_datagram(topic, payload)?;
        self.socket.send_to(&datagram, self.endpoint)?;
        Ok(())
    }
}

/// Datagram subscriber bound to the bus endpoint.
///
/// Register handlers with [`Subscriber::subscribe`], then call [`UdpSubscriber::start`]
/// to run the receive loop.
pub struct UdpSubscriber {
    socket: UdpSocket,
    routes: Routes,
}

impl UdpSubscriber {
    /// Bind the bus endpoint.
    pub fn bind(endpoint: &str) -> Result<Self> {
        let socket = UdpSocket::bind(endpoint)?;
        info!("Bus subscriber listening on {}", socket.local_addr()?);
        Ok(Self {
            socket,
            routes: HashMap::new(),
        })
    }

    /// Address the subscriber is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Spawn the receive loop. It runs for the life of the process.
    pub fn start(self) -> Result<JoinHandle<()>> {
        let Self { socket, routes } = self;
        let handle = thread::Builder::new()
            .name("bus-recv".to_string())
            .spawn(move || {
                let mut buf = vec![0u8; MAX_DATAGRAM + 1];
                let mut failures = 0u32;
                loop {
                    match socket.recv_from(&mut buf) {
                        Ok((size, from)) => {
                            failures = 0;
                            match decode_datagram(&buf[..size]) {
                                Ok((topic, payload)) => dispatch(&routes, topic, payload),
                                Err(e) => warn!("Dropping datagram from {}: {}", from, e),
                            }
                        }
                        Err(e) => {
                            failures = failures.saturating_add(1);
                            let pause = recv_backoff(failures);
                            error!(
                                "Bus receive error ({} in a row), retrying in {:?}: {}",
                                failures, pause, e
                            );
                            thread::sleep(pause);
                        }
                    }
                }
            })?;
        Ok(handle)
    }
}

impl Subscriber for UdpSubscriber {
    fn subscribe(&mut self, topic: &str, handler: FrameHandler) -> Result<()> {
        let frame_tx = spawn_topic_worker(topic, handler)?;
        self.routes.entry(topic.to_string()).or_default().push(frame_tx);
        info!("Subscribed to {}", topic);
        Ok(())
    }
}

/// In-process bus. Clones share the same subscriptions.
#[derive(Clone, Default)]
pub struct MemoryBus {
    routes: Arc<RwLock<Routes>>,
}

impl MemoryBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Publisher for MemoryBus {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let routes = self.routes.read()?;
        dispatch(&routes, topic, payload);
        Ok(())
    }
}

impl Subscriber for MemoryBus {
    fn subscribe(&mut self, topic: &str, handler: FrameHandler) -> Result<()> {
        let frame_tx = spawn_topic_worker(topic, handler)?;
        self.routes
            .write()?
            .entry(topic.to_string())
            .or_default()
            .push(frame_tx);
        Ok(())
    }
}
