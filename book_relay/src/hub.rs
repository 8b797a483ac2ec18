//! Broadcast hub: the registry of connected streaming clients.
//!
//! The hub fans one payload out to every registered client. It is shared by the bus
//! subscription workers (one per topic, possibly broadcasting at the same time) and by the
//! per-connection threads that register and unregister clients.
//!
//! Locking:
//! - Membership lives behind an `RwLock`. `add`/`remove` take the write lock, which makes
//!   membership changes mutually exclusive.
//! - `broadcast` holds the read lock only long enough to clone the member list, then sends
//!   outside of it. Each broadcast therefore works on a consistent snapshot of members (no
//!   client skipped or visited twice), and two broadcasts only ever contend on the
//!   per-client send mutex.
//! - Clients whose send fails are collected during the pass and removed under the write
//!   lock after it. No lock is held while another is acquired, so there is no ordering to
//!   get wrong.

use book_common::Result;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Outbound side of one client connection.
pub trait ClientSink: Send {
    /// Deliver one message. An error marks the connection as dead.
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Release the connection after a failed send.
    fn close(&mut self) {}
}

/// Handle returned by [`Hub::add`], used to unregister the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientHandle(u64);

impl ClientHandle {
    /// Numeric id, for logging.
    pub fn id(&self) -> u64 {
        self.0
    }
}

struct Client {
    handle: ClientHandle,
    sink: Mutex<Box<dyn ClientSink>>,
}

/// Outcome of one broadcast.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Clients the payload was delivered to.
    pub delivered: usize,
    /// Clients dropped because their send failed.
    pub dropped: usize,
}

/// Registry of connected clients.
#[derive(Default)]
pub struct Hub {
    clients: RwLock<HashMap<ClientHandle, Arc<Client>>>,
    next_id: AtomicU64,
}

impl Hub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client.
    pub fn add(&self, sink: Box<dyn ClientSink>) -> Result<ClientHandle> {
        let handle = ClientHandle(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let client = Arc::new(Client {
            handle,
            sink: Mutex::new(sink),
        });
        self.clients.write()?.insert(handle, client);
        Ok(handle)
    }

    /// Unregister a client. Returns whether it was still registered; removing an absent
    /// client is a no-op.
    pub fn remove(&self, handle: ClientHandle) -> Result<bool> {
        Ok(self.clients.write()?.remove(&handle).is_some())
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> Result<usize> {
        Ok(self.clients.read()?.len())
    }

    /// Send `payload` unmodified to every registered client.
    ///
    /// A failing client is closed and unregistered; delivery to the others continues.
    pub fn broadcast(&self, payload: &[u8]) -> Result<BroadcastReport> {
        let members: Vec<Arc<Client>> = self.clients.read()?.values().cloned().collect();

        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();
        for client in &members {
            let mut sink = match client.sink.lock() {
                Ok(sink) => sink,
                Err(e) => {
                    warn!("Client {} sink poisoned: {}", client.handle.id(), e);
                    failed.push(client.handle);
                    continue;
                }
            };
            match sink.send(payload) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Send to client {} failed: {}", client.handle.id(), e);
                    sink.close();
                    failed.push(client.handle);
                }
            }
        }

        if !failed.is_empty() {
            let mut clients = self.clients.write()?;
            for handle in failed {
                if clients.remove(&handle).is_some() {
                    report.dropped += 1;
                }
            }
            debug!("{} clients remain after broadcast", clients.len());
        }
        Ok(report)
    }
}
