//! Bus → browser relay.
//!
//! Decodes each inbound bus frame once, re-encodes it as the JSON message browsers
//! consume and hands the bytes to the hub for fan-out. Frames that fail to decode are
//! logged and dropped: the bus is not a trusted boundary.
//!
//! Outbound shapes:
//! ```text
//! {"type":"snapshot","timestamp":N,"bids":[{"price":P,"qty":Q}],"asks":[...]}
//! {"type":"orders","orders":[{"price":P,"qty":Q,"side":"BUY","action":"ADD","orderType":"LIMIT"}]}
//! ```

use crate::hub::{BroadcastReport, Hub};
use book_common::{FeedError, Result};
use book_common::bus::Subscriber;
use book_common::model::{BookSnapshot, OrderAction, OrderBatch, OrderType, PriceLevel, Side};
use book_common::net::{ORDERS_TOPIC, SNAPSHOT_TOPIC};
use book_common::wire::{decode_order_batch, decode_snapshot};
use log::{debug, error, warn};
use serde::{Serialize, Serializer};
use std::fmt::Display;
use std::sync::Arc;

/// Serialize any `Display` value as its string form.
fn as_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// One ladder rung as sent to browsers.
#[derive(Debug, Serialize)]
pub struct LevelMessage {
    /// Level price.
    pub price: f64,
    /// Level quantity.
    pub qty: i32,
}

impl From<&PriceLevel> for LevelMessage {
    fn from(level: &PriceLevel) -> Self {
        Self {
            price: level.price,
            qty: level.quantity,
        }
    }
}

/// One order event as sent to browsers.
#[derive(Debug, Serialize)]
pub struct OrderMessage {
    /// Order price.
    pub price: f64,
    /// Order quantity.
    pub qty: i32,
    /// `BUY`, `SELL` or `UNKNOWN`.
    #[serde(serialize_with = "as_display")]
    pub side: Side,
    /// `ADD`, `REMOVE`, `MODIFY`, `SEEKER_ADD` or `UNKNOWN`.
    #[serde(serialize_with = "as_display")]
    pub action: OrderAction,
    /// `LIMIT`, `MARKET`, `ICEBERG`, `STOP` or `UNKNOWN`.
    #[serde(rename = "orderType", serialize_with = "as_display")]
    pub order_type: OrderType,
}

/// Message streamed to every connected client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// Full book ladder.
    Snapshot {
        /// Generator tick.
        timestamp: u64,
        /// Bids, best first.
        bids: Vec<LevelMessage>,
        /// Asks, best first.
        asks: Vec<LevelMessage>,
    },
    /// Batch of order events.
    Orders {
        /// Events in publish order.
        orders: Vec<OrderMessage>,
    },
}

impl From<&BookSnapshot> for OutboundMessage {
    fn from(snapshot: &BookSnapshot) -> Self {
        OutboundMessage::Snapshot {
            timestamp: snapshot.timestamp,
            bids: snapshot.bids.iter().map(LevelMessage::from).collect(),
            asks: snapshot.asks.iter().map(LevelMessage::from).collect(),
        }
    }
}

impl From<&OrderBatch> for OutboundMessage {
    fn from(batch: &OrderBatch) -> Self {
        OutboundMessage::Orders {
            orders: batch
                .orders
                .iter()
                .map(|o| OrderMessage {
                    price: o.price,
                    qty: o.quantity,
                    side: o.side,
                    action: o.action,
                    order_type: o.order_type,
                })
                .collect(),
        }
    }
}

impl OutboundMessage {
    /// JSON bytes of this message.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

fn log_failure(kind: &str, e: &FeedError) {
    if e.is_frame_error() {
        warn!("Decode {}: {}", kind, e);
    } else {
        error!("Broadcast {}: {}", kind, e);
    }
}

/// Turns bus frames into hub broadcasts.
pub struct Relay {
    hub: Arc<Hub>,
}

impl Relay {
    /// Create a relay feeding `hub`.
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    /// Decode a snapshot frame and broadcast it.
    pub fn on_snapshot_frame(&self, frame: &[u8]) -> Result<BroadcastReport> {
        let snapshot = decode_snapshot(frame)?;
        let payload = OutboundMessage::from(&snapshot).to_json_bytes()?;
        debug!("Relaying snapshot {} ({} bytes)", snapshot.timestamp, payload.len());
        self.hub.broadcast(&payload)
    }

    /// Decode an order batch frame and broadcast it.
    pub fn on_orders_frame(&self, frame: &[u8]) -> Result<BroadcastReport> {
        let batch = decode_order_batch(frame)?;
        let payload = OutboundMessage::from(&batch).to_json_bytes()?;
        debug!("Relaying order batch {} ({} orders)", batch.sequence, batch.orders.len());
        self.hub.broadcast(&payload)
    }

    /// Subscribe the relay to both book topics on `bus`.
    pub fn attach<S: Subscriber>(self: &Arc<Self>, bus: &mut S) -> Result<()> {
        let relay = Arc::clone(self);
        bus.subscribe(
            SNAPSHOT_TOPIC,
            Box::new(move |frame| {
                match relay.on_snapshot_frame(frame) {
                    Ok(report) if report.dropped > 0 => {
                        debug!("Snapshot reached {} clients, dropped {}", report.delivered, report.dropped)
                    }
                    Ok(_) => {}
                    Err(e) => log_failure("snapshot", &e),
                }
            }),
        )?;

        let relay = Arc::clone(self);
        bus.subscribe(
            ORDERS_TOPIC,
            Box::new(move |frame| {
                match relay.on_orders_frame(frame) {
                    Ok(report) if report.dropped > 0 => {
                        debug!("Orders reached {} clients, dropped {}", report.delivered, report.dropped)
                    }
                    Ok(_) => {}
                    Err(e) => log_failure("orders", &e),
                }
            }),
        )?;
        Ok(())
    }
}
