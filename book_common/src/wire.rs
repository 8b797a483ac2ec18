//! Binary wire format shared by the feeder and the relay.
//!
//! Every integer is little-endian and prices travel as raw IEEE-754 `f64` bit patterns.
//!
//! Snapshot frame:
//! ```text
//! header (20): instrument_id:i64 | timestamp:u64 | num_bids:u16 | num_asks:u16
//! level  (12): price:f64 | quantity:i32            (bids first, then asks)
//! ```
//!
//! Order batch frame:
//! ```text
//! header (20): msg_type:u8 = 1 | instrument_id:u32 | sequence:u64 | count:u32 | 3 reserved
//! order  (40): instrument_id:i64 | price:f64 | tick:u64 | quantity:i32
//!              | side:i32 | type:i32 | action:i32
//! ```

use crate::error::FeedError;
use crate::model::{BookSnapshot, OrderAction, OrderBatch, OrderEvent, OrderType, PriceLevel, Side};
use crate::result::Result;

/// Snapshot header length.
pub const SNAPSHOT_HEADER_SIZE: usize = 20;
/// Encoded price level length.
pub const LEVEL_SIZE: usize = 12;
/// Order batch header length.
pub const ORDERS_HEADER_SIZE: usize = 20;
/// Encoded order length.
pub const ORDER_SIZE: usize = 40;
/// The only order batch message type this format defines.
pub const ORDERS_MSG_TYPE: u8 = 1;

/// Encode a snapshot frame.
///
/// Each side is capped at `u16::MAX` levels so the header count always matches the
/// records that follow.
pub fn encode_snapshot(
    instrument_id: i64,
    timestamp: u64,
    bids: &[PriceLevel],
    asks: &[PriceLevel],
) -> Vec<u8> {
    let num_bids = bids.len().min(u16::MAX as usize);
    let num_asks = asks.len().min(u16::MAX as usize);
    let mut buf = Vec::with_capacity(SNAPSHOT_HEADER_SIZE + (num_bids + num_asks) * LEVEL_SIZE);

    buf.extend_from_slice(&instrument_id.to_le_bytes());
    buf.extend_from_slice(&timestamp.to_le_bytes());
    buf.extend_from_slice(&(num_bids as u16).to_le_bytes());
    buf.extend_from_slice(&(num_asks as u16).to_le_bytes());

    for level in bids[..num_bids].iter().chain(&asks[..num_asks]) {
        buf.extend_from_slice(&level.price.to_bits().to_le_bytes());
        buf.extend_from_slice(&level.quantity.to_le_bytes());
    }
    buf
}

/// Encode a [`BookSnapshot`] value.
pub fn encode_book(snapshot: &BookSnapshot) -> Vec<u8> {
    encode_snapshot(
        snapshot.instrument_id,
        snapshot.timestamp,
        &snapshot.bids,
        &snapshot.asks,
    )
}

/// Decode a snapshot frame. Trailing bytes past the declared levels are ignored.
pub fn decode_snapshot(data: &[u8]) -> Result<BookSnapshot> {
    if data.len() < SNAPSHOT_HEADER_SIZE {
        return Err(FeedError::MalformedFrame {
            needed: SNAPSHOT_HEADER_SIZE,
            actual: data.len(),
        });
    }

    let mut reader = FrameReader::new(data);
    let instrument_id = reader.i64();
    let timestamp = reader.u64();
    let num_bids = reader.u16() as usize;
    let num_asks = reader.u16() as usize;

    let needed = SNAPSHOT_HEADER_SIZE + (num_bids + num_asks) * LEVEL_SIZE;
    if data.len() < needed {
        return Err(FeedError::MalformedFrame {
            needed,
            actual: data.len(),
        });
    }

    let bids = (0..num_bids).map(|_| reader.level()).collect();
    let asks = (0..num_asks).map(|_| reader.level()).collect();

    Ok(BookSnapshot {
        instrument_id,
        timestamp,
        bids,
        asks,
    })
}

/// Encode context for order batches.
///
/// Owns the batch sequence counter: the first batch gets sequence 1 and every encode
/// call advances it by exactly one, whatever the batch size.
#[derive(Debug)]
pub struct WireEncoder {
    next_sequence: u64,
}

impl Default for WireEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl WireEncoder {
    /// Create an encoder whose first batch carries sequence 1.
    pub fn new() -> Self {
        Self { next_sequence: 1 }
    }

    /// Sequence number the next batch will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Encode an order batch and advance the sequence counter.
    pub fn encode_order_batch(&mut self, orders: &[OrderEvent]) -> Vec<u8> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        encode_orders_with_sequence(sequence, orders)
    }
}

fn encode_orders_with_sequence(sequence: u64, orders: &[OrderEvent]) -> Vec<u8> {
    let count = orders.len().min(u32::MAX as usize);
    let mut buf = Vec::with_capacity(ORDERS_HEADER_SIZE + count * ORDER_SIZE);

    let instrument_id = orders.first().map(|o| o.instrument_id as u32).unwrap_or(0);
    buf.push(ORDERS_MSG_TYPE);
    buf.extend_from_slice(&instrument_id.to_le_bytes());
    buf.extend_from_slice(&sequence.to_le_bytes());
    buf.extend_from_slice(&(count as u32).to_le_bytes());
    buf.extend_from_slice(&[0u8; 3]);

    for order in &orders[..count] {
        buf.extend_from_slice(&order.instrument_id.to_le_bytes());
        buf.extend_from_slice(&order.price.to_bits().to_le_bytes());
        buf.extend_from_slice(&order.tick.to_le_bytes());
        buf.extend_from_slice(&order.quantity.to_le_bytes());
        buf.extend_from_slice(&order.side.code().to_le_bytes());
        buf.extend_from_slice(&order.order_type.code().to_le_bytes());
        buf.extend_from_slice(&order.action.code().to_le_bytes());
    }
    buf
}

/// Decode an order batch frame.
pub fn decode_order_batch(data: &[u8]) -> Result<OrderBatch> {
    if data.len() < ORDERS_HEADER_SIZE {
        return Err(FeedError::MalformedFrame {
            needed: ORDERS_HEADER_SIZE,
            actual: data.len(),
        });
    }

    let mut reader = FrameReader::new(data);
    let msg_type = reader.u8();
    if msg_type != ORDERS_MSG_TYPE {
        return Err(FeedError::UnsupportedMessageType(msg_type));
    }
    let instrument_id = reader.u32();
    let sequence = reader.u64();
    let count = reader.u32() as usize;
    reader.skip(3);

    let needed = count
        .checked_mul(ORDER_SIZE)
        .and_then(|body| body.checked_add(ORDERS_HEADER_SIZE))
        .unwrap_or(usize::MAX);
    if data.len() < needed {
        return Err(FeedError::MalformedFrame {
            needed,
            actual: data.len(),
        });
    }

    let orders = (0..count)
        .map(|_| OrderEvent {
            instrument_id: reader.i64(),
            price: reader.f64(),
            tick: reader.u64(),
            quantity: reader.i32(),
            side: Side::from_code(reader.i32()),
            order_type: OrderType::from_code(reader.i32()),
            action: OrderAction::from_code(reader.i32()),
        })
        .collect();

    Ok(OrderBatch {
        instrument_id,
        sequence,
        orders,
    })
}

/// Cursor over a frame whose length has already been validated.
struct FrameReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn i64(&mut self) -> i64 {
        i64::from_le_bytes(self.take())
    }

    fn f64(&mut self) -> f64 {
        f64::from_bits(self.u64())
    }

    fn level(&mut self) -> PriceLevel {
        let price = self.f64();
        let quantity = self.i32();
        PriceLevel { price, quantity }
    }
}
