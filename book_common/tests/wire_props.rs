//! Property tests for the binary wire format.
//!
//! - Decoding what was encoded yields the original snapshot / order batch.
//! - Encoded lengths follow the fixed layout.
//! - Any truncation of a valid frame is reported as a malformed frame.
//! - Batch sequence numbers advance by one per encode, whatever the batch sizes.

use book_common::FeedError;
use book_common::model::{BookSnapshot, OrderAction, OrderEvent, OrderType, PriceLevel, Side};
use book_common::wire::{
    LEVEL_SIZE, ORDER_SIZE, ORDERS_HEADER_SIZE, SNAPSHOT_HEADER_SIZE, WireEncoder, decode_order_batch,
    decode_snapshot, encode_book,
};
use proptest::prelude::*;

fn level() -> impl Strategy<Value = PriceLevel> {
    (0.01f64..1_000_000.0, any::<i32>()).prop_map(|(price, quantity)| PriceLevel { price, quantity })
}

fn snapshot() -> impl Strategy<Value = BookSnapshot> {
    (
        any::<i64>(),
        any::<u64>(),
        prop::collection::vec(level(), 0..40),
        prop::collection::vec(level(), 0..40),
    )
        .prop_map(|(instrument_id, timestamp, bids, asks)| BookSnapshot {
            instrument_id,
            timestamp,
            bids,
            asks,
        })
}

fn order() -> impl Strategy<Value = OrderEvent> {
    (
        any::<i64>(),
        -1e9f64..1e9,
        any::<u64>(),
        any::<i32>(),
        any::<i32>(),
        any::<i32>(),
        any::<i32>(),
    )
        .prop_map(|(instrument_id, price, tick, quantity, side, order_type, action)| OrderEvent {
            instrument_id,
            price,
            tick,
            quantity,
            side: Side::from_code(side),
            order_type: OrderType::from_code(order_type),
            action: OrderAction::from_code(action),
        })
}

proptest! {
    #[test]
    fn prop_snapshot_round_trip(snap in snapshot()) {
        let buf = encode_book(&snap);
        prop_assert_eq!(buf.len(), SNAPSHOT_HEADER_SIZE + LEVEL_SIZE * (snap.bids.len() + snap.asks.len()));
        let decoded = decode_snapshot(&buf).unwrap();
        prop_assert_eq!(decoded, snap);
    }

    #[test]
    fn prop_snapshot_truncation_is_malformed(snap in snapshot(), cut in 1usize..64) {
        let buf = encode_book(&snap);
        let cut = cut.min(buf.len());
        let result = decode_snapshot(&buf[..buf.len() - cut]);
        let is_malformed = matches!(result, Err(FeedError::MalformedFrame { .. }));
        prop_assert!(is_malformed);
    }

    #[test]
    fn prop_order_batch_round_trip(orders in prop::collection::vec(order(), 0..20)) {
        let mut encoder = WireEncoder::new();
        let buf = encoder.encode_order_batch(&orders);
        prop_assert_eq!(buf.len(), ORDERS_HEADER_SIZE + ORDER_SIZE * orders.len());

        let batch = decode_order_batch(&buf).unwrap();
        prop_assert_eq!(batch.sequence, 1);
        prop_assert_eq!(batch.instrument_id, orders.first().map(|o| o.instrument_id as u32).unwrap_or(0));
        prop_assert_eq!(batch.orders, orders);
    }

    #[test]
    fn prop_order_batch_truncation_is_malformed(orders in prop::collection::vec(order(), 1..10), cut in 1usize..40) {
        let mut encoder = WireEncoder::new();
        let buf = encoder.encode_order_batch(&orders);
        let result = decode_order_batch(&buf[..buf.len() - cut]);
        let is_malformed = matches!(result, Err(FeedError::MalformedFrame { .. }));
        prop_assert!(is_malformed);
    }

    #[test]
    fn prop_sequences_are_consecutive(sizes in prop::collection::vec(0usize..8, 1..30)) {
        let mut encoder = WireEncoder::new();
        let template = OrderEvent {
            instrument_id: 1,
            price: 100.0,
            tick: 1,
            quantity: 100,
            side: Side::Buy,
            order_type: OrderType::Limit,
            action: OrderAction::Add,
        };
        for (i, size) in sizes.iter().enumerate() {
            let buf = encoder.encode_order_batch(&vec![template; *size]);
            prop_assert_eq!(decode_order_batch(&buf).unwrap().sequence, i as u64 + 1);
        }
    }
}
