//! Per-tick publish path: generate, encode, publish.
//!
//! `FeedPublisher` owns the generator, the order batch encoder (and with it the batch
//! sequence counter) and the bus publisher. Publishing is fire-and-forget: failures are
//! logged and the feed moves on to the next tick.

use crate::generator::MarketGenerator;
use book_common::bus::Publisher;
use book_common::net::{ORDERS_TOPIC, SNAPSHOT_TOPIC};
use book_common::wire::{WireEncoder, encode_book};
use log::{debug, warn};

/// What a single tick put on the bus.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Generator tick of this report.
    pub tick: u64,
    /// Snapshot frame was handed to the bus.
    pub snapshot_published: bool,
    /// Orders in the published batch (0 when nothing was published).
    pub orders_published: usize,
}

/// Drives the generator and publishes its frames.
pub struct FeedPublisher<P: Publisher> {
    generator: MarketGenerator,
    encoder: WireEncoder,
    bus: P,
    publish_orders: bool,
}

impl<P: Publisher> FeedPublisher<P> {
    /// Create a publisher; order batches go out only when `publish_orders` is set.
    pub fn new(generator: MarketGenerator, bus: P, publish_orders: bool) -> Self {
        Self {
            generator,
            encoder: WireEncoder::new(),
            bus,
            publish_orders,
        }
    }

    /// Whether order batches are published.
    pub fn publishes_orders(&self) -> bool {
        self.publish_orders
    }

    /// Run one tick. A failed snapshot publish skips the tick's order batch.
    pub fn on_tick(&mut self) -> TickReport {
        let snapshot = self.generator.generate_snapshot();
        let mut report = TickReport {
            tick: snapshot.timestamp,
            ..TickReport::default()
        };

        let frame = encode_book(&snapshot);
        if let Err(e) = self.bus.publish(SNAPSHOT_TOPIC, &frame) {
            warn!("Publish snapshot error at tick {}: {}", report.tick, e);
            return report;
        }
        report.snapshot_published = true;
        if let (Some(bid), Some(ask)) = (snapshot.best_bid(), snapshot.best_ask()) {
            debug!(
                "Published snapshot {} ({} bytes), {} x {}",
                report.tick,
                frame.len(),
                bid.price,
                ask.price
            );
        }

        if self.publish_orders {
            let orders = self.generator.generate_order_events(&snapshot);
            if !orders.is_empty() {
                let batch = self.encoder.encode_order_batch(&orders);
                match self.bus.publish(ORDERS_TOPIC, &batch) {
                    Ok(()) => report.orders_published = orders.len(),
                    Err(e) => warn!("Publish orders error at tick {}: {}", report.tick, e),
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorConfig;
    use book_common::wire::{decode_order_batch, decode_snapshot};
    use book_common::{FeedError, Result};
    use std::cell::RefCell;

    /// Records publishes; fails every publish on `fail_topic`.
    #[derive(Default)]
    struct RecordingBus {
        frames: RefCell<Vec<(String, Vec<u8>)>>,
        fail_topic: Option<&'static str>,
    }

    impl Publisher for &RecordingBus {
        fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
            if self.fail_topic == Some(topic) {
                return Err(FeedError::Transport("bus unreachable".to_string()));
            }
            self.frames.borrow_mut().push((topic.to_string(), payload.to_vec()));
            Ok(())
        }
    }

    fn market() -> MarketGenerator {
        MarketGenerator::new(GeneratorConfig::default()).unwrap()
    }

    #[test]
    fn test_snapshots_only_by_default() {
        let bus = RecordingBus::default();
        let mut feed = FeedPublisher::new(market(), &bus, false);
        for _ in 0..3 {
            let report = feed.on_tick();
            assert!(report.snapshot_published);
            assert_eq!(report.orders_published, 0);
        }

        let frames = bus.frames.borrow();
        assert_eq!(frames.len(), 3);
        for (i, (topic, frame)) in frames.iter().enumerate() {
            assert_eq!(topic, SNAPSHOT_TOPIC);
            let snap = decode_snapshot(frame).unwrap();
            assert_eq!(snap.timestamp, i as u64 + 1);
            assert_eq!(snap.bids.len(), 20);
        }
    }

    #[test]
    fn test_order_batches_carry_consecutive_sequences() {
        let bus = RecordingBus::default();
        let mut feed = FeedPublisher::new(market(), &bus, true);
        assert!(feed.publishes_orders());
        for _ in 0..5 {
            let report = feed.on_tick();
            assert!((2..=6).contains(&report.orders_published));
        }

        let frames = bus.frames.borrow();
        let sequences: Vec<u64> = frames
            .iter()
            .filter(|(topic, _)| topic == ORDERS_TOPIC)
            .map(|(_, frame)| decode_order_batch(frame).unwrap().sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);

        // Each batch follows the snapshot of the same tick.
        for pair in frames.chunks(2) {
            let snap = decode_snapshot(&pair[0].1).unwrap();
            let batch = decode_order_batch(&pair[1].1).unwrap();
            assert!(batch.orders.iter().all(|o| o.tick == snap.timestamp));
        }
    }

    #[test]
    fn test_failed_snapshot_skips_orders() {
        let bus = RecordingBus {
            fail_topic: Some(SNAPSHOT_TOPIC),
            ..RecordingBus::default()
        };
        let mut feed = FeedPublisher::new(market(), &bus, true);
        let report = feed.on_tick();
        assert_eq!(report.tick, 1);
        assert!(!report.snapshot_published);
        assert_eq!(report.orders_published, 0);
        assert!(bus.frames.borrow().is_empty());

        // The feed keeps advancing.
        assert_eq!(feed.on_tick().tick, 2);
    }

    #[test]
    fn test_failed_orders_publish_is_isolated() {
        let bus = RecordingBus {
            fail_topic: Some(ORDERS_TOPIC),
            ..RecordingBus::default()
        };
        let mut feed = FeedPublisher::new(market(), &bus, true);
        let report = feed.on_tick();
        assert!(report.snapshot_published);
        assert_eq!(report.orders_published, 0);
        assert_eq!(bus.frames.borrow().len(), 1);
    }
}
