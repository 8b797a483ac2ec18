//! Synthetic order book generator.
//!
//! The `MarketGenerator` produces one self-consistent depth-N ladder per call. The mid
//! price follows a slow sine oscillation plus a small uniform drift, the best bid/ask are
//! rounded to the instrument tick size, and level quantities are smoothed against the
//! previous ladder so consecutive snapshots read like a live book rather than noise.
//!
//! Design notes:
//! - The random stream is seeded once at construction, so two generators with the same
//!   configuration produce identical output for the same call sequence.
//! - The generator is single-owner state: it is driven by one tick loop and never shared.
//! - Order events are cosmetic trade flow keyed to the book just produced; no matching or
//!   book accounting is performed.

use book_common::model::{BookSnapshot, OrderAction, OrderEvent, OrderType, PriceLevel, Side};
use book_common::{FeedError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Smallest quantity a generated level may carry.
pub const MIN_LEVEL_QTY: i32 = 100;
/// Weight of the previous quantity when a level survives between ticks.
const CARRY_WEIGHT: f64 = 0.8;
/// Weight of the fresh draw for a surviving level.
const FRESH_WEIGHT: f64 = 0.2;

/// Generator parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Instrument id stamped on snapshots and order events.
    pub instrument_id: i64,
    /// Centre of the mid-price oscillation.
    pub base_price: f64,
    /// Oscillation amplitude in price units.
    pub amplitude: f64,
    /// Oscillation frequency in cycles per tick.
    pub frequency: f64,
    /// Noise scale; the per-tick drift is uniform in `±noise * 0.1`.
    pub noise: f64,
    /// Levels per side.
    pub depth: usize,
    /// Quoted spread in basis points of the mid price.
    pub spread_bps: f64,
    /// Seed of the random stream.
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            instrument_id: 1,
            base_price: 100.0,
            amplitude: 0.15,
            frequency: 0.0003,
            noise: 0.02,
            depth: 20,
            spread_bps: 5.0,
            seed: 42,
        }
    }
}

/// Stateful book generator.
pub struct MarketGenerator {
    config: GeneratorConfig,
    tick_size: f64,
    tick: u64,
    prev_bids: Vec<PriceLevel>,
    prev_asks: Vec<PriceLevel>,
    rng: StdRng,
}

/// Round to the nearest cent.
fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round `price` to the nearest multiple of `tick_size`.
fn round_to_tick(price: f64, tick_size: f64) -> f64 {
    (price / tick_size).round() * tick_size
}

impl MarketGenerator {
    /// Validate `config` and create a generator at tick 0.
    ///
    /// The tick size is one basis point of the base price rounded to the cent; a base
    /// price too small to yield a non-zero tick is rejected.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let tick_size = round_cents(config.base_price * 0.0001);
        if !tick_size.is_finite() || tick_size <= 0.0 {
            return Err(FeedError::InvalidConfig(format!(
                "base price {} yields a zero tick size",
                config.base_price
            )));
        }
        if config.depth > u16::MAX as usize {
            return Err(FeedError::InvalidConfig(format!(
                "depth {} exceeds the wire limit of {} levels",
                config.depth,
                u16::MAX
            )));
        }
        if !(config.spread_bps >= 0.0) || !(config.noise >= 0.0) {
            return Err(FeedError::InvalidConfig(
                "spread and noise must be non-negative".to_string(),
            ));
        }

        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            tick_size,
            tick: 0,
            prev_bids: Vec::new(),
            prev_asks: Vec::new(),
            rng,
        })
    }

    /// Price increment of the instrument.
    pub fn tick_size(&self) -> f64 {
        self.tick_size
    }

    /// Active configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Advance one tick and produce the next snapshot.
    pub fn generate_snapshot(&mut self) -> BookSnapshot {
        self.tick += 1;
        let cfg = &self.config;

        let oscillation = cfg.amplitude * (2.0 * PI * cfg.frequency * self.tick as f64).sin();
        let drift = (self.rng.random::<f64>() * 2.0 - 1.0) * cfg.noise * 0.1;
        let mid_price = cfg.base_price + oscillation + drift;

        let half_spread = mid_price * cfg.spread_bps / 10_000.0 / 2.0;
        let best_bid = round_to_tick(mid_price - half_spread, self.tick_size);
        let mut best_ask = round_to_tick(mid_price + half_spread, self.tick_size);
        if best_ask <= best_bid {
            best_ask = best_bid + self.tick_size;
        }

        let bids = self.build_ladder(best_bid, -self.tick_size, Side::Buy);
        let asks = self.build_ladder(best_ask, self.tick_size, Side::Sell);

        self.prev_bids = bids.clone();
        self.prev_asks = asks.clone();

        BookSnapshot {
            instrument_id: self.config.instrument_id,
            timestamp: self.tick,
            bids,
            asks,
        }
    }

    /// Build one side of the book stepping `step` away from `best`.
    fn build_ladder(&mut self, best: f64, step: f64, side: Side) -> Vec<PriceLevel> {
        let depth = self.config.depth;
        let half_tick = self.tick_size * 0.5;
        let mut ladder = Vec::with_capacity(depth);

        for i in 0..depth {
            let price = best + i as f64 * step;
            let fresh = self.rng.random_range(500..5000);
            let previous = match side {
                Side::Buy => &self.prev_bids,
                _ => &self.prev_asks,
            };
            let mut quantity = previous
                .iter()
                .find(|level| (level.price - price).abs() < half_tick)
                .map(|level| {
                    (level.quantity as f64 * CARRY_WEIGHT + fresh as f64 * FRESH_WEIGHT)
                        as i32
                })
                .unwrap_or(fresh);
            if quantity < MIN_LEVEL_QTY {
                quantity = MIN_LEVEL_QTY;
            }
            ladder.push(PriceLevel::new(round_cents(price), quantity));
        }
        ladder
    }

    /// Synthesize 2 to 6 order events against `snapshot`.
    ///
    /// Each event picks a side uniformly and a random level on it; actions are 50% add,
    /// 30% modify, 20% remove; types are 90% limit, 10% market.
    pub fn generate_order_events(&mut self, snapshot: &BookSnapshot) -> Vec<OrderEvent> {
        let count = 2 + self.rng.random_range(0..5);
        let mut orders = Vec::with_capacity(count);

        for _ in 0..count {
            let side = if self.rng.random_range(0..2) == 0 {
                Side::Buy
            } else {
                Side::Sell
            };
            let ladder = snapshot.ladder(side);
            if ladder.is_empty() {
                continue;
            }

            let level = ladder[self.rng.random_range(0..ladder.len())];
            let action_roll = self.rng.random::<f64>();
            let action = if action_roll < 0.5 {
                OrderAction::Add
            } else if action_roll < 0.8 {
                OrderAction::Modify
            } else {
                OrderAction::Remove
            };
            let order_type = if self.rng.random::<f64>() < 0.1 {
                OrderType::Market
            } else {
                OrderType::Limit
            };

            orders.push(OrderEvent {
                instrument_id: self.config.instrument_id,
                price: level.price,
                tick: self.tick,
                quantity: 50 + self.rng.random_range(0..2000),
                side,
                order_type,
                action,
            });
        }
        orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use book_common::wire::encode_book;

    fn generator(depth: usize) -> MarketGenerator {
        MarketGenerator::new(GeneratorConfig {
            depth,
            ..GeneratorConfig::default()
        })
        .unwrap()
    }

    fn is_tick_multiple(price: f64, tick_size: f64) -> bool {
        let steps = (price / tick_size).round();
        (steps * tick_size - price).abs() < 1e-6
    }

    #[test]
    fn test_tick_size_from_base_price() {
        assert_eq!(generator(5).tick_size(), 0.01);
        let big = MarketGenerator::new(GeneratorConfig {
            base_price: 25_000.0,
            ..GeneratorConfig::default()
        })
        .unwrap();
        assert_eq!(big.tick_size(), 2.5);
    }

    #[test]
    fn test_rejects_zero_tick_size() {
        let result = MarketGenerator::new(GeneratorConfig {
            base_price: 10.0,
            ..GeneratorConfig::default()
        });
        assert!(matches!(result, Err(FeedError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_depth_beyond_wire_limit() {
        let result = MarketGenerator::new(GeneratorConfig {
            depth: 70_000,
            ..GeneratorConfig::default()
        });
        assert!(matches!(result, Err(FeedError::InvalidConfig(_))));
    }

    #[test]
    fn test_tick_counter_advances() {
        let mut market = generator(3);
        let first = market.generate_snapshot();
        let second = market.generate_snapshot();
        assert_eq!(first.timestamp, 1);
        assert_eq!(second.timestamp, 2);
        assert_eq!(second.instrument_id, 1);
    }

    #[test]
    fn test_book_never_crossed_or_locked() {
        for spread_bps in [0.0, 0.5, 5.0, 50.0] {
            let mut market = MarketGenerator::new(GeneratorConfig {
                spread_bps,
                ..GeneratorConfig::default()
            })
            .unwrap();
            for _ in 0..2_000 {
                let snap = market.generate_snapshot();
                let (bid, ask) = (snap.best_bid().unwrap(), snap.best_ask().unwrap());
                assert!(ask.price > bid.price, "spread {spread_bps}");
            }
        }
    }

    #[test]
    fn test_levels_on_tick_grid_with_quantity_floor() {
        for base_price in [100.0, 2_345.67, 25_000.0] {
            let mut market = MarketGenerator::new(GeneratorConfig {
                base_price,
                amplitude: base_price * 0.01,
                ..GeneratorConfig::default()
            })
            .unwrap();
            let tick_size = market.tick_size();
            for _ in 0..500 {
                let snap = market.generate_snapshot();
                for level in snap.bids.iter().chain(&snap.asks) {
                    assert!(is_tick_multiple(level.price, tick_size), "{} / {}", level.price, tick_size);
                    assert!(level.quantity >= MIN_LEVEL_QTY);
                }
            }
        }
    }

    #[test]
    fn test_ladders_are_ordered() {
        let mut market = generator(20);
        for _ in 0..200 {
            let snap = market.generate_snapshot();
            assert!(snap.bids.windows(2).all(|w| w[0].price > w[1].price));
            assert!(snap.asks.windows(2).all(|w| w[0].price < w[1].price));
        }
    }

    #[test]
    fn test_depth_is_exact() {
        for depth in [0, 1, 2, 7, 20, 64] {
            let mut market = generator(depth);
            for _ in 0..10 {
                let snap = market.generate_snapshot();
                assert_eq!(snap.bids.len(), depth);
                assert_eq!(snap.asks.len(), depth);
            }
        }
    }

    #[test]
    fn test_quantities_are_smoothed() {
        // No drift and no oscillation: the ladder prices repeat every tick.
        let mut market = MarketGenerator::new(GeneratorConfig {
            amplitude: 0.0,
            noise: 0.0,
            ..GeneratorConfig::default()
        })
        .unwrap();
        let first = market.generate_snapshot();
        let second = market.generate_snapshot();
        assert_eq!(first.bids[0].price, second.bids[0].price);
        for (prev, next) in first.bids.iter().zip(&second.bids) {
            // 0.8 * prev + 0.2 * fresh with fresh in [500, 5000).
            let low = (prev.quantity as f64 * 0.8 + 100.0) as i32 - 1;
            let high = (prev.quantity as f64 * 0.8 + 1000.0) as i32;
            assert!(next.quantity >= low && next.quantity <= high);
        }
    }

    #[test]
    fn test_identical_generators_produce_identical_frames() {
        let mut a = generator(20);
        let mut b = generator(20);
        for _ in 0..300 {
            let snap_a = a.generate_snapshot();
            let snap_b = b.generate_snapshot();
            assert_eq!(encode_book(&snap_a), encode_book(&snap_b));
            assert_eq!(a.generate_order_events(&snap_a), b.generate_order_events(&snap_b));
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = generator(10);
        let mut b = MarketGenerator::new(GeneratorConfig {
            depth: 10,
            seed: 7,
            ..GeneratorConfig::default()
        })
        .unwrap();
        let frames_a: Vec<_> = (0..20).map(|_| encode_book(&a.generate_snapshot())).collect();
        let frames_b: Vec<_> = (0..20).map(|_| encode_book(&b.generate_snapshot())).collect();
        assert_ne!(frames_a, frames_b);
    }

    #[test]
    fn test_order_events_follow_book() {
        let mut market = generator(20);
        for _ in 0..500 {
            let snap = market.generate_snapshot();
            let orders = market.generate_order_events(&snap);
            assert!((2..=6).contains(&orders.len()));
            for order in &orders {
                assert_eq!(order.tick, snap.timestamp);
                assert!((50..2050).contains(&order.quantity));
                assert!(matches!(order.order_type, OrderType::Limit | OrderType::Market));
                assert!(matches!(
                    order.action,
                    OrderAction::Add | OrderAction::Modify | OrderAction::Remove
                ));
                assert!(snap.ladder(order.side).iter().any(|l| l.price == order.price));
            }
        }
    }

    #[test]
    fn test_order_events_on_empty_book() {
        let mut market = generator(0);
        let snap = market.generate_snapshot();
        assert!(market.generate_order_events(&snap).is_empty());
    }
}
