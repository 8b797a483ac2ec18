//! In-memory book and order representation shared by producer and consumer.
//!
//! The enumerations mirror the integer codes used on the wire. Codes that this build does
//! not know decode into an explicit `Unknown(code)` arm, so a newer producer never breaks
//! an older consumer and the raw code survives a decode/encode round trip.

use strum_macros::Display;

/// One rung of a ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceLevel {
    /// Price, a multiple of the instrument tick size.
    pub price: f64,
    /// Resting quantity at this price.
    pub quantity: i32,
}

impl PriceLevel {
    /// Create a new level.
    pub fn new(price: f64, quantity: i32) -> Self {
        Self { price, quantity }
    }
}

/// Full depth-N ladder for one instrument at one generator tick.
#[derive(Debug, Clone, PartialEq)]
pub struct BookSnapshot {
    /// Instrument identifier.
    pub instrument_id: i64,
    /// Generator tick counter at which the snapshot was produced.
    pub timestamp: u64,
    /// Bids, best (highest) first.
    pub bids: Vec<PriceLevel>,
    /// Asks, best (lowest) first.
    pub asks: Vec<PriceLevel>,
}

impl BookSnapshot {
    /// Best bid, if the ladder is not empty.
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Best ask, if the ladder is not empty.
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Ladder for the given side.
    pub fn ladder(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
            Side::Unknown(_) => &[],
        }
    }
}

/// Order side.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Side {
    #[strum(to_string = "BUY")]
    Buy,
    #[strum(to_string = "SELL")]
    Sell,
    #[strum(to_string = "UNKNOWN")]
    Unknown(i32),
}

impl Side {
    /// Map a wire code to a side.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Side::Buy,
            2 => Side::Sell,
            other => Side::Unknown(other),
        }
    }

    /// Wire code of this side.
    pub fn code(self) -> i32 {
        match self {
            Side::Buy => 1,
            Side::Sell => 2,
            Side::Unknown(code) => code,
        }
    }
}

/// Order type.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum OrderType {
    #[strum(to_string = "LIMIT")]
    Limit,
    #[strum(to_string = "MARKET")]
    Market,
    #[strum(to_string = "ICEBERG")]
    Iceberg,
    #[strum(to_string = "STOP")]
    Stop,
    #[strum(to_string = "UNKNOWN")]
    Unknown(i32),
}

impl OrderType {
    /// Map a wire code to an order type.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => OrderType::Limit,
            2 => OrderType::Market,
            3 => OrderType::Iceberg,
            4 => OrderType::Stop,
            other => OrderType::Unknown(other),
        }
    }

    /// Wire code of this order type.
    pub fn code(self) -> i32 {
        match self {
            OrderType::Limit => 1,
            OrderType::Market => 2,
            OrderType::Iceberg => 3,
            OrderType::Stop => 4,
            OrderType::Unknown(code) => code,
        }
    }
}

/// What happened to the order.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum OrderAction {
    #[strum(to_string = "SEEKER_ADD")]
    SeekerAdd,
    #[strum(to_string = "ADD")]
    Add,
    #[strum(to_string = "REMOVE")]
    Remove,
    #[strum(to_string = "MODIFY")]
    Modify,
    #[strum(to_string = "UNKNOWN")]
    Unknown(i32),
}

impl OrderAction {
    /// Map a wire code to an action.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => OrderAction::SeekerAdd,
            1 => OrderAction::Add,
            2 => OrderAction::Remove,
            3 => OrderAction::Modify,
            other => OrderAction::Unknown(other),
        }
    }

    /// Wire code of this action.
    pub fn code(self) -> i32 {
        match self {
            OrderAction::SeekerAdd => 0,
            OrderAction::Add => 1,
            OrderAction::Remove => 2,
            OrderAction::Modify => 3,
            OrderAction::Unknown(code) => code,
        }
    }
}

/// A single synthetic order event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderEvent {
    /// Instrument identifier.
    pub instrument_id: i64,
    /// Price of the level the event refers to.
    pub price: f64,
    /// Generator tick that produced the event.
    pub tick: u64,
    /// Event quantity.
    pub quantity: i32,
    /// Book side the event hits.
    pub side: Side,
    /// Order type.
    pub order_type: OrderType,
    /// Add/modify/remove.
    pub action: OrderAction,
}

/// A decoded order batch frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBatch {
    /// Instrument id from the header (first order's id truncated to 32 bits, 0 if empty).
    pub instrument_id: u32,
    /// Encoder-assigned sequence number.
    pub sequence: u64,
    /// Events in publish order.
    pub orders: Vec<OrderEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(Side::Buy.to_string(), "BUY");
        assert_eq!(Side::Sell.to_string(), "SELL");
        assert_eq!(OrderType::Iceberg.to_string(), "ICEBERG");
        assert_eq!(OrderAction::SeekerAdd.to_string(), "SEEKER_ADD");
        assert_eq!(OrderAction::Modify.to_string(), "MODIFY");
    }

    #[test]
    fn test_unknown_codes_keep_raw_value() {
        let side = Side::from_code(9);
        assert_eq!(side, Side::Unknown(9));
        assert_eq!(side.code(), 9);
        assert_eq!(side.to_string(), "UNKNOWN");

        assert_eq!(OrderType::from_code(0), OrderType::Unknown(0));
        assert_eq!(OrderAction::from_code(-1).to_string(), "UNKNOWN");
    }

    #[test]
    fn test_known_codes_round_trip() {
        for code in 1..=2 {
            assert_eq!(Side::from_code(code).code(), code);
        }
        for code in 1..=4 {
            assert_eq!(OrderType::from_code(code).code(), code);
        }
        for code in 0..=3 {
            assert_eq!(OrderAction::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_ladder_by_side() {
        let snap = BookSnapshot {
            instrument_id: 1,
            timestamp: 1,
            bids: vec![PriceLevel::new(99.99, 100)],
            asks: vec![PriceLevel::new(100.01, 200)],
        };
        assert_eq!(snap.ladder(Side::Buy)[0].quantity, 100);
        assert_eq!(snap.ladder(Side::Sell)[0].quantity, 200);
        assert!(snap.ladder(Side::Unknown(7)).is_empty());
        assert_eq!(snap.best_bid().map(|l| l.price), Some(99.99));
        assert_eq!(snap.best_ask().map(|l| l.price), Some(100.01));
    }

    #[test]
    fn test_empty_book_has_no_best_prices() {
        let snap = BookSnapshot {
            instrument_id: 1,
            timestamp: 1,
            bids: Vec::new(),
            asks: Vec::new(),
        };
        assert!(snap.best_bid().is_none());
        assert!(snap.best_ask().is_none());
    }
}
