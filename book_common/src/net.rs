//! Shared networking constants used by feeder and relay.

/// Bus topic carrying encoded book snapshot frames.
pub const SNAPSHOT_TOPIC: &str = "orderbook.snapshots";
/// Bus topic carrying encoded order batch ("tick-by-tick") frames.
pub const ORDERS_TOPIC: &str = "orderbook.tbt";

/// Default bus endpoint: the relay binds it, the feeder publishes to it.
pub const DEFAULT_BUS_ADDR: &str = "127.0.0.1:4222";
/// Default HTTP port of the relay's streaming endpoint.
pub const DEFAULT_HTTP_PORT: u16 = 8080;
/// Upgrade path for streaming clients.
pub const WS_PATH: &str = "/ws";
/// Default directory of the static frontend bundle.
pub const DEFAULT_DIST_DIR: &str = "../frontend/dist";

/// Largest payload that fits one UDP datagram together with its topic prefix.
pub const MAX_DATAGRAM: usize = 65_507;

/// Helper to format an address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}
