//! Book Feeder: synthetic order book publisher.
//!
//! This binary drives a `MarketGenerator` from a fixed-rate ticker and publishes every
//! snapshot, encoded with the shared wire format, to the `orderbook.snapshots` bus topic.
//! When order publishing is enabled it also publishes a small batch of synthetic order
//! events per tick to `orderbook.tbt`.
//!
//! Building blocks:
//! - `MarketGenerator` — stateful, seeded book generator (see `generator`).
//! - `FeedPublisher` — tick → encode → publish, owning the batch sequence counter.
//! - `UdpPublisher` — fire-and-forget datagram transport to the bus endpoint.
//!
//! Concurrency and shutdown:
//! - The generator has a single owner: the main loop below.
//! - Crossbeam `select!` multiplexes the ticker with the Ctrl+C shutdown signal.
//! - Publish errors are logged per frame; the loop keeps ticking.
//!
//! Usage example:
//! ```bash
//! BUS_ADDR=127.0.0.1:4222 PUBLISH_ORDERS=yes book_feeder --rate 10
//! ```
#![warn(missing_docs)]
mod args;
mod generator;
mod publisher;

use crate::args::Args;
use crate::generator::MarketGenerator;
use crate::publisher::FeedPublisher;
use book_common::FeedError;
use book_common::Result;
use book_common::bus::UdpPublisher;
use book_common::net::{ORDERS_TOPIC, SNAPSHOT_TOPIC};
use clap::Parser;
use crossbeam_channel::{bounded, select, tick};
use log::{error, info};
use std::time::Duration;

fn main() -> Result<(), FeedError> {
    init_logger();
    let args = Args::parse();

    let generator = MarketGenerator::new(args.generator_config())?;
    info!(
        "Generator ready: base price {}, tick size {}, depth {}",
        generator.config().base_price,
        generator.tick_size(),
        generator.config().depth
    );

    let bus = UdpPublisher::connect(&args.bus_addr).inspect_err(|e| {
        error!("Cannot reach bus at {}: {}", args.bus_addr, e);
    })?;
    let mut feed = FeedPublisher::new(generator, bus, args.publish_orders);

    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Stopping feeder...");
        let _ = shutdown_tx.try_send(());
    })
    .map_err(|e| FeedError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;

    if feed.publishes_orders() {
        info!(
            "Publishing snapshots at {}/sec to {} + {}",
            args.rate, SNAPSHOT_TOPIC, ORDERS_TOPIC
        );
    } else {
        info!("Publishing snapshots at {}/sec to {}", args.rate, SNAPSHOT_TOPIC);
    }

    let ticker = tick(Duration::from_secs(1) / args.rate);
    let mut published = 0u64;
    let mut orders = 0usize;
    let mut last_tick = 0u64;
    loop {
        select! {
            recv(ticker) -> _ => {
                let report = feed.on_tick();
                last_tick = report.tick;
                if report.snapshot_published {
                    published += 1;
                }
                orders += report.orders_published;
            },
            recv(shutdown_rx) -> _ => break,
        }
    }

    info!(
        "Feeder stopped after {} ticks ({} snapshots, {} orders published)",
        last_tick, published, orders
    );
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
