//! Book Relay: bus to browser streaming server.
//!
//! This binary subscribes to the two book topics on the bus, decodes every binary frame
//! with the shared wire format, re-encodes it as JSON and pushes it to every connected
//! WebSocket client. It wires together:
//!
//! - `UdpSubscriber` — binds the bus endpoint and runs one worker per topic, so the
//!   snapshot and order paths broadcast independently.
//! - `Relay` — decode → JSON → `Hub::broadcast`, once per frame regardless of client count.
//! - `Hub` — concurrency-safe client registry; a client whose send fails is dropped
//!   without affecting the others.
//! - `StreamServer` — upgrades `/ws` requests and serves the frontend bundle for
//!   everything else.
//!
//! Failing to bind the bus endpoint or the HTTP port is fatal; everything after that is
//! isolated to the frame or client that failed.
#![warn(missing_docs)]
mod args;
mod assets;
mod hub;
mod relay;
mod server;

use crate::args::Args;
use crate::assets::StaticAssets;
use crate::hub::Hub;
use crate::relay::Relay;
use crate::server::StreamServer;
use book_common::FeedError;
use book_common::Result;
use book_common::bus::UdpSubscriber;
use book_common::net::addr;
use clap::Parser;
use log::error;
use std::sync::Arc;

fn main() -> Result<(), FeedError> {
    init_logger();
    let args = Args::parse();

    let hub = Arc::new(Hub::new());
    let relay = Arc::new(Relay::new(Arc::clone(&hub)));

    let mut bus = UdpSubscriber::bind(&args.bus_addr).inspect_err(|e| {
        error!("Cannot bind bus endpoint {}: {}", args.bus_addr, e);
    })?;
    relay.attach(&mut bus)?;
    bus.start()?;

    let server = StreamServer::bind(
        &addr("0.0.0.0", args.port),
        hub,
        StaticAssets::new(&args.dist_dir),
    )?;
    server.serve()
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
