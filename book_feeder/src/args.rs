//! Command-line arguments for the Book Feeder.
//!
//! Every option can also be supplied through the environment variable named in its help.
use book_common::config::flag_default_off;
use book_common::net::DEFAULT_BUS_ADDR;
use clap::Parser;

use crate::generator::GeneratorConfig;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Bus endpoint the frames are published to.
    #[arg(long, env = "BUS_ADDR", default_value = DEFAULT_BUS_ADDR)]
    pub bus_addr: String,

    /// Also publish synthetic order batches (accepts 1/0, true/false, yes/no, on/off).
    #[arg(
        long,
        env = "PUBLISH_ORDERS",
        default_value = "false",
        action = clap::ArgAction::Set,
        value_parser = flag_default_off
    )]
    pub publish_orders: bool,

    /// Snapshots per second.
    #[arg(long, env = "TICK_RATE", default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub rate: u32,

    /// Instrument id stamped on every frame.
    #[arg(long, default_value_t = 1)]
    pub instrument_id: i64,

    /// Centre of the mid-price oscillation.
    #[arg(long, default_value_t = 100.0)]
    pub base_price: f64,

    /// Oscillation amplitude in price units.
    #[arg(long, default_value_t = 0.15)]
    pub amplitude: f64,

    /// Oscillation frequency in cycles per tick.
    #[arg(long, default_value_t = 0.0003)]
    pub frequency: f64,

    /// Drift noise scale.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// Levels per side.
    #[arg(long, default_value_t = 20)]
    pub depth: usize,

    /// Quoted spread in basis points.
    #[arg(long, default_value_t = 5.0)]
    pub spread_bps: f64,

    /// Random seed of the generator.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl Args {
    /// Generator parameters from the command line.
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            instrument_id: self.instrument_id,
            base_price: self.base_price,
            amplitude: self.amplitude,
            frequency: self.frequency,
            noise: self.noise,
            depth: self.depth,
            spread_bps: self.spread_bps,
            seed: self.seed,
        }
    }
}
