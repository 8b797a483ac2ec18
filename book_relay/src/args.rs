//! Command-line arguments for the Book Relay.
//!
//! Every option can also be supplied through the environment variable named in its help.
use book_common::net::{DEFAULT_BUS_ADDR, DEFAULT_DIST_DIR, DEFAULT_HTTP_PORT};
use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Bus endpoint to bind and receive frames on.
    #[arg(long, env = "BUS_ADDR", default_value = DEFAULT_BUS_ADDR)]
    pub bus_addr: String,

    /// HTTP port for the streaming endpoint and static assets.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// Directory of the built frontend.
    #[arg(long, env = "DIST_DIR", default_value = DEFAULT_DIST_DIR)]
    pub dist_dir: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_values() {
        let args = Args::try_parse_from([
            "book_relay",
            "--bus-addr",
            "10.0.0.5:4222",
            "--port",
            "9000",
            "--dist-dir",
            "/srv/dist",
        ])
        .unwrap();
        assert_eq!(args.bus_addr, "10.0.0.5:4222");
        assert_eq!(args.port, 9000);
        assert_eq!(args.dist_dir, "/srv/dist");
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Args::try_parse_from(["book_relay", "--port", "99999"]).is_err());
    }
}
