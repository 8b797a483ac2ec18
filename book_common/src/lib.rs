//!
//! Common types and utilities shared by the book feeder and the book relay.
//!
//! This crate aggregates:
//! - `error` — unified error type `FeedError` used across the workspace.
//! - `result` — handy `Result<T, FeedError>` alias.
//! - `model` — price levels, snapshots, order events and their wire enumerations.
//! - `wire` — the bit-exact binary codec both processes agree on.
//! - `bus` — publish/subscribe abstraction with UDP and in-memory transports.
//! - `config` — command-line/environment parsing helpers.
//! - `net` — topics, default addresses and other networking constants.
#![warn(missing_docs)]
pub mod bus;
pub mod config;
pub mod error;
pub mod model;
pub mod net;
pub mod result;
pub mod wire;

pub use error::FeedError;
pub use result::Result;
