//! Wire-level primitives for the farmd control socket.
//!
//! This crate intentionally exposes a small surface:
//! - the JSON text-frame envelope and its codec
//! - service identifiers and the client identity
//! - typed builders for the daemon command vocabulary

pub mod commands;
pub mod envelope;
pub mod error;
pub mod service;
pub mod wallet;

pub use envelope::{Envelope, Request, new_request_id};
pub use error::{Result, WireError};
pub use service::{DAEMON, ORIGIN, PLOT_QUEUE, Service};
pub use wallet::{WalletSummary, WalletType};
