//! Live auction engine: per-auction state machines and the multi-auction
//! registry that drives them.
//!
//! # Architecture
//!
//! - `auction`: the single-game state machine (lots, bids, sliding deadline,
//!   settlement)
//! - `registry`: owns all live auctions keyed by code, drives the periodic
//!   tick, garbage-collects finished empty games
//! - `dispatch`: turns inbound commands into state changes and broadcastable
//!   events
//! - `participant`: the budget-holder entity
//! - `config`: validated engine configuration
//! - `error`: the command rejection taxonomy
//!
//! The engine is transport free and clock free: every operation takes the
//! current time as a parameter, nothing blocks, and all mutation of one
//! auction is serialized by that auction's own lock. The gateway owns
//! connections and identity; the engine only ever sees participant ids.

pub mod auction;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod participant;
pub mod registry;

pub use auction::{Auction, Settlement};
pub use config::{ConfigError, EngineConfig};
pub use dispatch::{handle_command, tick, Effects, Outbound};
pub use error::AuctionError;
pub use participant::Participant;
pub use registry::Registry;
