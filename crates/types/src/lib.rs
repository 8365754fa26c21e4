//! Core type definitions for the live auction system.
//!
//! This crate provides the shared data structures used across the workspace:
//! catalog items, bids, auction status, the full auction snapshot exchanged
//! with clients and the winner oracle, and the closed command/event wire
//! schema consumed and produced by the gateway.
//!
//! Everything here is plain data. All amounts are in the system's fixed
//! currency unit; all timestamps are milliseconds since the Unix epoch and
//! are always supplied by the caller.

use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod wire;

pub use wire::{Command, Event};

/// Opaque participant identifier, assigned by the gateway.
pub type ParticipantId = String;

// =========================
// CATALOG
// =========================

/// A single catalog entry: an item that can be put up for bidding.
///
/// Immutable once drawn from the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: String,
    pub base_price: u64,
}

impl Item {
    pub fn new(name: impl Into<String>, base_price: u64) -> Self {
        Self {
            name: name.into(),
            base_price,
        }
    }
}

/// An item a participant has won, with the price they paid for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WonItem {
    pub name: String,
    pub base_price: u64,
    pub sold_price: u64,
}

impl WonItem {
    /// Record `item` as won at `sold_price`.
    pub fn from_sale(item: &Item, sold_price: u64) -> Self {
        Self {
            name: item.name.clone(),
            base_price: item.base_price,
            sold_price,
        }
    }
}

// =========================
// BIDDING
// =========================

/// The live bid on the current lot.
///
/// At most one exists per lot; a strictly higher valid bid replaces it
/// entirely.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub bidder: ParticipantId,
    pub amount: u64,
    /// When the bid was placed, milliseconds since the Unix epoch.
    pub at: u64,
}

// =========================
// AUCTION LIFECYCLE
// =========================

/// Auction lifecycle status. Transitions are monotonic:
/// `Created` → `Running` → `Over`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuctionStatus {
    /// Accepting participants, bidding not yet started.
    Created,
    /// Lots cycling.
    Running,
    /// Draw queue exhausted; no further mutation except winner assignment.
    Over,
}

// =========================
// SNAPSHOTS
// =========================

/// A participant's externally visible state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSnapshot {
    pub id: ParticipantId,
    pub name: String,
    pub purse: u64,
    pub won: Vec<WonItem>,
}

/// The full read-only snapshot of one auction, as broadcast to clients and
/// handed to the winner oracle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSnapshot {
    pub code: String,
    pub host_id: ParticipantId,
    pub status: AuctionStatus,
    pub winner_id: Option<ParticipantId>,
    pub current_item: Option<Item>,
    pub current_bid: Option<Bid>,
    /// When the current lot closes, if a lot is open.
    pub deadline: Option<u64>,
    /// Participants in join order.
    pub participants: Vec<ParticipantSnapshot>,
    /// Items left in the draw queue.
    pub remaining: usize,
}
