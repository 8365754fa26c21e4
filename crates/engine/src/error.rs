//! Command rejection taxonomy.
//!
//! Every variant is recoverable and local to the single command that caused
//! it: a rejected command is reported to the issuer and leaves the auction's
//! state untouched.

use thiserror::Error;

/// Why a command was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("Auction not found: {0}")]
    NotFound(String),

    #[error("Auction is already over")]
    AlreadyOver,

    #[error("Auction not running or no lot open")]
    NotRunning,

    #[error("Participant is not part of this auction")]
    UnknownParticipant,

    #[error("Invalid bid amount")]
    InvalidAmount,

    #[error("Bid below base price: minimum {base}, got {got}")]
    BelowBasePrice { base: u64, got: u64 },

    #[error("Bid must be higher than current bid of {current}")]
    BidNotHigher { current: u64 },

    #[error("Insufficient purse: have {purse}, bid {got}")]
    InsufficientFunds { purse: u64, got: u64 },

    #[error("Only the host can do that")]
    Unauthorized,

    #[error("Malformed command: {0}")]
    MalformedCommand(String),
}
