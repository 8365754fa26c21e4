//! The multi-auction registry.
//!
//! Owns every live auction, keyed by a generated join code. The registry map
//! sits behind a read-write lock and each auction behind its own mutex, so
//! all mutation of one auction is serialized while distinct auctions proceed
//! in parallel. Lock order is always map first, then auction; no lock is
//! held across a call that could block.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use gavel_types::{AuctionSnapshot, AuctionStatus, Item, ParticipantId};

use crate::auction::{Auction, Settlement};
use crate::config::{ConfigError, EngineConfig};
use crate::error::AuctionError;

const CODE_LEN: usize = 5;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// One lot closed by the tick, with everything the gateway needs to fan out.
#[derive(Debug, Clone)]
pub struct LotClosed {
    pub code: String,
    pub result: Settlement,
    /// The next lot and its deadline, when one was drawn.
    pub opened: Option<(Item, u64)>,
    /// The settlement emptied the queue: the auction just reached `Over`.
    pub finished: bool,
    pub recipients: Vec<ParticipantId>,
    pub snapshot: AuctionSnapshot,
}

/// Registry of all live auctions.
pub struct Registry {
    auctions: RwLock<HashMap<String, Arc<Mutex<Auction>>>>,
    config: EngineConfig,
}

impl Registry {
    /// Create an empty registry with a validated configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            auctions: RwLock::new(HashMap::new()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.auctions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.auctions.read().is_empty()
    }

    /// Create a new auction with the issuer as host and a freshly shuffled
    /// copy of the catalog as draw queue.
    pub fn create(&self, host_id: &str, host_name: &str, host_purse: u64) -> AuctionSnapshot {
        let mut rng = rand::thread_rng();
        let mut queue: Vec<Item> = self.config.catalog.clone();
        queue.shuffle(&mut rng);

        let mut auctions = self.auctions.write();
        let code = loop {
            let candidate = generate_code(&mut rng);
            if !auctions.contains_key(&candidate) {
                break candidate;
            }
            debug!(code = %candidate, "Join code collision, regenerating");
        };

        let auction = Auction::new(
            code.clone(),
            host_id,
            host_name,
            host_purse,
            VecDeque::from(queue),
            self.config.bid_window_ms,
        );
        let snapshot = auction.snapshot();
        auctions.insert(code.clone(), Arc::new(Mutex::new(auction)));
        info!(code = %code, host = %host_id, "Auction created");
        snapshot
    }

    /// Look up a live auction by code.
    pub fn get(&self, code: &str) -> Option<Arc<Mutex<Auction>>> {
        self.auctions.read().get(code).cloned()
    }

    /// Join an auction. Rejoining under a known id returns the existing
    /// participant unchanged.
    pub fn join(
        &self,
        code: &str,
        participant_id: &str,
        name: &str,
        purse: u64,
    ) -> Result<AuctionSnapshot, AuctionError> {
        let auction = self
            .get(code)
            .ok_or_else(|| AuctionError::NotFound(code.to_string()))?;
        let mut auction = auction.lock();
        if auction.status() == AuctionStatus::Over {
            return Err(AuctionError::AlreadyOver);
        }
        auction.add_participant(participant_id, name, purse);
        Ok(auction.snapshot())
    }

    /// Remove a participant from every auction they belong to. Returns the
    /// post-removal snapshot and remaining recipients of each affected
    /// auction.
    pub fn leave_everywhere(
        &self,
        participant_id: &str,
    ) -> Vec<(Vec<ParticipantId>, AuctionSnapshot)> {
        let auctions: Vec<Arc<Mutex<Auction>>> =
            self.auctions.read().values().cloned().collect();

        let mut affected = Vec::new();
        for auction in auctions {
            let mut auction = auction.lock();
            if auction.remove_participant(participant_id) {
                affected.push((auction.participant_ids(), auction.snapshot()));
            }
        }
        affected
    }

    /// Settle every expired lot and garbage-collect finished auctions with
    /// no participants left.
    pub fn tick(&self, now: u64) -> Vec<LotClosed> {
        let mut closed = Vec::new();
        let mut auctions = self.auctions.write();
        auctions.retain(|code, auction| {
            let mut auction = auction.lock();
            if let Some(result) = auction.settle_if_expired(now) {
                closed.push(LotClosed {
                    code: code.clone(),
                    result,
                    opened: auction
                        .current_item()
                        .cloned()
                        .zip(auction.deadline()),
                    finished: auction.status() == AuctionStatus::Over,
                    recipients: auction.participant_ids(),
                    snapshot: auction.snapshot(),
                });
            }
            let abandoned = auction.status() == AuctionStatus::Over && auction.is_empty();
            if abandoned {
                debug!(code = %code, "Collecting finished empty auction");
            }
            !abandoned
        });
        closed
    }

    /// Record the oracle's verdict for a finished auction.
    ///
    /// Returns the recipients to notify and the winner id now on record, or
    /// `None` when the auction is gone or a winner was already recorded (in
    /// which case nothing may be announced again).
    pub fn assign_winner(
        &self,
        code: &str,
        winner_id: Option<ParticipantId>,
    ) -> Option<(Vec<ParticipantId>, Option<ParticipantId>)> {
        let auction = self.get(code)?;
        let mut auction = auction.lock();
        if auction.winner_id().is_some() {
            return None;
        }
        if let Some(id) = winner_id {
            if !auction.assign_winner(id) {
                return None;
            }
        }
        Some((
            auction.participant_ids(),
            auction.winner_id().map(str::to_string),
        ))
    }
}

/// Generate a join-code candidate. Uniqueness against live codes is the
/// caller's job.
fn generate_code(rng: &mut impl Rng) -> String {
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_CHARSET.len());
            CODE_CHARSET[idx] as char
        })
        .collect()
}
