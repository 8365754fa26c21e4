//! The single-game state machine.
//!
//! An auction cycles through `Created` → `Running` → `Over`. While running,
//! exactly one lot is open at a time with a sliding deadline: every accepted
//! higher bid restarts the countdown, so a lot only closes once a full quiet
//! period elapses with no new bid. Settlement happens through
//! [`Auction::settle_if_expired`], driven by the registry tick.

use std::collections::{HashMap, VecDeque};

use gavel_types::{AuctionSnapshot, AuctionStatus, Bid, Item, ParticipantId};

use crate::error::AuctionError;
use crate::participant::Participant;

/// Outcome of settling one expired lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub sold: bool,
    pub item: Item,
    pub winner_id: Option<ParticipantId>,
    /// The closing bid's amount, whether or not the lot sold.
    pub price: Option<u64>,
}

/// One live auction.
#[derive(Debug)]
pub struct Auction {
    code: String,
    host_id: ParticipantId,
    status: AuctionStatus,
    participants: HashMap<ParticipantId, Participant>,
    /// Ids in join order, for stable snapshots.
    join_order: Vec<ParticipantId>,
    draw_queue: VecDeque<Item>,
    current_item: Option<Item>,
    current_bid: Option<Bid>,
    deadline: Option<u64>,
    winner_id: Option<ParticipantId>,
    bid_window_ms: u64,
}

impl Auction {
    /// Create an auction in `Created` with the host as first participant and
    /// an already shuffled draw queue.
    pub fn new(
        code: impl Into<String>,
        host_id: impl Into<ParticipantId>,
        host_name: impl Into<String>,
        host_purse: u64,
        draw_queue: VecDeque<Item>,
        bid_window_ms: u64,
    ) -> Self {
        let host_id = host_id.into();
        let mut auction = Self {
            code: code.into(),
            host_id: host_id.clone(),
            status: AuctionStatus::Created,
            participants: HashMap::new(),
            join_order: Vec::new(),
            draw_queue,
            current_item: None,
            current_bid: None,
            deadline: None,
            winner_id: None,
            bid_window_ms,
        };
        auction.add_participant(host_id, host_name, host_purse);
        auction
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn status(&self) -> AuctionStatus {
        self.status
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.current_item.as_ref()
    }

    pub fn current_bid(&self) -> Option<&Bid> {
        self.current_bid.as_ref()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    pub fn winner_id(&self) -> Option<&str> {
        self.winner_id.as_deref()
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.participants.contains_key(participant_id)
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Current participant ids in join order; the recipient set for events
    /// about this auction.
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.join_order.clone()
    }

    /// Add a participant. Idempotent: a known id is returned unchanged.
    pub fn add_participant(
        &mut self,
        id: impl Into<ParticipantId>,
        name: impl Into<String>,
        purse: u64,
    ) -> &Participant {
        let id = id.into();
        if !self.participants.contains_key(&id) {
            self.join_order.push(id.clone());
            self.participants
                .insert(id.clone(), Participant::new(id.clone(), name, purse));
        }
        &self.participants[&id]
    }

    /// Remove a participant. An outstanding bid of theirs is left in place;
    /// if they are still absent when the lot settles, it goes unsold.
    pub fn remove_participant(&mut self, id: &str) -> bool {
        let removed = self.participants.remove(id).is_some();
        if removed {
            self.join_order.retain(|known| known != id);
        }
        removed
    }

    /// Start bidding: `Created` → `Running`, drawing the first lot.
    ///
    /// Only the host may start. Returns `Ok(false)` when the auction is
    /// already past `Created` (a no-op, not an error).
    pub fn start(&mut self, issuer: &str, now: u64) -> Result<bool, AuctionError> {
        if issuer != self.host_id {
            return Err(AuctionError::Unauthorized);
        }
        if self.status != AuctionStatus::Created {
            return Ok(false);
        }
        self.status = AuctionStatus::Running;
        self.advance_lot(now);
        Ok(true)
    }

    /// Place a bid on the current lot.
    ///
    /// On success the live bid is replaced and the deadline slides to
    /// `now + bid_window`. On any rejection nothing changes.
    pub fn place_bid(
        &mut self,
        issuer: &str,
        amount: u64,
        now: u64,
    ) -> Result<(Bid, u64), AuctionError> {
        if self.status != AuctionStatus::Running {
            return Err(AuctionError::NotRunning);
        }
        let Some(item) = self.current_item.as_ref() else {
            return Err(AuctionError::NotRunning);
        };
        let Some(participant) = self.participants.get(issuer) else {
            return Err(AuctionError::UnknownParticipant);
        };
        if amount == 0 {
            return Err(AuctionError::InvalidAmount);
        }
        if amount < item.base_price {
            return Err(AuctionError::BelowBasePrice {
                base: item.base_price,
                got: amount,
            });
        }
        if let Some(current) = &self.current_bid {
            if amount <= current.amount {
                return Err(AuctionError::BidNotHigher {
                    current: current.amount,
                });
            }
        }
        if amount > participant.purse {
            return Err(AuctionError::InsufficientFunds {
                purse: participant.purse,
                got: amount,
            });
        }

        let bid = Bid {
            bidder: issuer.to_string(),
            amount,
            at: now,
        };
        self.current_bid = Some(bid.clone());
        let deadline = now + self.bid_window_ms;
        self.deadline = Some(deadline);
        Ok((bid, deadline))
    }

    /// Settle the current lot if its deadline has passed.
    ///
    /// Returns `None` when there is nothing to settle. A lot is settled
    /// exactly once: advancing clears `current_item` and `deadline` before
    /// any later call could re-trigger settlement. A bid whose bidder has
    /// left the auction settles the lot as unsold.
    pub fn settle_if_expired(&mut self, now: u64) -> Option<Settlement> {
        if self.status != AuctionStatus::Running {
            return None;
        }
        let item = self.current_item.clone()?;
        if self.deadline.is_some_and(|deadline| now < deadline) {
            return None;
        }

        let price = self.current_bid.as_ref().map(|bid| bid.amount);
        let winner_id = self.current_bid.as_ref().and_then(|bid| {
            let winner = self.participants.get_mut(&bid.bidder)?;
            winner.award(&item, bid.amount);
            Some(winner.id.clone())
        });

        let settlement = Settlement {
            sold: winner_id.is_some(),
            item,
            winner_id,
            price,
        };

        self.advance_lot(now);
        Some(settlement)
    }

    /// Record the oracle's verdict. At most one write ever succeeds; a
    /// recorded winner is never changed.
    pub fn assign_winner(&mut self, winner_id: impl Into<ParticipantId>) -> bool {
        if self.status != AuctionStatus::Over || self.winner_id.is_some() {
            return false;
        }
        self.winner_id = Some(winner_id.into());
        true
    }

    /// Pop the next lot off the queue, or finish the auction.
    fn advance_lot(&mut self, now: u64) {
        self.current_bid = None;
        match self.draw_queue.pop_front() {
            Some(item) => {
                self.current_item = Some(item);
                self.deadline = Some(now + self.bid_window_ms);
            }
            None => {
                self.current_item = None;
                self.deadline = None;
                self.status = AuctionStatus::Over;
            }
        }
    }

    pub fn snapshot(&self) -> AuctionSnapshot {
        AuctionSnapshot {
            code: self.code.clone(),
            host_id: self.host_id.clone(),
            status: self.status,
            winner_id: self.winner_id.clone(),
            current_item: self.current_item.clone(),
            current_bid: self.current_bid.clone(),
            deadline: self.deadline,
            participants: self
                .join_order
                .iter()
                .filter_map(|id| self.participants.get(id))
                .map(Participant::snapshot)
                .collect(),
            remaining: self.draw_queue.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: u64 = 30_000;

    fn two_lot_auction() -> Auction {
        let queue = VecDeque::from(vec![Item::new("Virat Kohli", 20), Item::new("KL Rahul", 14)]);
        Auction::new("AB12C", "host", "Asha", 100, queue, WINDOW)
    }

    #[test]
    fn test_start_draws_first_lot_and_sets_deadline() {
        let mut auction = two_lot_auction();
        assert!(auction.start("host", 1_000).unwrap());

        assert_eq!(auction.status(), AuctionStatus::Running);
        assert_eq!(auction.current_item().unwrap().name, "Virat Kohli");
        assert_eq!(auction.deadline(), Some(1_000 + WINDOW));
    }

    #[test]
    fn test_start_rejects_non_host_and_is_noop_when_running() {
        let mut auction = two_lot_auction();
        auction.add_participant("p2", "Ben", 50);

        assert_eq!(
            auction.start("p2", 1_000),
            Err(AuctionError::Unauthorized)
        );
        assert_eq!(auction.status(), AuctionStatus::Created);

        assert!(auction.start("host", 1_000).unwrap());
        assert!(!auction.start("host", 2_000).unwrap());
        // The first lot was not re-drawn.
        assert_eq!(auction.deadline(), Some(1_000 + WINDOW));
    }

    #[test]
    fn test_add_participant_is_idempotent() {
        let mut auction = two_lot_auction();
        auction.add_participant("p2", "Ben", 50);
        let rejoined = auction.add_participant("p2", "Somebody Else", 9_999);

        assert_eq!(rejoined.name, "Ben");
        assert_eq!(rejoined.purse, 50);
        assert_eq!(auction.participant_ids(), vec!["host", "p2"]);
    }

    #[test]
    fn test_bid_validation_order_and_untouched_state() {
        let mut auction = two_lot_auction();
        auction.add_participant("p2", "Ben", 50);
        auction.start("host", 0).unwrap();

        assert_eq!(
            auction.place_bid("ghost", 25, 10),
            Err(AuctionError::UnknownParticipant)
        );
        assert_eq!(
            auction.place_bid("p2", 0, 10),
            Err(AuctionError::InvalidAmount)
        );
        assert_eq!(
            auction.place_bid("p2", 19, 10),
            Err(AuctionError::BelowBasePrice { base: 20, got: 19 })
        );
        assert_eq!(
            auction.place_bid("p2", 60, 10),
            Err(AuctionError::InsufficientFunds { purse: 50, got: 60 })
        );

        // Nothing above changed the lot.
        assert!(auction.current_bid().is_none());
        assert_eq!(auction.deadline(), Some(WINDOW));
    }

    #[test]
    fn test_equal_bid_rejected_higher_bid_slides_deadline() {
        let mut auction = two_lot_auction();
        auction.add_participant("p2", "Ben", 50);
        auction.start("host", 0).unwrap();

        let (bid, deadline) = auction.place_bid("host", 25, 1_000).unwrap();
        assert_eq!(bid.amount, 25);
        assert_eq!(deadline, 1_000 + WINDOW);

        assert_eq!(
            auction.place_bid("p2", 25, 2_000),
            Err(AuctionError::BidNotHigher { current: 25 })
        );
        // Rejection left the leader and the countdown alone.
        assert_eq!(auction.current_bid().unwrap().bidder, "host");
        assert_eq!(auction.deadline(), Some(1_000 + WINDOW));

        let (bid, deadline) = auction.place_bid("p2", 30, 2_000).unwrap();
        assert_eq!(bid.bidder, "p2");
        assert_eq!(deadline, 2_000 + WINDOW);
        // Purse untouched until settlement.
        assert_eq!(auction.snapshot().participants[1].purse, 50);
    }

    #[test]
    fn test_settlement_transfers_item_and_funds_once() {
        let mut auction = two_lot_auction();
        auction.add_participant("p2", "Ben", 50);
        auction.start("host", 0).unwrap();
        auction.place_bid("host", 25, 1_000).unwrap();
        auction.place_bid("p2", 30, 2_000).unwrap();

        // Not yet expired.
        assert!(auction.settle_if_expired(2_000 + WINDOW - 1).is_none());

        let settlement = auction.settle_if_expired(2_000 + WINDOW).unwrap();
        assert!(settlement.sold);
        assert_eq!(settlement.winner_id.as_deref(), Some("p2"));
        assert_eq!(settlement.price, Some(30));
        assert_eq!(settlement.item.name, "Virat Kohli");

        let snapshot = auction.snapshot();
        assert_eq!(snapshot.participants[0].purse, 100);
        assert_eq!(snapshot.participants[1].purse, 20);
        assert_eq!(snapshot.participants[1].won[0].sold_price, 30);

        // The queue advanced; the same instant cannot settle the lot again.
        assert_eq!(auction.current_item().unwrap().name, "KL Rahul");
        let next = auction.settle_if_expired(2_000 + WINDOW);
        assert!(next.is_none());
    }

    #[test]
    fn test_zero_bid_lot_goes_unsold() {
        let mut auction = two_lot_auction();
        auction.start("host", 0).unwrap();

        let settlement = auction.settle_if_expired(WINDOW).unwrap();
        assert!(!settlement.sold);
        assert!(settlement.winner_id.is_none());
        assert!(settlement.price.is_none());
        assert_eq!(auction.snapshot().participants[0].purse, 100);
    }

    #[test]
    fn test_departed_leader_settles_unsold_keeping_bid_price() {
        let mut auction = two_lot_auction();
        auction.add_participant("p2", "Ben", 50);
        auction.start("host", 0).unwrap();
        auction.place_bid("p2", 30, 1_000).unwrap();
        auction.remove_participant("p2");

        // The bid is intentionally left live.
        assert_eq!(auction.current_bid().unwrap().bidder, "p2");

        let settlement = auction.settle_if_expired(1_000 + WINDOW).unwrap();
        assert!(!settlement.sold);
        assert!(settlement.winner_id.is_none());
        assert_eq!(settlement.price, Some(30));
        assert_eq!(auction.snapshot().participants[0].purse, 100);
    }

    #[test]
    fn test_last_lot_finishes_the_auction() {
        let mut auction = two_lot_auction();
        auction.start("host", 0).unwrap();

        auction.settle_if_expired(WINDOW).unwrap();
        assert_eq!(auction.status(), AuctionStatus::Running);

        auction.settle_if_expired(2 * WINDOW).unwrap();
        assert_eq!(auction.status(), AuctionStatus::Over);
        assert!(auction.current_item().is_none());
        assert!(auction.deadline().is_none());

        // Over: nothing left to settle, bids rejected.
        assert!(auction.settle_if_expired(3 * WINDOW).is_none());
        assert_eq!(
            auction.place_bid("host", 25, 3 * WINDOW),
            Err(AuctionError::NotRunning)
        );
    }

    #[test]
    fn test_winner_is_written_at_most_once() {
        let mut auction = two_lot_auction();
        auction.start("host", 0).unwrap();
        auction.settle_if_expired(WINDOW).unwrap();

        // Not assignable while running.
        assert!(!auction.assign_winner("host"));

        auction.settle_if_expired(2 * WINDOW).unwrap();
        assert!(auction.assign_winner("host"));
        assert!(!auction.assign_winner("p2"));
        assert_eq!(auction.winner_id(), Some("host"));
    }
}
