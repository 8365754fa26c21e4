//! The budget-holder entity.

use gavel_types::{Item, ParticipantId, ParticipantSnapshot, WonItem};

/// One participant in one auction.
///
/// Owned exclusively by that auction. The purse only ever decreases, by
/// exactly the settled price of an item the participant won.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub purse: u64,
    pub won: Vec<WonItem>,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, name: impl Into<String>, purse: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            purse,
            won: Vec::new(),
        }
    }

    /// Transfer `item` to this participant at `price`.
    ///
    /// Callers must have validated the price against the purse when the bid
    /// was accepted; the purse never goes below zero.
    pub fn award(&mut self, item: &Item, price: u64) {
        self.purse -= price;
        self.won.push(WonItem::from_sale(item, price));
    }

    pub fn snapshot(&self) -> ParticipantSnapshot {
        ParticipantSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            purse: self.purse,
            won: self.won.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_award_deducts_exact_price_and_records_item() {
        let mut participant = Participant::new("p1", "Asha", 100);
        let item = Item::new("Virat Kohli", 20);

        participant.award(&item, 25);

        assert_eq!(participant.purse, 75);
        assert_eq!(participant.won.len(), 1);
        assert_eq!(participant.won[0].name, "Virat Kohli");
        assert_eq!(participant.won[0].base_price, 20);
        assert_eq!(participant.won[0].sold_price, 25);
    }
}
