//! Command and event wire schema.
//!
//! The gateway delivers one [`Command`] per inbound message and fans
//! [`Event`]s out to the participants of the affected auction. Both sets are
//! closed: anything that does not decode into a variant is a malformed
//! command, never a silently ignored payload.

use serde::{Deserialize, Serialize};

use crate::{AuctionSnapshot, Bid, Item, ParticipantId};

/// Inbound commands, one per message. The issuing participant's id travels
/// alongside the command, assigned at the gateway boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Open a new auction with the issuer as host.
    #[serde(rename_all = "camelCase")]
    Create { host_name: String, host_purse: u64 },

    /// Join an existing auction (idempotent rejoin).
    #[serde(rename_all = "camelCase")]
    Join {
        code: String,
        name: String,
        purse: u64,
    },

    /// Start bidding. Honored only when the issuer is the host.
    #[serde(rename_all = "camelCase")]
    Start { code: String },

    /// Bid on the current lot.
    #[serde(rename_all = "camelCase")]
    Bid { code: String, amount: u64 },

    /// Read-only snapshot of one auction.
    #[serde(rename_all = "camelCase")]
    GetState { code: String },

    /// Remove the issuer from every auction they belong to.
    Leave,
}

/// Outbound events. All are broadcast to the affected auction's current
/// participants except [`Event::Rejected`], which goes only to the issuer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// A new auction exists; the issuer is its host.
    #[serde(rename_all = "camelCase")]
    Created { code: String },

    /// A participant joined.
    #[serde(rename_all = "camelCase")]
    Joined { name: String },

    /// Bidding has started.
    #[serde(rename_all = "camelCase")]
    Started { code: String },

    /// A new lot is open for bidding until `deadline`.
    #[serde(rename_all = "camelCase")]
    LotOpened { item: Item, deadline: u64 },

    /// A higher bid replaced the previous one; the countdown restarted.
    #[serde(rename_all = "camelCase")]
    BidAccepted { bid: Bid, deadline: u64 },

    /// The lot closed. `deadline` is the next lot's, when one was drawn.
    #[serde(rename_all = "camelCase")]
    LotSettled {
        sold: bool,
        item: Item,
        winner_id: Option<ParticipantId>,
        price: Option<u64>,
        deadline: Option<u64>,
    },

    /// The auction is over. An absent winner id means the winner could not
    /// be determined.
    #[serde(rename_all = "camelCase")]
    Finished { winner_id: Option<ParticipantId> },

    /// Full snapshot of the auction after a mutation.
    #[serde(rename_all = "camelCase")]
    State { game: AuctionSnapshot },

    /// The issuer's command was rejected; nothing changed.
    #[serde(rename_all = "camelCase")]
    Rejected { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_decodes_from_tagged_json() {
        let command: Command = serde_json::from_value(json!({
            "type": "bid",
            "code": "AB12C",
            "amount": 25,
        }))
        .unwrap();
        assert_eq!(
            command,
            Command::Bid {
                code: "AB12C".into(),
                amount: 25,
            }
        );

        let command: Command = serde_json::from_value(json!({
            "type": "create",
            "hostName": "Asha",
            "hostPurse": 100,
        }))
        .unwrap();
        assert!(matches!(command, Command::Create { .. }));
    }

    #[test]
    fn test_unknown_command_fails_to_decode() {
        let result: Result<Command, _> =
            serde_json::from_value(json!({ "type": "teleport", "code": "AB12C" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_event_tag_and_field_names() {
        let event = Event::LotSettled {
            sold: true,
            item: Item::new("Virat Kohli", 20),
            winner_id: Some("p2".into()),
            price: Some(30),
            deadline: Some(1_000),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "lotSettled");
        assert_eq!(value["winnerId"], "p2");
        assert_eq!(value["item"]["basePrice"], 20);

        let event = Event::Finished { winner_id: None };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "finished");
        assert!(value["winnerId"].is_null());
    }
}
