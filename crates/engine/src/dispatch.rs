//! Command dispatch.
//!
//! One entry point per trigger: [`handle_command`] for inbound commands and
//! [`tick`] for the periodic deadline scan. Both return [`Effects`], the
//! events to deliver with recipients already resolved, so the gateway stays
//! a pure transport: it never inspects auction state, only forwards
//! envelopes.

use gavel_types::{AuctionSnapshot, Command, Event, ParticipantId};

use crate::error::AuctionError;
use crate::registry::Registry;

/// An event with its resolved recipients.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub to: Vec<ParticipantId>,
    pub event: Event,
}

/// What a command or tick produced.
#[derive(Debug, Clone, Default)]
pub struct Effects {
    /// Direct response to the issuer on the command channel.
    pub reply: Option<Event>,
    /// Events to fan out.
    pub broadcasts: Vec<Outbound>,
    /// Snapshots of auctions that just reached `Over`; each triggers one
    /// winner-oracle call.
    pub finished: Vec<AuctionSnapshot>,
}

impl Effects {
    fn broadcast(&mut self, to: Vec<ParticipantId>, event: Event) {
        self.broadcasts.push(Outbound { to, event });
    }

    /// Queue a fresh `state` snapshot for the auction's participants.
    fn broadcast_state(&mut self, to: Vec<ParticipantId>, snapshot: AuctionSnapshot) {
        self.broadcast(to, Event::State { game: snapshot });
    }
}

/// Process one inbound command from `issuer`.
///
/// A returned error means the command was rejected outright: no auction
/// changed and nothing is broadcast.
pub fn handle_command(
    registry: &Registry,
    issuer: &str,
    command: Command,
    now: u64,
) -> Result<Effects, AuctionError> {
    match command {
        Command::Create {
            host_name,
            host_purse,
        } => {
            let host_name = require_field(&host_name, "hostName")?;
            let snapshot = registry.create(issuer, host_name, host_purse);

            let mut effects = Effects {
                reply: Some(Event::State {
                    game: snapshot.clone(),
                }),
                ..Default::default()
            };
            let recipients = vec![issuer.to_string()];
            effects.broadcast(
                recipients.clone(),
                Event::Created {
                    code: snapshot.code.clone(),
                },
            );
            effects.broadcast_state(recipients, snapshot);
            Ok(effects)
        }

        Command::Join { code, name, purse } => {
            let code = require_field(&code, "code")?;
            let name = require_field(&name, "name")?;
            let snapshot = registry.join(code, issuer, name, purse)?;

            let mut effects = Effects {
                reply: Some(Event::State {
                    game: snapshot.clone(),
                }),
                ..Default::default()
            };
            let recipients: Vec<ParticipantId> = snapshot
                .participants
                .iter()
                .map(|participant| participant.id.clone())
                .collect();
            effects.broadcast(
                recipients.clone(),
                Event::Joined {
                    name: name.to_string(),
                },
            );
            effects.broadcast_state(recipients, snapshot);
            Ok(effects)
        }

        Command::Start { code } => {
            let code = require_field(&code, "code")?;
            let auction = registry
                .get(code)
                .ok_or_else(|| AuctionError::NotFound(code.to_string()))?;
            let mut auction = auction.lock();

            let mut effects = Effects::default();
            if !auction.start(issuer, now)? {
                // Already past Created; nothing to announce.
                return Ok(effects);
            }

            let recipients = auction.participant_ids();
            effects.broadcast(
                recipients.clone(),
                Event::Started {
                    code: code.to_string(),
                },
            );
            match auction.current_item().cloned().zip(auction.deadline()) {
                Some((item, deadline)) => {
                    effects.broadcast(recipients.clone(), Event::LotOpened { item, deadline });
                }
                // An empty draw queue finishes the auction on the spot.
                None => effects.finished.push(auction.snapshot()),
            }
            effects.broadcast_state(recipients, auction.snapshot());
            Ok(effects)
        }

        Command::Bid { code, amount } => {
            let code = require_field(&code, "code")?;
            let auction = registry
                .get(code)
                .ok_or_else(|| AuctionError::NotFound(code.to_string()))?;
            let mut auction = auction.lock();

            let (bid, deadline) = auction.place_bid(issuer, amount, now)?;

            let mut effects = Effects::default();
            let recipients = auction.participant_ids();
            effects.broadcast(recipients.clone(), Event::BidAccepted { bid, deadline });
            effects.broadcast_state(recipients, auction.snapshot());
            Ok(effects)
        }

        Command::GetState { code } => {
            let code = require_field(&code, "code")?;
            let auction = registry
                .get(code)
                .ok_or_else(|| AuctionError::NotFound(code.to_string()))?;
            let snapshot = auction.lock().snapshot();

            Ok(Effects {
                reply: Some(Event::State { game: snapshot }),
                ..Default::default()
            })
        }

        Command::Leave => {
            let mut effects = Effects::default();
            for (recipients, snapshot) in registry.leave_everywhere(issuer) {
                effects.broadcast_state(recipients, snapshot);
            }
            Ok(effects)
        }
    }
}

/// Scan every auction for expired lots and turn the settlements into events.
pub fn tick(registry: &Registry, now: u64) -> Effects {
    let mut effects = Effects::default();
    for closed in registry.tick(now) {
        let opened_deadline = closed.opened.as_ref().map(|(_, deadline)| *deadline);
        effects.broadcast(
            closed.recipients.clone(),
            Event::LotSettled {
                sold: closed.result.sold,
                item: closed.result.item,
                winner_id: closed.result.winner_id,
                price: closed.result.price,
                deadline: opened_deadline,
            },
        );
        if let Some((item, deadline)) = closed.opened {
            effects.broadcast(
                closed.recipients.clone(),
                Event::LotOpened { item, deadline },
            );
        }
        effects.broadcast_state(closed.recipients, closed.snapshot.clone());
        if closed.finished {
            effects.finished.push(closed.snapshot);
        }
    }
    effects
}

fn require_field<'a>(value: &'a str, field: &str) -> Result<&'a str, AuctionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuctionError::MalformedCommand(format!(
            "{field} must not be blank"
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use gavel_types::{AuctionStatus, Item};

    const WINDOW: u64 = 30_000;

    fn registry() -> Registry {
        let config = EngineConfig {
            bid_window_ms: WINDOW,
            catalog: vec![Item::new("Virat Kohli", 20), Item::new("KL Rahul", 14)],
        };
        Registry::new(config).unwrap()
    }

    fn created_code(effects: &Effects) -> String {
        effects
            .broadcasts
            .iter()
            .find_map(|outbound| match &outbound.event {
                Event::Created { code } => Some(code.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_create_announces_to_the_host_only() {
        let registry = registry();
        let effects = handle_command(
            &registry,
            "host",
            Command::Create {
                host_name: "Asha".into(),
                host_purse: 100,
            },
            0,
        )
        .unwrap();

        assert_eq!(effects.broadcasts.len(), 2);
        assert!(effects
            .broadcasts
            .iter()
            .all(|outbound| outbound.to == vec!["host".to_string()]));
        assert!(matches!(effects.broadcasts[1].event, Event::State { .. }));
        assert!(effects.finished.is_empty());
    }

    #[test]
    fn test_blank_host_name_is_malformed() {
        let registry = registry();
        let result = handle_command(
            &registry,
            "host",
            Command::Create {
                host_name: "   ".into(),
                host_purse: 100,
            },
            0,
        );
        assert!(matches!(result, Err(AuctionError::MalformedCommand(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_join_broadcasts_to_everyone_including_joiner() {
        let registry = registry();
        let effects = handle_command(
            &registry,
            "host",
            Command::Create {
                host_name: "Asha".into(),
                host_purse: 100,
            },
            0,
        )
        .unwrap();
        let code = created_code(&effects);

        let effects = handle_command(
            &registry,
            "p2",
            Command::Join {
                code,
                name: "Ben".into(),
                purse: 50,
            },
            0,
        )
        .unwrap();

        let recipients = &effects.broadcasts[0].to;
        assert!(recipients.contains(&"host".to_string()));
        assert!(recipients.contains(&"p2".to_string()));
        assert!(
            matches!(&effects.broadcasts[0].event, Event::Joined { name } if name == "Ben")
        );
    }

    #[test]
    fn test_start_requires_host_and_opens_first_lot() {
        let registry = registry();
        let effects = handle_command(
            &registry,
            "host",
            Command::Create {
                host_name: "Asha".into(),
                host_purse: 100,
            },
            0,
        )
        .unwrap();
        let code = created_code(&effects);

        assert!(matches!(
            handle_command(&registry, "p2", Command::Start { code: code.clone() }, 0),
            Err(AuctionError::Unauthorized)
        ));

        let effects =
            handle_command(&registry, "host", Command::Start { code: code.clone() }, 1_000)
                .unwrap();
        assert!(matches!(effects.broadcasts[0].event, Event::Started { .. }));
        assert!(matches!(
            effects.broadcasts[1].event,
            Event::LotOpened { deadline, .. } if deadline == 1_000 + WINDOW
        ));

        // Repeated start is a silent no-op.
        let effects =
            handle_command(&registry, "host", Command::Start { code }, 2_000).unwrap();
        assert!(effects.broadcasts.is_empty());
    }

    #[test]
    fn test_bid_on_unknown_code_is_not_found() {
        let registry = registry();
        assert!(matches!(
            handle_command(
                &registry,
                "host",
                Command::Bid {
                    code: "ZZZZZ".into(),
                    amount: 25,
                },
                0,
            ),
            Err(AuctionError::NotFound(code)) if code == "ZZZZZ"
        ));
    }

    #[test]
    fn test_get_state_replies_without_broadcasting() {
        let registry = registry();
        let effects = handle_command(
            &registry,
            "host",
            Command::Create {
                host_name: "Asha".into(),
                host_purse: 100,
            },
            0,
        )
        .unwrap();
        let code = created_code(&effects);

        let effects =
            handle_command(&registry, "viewer", Command::GetState { code }, 0).unwrap();
        assert!(effects.broadcasts.is_empty());
        assert!(matches!(effects.reply, Some(Event::State { .. })));
    }

    #[test]
    fn test_tick_emits_settled_opened_state_in_order() {
        let registry = registry();
        let effects = handle_command(
            &registry,
            "host",
            Command::Create {
                host_name: "Asha".into(),
                host_purse: 100,
            },
            0,
        )
        .unwrap();
        let code = created_code(&effects);
        handle_command(&registry, "host", Command::Start { code: code.clone() }, 0).unwrap();
        handle_command(
            &registry,
            "host",
            Command::Bid {
                code: code.clone(),
                amount: 25,
            },
            1_000,
        )
        .unwrap();

        let effects = tick(&registry, 1_000 + WINDOW);
        assert!(matches!(
            &effects.broadcasts[0].event,
            Event::LotSettled { sold: true, price: Some(25), .. }
        ));
        assert!(matches!(effects.broadcasts[1].event, Event::LotOpened { .. }));
        assert!(matches!(effects.broadcasts[2].event, Event::State { .. }));
        assert!(effects.finished.is_empty());

        // Second lot expires unsold and the auction finishes.
        let effects = tick(&registry, 1_000 + 2 * WINDOW);
        assert!(matches!(
            &effects.broadcasts[0].event,
            Event::LotSettled { sold: false, deadline: None, .. }
        ));
        assert_eq!(effects.finished.len(), 1);
        assert_eq!(effects.finished[0].code, code);
        assert_eq!(effects.finished[0].status, AuctionStatus::Over);
    }

    #[test]
    fn test_leave_updates_every_auction_the_issuer_was_in() {
        let registry = registry();
        let first = created_code(
            &handle_command(
                &registry,
                "host",
                Command::Create {
                    host_name: "Asha".into(),
                    host_purse: 100,
                },
                0,
            )
            .unwrap(),
        );
        handle_command(
            &registry,
            "p2",
            Command::Join {
                code: first,
                name: "Ben".into(),
                purse: 50,
            },
            0,
        )
        .unwrap();

        let effects = handle_command(&registry, "p2", Command::Leave, 0).unwrap();
        assert_eq!(effects.broadcasts.len(), 1);
        assert_eq!(effects.broadcasts[0].to, vec!["host".to_string()]);
        assert!(matches!(effects.broadcasts[0].event, Event::State { .. }));
    }
}
