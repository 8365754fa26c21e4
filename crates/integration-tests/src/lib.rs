//! End-to-end tests for the auction engine.
//!
//! These tests exercise the full game lifecycle against a simulated clock:
//! 1. Create and join
//! 2. Start and bid
//! 3. Tick-driven settlement
//! 4. Finish, winner recording, garbage collection

use gavel_engine::{dispatch, handle_command, EngineConfig, Registry};
use gavel_types::{AuctionStatus, Command, Event, Item};

const WINDOW: u64 = 30_000;

fn registry_with(catalog: Vec<Item>) -> Registry {
    Registry::new(EngineConfig {
        bid_window_ms: WINDOW,
        catalog,
    })
    .unwrap()
}

fn create_game(registry: &Registry, host: &str, name: &str, purse: u64) -> String {
    let effects = handle_command(
        registry,
        host,
        Command::Create {
            host_name: name.into(),
            host_purse: purse,
        },
        0,
    )
    .expect("create failed");
    match effects.reply {
        Some(Event::State { game }) => game.code,
        other => panic!("unexpected create reply: {other:?}"),
    }
}

/// Full lifecycle: host purse 100, first lot base price 20, host bids 25,
/// an equal counter-bid is rejected, a 30 bid wins at settlement.
#[test]
fn test_full_auction_lifecycle() {
    let registry = registry_with(vec![
        Item::new("Virat Kohli", 20),
        Item::new("KL Rahul", 14),
    ]);

    // ========================================
    // Phase 1: Create and join
    // ========================================

    let code = create_game(&registry, "host", "Asha", 100);
    handle_command(
        &registry,
        "p2",
        Command::Join {
            code: code.clone(),
            name: "Ben".into(),
            purse: 50,
        },
        100,
    )
    .expect("join failed");

    // ========================================
    // Phase 2: Start and bid
    // ========================================

    handle_command(&registry, "host", Command::Start { code: code.clone() }, 1_000)
        .expect("start failed");

    handle_command(
        &registry,
        "host",
        Command::Bid {
            code: code.clone(),
            amount: 25,
        },
        2_000,
    )
    .expect("host bid failed");

    // Equal bid loses, and changes nothing.
    let rejected = handle_command(
        &registry,
        "p2",
        Command::Bid {
            code: code.clone(),
            amount: 25,
        },
        3_000,
    );
    assert!(rejected.is_err());

    handle_command(
        &registry,
        "p2",
        Command::Bid {
            code: code.clone(),
            amount: 30,
        },
        4_000,
    )
    .expect("p2 bid failed");

    // Purses are untouched until settlement.
    let auction = registry.get(&code).unwrap();
    {
        let snapshot = auction.lock().snapshot();
        assert_eq!(snapshot.participants[0].purse, 100);
        assert_eq!(snapshot.participants[1].purse, 50);
        assert_eq!(snapshot.deadline, Some(4_000 + WINDOW));
    }

    // ========================================
    // Phase 3: Tick-driven settlement
    // ========================================

    // One tick early: nothing settles.
    assert!(dispatch::tick(&registry, 4_000 + WINDOW - 1_000)
        .broadcasts
        .is_empty());

    let effects = dispatch::tick(&registry, 4_000 + WINDOW);
    let settled = effects
        .broadcasts
        .iter()
        .find_map(|outbound| match &outbound.event {
            Event::LotSettled {
                sold,
                winner_id,
                price,
                ..
            } => Some((*sold, winner_id.clone(), *price)),
            _ => None,
        })
        .expect("no settlement event");
    assert_eq!(settled, (true, Some("p2".to_string()), Some(30)));

    {
        let snapshot = auction.lock().snapshot();
        assert_eq!(snapshot.participants[0].purse, 100);
        assert_eq!(snapshot.participants[1].purse, 20);
        assert_eq!(snapshot.participants[1].won[0].name, "Virat Kohli");
        assert_eq!(snapshot.participants[1].won[0].sold_price, 30);
        assert_eq!(snapshot.remaining, 0);
        assert_eq!(snapshot.status, AuctionStatus::Running);
    }

    // ========================================
    // Phase 4: Finish, winner, stability
    // ========================================

    // The second lot expires with no bids: unsold, auction over.
    let effects = dispatch::tick(&registry, 4_000 + 2 * WINDOW);
    assert_eq!(effects.finished.len(), 1);
    assert_eq!(effects.finished[0].status, AuctionStatus::Over);

    let (_, recorded) = registry
        .assign_winner(&code, Some("p2".into()))
        .expect("assign failed");
    assert_eq!(recorded.as_deref(), Some("p2"));

    // The recorded winner survives further ticks and verdicts.
    dispatch::tick(&registry, 4_000 + 3 * WINDOW);
    assert!(registry.assign_winner(&code, Some("host".into())).is_none());
    let snapshot = registry.get(&code).unwrap().lock().snapshot();
    assert_eq!(snapshot.winner_id.as_deref(), Some("p2"));
}

/// Every valid higher bid restarts the countdown, so a lot outlives any
/// number of bid windows as long as bidding stays active.
#[test]
fn test_anti_snipe_outlasts_the_original_deadline() {
    let registry = registry_with(vec![Item::new("Virat Kohli", 20)]);
    let code = create_game(&registry, "host", "Asha", 1_000);
    handle_command(
        &registry,
        "p2",
        Command::Join {
            code: code.clone(),
            name: "Ben".into(),
            purse: 1_000,
        },
        0,
    )
    .unwrap();
    handle_command(&registry, "host", Command::Start { code: code.clone() }, 0).unwrap();

    // Alternate bids, each just before the current deadline expires.
    let mut now = 0;
    for round in 0..5u64 {
        now = (round + 1) * (WINDOW - 1_000);
        let bidder = if round % 2 == 0 { "host" } else { "p2" };
        assert!(dispatch::tick(&registry, now).broadcasts.is_empty());
        handle_command(
            &registry,
            bidder,
            Command::Bid {
                code: code.clone(),
                amount: 20 + round,
            },
            now,
        )
        .expect("bid failed");
    }

    // Quiet period finally elapses; the last bidder wins.
    let effects = dispatch::tick(&registry, now + WINDOW);
    assert!(effects
        .broadcasts
        .iter()
        .any(|outbound| matches!(&outbound.event, Event::LotSettled { sold: true, .. })));
}

/// An abandoned running auction is never cancelled outright: its lots drain
/// as their deadlines elapse, and the empty finished game is collected.
#[test]
fn test_abandoned_running_auction_drains_and_is_collected() {
    let registry = registry_with(vec![
        Item::new("Virat Kohli", 20),
        Item::new("KL Rahul", 14),
    ]);
    let code = create_game(&registry, "host", "Asha", 100);
    handle_command(&registry, "host", Command::Start { code: code.clone() }, 0).unwrap();
    handle_command(&registry, "host", Command::Leave, 1_000).unwrap();

    // Still running with nobody in it.
    assert_eq!(registry.len(), 1);

    let effects = dispatch::tick(&registry, WINDOW);
    assert!(effects
        .broadcasts
        .iter()
        .all(|outbound| outbound.to.is_empty()));

    dispatch::tick(&registry, 2 * WINDOW);
    // Finished and empty: gone on the same sweep.
    assert!(registry.is_empty());
}

/// A departed leading bidder forfeits at settlement; rejoining in time keeps
/// the bid alive.
#[test]
fn test_leaver_forfeits_unless_rejoined() {
    let registry = registry_with(vec![Item::new("Virat Kohli", 20)]);
    let code = create_game(&registry, "host", "Asha", 100);
    handle_command(
        &registry,
        "p2",
        Command::Join {
            code: code.clone(),
            name: "Ben".into(),
            purse: 50,
        },
        0,
    )
    .unwrap();
    handle_command(&registry, "host", Command::Start { code: code.clone() }, 0).unwrap();
    handle_command(
        &registry,
        "p2",
        Command::Bid {
            code: code.clone(),
            amount: 30,
        },
        1_000,
    )
    .unwrap();
    handle_command(&registry, "p2", Command::Leave, 2_000).unwrap();

    // Rejoin before the deadline: same id, bid still live, so the win and
    // the purse deduction land normally.
    handle_command(
        &registry,
        "p2",
        Command::Join {
            code: code.clone(),
            name: "Ben".into(),
            purse: 50,
        },
        3_000,
    )
    .unwrap();

    let effects = dispatch::tick(&registry, 1_000 + WINDOW);
    assert!(effects
        .broadcasts
        .iter()
        .any(|outbound| matches!(
            &outbound.event,
            Event::LotSettled { sold: true, winner_id: Some(id), price: Some(30), .. } if id == "p2"
        )));
}
