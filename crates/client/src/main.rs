//! CLI for playing live auctions from a terminal.
//!
//! This binary provides commands for:
//! - Creating and joining auctions
//! - Starting the game (host only)
//! - Bidding on the current lot
//! - Querying auction state
//! - Watching the event stream
//!
//! Every command carries a participant id. Pass `--player-id` to keep one
//! identity across invocations (and across the `watch` stream); otherwise a
//! fresh id is generated per run.

use anyhow::Result;
use clap::{Parser, Subcommand};
use jsonrpsee::core::client::{ClientT, Subscription, SubscriptionClientT};
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use tracing::info;

use gavel_types::{AuctionSnapshot, Event};

#[derive(Parser)]
#[command(name = "gavel")]
#[command(about = "CLI for live cricket auctions")]
struct Cli {
    /// Gateway WebSocket endpoint
    #[arg(long, default_value = "ws://127.0.0.1:9944")]
    rpc: String,

    /// Participant id; generated when omitted
    #[arg(long)]
    player_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new auction and become its host
    Create {
        /// Display name
        #[arg(long, default_value = "Host")]
        name: String,

        /// Starting purse
        #[arg(long, default_value_t = 100)]
        purse: u64,
    },

    /// Join an existing auction
    Join {
        /// Auction code
        #[arg(long)]
        code: String,

        /// Display name
        #[arg(long, default_value = "Player")]
        name: String,

        /// Starting purse
        #[arg(long, default_value_t = 100)]
        purse: u64,
    },

    /// Start bidding (host only)
    Start {
        /// Auction code
        #[arg(long)]
        code: String,
    },

    /// Bid on the current lot
    Bid {
        /// Auction code
        #[arg(long)]
        code: String,

        /// Bid amount
        #[arg(long)]
        amount: u64,
    },

    /// Print the auction snapshot
    State {
        /// Auction code
        #[arg(long)]
        code: String,
    },

    /// Leave every auction this id belongs to
    Leave,

    /// Stream events addressed to this id until interrupted
    Watch,
}

fn print_snapshot(snapshot: &AuctionSnapshot) {
    println!("Auction {} [{:?}]", snapshot.code, snapshot.status);
    println!("  Host: {}", snapshot.host_id);
    if let Some(winner) = &snapshot.winner_id {
        println!("  Winner: {}", winner);
    }
    if let Some(item) = &snapshot.current_item {
        println!("  Lot: {} (base {})", item.name, item.base_price);
    }
    if let Some(bid) = &snapshot.current_bid {
        println!("  Leading bid: {} by {}", bid.amount, bid.bidder);
    }
    if let Some(deadline) = snapshot.deadline {
        println!("  Closes at: {}", deadline);
    }
    println!("  Remaining in queue: {}", snapshot.remaining);
    println!("  Participants:");
    for participant in &snapshot.participants {
        println!(
            "    {} ({}) purse {} won {}",
            participant.name,
            participant.id,
            participant.purse,
            participant.won.len()
        );
    }
}

async fn watch_cmd(client: &WsClient, player_id: &str) -> Result<()> {
    let mut events: Subscription<Event> = client
        .subscribe(
            "auction_subscribeEvents",
            rpc_params![player_id],
            "auction_unsubscribeEvents",
        )
        .await?;

    println!("Watching events for {player_id} (Ctrl+C to stop)");
    while let Some(event) = events.next().await {
        let event = event?;
        println!("{}", serde_json::to_string(&event)?);
    }
    println!("Event stream closed");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gavel_client=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let player_id = cli
        .player_id
        .unwrap_or_else(|| format!("{:032x}", rand::random::<u128>()));
    let client = WsClientBuilder::default().build(&cli.rpc).await?;

    match cli.command {
        Commands::Create { name, purse } => {
            let snapshot: AuctionSnapshot = client
                .request("auction_create", rpc_params![&player_id, name, purse])
                .await?;
            info!(code = %snapshot.code, "Auction created");
            println!("Auction code: {}", snapshot.code);
            println!("Player id: {player_id}");
            print_snapshot(&snapshot);
        }

        Commands::Join { code, name, purse } => {
            let snapshot: AuctionSnapshot = client
                .request("auction_join", rpc_params![&player_id, code, name, purse])
                .await?;
            println!("Joined as {player_id}");
            print_snapshot(&snapshot);
        }

        Commands::Start { code } => {
            let started: bool = client
                .request("auction_start", rpc_params![&player_id, code])
                .await?;
            if started {
                println!("Bidding started");
            } else {
                println!("Auction was already started");
            }
        }

        Commands::Bid { code, amount } => {
            let _accepted: bool = client
                .request("auction_bid", rpc_params![&player_id, code, amount])
                .await?;
            println!("Bid of {amount} accepted");
        }

        Commands::State { code } => {
            let snapshot: AuctionSnapshot = client
                .request("auction_getState", rpc_params![&player_id, code])
                .await?;
            print_snapshot(&snapshot);
        }

        Commands::Leave => {
            let affected: usize = client
                .request("auction_leave", rpc_params![&player_id])
                .await?;
            println!("Left {affected} auction(s)");
        }

        Commands::Watch => {
            watch_cmd(&client, &player_id).await?;
        }
    }

    Ok(())
}
