//! Gateway server for the live auction system.
//!
//! Exposes the command surface over JSON-RPC (HTTP and WebSocket on one
//! listener): one method per command, each carrying the issuer's participant
//! id, plus a subscription that delivers every event addressed to that
//! participant. A background task fires the registry tick on a fixed
//! interval; auctions that finish trigger a single winner-oracle call.
//!
//! The gateway never inspects auction state. Commands go through the
//! engine's dispatch layer, which resolves recipients while the auction lock
//! is held; this task only forwards the resulting envelopes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::Parser;
use jsonrpsee::core::{async_trait, SubscriptionResult};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{PendingSubscriptionSink, Server, SubscriptionMessage};
use jsonrpsee::types::ErrorObjectOwned;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use gavel_engine::{dispatch, handle_command, AuctionError, EngineConfig, Outbound, Registry};
use gavel_engine::config::DEFAULT_BID_WINDOW_MS;
use gavel_oracle::{OpenAiOracle, WinnerOracle, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use gavel_types::{catalog::default_catalog, AuctionSnapshot, Command, Event};

#[derive(Parser)]
#[command(name = "gavel-server")]
#[command(about = "Live auction gateway server")]
struct Args {
    /// Listen address for HTTP and WebSocket clients
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// Quiet period after the latest bid before a lot closes, milliseconds
    #[arg(long, default_value_t = DEFAULT_BID_WINDOW_MS)]
    bid_window_ms: u64,

    /// Deadline scan interval, milliseconds
    #[arg(long, default_value_t = 1_000)]
    tick_interval_ms: u64,

    /// Winner oracle model
    #[arg(long, default_value = DEFAULT_MODEL)]
    oracle_model: String,

    /// Winner oracle chat-completions endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    oracle_endpoint: String,
}

/// RPC surface consumed by clients. Every call names the issuing
/// participant; connection-to-identity mapping is not the engine's concern.
#[rpc(server)]
pub trait GatewayApi {
    /// Open a new auction with the issuer as host. Returns the snapshot.
    #[method(name = "auction_create")]
    async fn create(
        &self,
        player_id: String,
        host_name: String,
        host_purse: u64,
    ) -> Result<AuctionSnapshot, ErrorObjectOwned>;

    /// Join an existing auction (idempotent rejoin). Returns the snapshot.
    #[method(name = "auction_join")]
    async fn join(
        &self,
        player_id: String,
        code: String,
        name: String,
        purse: u64,
    ) -> Result<AuctionSnapshot, ErrorObjectOwned>;

    /// Start bidding. Host only. Returns whether this call started the game.
    #[method(name = "auction_start")]
    async fn start(&self, player_id: String, code: String) -> Result<bool, ErrorObjectOwned>;

    /// Bid on the current lot.
    #[method(name = "auction_bid")]
    async fn bid(
        &self,
        player_id: String,
        code: String,
        amount: u64,
    ) -> Result<bool, ErrorObjectOwned>;

    /// Read-only snapshot of one auction.
    #[method(name = "auction_getState")]
    async fn get_state(
        &self,
        player_id: String,
        code: String,
    ) -> Result<AuctionSnapshot, ErrorObjectOwned>;

    /// Remove the issuer from every auction they belong to. Returns how many
    /// auctions were affected.
    #[method(name = "auction_leave")]
    async fn leave(&self, player_id: String) -> Result<usize, ErrorObjectOwned>;

    /// Stream every event addressed to this participant.
    #[subscription(
        name = "auction_subscribeEvents",
        unsubscribe = "auction_unsubscribeEvents",
        item = Event
    )]
    async fn subscribe_events(&self, player_id: String) -> SubscriptionResult;
}

/// Shared gateway state behind the RPC surface.
#[derive(Clone)]
struct Gateway {
    registry: Arc<Registry>,
    events: broadcast::Sender<Outbound>,
    oracle: Arc<dyn WinnerOracle>,
}

impl Gateway {
    /// Run one command through the engine. On rejection the issuer also
    /// receives a `rejected` event on their subscription.
    fn run(&self, issuer: &str, command: Command) -> Result<dispatch::Effects, ErrorObjectOwned> {
        match handle_command(&self.registry, issuer, command, now_ms()) {
            Ok(effects) => Ok(effects),
            Err(err) => {
                debug!(issuer = %issuer, error = %err, "Command rejected");
                let _ = self.events.send(Outbound {
                    to: vec![issuer.to_string()],
                    event: Event::Rejected {
                        reason: err.to_string(),
                    },
                });
                Err(rpc_error(&err))
            }
        }
    }

    /// Fan out the produced events and kick off oracle calls for auctions
    /// that just finished.
    fn publish(&self, effects: dispatch::Effects) {
        for outbound in effects.broadcasts {
            let _ = self.events.send(outbound);
        }
        for snapshot in effects.finished {
            self.spawn_oracle(snapshot);
        }
    }

    /// Consult the winner oracle exactly once for a finished auction. The
    /// verdict is recorded and announced; an absent winner id means the
    /// winner could not be determined.
    fn spawn_oracle(&self, snapshot: AuctionSnapshot) {
        let registry = Arc::clone(&self.registry);
        let events = self.events.clone();
        let oracle = Arc::clone(&self.oracle);
        tokio::spawn(async move {
            let code = snapshot.code.clone();
            let winner = oracle.pick_winner(&snapshot).await;
            match registry.assign_winner(&code, winner) {
                Some((recipients, winner_id)) => {
                    info!(code = %code, winner = ?winner_id, "Auction finished");
                    let _ = events.send(Outbound {
                        to: recipients,
                        event: Event::Finished { winner_id },
                    });
                }
                // The auction was collected, or a winner was already
                // recorded; either way there is nothing to announce.
                None => debug!(code = %code, "Winner verdict dropped"),
            }
        });
    }

    fn reply_snapshot(
        effects: &dispatch::Effects,
    ) -> Result<AuctionSnapshot, ErrorObjectOwned> {
        match &effects.reply {
            Some(Event::State { game }) => Ok(game.clone()),
            _ => Err(internal_error("command produced no snapshot")),
        }
    }
}

#[async_trait]
impl GatewayApiServer for Gateway {
    async fn create(
        &self,
        player_id: String,
        host_name: String,
        host_purse: u64,
    ) -> Result<AuctionSnapshot, ErrorObjectOwned> {
        let effects = self.run(
            &player_id,
            Command::Create {
                host_name,
                host_purse,
            },
        )?;
        let snapshot = Self::reply_snapshot(&effects)?;
        self.publish(effects);
        Ok(snapshot)
    }

    async fn join(
        &self,
        player_id: String,
        code: String,
        name: String,
        purse: u64,
    ) -> Result<AuctionSnapshot, ErrorObjectOwned> {
        let effects = self.run(&player_id, Command::Join { code, name, purse })?;
        let snapshot = Self::reply_snapshot(&effects)?;
        self.publish(effects);
        Ok(snapshot)
    }

    async fn start(&self, player_id: String, code: String) -> Result<bool, ErrorObjectOwned> {
        let effects = self.run(&player_id, Command::Start { code })?;
        let started = !effects.broadcasts.is_empty();
        self.publish(effects);
        Ok(started)
    }

    async fn bid(
        &self,
        player_id: String,
        code: String,
        amount: u64,
    ) -> Result<bool, ErrorObjectOwned> {
        let effects = self.run(&player_id, Command::Bid { code, amount })?;
        self.publish(effects);
        Ok(true)
    }

    async fn get_state(
        &self,
        player_id: String,
        code: String,
    ) -> Result<AuctionSnapshot, ErrorObjectOwned> {
        let effects = self.run(&player_id, Command::GetState { code })?;
        Self::reply_snapshot(&effects)
    }

    async fn leave(&self, player_id: String) -> Result<usize, ErrorObjectOwned> {
        let effects = self.run(&player_id, Command::Leave)?;
        let affected = effects.broadcasts.len();
        self.publish(effects);
        Ok(affected)
    }

    async fn subscribe_events(
        &self,
        pending: PendingSubscriptionSink,
        player_id: String,
    ) -> SubscriptionResult {
        let sink = pending.accept().await?;
        let mut rx = self.events.subscribe();
        info!(player = %player_id, "Participant connected");

        loop {
            tokio::select! {
                _ = sink.closed() => break,
                received = rx.recv() => match received {
                    Ok(outbound) => {
                        if !outbound.to.iter().any(|id| id == &player_id) {
                            continue;
                        }
                        let message = SubscriptionMessage::from_json(&outbound.event)?;
                        if sink.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(player = %player_id, skipped, "Event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        // Connection gone: drop the participant from every game, as if they
        // had issued `leave`.
        info!(player = %player_id, "Participant disconnected");
        for (recipients, snapshot) in self.registry.leave_everywhere(&player_id) {
            let _ = self.events.send(Outbound {
                to: recipients,
                event: Event::State { game: snapshot },
            });
        }
        Ok(())
    }
}

/// Map the rejection taxonomy onto stable JSON-RPC error codes.
fn rpc_error(err: &AuctionError) -> ErrorObjectOwned {
    let code = match err {
        AuctionError::NotFound(_) => -32001,
        AuctionError::AlreadyOver => -32002,
        AuctionError::NotRunning => -32003,
        AuctionError::UnknownParticipant => -32004,
        AuctionError::InvalidAmount => -32005,
        AuctionError::BelowBasePrice { .. } => -32006,
        AuctionError::BidNotHigher { .. } => -32007,
        AuctionError::InsufficientFunds { .. } => -32008,
        AuctionError::Unauthorized => -32009,
        AuctionError::MalformedCommand(_) => -32010,
    };
    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}

fn internal_error(msg: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32603, msg.to_string(), None::<()>)
}

/// Current wall-clock time in milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before the Unix epoch")
        .as_millis() as u64
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gavel_server=info".parse()?)
                .add_directive("gavel_engine=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = EngineConfig {
        bid_window_ms: args.bid_window_ms,
        catalog: default_catalog(),
    };
    let registry = Arc::new(Registry::new(config)?);
    let oracle: Arc<dyn WinnerOracle> = Arc::new(OpenAiOracle::from_env(
        args.oracle_model,
        args.oracle_endpoint,
    ));
    let (events, _) = broadcast::channel(1024);

    let gateway = Gateway {
        registry,
        events,
        oracle,
    };

    // Deadline scan. Expiry is detected with latency up to one interval.
    let ticker = gateway.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_millis(args.tick_interval_ms.max(1)));
        loop {
            interval.tick().await;
            let effects = dispatch::tick(&ticker.registry, now_ms());
            ticker.publish(effects);
        }
    });

    info!("Starting auction gateway on {}", args.listen);

    let server = Server::builder().build(args.listen).await?;
    let handle = server.start(gateway.into_rpc());

    info!("Auction gateway running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}
