//! Winner oracle: names the strongest squad once an auction is over.
//!
//! The oracle is consulted at most once per finished auction, with a
//! read-only snapshot, and answers with the id of one of its participants
//! or nothing. Every failure mode (missing credential, transport error, bad
//! status, an answer naming nobody in the game) collapses to "no winner";
//! the auction's lifecycle never depends on the oracle.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gavel_types::{AuctionSnapshot, ParticipantId};

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Picks the winning participant of a finished auction.
#[async_trait]
pub trait WinnerOracle: Send + Sync {
    /// Return the winning participant's id, or `None` when no winner can be
    /// determined. Must never fail the caller.
    async fn pick_winner(&self, snapshot: &AuctionSnapshot) -> Option<ParticipantId>;
}

/// Winner oracle backed by an OpenAI-compatible chat-completions API.
///
/// Without an API key the oracle is disabled and every verdict is `None`.
pub struct OpenAiOracle {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl OpenAiOracle {
    pub fn new(api_key: Option<String>, model: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|key| !key.is_empty()),
            model: model.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Read the credential from `OPENAI_API_KEY`.
    pub fn from_env(model: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new(std::env::var("OPENAI_API_KEY").ok(), model, endpoint)
    }

    async fn request_verdict(&self, api_key: &str, snapshot: &AuctionSnapshot) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(snapshot),
            }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("winner oracle returned {status}: {body}"));
        }

        let parsed: ChatResponse = response.json().await?;
        extract_answer(&parsed).ok_or_else(|| anyhow!("winner oracle returned an empty answer"))
    }
}

#[async_trait]
impl WinnerOracle for OpenAiOracle {
    async fn pick_winner(&self, snapshot: &AuctionSnapshot) -> Option<ParticipantId> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!(code = %snapshot.code, "Winner oracle disabled, no API key");
            return None;
        };

        match self.request_verdict(api_key, snapshot).await {
            Ok(answer) => match accept_answer(snapshot, &answer) {
                Some(winner) => Some(winner),
                None => {
                    warn!(
                        code = %snapshot.code,
                        answer = %answer,
                        "Winner oracle named an unknown participant"
                    );
                    None
                }
            },
            Err(err) => {
                warn!(code = %snapshot.code, error = %err, "Winner oracle call failed");
                None
            }
        }
    }
}

/// Build the analyst prompt from the final squads.
fn build_prompt(snapshot: &AuctionSnapshot) -> String {
    let squads: Vec<serde_json::Value> = snapshot
        .participants
        .iter()
        .map(|participant| {
            serde_json::json!({
                "playerId": participant.id,
                "name": participant.name,
                "purseRemaining": participant.purse,
                "squad": participant.won,
            })
        })
        .collect();
    let input = serde_json::json!({ "gameId": snapshot.code, "squads": squads });

    [
        "You are an IPL-style auction analyst.",
        "Given the squads, pick the single playerId with the strongest and most balanced team.",
        "Balance scoring higher than star power if needed.",
        "Return only the playerId, no extra text.",
        "Input squads JSON:",
        &serde_json::to_string_pretty(&input).unwrap_or_default(),
    ]
    .join("\n")
}

/// The model's trimmed answer, if it produced one.
fn extract_answer(response: &ChatResponse) -> Option<String> {
    let content = response.choices.first()?.message.content.trim();
    (!content.is_empty()).then(|| content.to_string())
}

/// Accept the answer only when it names a participant of the snapshot.
fn accept_answer(snapshot: &AuctionSnapshot, answer: &str) -> Option<ParticipantId> {
    snapshot
        .participants
        .iter()
        .find(|participant| participant.id == answer)
        .map(|participant| participant.id.clone())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_types::{AuctionStatus, ParticipantSnapshot, WonItem};

    fn finished_snapshot() -> AuctionSnapshot {
        AuctionSnapshot {
            code: "AB12C".into(),
            host_id: "host".into(),
            status: AuctionStatus::Over,
            winner_id: None,
            current_item: None,
            current_bid: None,
            deadline: None,
            participants: vec![
                ParticipantSnapshot {
                    id: "host".into(),
                    name: "Asha".into(),
                    purse: 70,
                    won: vec![WonItem {
                        name: "Virat Kohli".into(),
                        base_price: 20,
                        sold_price: 30,
                    }],
                },
                ParticipantSnapshot {
                    id: "p2".into(),
                    name: "Ben".into(),
                    purse: 20,
                    won: Vec::new(),
                },
            ],
            remaining: 0,
        }
    }

    #[test]
    fn test_prompt_includes_every_squad() {
        let prompt = build_prompt(&finished_snapshot());
        assert!(prompt.contains("\"gameId\": \"AB12C\""));
        assert!(prompt.contains("host"));
        assert!(prompt.contains("p2"));
        assert!(prompt.contains("Virat Kohli"));
        assert!(prompt.contains("Return only the playerId"));
    }

    #[test]
    fn test_extract_answer_trims_and_rejects_empty() {
        let response = ChatResponse {
            choices: vec![ChatChoice {
                message: ChatChoiceMessage {
                    content: "  host \n".into(),
                },
            }],
        };
        assert_eq!(extract_answer(&response).as_deref(), Some("host"));

        let empty = ChatResponse {
            choices: vec![ChatChoice {
                message: ChatChoiceMessage {
                    content: "   ".into(),
                },
            }],
        };
        assert!(extract_answer(&empty).is_none());
        assert!(extract_answer(&ChatResponse { choices: vec![] }).is_none());
    }

    #[test]
    fn test_accept_answer_requires_known_participant() {
        let snapshot = finished_snapshot();
        assert_eq!(accept_answer(&snapshot, "p2").as_deref(), Some("p2"));
        assert!(accept_answer(&snapshot, "somebody-else").is_none());
    }

    #[tokio::test]
    async fn test_oracle_without_key_is_disabled() {
        let oracle = OpenAiOracle::new(None, DEFAULT_MODEL, DEFAULT_ENDPOINT);
        assert!(oracle.pick_winner(&finished_snapshot()).await.is_none());
    }
}
