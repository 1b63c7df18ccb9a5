//! Settlement bridge: hands a finished match to the external ledger.
//!
//! The ledger itself (contract calls, confirmations, double-submission
//! protection) lives behind [`Ledger`]. The bridge adds exactly one thing on
//! top: a bounded wait, turning a hung submission into a failure outcome.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pong_core::{MatchId, RoomId, SettlementOutcome};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ledger rejected result ({status}): {details}")]
    Rejected { status: u16, details: String },

    #[error("ledger response carried no transaction reference")]
    MalformedResponse,
}

/// External collaborator that records a match winner for payout.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit the winner of `match_id`. Returns the transaction reference.
    async fn commit_result(&self, match_id: &MatchId, winner: &str) -> Result<String, LedgerError>;
}

/// Hex form of a match id as the ledger backend expects it (`0x` + 64 digits).
pub fn encode_match_id(match_id: &MatchId) -> String {
    format!("0x{}", hex::encode(match_id.as_bytes()))
}

pub struct SettlementBridge {
    ledger: Arc<dyn Ledger>,
    timeout: Duration,
}

impl SettlementBridge {
    pub fn new(ledger: Arc<dyn Ledger>, timeout: Duration) -> Self {
        Self { ledger, timeout }
    }

    /// Submit the result for `room_id` once. Never retries; any error or a
    /// timeout comes back as [`SettlementOutcome::Failed`].
    pub async fn settle(&self, room_id: RoomId, winner_address: &str) -> SettlementOutcome {
        let match_id = MatchId::for_room(room_id);
        tracing::info!(
            "Committing result for room {} (match {}), winner {}",
            room_id,
            encode_match_id(&match_id),
            winner_address
        );

        let submission = self.ledger.commit_result(&match_id, winner_address);
        match tokio::time::timeout(self.timeout, submission).await {
            Ok(Ok(tx_ref)) => {
                tracing::info!(
                    "Payout transaction successful for winner {}. Tx: {}",
                    winner_address,
                    tx_ref
                );
                SettlementOutcome::Settled { tx_ref }
            }
            Ok(Err(e)) => {
                tracing::error!("Settlement for room {} failed: {}", room_id, e);
                SettlementOutcome::Failed {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                tracing::error!(
                    "Settlement for room {} timed out after {:?}",
                    room_id,
                    self.timeout
                );
                SettlementOutcome::Failed {
                    reason: format!("settlement timed out after {}s", self.timeout.as_secs()),
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommitResultRequest<'a> {
    match_id: String,
    winner: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResultResponse {
    tx_hash: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

/// Ledger backend reached over HTTP: `POST <base>/match/result`.
pub struct HttpLedger {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLedger {
    pub fn new(base_url: &str) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/match/result", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn commit_result(&self, match_id: &MatchId, winner: &str) -> Result<String, LedgerError> {
        let request = CommitResultRequest {
            match_id: encode_match_id(match_id),
            winner,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .json::<CommitResultResponse>()
                .await
                .unwrap_or_default();
            return Err(LedgerError::Rejected {
                status: status.as_u16(),
                details: body
                    .details
                    .or(body.error)
                    .unwrap_or_else(|| status.to_string()),
            });
        }

        let body: CommitResultResponse = response.json().await?;
        body.tx_hash.ok_or(LedgerError::MalformedResponse)
    }
}

/// Stand-in ledger for local play: accepts every result without submitting it.
#[derive(Debug, Default)]
pub struct DryRunLedger;

#[async_trait]
impl Ledger for DryRunLedger {
    async fn commit_result(&self, match_id: &MatchId, winner: &str) -> Result<String, LedgerError> {
        let match_id = encode_match_id(match_id);
        tracing::warn!("Dry run: not submitting match {} (winner {})", match_id, winner);
        Ok(format!("dry-run-{}", match_id))
    }
}
