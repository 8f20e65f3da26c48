use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::traits::{ChainLedger, TransferHandle, TransferState};
use crate::error::{AppError, AppResult};

/// HTTP client for the chain execution gateway
///
/// The gateway fronts the payroll contract with a plain JSON API:
/// POST /transfers, GET /transfers/:id, GET /balance,
/// POST /deposit, POST /withdraw.
pub struct HttpChainGateway {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct TransferRequest<'a> {
    recipient: &'a str,
    amount: String,
}

#[derive(Deserialize)]
struct TransferAccepted {
    id: Uuid,
    tx_hash: Option<String>,
}

#[derive(Deserialize)]
struct TransferStatus {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct BalanceResponse {
    balance: String,
}

#[derive(Serialize)]
struct AmountRequest {
    amount: String,
}

#[derive(Deserialize)]
struct TxResponse {
    tx_hash: String,
}

impl HttpChainGateway {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn parse_amount(raw: &str) -> AppResult<u128> {
        raw.parse::<u128>()
            .map_err(|_| AppError::Chain(format!("Gateway returned non-integer amount: {}", raw)))
    }
}

#[async_trait]
impl ChainLedger for HttpChainGateway {
    async fn submit_transfer(&self, recipient: &str, amount: u128) -> AppResult<TransferHandle> {
        let response = self
            .client
            .post(self.url("/transfers"))
            .json(&TransferRequest {
                recipient,
                amount: amount.to_string(),
            })
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Chain(format!("Transfer rejected by gateway: {}", e)))?;

        let accepted: TransferAccepted = response.json().await?;
        info!(
            "Transfer submitted to gateway: {} ({} -> {})",
            accepted.id, amount, recipient
        );

        Ok(TransferHandle {
            id: accepted.id,
            tx_hash: accepted.tx_hash,
        })
    }

    async fn confirm(&self, handle: &TransferHandle) -> AppResult<TransferState> {
        let status: TransferStatus = self
            .client
            .get(self.url(&format!("/transfers/{}", handle.id)))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Chain(format!("Confirmation query failed: {}", e)))?
            .json()
            .await?;

        match status.status.as_str() {
            "pending" => Ok(TransferState::Pending),
            "success" | "confirmed" => Ok(TransferState::Confirmed),
            "failure" | "failed" => Ok(TransferState::Failed(
                status.reason.unwrap_or_else(|| "unspecified".to_string()),
            )),
            other => Err(AppError::Chain(format!(
                "Unknown transfer status from gateway: {}",
                other
            ))),
        }
    }

    async fn current_balance(&self) -> AppResult<u128> {
        let response: BalanceResponse = self
            .client
            .get(self.url("/balance"))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Chain(format!("Balance query failed: {}", e)))?
            .json()
            .await?;

        Self::parse_amount(&response.balance)
    }

    async fn deposit(&self, amount: u128) -> AppResult<String> {
        let response: TxResponse = self
            .client
            .post(self.url("/deposit"))
            .json(&AmountRequest {
                amount: amount.to_string(),
            })
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Chain(format!("Deposit rejected by gateway: {}", e)))?
            .json()
            .await?;

        Ok(response.tx_hash)
    }

    async fn withdraw(&self, amount: u128) -> AppResult<String> {
        let response: TxResponse = self
            .client
            .post(self.url("/withdraw"))
            .json(&AmountRequest {
                amount: amount.to_string(),
            })
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Chain(format!("Withdrawal rejected by gateway: {}", e)))?
            .json()
            .await?;

        Ok(response.tx_hash)
    }
}
