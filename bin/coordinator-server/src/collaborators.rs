//! HTTP-backed implementations of the engine's collaborator traits.

use async_trait::async_trait;
use bon::Builder;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use settlement_coordinator_domain::UserId;
use settlement_coordinator_engine::{
    CollaboratorError, FraudOracle, NotificationEvent, NotificationService, PaymentGateway,
};

#[derive(Debug, Builder)]
pub struct HttpFraudOracle {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Builder)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Builder)]
pub struct HttpNotifier {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ScoreBody {
    score: f64,
}

#[derive(Deserialize)]
struct WatchlistBody {
    watchlisted: bool,
}

#[async_trait]
impl FraudOracle for HttpFraudOracle {
    async fn score(&self, user: UserId) -> Result<f64, CollaboratorError> {
        let url = format!("{}/score/{user}", self.base_url);

        let body: ScoreBody = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| CollaboratorError::new(format!("fraud oracle score: {err}")))?
            .json()
            .await
            .map_err(|err| CollaboratorError::new(format!("fraud oracle score body: {err}")))?;

        Ok(body.score)
    }

    async fn is_watchlisted(&self, user: UserId) -> Result<bool, CollaboratorError> {
        let url = format!("{}/watchlist/{user}", self.base_url);

        let body: WatchlistBody = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| CollaboratorError::new(format!("fraud oracle watchlist: {err}")))?
            .json()
            .await
            .map_err(|err| {
                CollaboratorError::new(format!("fraud oracle watchlist body: {err}"))
            })?;

        Ok(body.watchlisted)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn payout(&self, recipient: UserId, amount: Decimal) -> Result<(), CollaboratorError> {
        let url = format!("{}/payouts", self.base_url);

        self.client
            .post(&url)
            .json(&json!({ "recipient_id": recipient, "amount": amount }))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| CollaboratorError::new(format!("payment gateway payout: {err}")))?;

        Ok(())
    }
}

#[async_trait]
impl NotificationService for HttpNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<(), CollaboratorError> {
        let url = format!("{}/events", self.base_url);

        self.client
            .post(&url)
            .json(&event_body(&event))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| CollaboratorError::new(format!("notification delivery: {err}")))?;

        Ok(())
    }
}

fn event_body(event: &NotificationEvent) -> serde_json::Value {
    match event {
        NotificationEvent::ContractInitiated { contract_id } => {
            json!({ "event": "contract_initiated", "contract_id": contract_id })
        },
        NotificationEvent::SignatureRecorded { contract_id, role } => {
            json!({
                "event": "signature_recorded",
                "contract_id": contract_id,
                "role": role.to_string(),
            })
        },
        NotificationEvent::ContractFullySigned { contract_id } => {
            json!({ "event": "contract_fully_signed", "contract_id": contract_id })
        },
        NotificationEvent::ContractCancelled { contract_id } => {
            json!({ "event": "contract_cancelled", "contract_id": contract_id })
        },
        NotificationEvent::EscrowFunded { account_id, contract_id } => {
            json!({
                "event": "escrow_funded",
                "account_id": account_id,
                "contract_id": contract_id,
            })
        },
        NotificationEvent::MilestoneReleased { account_id, milestone_id, amount } => {
            json!({
                "event": "milestone_released",
                "account_id": account_id,
                "milestone_id": milestone_id,
                "amount": amount,
            })
        },
        NotificationEvent::EscrowReleased { account_id } => {
            json!({ "event": "escrow_released", "account_id": account_id })
        },
        NotificationEvent::EscrowFrozen { account_id } => {
            json!({ "event": "escrow_frozen", "account_id": account_id })
        },
    }
}
