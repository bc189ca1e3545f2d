//! The policy gate consulted before every money-moving action.
//!
//! The gate asks the [`FraudOracle`] two questions about the acting user:
//! whether they are watchlisted, and what their current fraud-risk score is.
//! Watchlisted users are always blocked; otherwise the score is normalized to
//! `0.0..=1.0` and compared against the configured block threshold. An oracle
//! outage is a retryable error, never a silent allow.

use std::{borrow::Cow, sync::Arc};

use bon::Builder;
use settlement_coordinator_domain::UserId;
use strum::{Display, IntoStaticStr};

use crate::collaborators::{CollaboratorError, FraudOracle};

/// The money-moving action a risk check gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum GateAction {
    /// Signing a contract.
    Sign,
    /// Funding an escrow account.
    FundEscrow,
    /// Releasing a milestone's share of escrowed funds.
    ReleaseMilestone,
}

/// The scale the fraud oracle reports raw scores in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreScale {
    /// Scores arrive already in `0.0..=1.0`.
    Unit,
    /// Scores arrive in `0.0..=100.0` and are divided by 100.
    Percent,
}

impl ScoreScale {
    /// Normalizes a raw oracle score into `0.0..=1.0`.
    pub fn normalize(self, raw: f64) -> f64 {
        let scaled = match self {
            ScoreScale::Unit => raw,
            ScoreScale::Percent => raw / 100.0,
        };

        scaled.clamp(0.0, 1.0)
    }
}

/// Risk gate tuning.
#[derive(Debug, Clone, Copy, Builder)]
pub struct RiskGateConfig {
    /// Normalized scores at or above this value block the action.
    block_threshold: f64,

    /// The scale raw oracle scores arrive in.
    score_scale: ScoreScale,
}

impl Default for RiskGateConfig {
    fn default() -> Self {
        Self { block_threshold: 0.8, score_scale: ScoreScale::Unit }
    }
}

/// A blocked or failed risk check.
#[derive(Debug, thiserror::Error)]
pub enum RiskGateError {
    /// The action was blocked by policy.
    #[error("{action} blocked for user {user}: {reason}")]
    Blocked {
        /// The gated action.
        action: GateAction,
        /// The acting user.
        user: UserId,
        /// Why the action was blocked.
        reason: Cow<'static, str>,
    },

    /// The fraud oracle could not be consulted. Retryable.
    #[error(transparent)]
    Oracle(#[from] CollaboratorError),
}

/// The policy facade in front of the [`FraudOracle`].
#[derive(Debug, Clone)]
pub struct RiskGate {
    oracle: Arc<dyn FraudOracle>,
    config: RiskGateConfig,
}

impl RiskGate {
    /// Creates a gate over `oracle` with the given tuning.
    pub fn new(oracle: Arc<dyn FraudOracle>, config: RiskGateConfig) -> Self {
        Self { oracle, config }
    }

    /// Checks whether `user` may perform `action`.
    ///
    /// # Returns
    ///
    /// The normalized score on success, so callers can record it.
    #[tracing::instrument(skip_all, fields(%user, %action))]
    pub async fn check(&self, user: UserId, action: GateAction) -> Result<f64, RiskGateError> {
        if self.oracle.is_watchlisted(user).await? {
            tracing::warn!(%user, %action, "blocked watchlisted user");

            return Err(RiskGateError::Blocked {
                action,
                user,
                reason: "user is on the fraud watchlist".into(),
            });
        }

        let raw = self.oracle.score(user).await?;
        let score = self.config.score_scale.normalize(raw);

        if score >= self.config.block_threshold {
            tracing::warn!(%user, %action, score, "blocked high-risk user");

            return Err(RiskGateError::Blocked {
                action,
                user,
                reason: format!(
                    "risk score {score:.2} at or above block threshold {:.2}",
                    self.config.block_threshold
                )
                .into(),
            });
        }

        Ok(score)
    }
}
