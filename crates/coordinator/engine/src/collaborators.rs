//! External collaborator seams.
//!
//! The engine talks to fraud scoring, payment rails, notification delivery
//! and id generation exclusively through these traits, so the settlement
//! semantics can be exercised without any of those systems running.

use std::{borrow::Cow, fmt};

use async_trait::async_trait;
use rust_decimal::Decimal;
use settlement_coordinator_domain::{
    ContractId, EscrowAccountId, MilestoneId, UserId,
    contract::SignerRole,
};
use uuid::Uuid;

/// A failure reported by an external collaborator.
#[derive(Debug, Clone, thiserror::Error)]
#[error("collaborator error: {0}")]
pub struct CollaboratorError(Cow<'static, str>);

impl CollaboratorError {
    /// Wraps a collaborator failure message.
    pub fn new<E>(detail: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self(detail.into())
    }
}

/// Fraud scoring provider consulted before money-moving actions.
#[async_trait]
pub trait FraudOracle: fmt::Debug + Send + Sync {
    /// Returns the raw fraud-risk score for a user, in the oracle's own
    /// scale.
    async fn score(&self, user: UserId) -> Result<f64, CollaboratorError>;

    /// Returns whether the user is on the fraud watchlist.
    async fn is_watchlisted(&self, user: UserId) -> Result<bool, CollaboratorError>;
}

/// Payment rail the released funds are dispatched through.
#[async_trait]
pub trait PaymentGateway: fmt::Debug + Send + Sync {
    /// Dispatches a payout of `amount` to `recipient`.
    async fn payout(&self, recipient: UserId, amount: Decimal) -> Result<(), CollaboratorError>;
}

/// An event worth telling the contract parties about.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    /// A contract was initiated and awaits the employer's signature.
    ContractInitiated {
        /// The new contract.
        contract_id: ContractId,
    },
    /// One party signed.
    SignatureRecorded {
        /// The signed contract.
        contract_id: ContractId,
        /// The role that signed.
        role: SignerRole,
    },
    /// Both signatures exist; the contract is binding.
    ContractFullySigned {
        /// The fully signed contract.
        contract_id: ContractId,
    },
    /// The contract was cancelled before being fully signed.
    ContractCancelled {
        /// The cancelled contract.
        contract_id: ContractId,
    },
    /// An escrow account was funded.
    EscrowFunded {
        /// The funded account.
        account_id: EscrowAccountId,
        /// The contract the account settles.
        contract_id: ContractId,
    },
    /// A milestone's share of the escrowed funds was released.
    MilestoneReleased {
        /// The account released from.
        account_id: EscrowAccountId,
        /// The released milestone.
        milestone_id: MilestoneId,
        /// The released amount.
        amount: Decimal,
    },
    /// The account reached full release.
    EscrowReleased {
        /// The fully released account.
        account_id: EscrowAccountId,
    },
    /// The account was frozen pending dispute resolution.
    EscrowFrozen {
        /// The frozen account.
        account_id: EscrowAccountId,
    },
}

/// Delivery channel for [`NotificationEvent`]s.
///
/// Delivery is best-effort: the engine logs failures and never fails a
/// settlement operation over one.
#[async_trait]
pub trait NotificationService: fmt::Debug + Send + Sync {
    /// Delivers one event.
    async fn notify(&self, event: NotificationEvent) -> Result<(), CollaboratorError>;
}

/// Source of fresh entity ids.
pub trait IdGenerator: fmt::Debug + Send + Sync {
    /// Returns a fresh id.
    fn generate(&self) -> Uuid;
}

/// The production [`IdGenerator`]: random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> Uuid {
        Uuid::new_v4()
    }
}
