use std::borrow::Cow;

use settlement_coordinator_domain::{
    ContractId, contract::SignatureError, escrow::LedgerError,
};
use settlement_coordinator_store::SettlementStoreError;
use uuid::Uuid;

use crate::{
    collaborators::CollaboratorError,
    risk_gate::RiskGateError,
    types::request::RequestError,
};

/// Errors that can occur when driving settlement operations through the
/// engine.
#[derive(Debug, thiserror::Error)]
pub enum SettlementEngineError {
    /// A request failed validation before any state was touched.
    #[error("request validation error: {0}")]
    Request(#[from] RequestError),

    /// The signature state machine rejected the operation.
    ///
    /// Recoverable: the caller may retry once the blocking condition changes.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The escrow ledger rejected the operation.
    ///
    /// Recoverable: covers insufficient balance, freeze violations and
    /// status preconditions.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The requested record was not found.
    #[error("not found error: {0}")]
    NotFound(Cow<'static, str>),

    /// Escrow funds may only move for a fully signed contract.
    #[error("contract {0} is not fully signed")]
    ContractNotFullySigned(ContractId),

    /// The risk gate blocked the action.
    #[error("risk blocked: {0}")]
    RiskBlocked(Cow<'static, str>),

    /// The audit chain failed verification. The chain is halted and the
    /// incident id can be correlated with internal logs; hashes are never
    /// surfaced to callers.
    #[error("audit tamper detected, incident {incident}")]
    TamperDetected {
        /// Correlates the caller-visible error with the internal log line
        /// carrying the defect details.
        incident: Uuid,
    },

    /// An external collaborator failed. Retryable.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// The store failed in a way that is not a settlement rejection.
    #[error("store error: {0}")]
    Store(Cow<'static, str>),
}

impl SettlementEngineError {
    pub(crate) fn not_found<E>(detail: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::NotFound(detail.into())
    }
}

impl From<SettlementStoreError> for SettlementEngineError {
    fn from(err: SettlementStoreError) -> Self {
        match err {
            SettlementStoreError::Signature(err) => Self::Signature(err),
            SettlementStoreError::Ledger(err) => Self::Ledger(err),
            SettlementStoreError::NotFound(detail) => Self::NotFound(detail),
            SettlementStoreError::Tamper(defect) => {
                let incident = Uuid::new_v4();

                // full defect details stay in internal logs
                tracing::error!(%incident, %defect, "audit chain integrity failure");

                Self::TamperDetected { incident }
            },
            err => Self::Store(err.to_string().into()),
        }
    }
}

impl From<RiskGateError> for SettlementEngineError {
    fn from(err: RiskGateError) -> Self {
        match err {
            RiskGateError::Blocked { .. } => Self::RiskBlocked(err.to_string().into()),
            RiskGateError::Oracle(err) => Self::Collaborator(err),
        }
    }
}
