use std::borrow::Cow;

use settlement_coordinator_domain::{contract::SignatureError, escrow::LedgerError};

use crate::persistence::audit::ChainDefect;

pub type Result<T, E = SettlementStoreError> = core::result::Result<T, E>;

/// Errors that can occur when interacting with the store
#[derive(Debug, thiserror::Error)]
pub enum SettlementStoreError {
    /// The signature state machine rejected the operation.
    ///
    /// Recoverable: the caller may retry once the blocking condition changes
    /// (e.g. after the employer signs).
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The escrow ledger rejected the operation.
    ///
    /// Recoverable: covers insufficient balance, freeze violations and
    /// status preconditions.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The requested record was not found.
    ///
    /// This is returned when operating on entities that don't exist, such as
    /// unknown contract or escrow account ids.
    #[error("not found error: {0}")]
    NotFound(Cow<'static, str>),

    /// A record with the same identity already exists.
    #[error("duplicate record error: {0}")]
    Duplicate(Cow<'static, str>),

    /// A snapshot could not be serialized for the audit log.
    #[error("serialization error: {0}")]
    Serialization(Cow<'static, str>),

    /// The audit chain failed verification or has been halted after a
    /// failed verification.
    ///
    /// Fatal to the affected chain segment: further writes are refused until
    /// the incident is investigated.
    #[error("audit chain integrity error: {0}")]
    Tamper(#[from] ChainDefect),

    /// An unclassified error occurred.
    #[error("other error: {0}")]
    Other(Cow<'static, str>),
}

impl SettlementStoreError {
    pub(crate) fn not_found<E>(detail: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::NotFound(detail.into())
    }

    pub(crate) fn duplicate<E>(detail: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::Duplicate(detail.into())
    }
}

impl From<serde_json::Error> for SettlementStoreError {
    fn from(err: serde_json::Error) -> Self {
        SettlementStoreError::Serialization(err.to_string().into())
    }
}
