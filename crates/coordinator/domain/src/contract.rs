//! Contract domain models and the signature-ordering state machine.

use alloc::string::String;

use bon::Builder;
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;
use rust_decimal::Decimal;
use strum::{Display, EnumString, IntoStaticStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{ContractId, JobId, Timestamps, UserId};

/// The settlement status of a contract.
///
/// A contract progresses through these states as signatures are collected.
/// `FullySigned` and `Cancelled` are terminal; cancellation is reachable from
/// any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum ContractStatus {
    /// The contract is awaiting the employer's signature. Initial state.
    PendingEmployerSignature,
    /// The employer has signed; the contract is awaiting the gig worker.
    PendingGigWorkerSignature,
    /// Both required signatures exist. Terminal success state.
    FullySigned,
    /// The contract was cancelled before being fully signed. Terminal.
    Cancelled,
}

impl ContractStatus {
    /// Returns `true` for the two terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, ContractStatus::FullySigned | ContractStatus::Cancelled)
    }
}

/// The role a signer holds on a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum SignerRole {
    /// The party funding the work.
    Employer,
    /// The party performing the work.
    GigWorker,
}

/// Rejections produced by the signature state machine.
///
/// All variants are recoverable: the caller may retry once the blocking
/// condition changes (e.g. after the employer signs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// A role attempted to sign before its turn in the signing order.
    #[error("out of order signature: the contract is not awaiting this role")]
    OutOfOrder,

    /// The signer's role already holds a signature on this contract.
    #[error("already signed: at most one signature per role per contract")]
    AlreadySigned,

    /// The contract is in a terminal state and accepts no further actions.
    #[error("contract terminal: fully signed or cancelled contracts are immutable")]
    Terminal,

    /// The acting user is neither the employer nor the gig worker.
    #[error("not a participant of this contract")]
    NotParticipant,
}

/// A two-party settlement contract between an employer and a gig worker.
///
/// Created when an accepted bid or direct-hire offer is finalized. Mutated
/// only through [`accept_signature`](Contract::accept_signature) and
/// [`cancel`](Contract::cancel); never physically deleted (cancellation is a
/// status, not a removal).
///
/// # Type Parameters
///
/// * `AUX` - Auxiliary data type, defaults to [`Timestamps`] for tracking metadata.
#[derive(Debug, Clone, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Contract<AUX = Timestamps> {
    /// The unique identifier for this contract.
    id: ContractId,

    /// The employer party.
    employer_id: UserId,

    /// The gig worker party.
    gig_worker_id: UserId,

    /// The job or accepted bid this contract settles.
    job_id: JobId,

    /// The agreed monetary total, fixed-point with 2 decimal digits.
    total_amount: Decimal,

    /// The contract text as presented to both signers.
    terms: String,

    /// SHA-256 hex digest of `terms`; signatures bind to this value.
    version_hash: String,

    /// The current settlement status.
    status: ContractStatus,

    /// When the employer signed, if they have.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    employer_signed_at: Option<DateTime<Utc>>,

    /// When the gig worker signed, if they have.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    gig_worker_signed_at: Option<DateTime<Utc>>,

    /// When both signatures existed for the first time. Set exactly once.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    fully_signed_at: Option<DateTime<Utc>>,

    /// The reason supplied on cancellation.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    cancel_reason: Option<String>,

    /// Auxiliary metadata associated with this contract.
    aux: AUX,
}

impl<AUX> Contract<AUX> {
    /// Returns the contract id.
    pub fn id(&self) -> ContractId {
        self.id
    }

    /// Returns the employer's user id.
    pub fn employer_id(&self) -> UserId {
        self.employer_id
    }

    /// Returns the gig worker's user id.
    pub fn gig_worker_id(&self) -> UserId {
        self.gig_worker_id
    }

    /// Returns the settled job id.
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Returns the agreed monetary total.
    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    /// Returns the contract text.
    pub fn terms(&self) -> &str {
        &self.terms
    }

    /// Returns the SHA-256 hex digest of the contract text.
    pub fn version_hash(&self) -> &str {
        &self.version_hash
    }

    /// Returns the current settlement status.
    pub fn status(&self) -> ContractStatus {
        self.status
    }

    /// Returns when the employer signed, if they have.
    pub fn employer_signed_at(&self) -> Option<DateTime<Utc>> {
        self.employer_signed_at
    }

    /// Returns when the gig worker signed, if they have.
    pub fn gig_worker_signed_at(&self) -> Option<DateTime<Utc>> {
        self.gig_worker_signed_at
    }

    /// Returns when the contract became fully signed, if it has.
    pub fn fully_signed_at(&self) -> Option<DateTime<Utc>> {
        self.fully_signed_at
    }

    /// Returns the cancellation reason, if the contract was cancelled.
    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    /// Returns a reference to the auxiliary metadata.
    pub fn aux(&self) -> &AUX {
        &self.aux
    }

    /// Replaces the auxiliary data with a new value, returning both the
    /// updated contract and the old auxiliary data.
    pub fn with_aux<AUX2>(self, aux: AUX2) -> (Contract<AUX2>, AUX) {
        let contract = Contract {
            id: self.id,
            employer_id: self.employer_id,
            gig_worker_id: self.gig_worker_id,
            job_id: self.job_id,
            total_amount: self.total_amount,
            terms: self.terms,
            version_hash: self.version_hash,
            status: self.status,
            employer_signed_at: self.employer_signed_at,
            gig_worker_signed_at: self.gig_worker_signed_at,
            fully_signed_at: self.fully_signed_at,
            cancel_reason: self.cancel_reason,
            aux,
        };

        (contract, self.aux)
    }

    /// Returns the role `user` holds on this contract, if any.
    pub fn role_of(&self, user: UserId) -> Option<SignerRole> {
        if user == self.employer_id {
            Some(SignerRole::Employer)
        } else if user == self.gig_worker_id {
            Some(SignerRole::GigWorker)
        } else {
            None
        }
    }

    /// Returns the role whose signature the contract is currently awaiting.
    ///
    /// `None` for terminal contracts.
    pub fn required_role(&self) -> Option<SignerRole> {
        match self.status {
            ContractStatus::PendingEmployerSignature => Some(SignerRole::Employer),
            ContractStatus::PendingGigWorkerSignature => Some(SignerRole::GigWorker),
            ContractStatus::FullySigned | ContractStatus::Cancelled => None,
        }
    }

    /// Returns `true` if `role` already holds a signature on this contract.
    pub fn has_signed(&self, role: SignerRole) -> bool {
        match role {
            SignerRole::Employer => self.employer_signed_at.is_some(),
            SignerRole::GigWorker => self.gig_worker_signed_at.is_some(),
        }
    }

    /// Records a signature for `role` at `at` and advances the state machine.
    ///
    /// The employer must sign while the contract is awaiting the employer
    /// signature; the gig worker only once the employer signature exists.
    /// When the gig worker's signature lands the contract becomes fully
    /// signed and `fully_signed_at` is set, exactly once.
    pub fn accept_signature(
        &mut self,
        role: SignerRole,
        at: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        if self.status.is_terminal() {
            return Err(SignatureError::Terminal);
        }

        if self.has_signed(role) {
            return Err(SignatureError::AlreadySigned);
        }

        if self.required_role() != Some(role) {
            return Err(SignatureError::OutOfOrder);
        }

        match role {
            SignerRole::Employer => {
                self.employer_signed_at = Some(at);
                self.status = ContractStatus::PendingGigWorkerSignature;
            },
            SignerRole::GigWorker => {
                self.gig_worker_signed_at = Some(at);
                self.fully_signed_at = Some(at);
                self.status = ContractStatus::FullySigned;
            },
        }

        Ok(())
    }

    /// Cancels the contract.
    ///
    /// Allowed only while non-terminal. Does not reverse escrow funds; a
    /// compensating refund is an external dispute-resolution responsibility.
    pub fn cancel(&mut self, reason: String) -> Result<(), SignatureError> {
        if self.status.is_terminal() {
            return Err(SignatureError::Terminal);
        }

        self.status = ContractStatus::Cancelled;
        self.cancel_reason = Some(reason);

        Ok(())
    }
}

/// A signature captured for one (contract, role) pair.
///
/// Binds the signer's identity and the typed legal name to the contract
/// version that was on screen when they signed.
#[derive(Debug, Clone, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContractSignature {
    /// The contract this signature belongs to.
    contract_id: ContractId,

    /// The role the signer holds on the contract.
    role: SignerRole,

    /// The signer's user id.
    signer_id: UserId,

    /// The full legal name exactly as typed by the signer.
    full_name: String,

    /// When the signature was recorded.
    signed_at: DateTime<Utc>,

    /// The originating IP address, when known.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    ip_address: Option<String>,

    /// The originating user agent, when known.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    user_agent: Option<String>,

    /// The `version_hash` of the contract text the signature binds to.
    contract_version_hash: String,
}

impl ContractSignature {
    /// Returns the contract id.
    pub fn contract_id(&self) -> ContractId {
        self.contract_id
    }

    /// Returns the signer's role.
    pub fn role(&self) -> SignerRole {
        self.role
    }

    /// Returns the signer's user id.
    pub fn signer_id(&self) -> UserId {
        self.signer_id
    }

    /// Returns the full legal name as typed.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Returns when the signature was recorded.
    pub fn signed_at(&self) -> DateTime<Utc> {
        self.signed_at
    }

    /// Returns the originating IP address, when known.
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// Returns the originating user agent, when known.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Returns the contract version digest the signature binds to.
    pub fn contract_version_hash(&self) -> &str {
        &self.contract_version_hash
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;

    fn contract() -> Contract<()> {
        Contract::builder()
            .id(Uuid::from_u128(1).into())
            .employer_id(Uuid::from_u128(2).into())
            .gig_worker_id(Uuid::from_u128(3).into())
            .job_id(Uuid::from_u128(4).into())
            .total_amount(Decimal::new(10_000_00, 2))
            .terms("terms".to_string())
            .version_hash("abc123".to_string())
            .status(ContractStatus::PendingEmployerSignature)
            .aux(())
            .build()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn gig_worker_cannot_sign_before_employer() {
        let mut contract = contract();

        let err = contract.accept_signature(SignerRole::GigWorker, at(1)).unwrap_err();

        assert_eq!(err, SignatureError::OutOfOrder);
        assert_eq!(contract.status(), ContractStatus::PendingEmployerSignature);
    }

    #[test]
    fn in_order_signatures_reach_fully_signed_once() {
        let mut contract = contract();

        contract.accept_signature(SignerRole::Employer, at(1)).unwrap();
        assert_eq!(contract.status(), ContractStatus::PendingGigWorkerSignature);
        assert!(contract.fully_signed_at().is_none());

        contract.accept_signature(SignerRole::GigWorker, at(2)).unwrap();
        assert_eq!(contract.status(), ContractStatus::FullySigned);
        assert_eq!(contract.fully_signed_at(), Some(at(2)));
        assert!(contract.gig_worker_signed_at() >= contract.employer_signed_at());
    }

    #[test]
    fn double_signing_is_rejected() {
        let mut contract = contract();

        contract.accept_signature(SignerRole::Employer, at(1)).unwrap();
        let err = contract.accept_signature(SignerRole::Employer, at(2)).unwrap_err();

        assert_eq!(err, SignatureError::AlreadySigned);
    }

    #[test]
    fn terminal_contracts_reject_signatures_and_cancellation() {
        let mut contract = contract();

        contract.accept_signature(SignerRole::Employer, at(1)).unwrap();
        contract.accept_signature(SignerRole::GigWorker, at(2)).unwrap();

        assert_eq!(
            contract.accept_signature(SignerRole::Employer, at(3)),
            Err(SignatureError::Terminal)
        );
        assert_eq!(contract.cancel("late".to_string()), Err(SignatureError::Terminal));
    }

    #[test]
    fn cancellation_is_reachable_from_any_non_terminal_state() {
        let mut fresh = contract();
        fresh.cancel("no longer needed".to_string()).unwrap();
        assert_eq!(fresh.status(), ContractStatus::Cancelled);

        let mut half_signed = contract();
        half_signed.accept_signature(SignerRole::Employer, at(1)).unwrap();
        half_signed.cancel("worker unavailable".to_string()).unwrap();
        assert_eq!(half_signed.status(), ContractStatus::Cancelled);
        assert_eq!(half_signed.cancel_reason(), Some("worker unavailable"));
    }
}
