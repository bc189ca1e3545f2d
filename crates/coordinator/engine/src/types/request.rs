//! Request types for settlement engine operations.

mod error;

pub use self::error::{
    CancelContractRequestError, DefineMilestonesRequestError, FreezeEscrowRequestError,
    FundEscrowRequestError, InitiateContractRequestError, RequestError, SignContractRequestError,
};

use bon::Builder;
use dissolve_derive::Dissolve;
use rust_decimal::Decimal;
use settlement_coordinator_domain::{
    ContractId, EscrowAccountId, JobId, MilestoneId, UserId, audit::ActorContext, money,
};

/// Request to initiate a settlement contract for an accepted job.
///
/// # Validation
///
/// The request validates that:
/// - The employer and gig worker are distinct users
/// - The total amount is a positive 2-decimal value
/// - The contract terms are non-empty
#[derive(Debug, Dissolve)]
pub struct InitiateContractRequest {
    /// The party funding the work
    employer_id: UserId,

    /// The party performing the work
    gig_worker_id: UserId,

    /// The job or accepted bid the contract settles
    job_id: JobId,

    /// The agreed monetary total
    total_amount: Decimal,

    /// The contract text as presented to both signers
    terms: String,

    /// Who triggered the initiation
    actor: ActorContext,
}

/// Request to record one party's signature on a contract.
#[derive(Debug, Dissolve)]
pub struct SignContractRequest {
    /// The contract being signed
    contract_id: ContractId,

    /// The signing user
    signer_id: UserId,

    /// The full legal name exactly as typed
    full_name: String,

    /// Who triggered the signature
    actor: ActorContext,
}

/// Request to cancel a non-terminal contract.
#[derive(Debug, Dissolve)]
pub struct CancelContractRequest {
    /// The contract being cancelled
    contract_id: ContractId,

    /// The participant requesting cancellation
    cancelled_by: UserId,

    /// Why the contract is being cancelled
    reason: String,

    /// Who triggered the cancellation
    actor: ActorContext,
}

/// Request to fund an escrow account for a fully signed contract.
///
/// # Validation
///
/// The request validates that:
/// - The total amount is a positive 2-decimal value
/// - The platform fee is a non-negative 2-decimal value below the total
#[derive(Debug, Dissolve)]
pub struct FundEscrowRequest {
    /// The fully signed contract the account settles
    contract_id: ContractId,

    /// The total funded amount
    total_amount: Decimal,

    /// The platform's fee, withheld from the funded amount
    platform_fee: Decimal,

    /// Whether funds release per milestone
    milestone_based: bool,

    /// Whether the final release runs automatically once every milestone is
    /// completed
    automatic_release: bool,

    /// Whether the employer purchased fraud insurance
    fraud_insurance: bool,

    /// Whether releases additionally require a counter-signature
    multi_signature: bool,

    /// Who triggered the funding
    actor: ActorContext,
}

/// One milestone in a [`DefineMilestonesRequest`]; position in the submitted
/// sequence determines release order.
#[derive(Debug, Builder, Dissolve)]
pub struct MilestoneSpec {
    /// What must be delivered
    description: String,

    /// The share of escrowed funds this milestone releases
    amount: Decimal,
}

/// Request to attach the ordered milestone sequence to an escrow account.
///
/// # Validation
///
/// The request validates that:
/// - At least one milestone is supplied
/// - Every description is non-empty
/// - Every amount is a positive 2-decimal value
#[derive(Debug, Dissolve)]
pub struct DefineMilestonesRequest {
    /// The escrow account the milestones belong to
    account_id: EscrowAccountId,

    /// The ordered milestone sequence
    milestones: Vec<MilestoneSpec>,

    /// Who triggered the definition
    actor: ActorContext,
}

/// Request to release one pending milestone's share of escrowed funds.
#[derive(Debug, Builder, Dissolve)]
pub struct ReleaseMilestoneRequest {
    /// The escrow account released from
    account_id: EscrowAccountId,

    /// The milestone to release
    milestone_id: MilestoneId,

    /// Who triggered the release
    actor: ActorContext,
}

/// Request to freeze an escrow account pending dispute resolution.
#[derive(Debug, Dissolve)]
pub struct FreezeEscrowRequest {
    /// The escrow account to freeze
    account_id: EscrowAccountId,

    /// Why the account is being frozen
    reason: String,

    /// Who triggered the freeze
    actor: ActorContext,
}

/// Request to retrieve a contract with its captured signatures.
#[derive(Debug, Builder, Dissolve)]
pub struct GetContractRequest {
    /// The contract to look up
    contract_id: ContractId,
}

/// Request to retrieve an escrow account with its milestones.
#[derive(Debug, Builder, Dissolve)]
pub struct GetEscrowAccountRequest {
    /// The escrow account to look up
    account_id: EscrowAccountId,
}

#[bon::bon]
impl InitiateContractRequest {
    /// Creates a contract initiation request with validation.
    ///
    /// Returns an error if the parties coincide, the amount is not a
    /// positive 2-decimal value, or the terms are empty.
    #[builder]
    pub fn new(
        employer_id: UserId,
        gig_worker_id: UserId,
        job_id: JobId,
        total_amount: Decimal,
        terms: String,
        actor: ActorContext,
    ) -> Result<Self, InitiateContractRequestError> {
        if employer_id == gig_worker_id {
            return Err(InitiateContractRequestError::SameParty);
        }

        if !money::is_positive_amount(total_amount) {
            return Err(InitiateContractRequestError::InvalidAmount(total_amount));
        }

        if terms.trim().is_empty() {
            return Err(InitiateContractRequestError::EmptyTerms);
        }

        Ok(Self { employer_id, gig_worker_id, job_id, total_amount, terms, actor })
    }
}

#[bon::bon]
impl SignContractRequest {
    /// Creates a signature request with validation.
    ///
    /// Returns an error if the typed full name is empty.
    #[builder]
    pub fn new(
        contract_id: ContractId,
        signer_id: UserId,
        full_name: String,
        actor: ActorContext,
    ) -> Result<Self, SignContractRequestError> {
        if full_name.trim().is_empty() {
            return Err(SignContractRequestError::EmptyFullName);
        }

        Ok(Self { contract_id, signer_id, full_name, actor })
    }
}

#[bon::bon]
impl CancelContractRequest {
    /// Creates a cancellation request with validation.
    ///
    /// Returns an error if the reason is empty.
    #[builder]
    pub fn new(
        contract_id: ContractId,
        cancelled_by: UserId,
        reason: String,
        actor: ActorContext,
    ) -> Result<Self, CancelContractRequestError> {
        if reason.trim().is_empty() {
            return Err(CancelContractRequestError::EmptyReason);
        }

        Ok(Self { contract_id, cancelled_by, reason, actor })
    }
}

#[bon::bon]
impl FundEscrowRequest {
    /// Creates an escrow funding request with validation.
    ///
    /// Returns an error if the total is not a positive 2-decimal value, or
    /// the fee is negative, finer than 2 decimals, or at least the total.
    #[builder]
    pub fn new(
        contract_id: ContractId,
        total_amount: Decimal,
        platform_fee: Decimal,
        milestone_based: bool,
        automatic_release: bool,
        fraud_insurance: bool,
        multi_signature: bool,
        actor: ActorContext,
    ) -> Result<Self, FundEscrowRequestError> {
        if !money::is_positive_amount(total_amount) {
            return Err(FundEscrowRequestError::InvalidTotalAmount(total_amount));
        }

        if platform_fee.is_sign_negative() || !money::is_amount(platform_fee) {
            return Err(FundEscrowRequestError::InvalidPlatformFee(platform_fee));
        }

        if platform_fee >= total_amount {
            return Err(FundEscrowRequestError::FeeExceedsTotal {
                platform_fee,
                total_amount,
            });
        }

        Ok(Self {
            contract_id,
            total_amount,
            platform_fee,
            milestone_based,
            automatic_release,
            fraud_insurance,
            multi_signature,
            actor,
        })
    }
}

#[bon::bon]
impl DefineMilestonesRequest {
    /// Creates a milestone definition request with validation.
    ///
    /// Returns an error if no milestones are supplied, a description is
    /// empty, or an amount is not a positive 2-decimal value.
    #[builder]
    pub fn new(
        account_id: EscrowAccountId,
        milestones: Vec<MilestoneSpec>,
        actor: ActorContext,
    ) -> Result<Self, DefineMilestonesRequestError> {
        if milestones.is_empty() {
            return Err(DefineMilestonesRequestError::NoMilestones);
        }

        for spec in &milestones {
            if spec.description.trim().is_empty() {
                return Err(DefineMilestonesRequestError::EmptyDescription);
            }

            if !money::is_positive_amount(spec.amount) {
                return Err(DefineMilestonesRequestError::InvalidAmount(spec.amount));
            }
        }

        Ok(Self { account_id, milestones, actor })
    }
}

#[bon::bon]
impl FreezeEscrowRequest {
    /// Creates a freeze request with validation.
    ///
    /// Returns an error if the reason is empty.
    #[builder]
    pub fn new(
        account_id: EscrowAccountId,
        reason: String,
        actor: ActorContext,
    ) -> Result<Self, FreezeEscrowRequestError> {
        if reason.trim().is_empty() {
            return Err(FreezeEscrowRequestError::EmptyReason);
        }

        Ok(Self { account_id, reason, actor })
    }
}
