use dissolve_derive::Dissolve;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Dissolve, Deserialize)]
pub struct InitiateContractRequestPayload {
    employer_id: Uuid,
    gig_worker_id: Uuid,
    job_id: Uuid,
    total_amount: Decimal,
    terms: String,
}

#[derive(Debug, Dissolve, Deserialize)]
pub struct SignContractRequestPayload {
    contract_id: Uuid,
    signer_id: Uuid,
    full_name: String,
}

#[derive(Debug, Dissolve, Deserialize)]
pub struct CancelContractRequestPayload {
    contract_id: Uuid,
    cancelled_by: Uuid,
    reason: String,
}

#[derive(Debug, Dissolve, Deserialize)]
pub struct FundEscrowRequestPayload {
    contract_id: Uuid,
    total_amount: Decimal,
    platform_fee: Decimal,

    #[serde(default)]
    milestone_based: bool,

    #[serde(default)]
    automatic_release: bool,

    #[serde(default)]
    fraud_insurance: bool,

    #[serde(default)]
    multi_signature: bool,

    requested_by: Uuid,
}

#[derive(Debug, Dissolve, Deserialize)]
pub struct MilestoneSpecPayload {
    description: String,
    amount: Decimal,
}

#[derive(Debug, Dissolve, Deserialize)]
pub struct DefineMilestonesRequestPayload {
    account_id: Uuid,
    milestones: Vec<MilestoneSpecPayload>,
    requested_by: Uuid,
}

#[derive(Debug, Dissolve, Deserialize)]
pub struct ReleaseMilestoneRequestPayload {
    account_id: Uuid,
    milestone_id: Uuid,
    requested_by: Uuid,
}

#[derive(Debug, Dissolve, Deserialize)]
pub struct FreezeEscrowRequestPayload {
    account_id: Uuid,
    reason: String,
    requested_by: Uuid,
}

#[derive(Debug, Dissolve, Deserialize)]
pub struct GetContractDetailsRequestPayload {
    contract_id: Uuid,
}

#[derive(Debug, Dissolve, Deserialize)]
pub struct GetEscrowAccountDetailsRequestPayload {
    account_id: Uuid,
}

#[derive(Debug, Dissolve, Deserialize)]
pub struct VerifyAuditRequestPayload {
    /// Verify a single entry when given, the whole chain otherwise.
    seq: Option<u64>,
}
