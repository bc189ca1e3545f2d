use bon::Builder;
use serde::Serialize;

use super::{
    AuditEntryPayload, ContractPayload, EscrowAccountPayload, MilestonePayload, SignaturePayload,
};

#[derive(Debug, Builder, Serialize)]
pub struct InitiateContractResponsePayload {
    contract: ContractPayload,
}

#[derive(Debug, Builder, Serialize)]
pub struct SignContractResponsePayload {
    contract: ContractPayload,
    signature: SignaturePayload,
}

#[derive(Debug, Builder, Serialize)]
pub struct CancelContractResponsePayload {
    contract: ContractPayload,
}

#[derive(Debug, Builder, Serialize)]
pub struct FundEscrowResponsePayload {
    account: EscrowAccountPayload,
}

#[derive(Debug, Builder, Serialize)]
pub struct DefineMilestonesResponsePayload {
    milestones: Vec<MilestonePayload>,
}

#[derive(Debug, Builder, Serialize)]
pub struct ReleaseMilestoneResponsePayload {
    account: EscrowAccountPayload,
    milestone: MilestonePayload,
    auto_released: bool,
}

#[derive(Debug, Builder, Serialize)]
pub struct FreezeEscrowResponsePayload {
    account: EscrowAccountPayload,
}

#[derive(Debug, Builder, Serialize)]
pub struct GetContractDetailsResponsePayload {
    contract: ContractPayload,
    signatures: Vec<SignaturePayload>,
}

#[derive(Debug, Builder, Serialize)]
pub struct GetEscrowAccountDetailsResponsePayload {
    account: EscrowAccountPayload,
    milestones: Vec<MilestonePayload>,
    completion_percentage: f64,
}

#[derive(Debug, Builder, Serialize)]
pub struct ListAuditEntriesResponsePayload {
    entries: Vec<AuditEntryPayload>,
}

#[derive(Debug, Builder, Serialize)]
pub struct VerifyAuditResponsePayload {
    verified: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<AuditEntryPayload>,
}
