pub mod request;
pub mod response;

use bon::Builder;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use settlement_coordinator_domain::{
    ContractId, EscrowAccountId, JobId, MilestoneId, UserId,
    audit::{ActorKind, AuditAction, AuditEntry, AuditEntryDissolved, AuditTable},
    contract::{
        Contract, ContractDissolved, ContractSignature, ContractSignatureDissolved,
        ContractStatus, SignerRole,
    },
    escrow::{
        EscrowAccount, EscrowAccountDissolved, EscrowStatus, Milestone, MilestoneDissolved,
        MilestoneStatus,
    },
    risk::RiskLevel,
};
use uuid::Uuid;

#[derive(Debug, Builder, Serialize)]
pub struct ContractPayload {
    id: ContractId,
    employer_id: UserId,
    gig_worker_id: UserId,
    job_id: JobId,
    total_amount: Decimal,
    status: ContractStatus,
    version_hash: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    employer_signed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    gig_worker_signed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    fully_signed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    cancel_reason: Option<String>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Builder, Serialize)]
pub struct SignaturePayload {
    role: SignerRole,
    signer_id: UserId,
    full_name: String,
    signed_at: DateTime<Utc>,
    contract_version_hash: String,
}

#[derive(Debug, Builder, Serialize)]
pub struct EscrowAccountPayload {
    id: EscrowAccountId,
    contract_id: ContractId,
    total_amount: Decimal,
    platform_fee: Decimal,
    available_amount: Decimal,
    released_amount: Decimal,
    status: EscrowStatus,
    frozen: bool,
    milestone_based: bool,
    automatic_release: bool,
    risk_level: RiskLevel,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Builder, Serialize)]
pub struct MilestonePayload {
    id: MilestoneId,
    description: String,
    amount: Decimal,
    order_index: u32,
    status: MilestoneStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Builder, Serialize)]
pub struct AuditEntryPayload {
    seq: u64,
    table: AuditTable,
    record_id: Uuid,
    action: AuditAction,
    actor_id: Uuid,
    actor_kind: ActorKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<String>,

    previous_hash: String,
    hash_signature: String,
    created_at: DateTime<Utc>,
}

impl From<Contract> for ContractPayload {
    fn from(contract: Contract) -> Self {
        let ContractDissolved {
            id,
            employer_id,
            gig_worker_id,
            job_id,
            total_amount,
            terms: _,
            version_hash,
            status,
            employer_signed_at,
            gig_worker_signed_at,
            fully_signed_at,
            cancel_reason,
            aux,
        } = contract.dissolve();

        Self::builder()
            .id(id)
            .employer_id(employer_id)
            .gig_worker_id(gig_worker_id)
            .job_id(job_id)
            .total_amount(total_amount)
            .status(status)
            .version_hash(version_hash)
            .maybe_employer_signed_at(employer_signed_at)
            .maybe_gig_worker_signed_at(gig_worker_signed_at)
            .maybe_fully_signed_at(fully_signed_at)
            .maybe_cancel_reason(cancel_reason)
            .created_at(aux.created_at())
            .updated_at(aux.updated_at())
            .build()
    }
}

impl From<ContractSignature> for SignaturePayload {
    fn from(signature: ContractSignature) -> Self {
        let ContractSignatureDissolved {
            contract_id: _,
            role,
            signer_id,
            full_name,
            signed_at,
            ip_address: _,
            user_agent: _,
            contract_version_hash,
        } = signature.dissolve();

        Self::builder()
            .role(role)
            .signer_id(signer_id)
            .full_name(full_name)
            .signed_at(signed_at)
            .contract_version_hash(contract_version_hash)
            .build()
    }
}

impl From<EscrowAccount> for EscrowAccountPayload {
    fn from(account: EscrowAccount) -> Self {
        let frozen = account.is_frozen();
        let risk_level = account.risk_level();
        let released_amount = account.released_amount();

        let EscrowAccountDissolved {
            id,
            contract_id,
            total_amount,
            platform_fee,
            available_amount,
            milestone_based,
            automatic_release,
            fraud_insurance: _,
            multi_signature: _,
            risk_score: _,
            status,
            terms: _,
            aux,
        } = account.dissolve();

        Self::builder()
            .id(id)
            .contract_id(contract_id)
            .total_amount(total_amount)
            .platform_fee(platform_fee)
            .available_amount(available_amount)
            .released_amount(released_amount)
            .status(status)
            .frozen(frozen)
            .milestone_based(milestone_based)
            .automatic_release(automatic_release)
            .risk_level(risk_level)
            .created_at(aux.created_at())
            .updated_at(aux.updated_at())
            .build()
    }
}

impl From<Milestone> for MilestonePayload {
    fn from(milestone: Milestone) -> Self {
        let MilestoneDissolved {
            id,
            account_id: _,
            description,
            amount,
            order_index,
            status,
            completed_at,
        } = milestone.dissolve();

        Self::builder()
            .id(id)
            .description(description)
            .amount(amount)
            .order_index(order_index)
            .status(status)
            .maybe_completed_at(completed_at)
            .build()
    }
}

impl From<AuditEntry> for AuditEntryPayload {
    fn from(entry: AuditEntry) -> Self {
        let AuditEntryDissolved {
            seq,
            table,
            record_id,
            action,
            old_values: _,
            new_values: _,
            metadata,
            actor_id,
            actor_kind,
            ip_address: _,
            user_agent: _,
            session_id: _,
            previous_hash,
            hash_signature,
            created_at,
        } = entry.dissolve();

        Self::builder()
            .seq(seq)
            .table(table)
            .record_id(record_id)
            .action(action)
            .actor_id(actor_id)
            .actor_kind(actor_kind)
            .maybe_metadata(metadata)
            .previous_hash(previous_hash)
            .hash_signature(hash_signature)
            .created_at(created_at)
            .build()
    }
}
