#![allow(missing_docs)]

//! The settlement engine: orchestration of contract signing, escrow
//! releases and audit verification over the store, gated by risk policy.
//!
//! The engine owns no settlement rules of its own; state transitions live in
//! the domain types and are committed by the store. What the engine adds is
//! the orchestration around them: risk gate checks before money moves,
//! contract/escrow cross-checks, payout dispatch, notification fan-out and
//! incident handling for audit verification failures.

mod collaborators;
mod error;
mod risk_gate;
mod types;

pub use self::{
    collaborators::{
        CollaboratorError, FraudOracle, IdGenerator, NotificationEvent, NotificationService,
        PaymentGateway, UuidGenerator,
    },
    error::SettlementEngineError,
    risk_gate::{GateAction, RiskGate, RiskGateConfig, RiskGateError, ScoreScale},
    types::{request, response},
};

use std::sync::Arc;

use settlement_coordinator_domain::{
    audit::{ActorContext, AuditEntry},
    contract::{Contract, ContractStatus, SignatureError},
    escrow::{self, EscrowAccount, EscrowStatus, EscrowTerms},
};
use settlement_coordinator_store::{
    MilestoneDraft, MilestoneReleaseOutcomeDissolved, SettlementStore, SignatureDraft,
};
use sha2::{Digest, Sha256};

use self::types::{
    request::{
        CancelContractRequest, CancelContractRequestDissolved, DefineMilestonesRequest,
        DefineMilestonesRequestDissolved, FreezeEscrowRequest, FreezeEscrowRequestDissolved,
        FundEscrowRequest, FundEscrowRequestDissolved, GetContractRequest,
        GetContractRequestDissolved, GetEscrowAccountRequest, GetEscrowAccountRequestDissolved,
        InitiateContractRequest, InitiateContractRequestDissolved, MilestoneSpecDissolved,
        ReleaseMilestoneRequest, ReleaseMilestoneRequestDissolved, SignContractRequest,
        SignContractRequestDissolved,
    },
    response::{
        CancelContractResponse, DefineMilestonesResponse, FreezeEscrowResponse, FundEscrowResponse,
        GetContractResponse, GetEscrowAccountResponse, InitiateContractResponse,
        ReleaseMilestoneResponse, SignContractResponse,
    },
};

pub struct SettlementEngine {
    store: SettlementStore,
    risk_gate: RiskGate,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationService>,
    ids: Arc<dyn IdGenerator>,
}

#[bon::bon]
impl SettlementEngine {
    #[builder]
    pub fn new(
        store: SettlementStore,
        oracle: Arc<dyn FraudOracle>,
        risk_config: RiskGateConfig,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationService>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            risk_gate: RiskGate::new(oracle, risk_config),
            payments,
            notifier,
            ids,
        }
    }
}

impl SettlementEngine {
    /// Initiates a contract for an accepted job. The contract starts
    /// awaiting the employer's signature; signatures bind to the SHA-256
    /// digest of the terms computed here.
    #[tracing::instrument(skip_all)]
    pub async fn initiate_contract(
        &self,
        request: InitiateContractRequest,
    ) -> Result<InitiateContractResponse, SettlementEngineError> {
        let InitiateContractRequestDissolved {
            employer_id,
            gig_worker_id,
            job_id,
            total_amount,
            terms,
            actor,
        } = request.dissolve();

        let version_hash = terms_hash(&terms);

        let contract = Contract::builder()
            .id(self.ids.generate().into())
            .employer_id(employer_id)
            .gig_worker_id(gig_worker_id)
            .job_id(job_id)
            .total_amount(total_amount)
            .terms(terms)
            .version_hash(version_hash)
            .status(ContractStatus::PendingEmployerSignature)
            .aux(())
            .build();

        let contract = self.store.create_contract(contract, actor).await?;

        self.notify(NotificationEvent::ContractInitiated { contract_id: contract.id() }).await;

        Ok(InitiateContractResponse::builder().contract(contract).build())
    }

    /// Records one party's signature, after the risk gate clears the signer.
    #[tracing::instrument(skip_all)]
    pub async fn sign_contract(
        &self,
        request: SignContractRequest,
    ) -> Result<SignContractResponse, SettlementEngineError> {
        let SignContractRequestDissolved { contract_id, signer_id, full_name, actor } =
            request.dissolve();

        let (contract, _) = self
            .store
            .get_contract(contract_id)
            .await?
            .ok_or_else(|| {
                SettlementEngineError::not_found(format!("contract {contract_id} not found"))
            })?;

        let role = contract.role_of(signer_id).ok_or(SignatureError::NotParticipant)?;

        self.risk_gate.check(signer_id, GateAction::Sign).await?;

        let draft = SignatureDraft::builder()
            .signer_id(signer_id)
            .role(role)
            .full_name(full_name)
            .actor(actor)
            .build();

        let (contract, signature) =
            self.store.apply_contract_signature(contract_id, draft).await?;

        self.notify(NotificationEvent::SignatureRecorded { contract_id, role }).await;

        if contract.status() == ContractStatus::FullySigned {
            self.notify(NotificationEvent::ContractFullySigned { contract_id }).await;
        }

        Ok(SignContractResponse::builder().contract(contract).signature(signature).build())
    }

    /// Cancels a non-terminal contract on behalf of one of its participants.
    #[tracing::instrument(skip_all)]
    pub async fn cancel_contract(
        &self,
        request: CancelContractRequest,
    ) -> Result<CancelContractResponse, SettlementEngineError> {
        let CancelContractRequestDissolved { contract_id, cancelled_by, reason, actor } =
            request.dissolve();

        let (contract, _) = self
            .store
            .get_contract(contract_id)
            .await?
            .ok_or_else(|| {
                SettlementEngineError::not_found(format!("contract {contract_id} not found"))
            })?;

        contract.role_of(cancelled_by).ok_or(SignatureError::NotParticipant)?;

        let contract = self.store.cancel_contract(contract_id, reason, actor).await?;

        self.notify(NotificationEvent::ContractCancelled { contract_id }).await;

        Ok(CancelContractResponse::builder().contract(contract).build())
    }

    /// Funds an escrow account for a fully signed contract.
    ///
    /// The funding employer must clear the risk gate; the normalized score
    /// observed there is recorded on the account. The unreleased balance
    /// starts at the funded total minus the platform fee.
    #[tracing::instrument(skip_all)]
    pub async fn fund_escrow(
        &self,
        request: FundEscrowRequest,
    ) -> Result<FundEscrowResponse, SettlementEngineError> {
        let FundEscrowRequestDissolved {
            contract_id,
            total_amount,
            platform_fee,
            milestone_based,
            automatic_release,
            fraud_insurance,
            multi_signature,
            actor,
        } = request.dissolve();

        let (contract, _) = self
            .store
            .get_contract(contract_id)
            .await?
            .ok_or_else(|| {
                SettlementEngineError::not_found(format!("contract {contract_id} not found"))
            })?;

        if contract.status() != ContractStatus::FullySigned {
            return Err(SettlementEngineError::ContractNotFullySigned(contract_id));
        }

        let risk_score =
            self.risk_gate.check(contract.employer_id(), GateAction::FundEscrow).await?;

        let account = EscrowAccount::builder()
            .id(self.ids.generate().into())
            .contract_id(contract_id)
            .total_amount(total_amount)
            .platform_fee(platform_fee)
            .available_amount(total_amount - platform_fee)
            .milestone_based(milestone_based)
            .automatic_release(automatic_release)
            .fraud_insurance(fraud_insurance)
            .multi_signature(multi_signature)
            .risk_score(risk_score)
            .status(EscrowStatus::Active)
            .terms(EscrowTerms::default())
            .aux(())
            .build();

        let account = self.store.create_escrow_account(account, actor).await?;

        self.notify(NotificationEvent::EscrowFunded { account_id: account.id(), contract_id })
            .await;

        Ok(FundEscrowResponse::builder().account(account).build())
    }

    /// Attaches the ordered milestone sequence to an escrow account, once.
    #[tracing::instrument(skip_all)]
    pub async fn define_milestones(
        &self,
        request: DefineMilestonesRequest,
    ) -> Result<DefineMilestonesResponse, SettlementEngineError> {
        let DefineMilestonesRequestDissolved { account_id, milestones, actor } =
            request.dissolve();

        let drafts = milestones
            .into_iter()
            .map(|spec| {
                let MilestoneSpecDissolved { description, amount } = spec.dissolve();

                MilestoneDraft::builder()
                    .id(self.ids.generate().into())
                    .description(description)
                    .amount(amount)
                    .build()
            })
            .collect();

        let milestones = self.store.define_milestones(account_id, drafts, actor).await?;

        Ok(DefineMilestonesResponse::builder().milestones(milestones).build())
    }

    /// Releases one pending milestone's share of escrowed funds.
    ///
    /// The linked contract must be fully signed and the gig worker must
    /// clear the risk gate. The payout is dispatched best-effort after the
    /// balance change commits; if this release completes the last milestone
    /// on an automatic-release account, the final release fires in the same
    /// call under the system actor.
    #[tracing::instrument(skip_all)]
    pub async fn release_milestone(
        &self,
        request: ReleaseMilestoneRequest,
    ) -> Result<ReleaseMilestoneResponse, SettlementEngineError> {
        let ReleaseMilestoneRequestDissolved { account_id, milestone_id, actor } =
            request.dissolve();

        let (account, _) = self
            .store
            .get_escrow_account(account_id)
            .await?
            .ok_or_else(|| {
                SettlementEngineError::not_found(format!("escrow account {account_id} not found"))
            })?;

        let (contract, _) = self
            .store
            .get_contract(account.contract_id())
            .await?
            .ok_or_else(|| {
                SettlementEngineError::not_found(format!(
                    "contract {} not found",
                    account.contract_id()
                ))
            })?;

        if contract.status() != ContractStatus::FullySigned {
            return Err(SettlementEngineError::ContractNotFullySigned(contract.id()));
        }

        self.risk_gate.check(contract.gig_worker_id(), GateAction::ReleaseMilestone).await?;

        let outcome = self.store.apply_milestone_release(account_id, milestone_id, actor).await?;

        let MilestoneReleaseOutcomeDissolved {
            account, milestone, all_completed: _, auto_release_ready,
        } = outcome.dissolve();

        // the ledger change is committed; a payout failure is retried by the
        // payment rail's own reconciliation, not by rolling back the release
        if let Err(err) =
            self.payments.payout(contract.gig_worker_id(), milestone.amount()).await
        {
            tracing::error!(%account_id, milestone_id = %milestone.id(), %err, "payout dispatch failed");
        }

        self.notify(NotificationEvent::MilestoneReleased {
            account_id,
            milestone_id: milestone.id(),
            amount: milestone.amount(),
        })
        .await;

        let (account, auto_released) = if auto_release_ready {
            let account = self.store.finalize_release(account_id, ActorContext::system()).await?;

            self.notify(NotificationEvent::EscrowReleased { account_id }).await;

            (account, true)
        } else {
            (account, false)
        };

        let response = ReleaseMilestoneResponse::builder()
            .account(account)
            .milestone(milestone)
            .auto_released(auto_released)
            .build();

        Ok(response)
    }

    /// Freezes an escrow account pending dispute resolution.
    #[tracing::instrument(skip_all)]
    pub async fn freeze_escrow(
        &self,
        request: FreezeEscrowRequest,
    ) -> Result<FreezeEscrowResponse, SettlementEngineError> {
        let FreezeEscrowRequestDissolved { account_id, reason, actor } = request.dissolve();

        let account = self.store.freeze_escrow_account(account_id, reason, actor).await?;

        self.notify(NotificationEvent::EscrowFrozen { account_id }).await;

        Ok(FreezeEscrowResponse::builder().account(account).build())
    }

    /// Retrieves a contract with its captured signatures.
    #[tracing::instrument(skip_all)]
    pub async fn get_contract(
        &self,
        request: GetContractRequest,
    ) -> Result<GetContractResponse, SettlementEngineError> {
        let GetContractRequestDissolved { contract_id } = request.dissolve();

        let (contract, signatures) = match self.store.get_contract(contract_id).await? {
            Some((contract, signatures)) => (Some(contract), signatures),
            None => (None, Vec::new()),
        };

        Ok(GetContractResponse::builder()
            .maybe_contract(contract)
            .signatures(signatures)
            .build())
    }

    /// Retrieves an escrow account with its milestones and completion
    /// percentage.
    #[tracing::instrument(skip_all)]
    pub async fn get_escrow_account(
        &self,
        request: GetEscrowAccountRequest,
    ) -> Result<GetEscrowAccountResponse, SettlementEngineError> {
        let GetEscrowAccountRequestDissolved { account_id } = request.dissolve();

        let (account, milestones) = match self.store.get_escrow_account(account_id).await? {
            Some((account, milestones)) => (Some(account), milestones),
            None => (None, Vec::new()),
        };

        let completion_percentage = escrow::completion_percentage(&milestones);

        Ok(GetEscrowAccountResponse::builder()
            .maybe_account(account)
            .milestones(milestones)
            .completion_percentage(completion_percentage)
            .build())
    }

    /// Returns every audit entry in global write order.
    #[tracing::instrument(skip_all)]
    pub async fn list_audit_entries(&self) -> Vec<AuditEntry> {
        self.store.audit_entries().await
    }

    /// Verifies a single audit entry. A defect halts the chain and surfaces
    /// as a tamper incident.
    #[tracing::instrument(skip_all, fields(seq))]
    pub async fn verify_audit_entry(&self, seq: u64) -> Result<AuditEntry, SettlementEngineError> {
        self.store.verify_audit_entry(seq).await.map_err(From::from)
    }

    /// Full-chain audit scan; returns the number of verified entries.
    #[tracing::instrument(skip_all)]
    pub async fn verify_audit_chain(&self) -> Result<u64, SettlementEngineError> {
        self.store.verify_audit_chain().await.map_err(From::from)
    }

    async fn notify(&self, event: NotificationEvent) {
        if let Err(err) = self.notifier.notify(event).await {
            tracing::warn!(%err, "notification delivery failed");
        }
    }
}

/// SHA-256 hex digest of the contract terms; signatures bind to this value.
fn terms_hash(terms: &str) -> String {
    hex::encode(Sha256::digest(terms.as_bytes()))
}
