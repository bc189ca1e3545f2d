//! Persistence layer for the settlement coordinator.
//!
//! This crate provides storage and retrieval operations for contracts,
//! captured signatures, escrow accounts, milestones and the hash-chained
//! audit log. It acts as the data access layer for the coordinator and is
//! the single place where settlement invariants are enforced under a lock.
//!
//! # Architecture
//!
//! Storage is in-memory, built on [tokio](docs.rs/tokio) synchronization
//! primitives:
//! - One mutex per entity (contract or escrow account), so invariant-critical
//!   transitions serialize per row: two concurrent `sign` calls for the same
//!   role have exactly one winner, and a release can never observe a stale
//!   balance.
//! - One mutex around the audit log, giving the strict global write order the
//!   hash chain requires: each append reads the previous entry's hash and
//!   pushes the next entry atomically.
//!
//! Every state-changing operation appends its audit entry inside the same
//! critical section that commits the state change; a change without its
//! audit entry (or vice versa) cannot be observed.
//!
//! # Main Components
//!
//! - [`SettlementStore`] - The primary interface for storage operations
//! - [`SettlementStoreError`] - Error types for store operations
//! - [`audit`] - Pure hash-chain derivation and verification helpers, usable
//!   by compliance tooling on exported entries

mod error;
mod persistence;

#[cfg(test)]
mod tests;

pub use self::{
    error::SettlementStoreError,
    persistence::audit::{AuditDraft, ChainDefect},
};

/// Pure audit-chain helpers for compliance tooling.
pub mod audit {
    pub use crate::persistence::audit::{entry_hash, verify_entries, verify_entry};
}

use std::{collections::HashMap, sync::Arc};

use bon::Builder;
use chrono::Utc;
use dissolve_derive::Dissolve;
use rust_decimal::Decimal;
use serde::Serialize;
use settlement_coordinator_domain::{
    ContractId, EscrowAccountId, MilestoneId, Timestamps, UserId,
    audit::{ActorContext, AuditAction, AuditEntry, AuditTable},
    contract::{Contract, ContractSignature, SignerRole},
    escrow::{EscrowAccount, EscrowStatus, LedgerError, Milestone, MilestoneStatus},
    money,
};
use tokio::sync::{Mutex, RwLock};

use self::{
    error::Result,
    persistence::{
        audit::AuditLog,
        cell::{ContractCell, EscrowCell},
    },
};

/// Everything needed to capture one contract signature; the store stamps the
/// signature time and binds the contract version hash itself.
#[derive(Debug, Builder, Dissolve)]
pub struct SignatureDraft {
    /// The signing user.
    signer_id: UserId,

    /// The role the signer holds on the contract.
    role: SignerRole,

    /// The full legal name exactly as typed.
    full_name: String,

    /// The identity and request provenance of the signer.
    actor: ActorContext,
}

/// One milestone definition; the store assigns the order index from the
/// position in the submitted sequence.
#[derive(Debug, Builder, Dissolve)]
pub struct MilestoneDraft {
    /// The pre-generated milestone id.
    id: MilestoneId,

    /// What must be delivered.
    description: String,

    /// The share of escrowed funds this milestone releases.
    amount: Decimal,
}

/// The state observed immediately after a milestone release committed.
#[derive(Debug, Dissolve)]
pub struct MilestoneReleaseOutcome {
    /// The account after the balance decrement.
    account: EscrowAccount,

    /// The milestone, now completed.
    milestone: Milestone,

    /// Whether every milestone on the account is now completed.
    all_completed: bool,

    /// Whether the automatic-release predicate held right after the commit.
    auto_release_ready: bool,
}

impl MilestoneReleaseOutcome {
    /// Returns the account after the balance decrement.
    pub fn account(&self) -> &EscrowAccount {
        &self.account
    }

    /// Returns the released milestone.
    pub fn milestone(&self) -> &Milestone {
        &self.milestone
    }

    /// Returns whether every milestone on the account is now completed.
    pub fn all_completed(&self) -> bool {
        self.all_completed
    }

    /// Returns whether the automatic-release predicate held right after the
    /// commit.
    pub fn auto_release_ready(&self) -> bool {
        self.auto_release_ready
    }
}

/// The main store interface for settlement coordinator persistence
/// operations.
#[derive(Debug, Default)]
pub struct SettlementStore {
    contracts: RwLock<HashMap<ContractId, Arc<Mutex<ContractCell>>>>,
    escrows: RwLock<HashMap<EscrowAccountId, Arc<Mutex<EscrowCell>>>>,
    audit: Mutex<AuditLog>,
}

impl SettlementStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettlementStore {
    /// Persists a freshly initiated contract and appends its `CREATE` audit
    /// entry.
    ///
    /// # Errors
    ///
    /// Returns an error if a contract with the same id already exists or the
    /// audit chain is halted.
    #[tracing::instrument(skip_all, fields(contract_id = %contract.id()))]
    pub async fn create_contract(
        &self,
        contract: Contract<()>,
        actor: ActorContext,
    ) -> Result<Contract> {
        let now = Utc::now();
        let timestamps = Timestamps::builder().created_at(now).updated_at(now).build();
        let (contract, ()) = contract.with_aux(timestamps);

        let mut contracts = self.contracts.write().await;

        if contracts.contains_key(&contract.id()) {
            return Err(SettlementStoreError::duplicate(format!(
                "contract {} already exists",
                contract.id()
            )));
        }

        let mut audit = self.audit.lock().await;
        audit.ensure_writable()?;

        let draft = AuditDraft::builder()
            .table(AuditTable::Contracts)
            .record_id(contract.id().into())
            .action(AuditAction::Create)
            .new_values(snapshot(&contract)?)
            .actor(actor)
            .build();

        audit.append(draft, now)?;

        contracts.insert(
            contract.id(),
            Arc::new(Mutex::new(ContractCell {
                contract: contract.clone(),
                signatures: Vec::new(),
            })),
        );

        Ok(contract)
    }

    /// Records a signature for one (contract, role) pair and advances the
    /// contract state machine, all inside the contract's row lock.
    ///
    /// # Errors
    ///
    /// Returns the state machine's rejection (out-of-order, already signed,
    /// terminal) unchanged; nothing is recorded in that case.
    #[tracing::instrument(skip_all, fields(%contract_id, role = %draft.role))]
    pub async fn apply_contract_signature(
        &self,
        contract_id: ContractId,
        draft: SignatureDraft,
    ) -> Result<(Contract, ContractSignature)> {
        let SignatureDraftDissolved { signer_id, role, full_name, actor } = draft.dissolve();

        let cell = self.contract_cell(contract_id).await?;
        let mut cell = cell.lock().await;

        let mut audit = self.audit.lock().await;
        audit.ensure_writable()?;

        let now = Utc::now();

        let mut contract = cell.contract.clone();
        let old_values = snapshot(&contract)?;

        contract.accept_signature(role, now)?;

        let aux = contract.aux().touched(now);
        let (contract, _) = contract.with_aux(aux);

        let signature = ContractSignature::builder()
            .contract_id(contract_id)
            .role(role)
            .signer_id(signer_id)
            .full_name(full_name)
            .signed_at(now)
            .maybe_ip_address(actor.ip_address().map(str::to_owned))
            .maybe_user_agent(actor.user_agent().map(str::to_owned))
            .contract_version_hash(contract.version_hash().to_owned())
            .build();

        let entry_draft = AuditDraft::builder()
            .table(AuditTable::Contracts)
            .record_id(contract_id.into())
            .action(AuditAction::Update)
            .old_values(old_values)
            .new_values(snapshot(&contract)?)
            .metadata(format!("signature_role:{role}"))
            .actor(actor)
            .build();

        audit.append(entry_draft, now)?;

        cell.contract = contract.clone();
        cell.signatures.push(signature.clone());

        Ok((contract, signature))
    }

    /// Cancels a non-terminal contract.
    ///
    /// Does not touch escrow funds; a compensating refund is driven by the
    /// external dispute-resolution process.
    #[tracing::instrument(skip_all, fields(%contract_id))]
    pub async fn cancel_contract(
        &self,
        contract_id: ContractId,
        reason: String,
        actor: ActorContext,
    ) -> Result<Contract> {
        let cell = self.contract_cell(contract_id).await?;
        let mut cell = cell.lock().await;

        let mut audit = self.audit.lock().await;
        audit.ensure_writable()?;

        let now = Utc::now();

        let mut contract = cell.contract.clone();
        let old_values = snapshot(&contract)?;

        contract.cancel(reason)?;

        let aux = contract.aux().touched(now);
        let (contract, _) = contract.with_aux(aux);

        let entry_draft = AuditDraft::builder()
            .table(AuditTable::Contracts)
            .record_id(contract_id.into())
            .action(AuditAction::Update)
            .old_values(old_values)
            .new_values(snapshot(&contract)?)
            .metadata("cancelled".to_owned())
            .actor(actor)
            .build();

        audit.append(entry_draft, now)?;

        cell.contract = contract.clone();

        Ok(contract)
    }

    /// Retrieves a contract with its captured signatures.
    ///
    /// # Returns
    ///
    /// Returns `Some((contract, signatures))` if found, or `None` if no such
    /// contract exists.
    #[tracing::instrument(skip_all, fields(%contract_id))]
    pub async fn get_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Option<(Contract, Vec<ContractSignature>)>> {
        let Some(cell) = self.contracts.read().await.get(&contract_id).cloned() else {
            return Ok(None);
        };

        let cell = cell.lock().await;

        Ok(Some((cell.contract.clone(), cell.signatures.clone())))
    }

    /// Persists a freshly funded escrow account and appends its `CREATE`
    /// audit entry.
    #[tracing::instrument(skip_all, fields(account_id = %account.id()))]
    pub async fn create_escrow_account(
        &self,
        account: EscrowAccount<()>,
        actor: ActorContext,
    ) -> Result<EscrowAccount> {
        let now = Utc::now();
        let timestamps = Timestamps::builder().created_at(now).updated_at(now).build();
        let (account, ()) = account.with_aux(timestamps);

        let mut escrows = self.escrows.write().await;

        if escrows.contains_key(&account.id()) {
            return Err(SettlementStoreError::duplicate(format!(
                "escrow account {} already exists",
                account.id()
            )));
        }

        let mut audit = self.audit.lock().await;
        audit.ensure_writable()?;

        let draft = AuditDraft::builder()
            .table(AuditTable::EscrowAccounts)
            .record_id(account.id().into())
            .action(AuditAction::Create)
            .new_values(snapshot(&account)?)
            .actor(actor)
            .build();

        audit.append(draft, now)?;

        escrows.insert(
            account.id(),
            Arc::new(Mutex::new(EscrowCell { account: account.clone(), milestones: Vec::new() })),
        );

        Ok(account)
    }

    /// Attaches the ordered milestone sequence to an account, once.
    ///
    /// The submitted order determines `order_index`, release order and "next
    /// milestone" queries. The amounts must each be positive 2-decimal
    /// values and may not sum past the unreleased balance.
    #[tracing::instrument(skip_all, fields(%account_id, count = drafts.len()))]
    pub async fn define_milestones(
        &self,
        account_id: EscrowAccountId,
        drafts: Vec<MilestoneDraft>,
        actor: ActorContext,
    ) -> Result<Vec<Milestone>> {
        let cell = self.escrow_cell(account_id).await?;
        let mut cell = cell.lock().await;

        let mut audit = self.audit.lock().await;
        audit.ensure_writable()?;

        if cell.account.is_frozen() {
            return Err(LedgerError::Frozen.into());
        }

        if cell.account.status() != EscrowStatus::Active {
            return Err(LedgerError::NotActive(cell.account.status()).into());
        }

        if !cell.milestones.is_empty() {
            return Err(LedgerError::MilestonesAlreadyDefined.into());
        }

        let mut sum = Decimal::ZERO;

        for draft in &drafts {
            if !money::is_positive_amount(draft.amount) {
                return Err(LedgerError::InvalidAmount(draft.amount).into());
            }

            sum += draft.amount;
        }

        if sum > cell.account.available_amount() {
            return Err(LedgerError::MilestoneSumExceedsBalance {
                sum,
                available: cell.account.available_amount(),
            }
            .into());
        }

        let now = Utc::now();

        let milestones: Vec<Milestone> = drafts
            .into_iter()
            .enumerate()
            .map(|(idx, draft)| {
                let MilestoneDraftDissolved { id, description, amount } = draft.dissolve();

                Milestone::builder()
                    .id(id)
                    .account_id(account_id)
                    .description(description)
                    .amount(amount)
                    .order_index(idx as u32)
                    .status(MilestoneStatus::Pending)
                    .build()
            })
            .collect();

        let entry_draft = AuditDraft::builder()
            .table(AuditTable::EscrowMilestones)
            .record_id(account_id.into())
            .action(AuditAction::Create)
            .new_values(snapshot(&milestones)?)
            .metadata(format!("milestones_defined:{}", milestones.len()))
            .actor(actor)
            .build();

        audit.append(entry_draft, now)?;

        cell.milestones = milestones.clone();

        Ok(milestones)
    }

    /// Releases one pending milestone: marks it completed and decrements the
    /// account's unreleased balance by its share, all inside the account's
    /// row lock.
    ///
    /// # Errors
    ///
    /// Rejects frozen accounts, non-active accounts, non-pending milestones
    /// and releases that would drive the balance negative; nothing is
    /// mutated in those cases.
    #[tracing::instrument(skip_all, fields(%account_id, %milestone_id))]
    pub async fn apply_milestone_release(
        &self,
        account_id: EscrowAccountId,
        milestone_id: MilestoneId,
        actor: ActorContext,
    ) -> Result<MilestoneReleaseOutcome> {
        let cell = self.escrow_cell(account_id).await?;
        let mut cell = cell.lock().await;

        let mut audit = self.audit.lock().await;
        audit.ensure_writable()?;

        let now = Utc::now();

        let mut account = cell.account.clone();
        let mut milestones = cell.milestones.clone();

        let old_values = snapshot(&account)?;

        let milestone = milestones
            .iter_mut()
            .find(|m| m.id() == milestone_id)
            .ok_or_else(|| {
                SettlementStoreError::not_found(format!("milestone {milestone_id} not found"))
            })?;

        if milestone.status() != MilestoneStatus::Pending {
            return Err(LedgerError::MilestoneNotPending(milestone.status()).into());
        }

        account.release(milestone.amount())?;
        milestone.complete(now)?;

        let milestone = milestone.clone();

        let aux = account.aux().touched(now);
        let (account, _) = account.with_aux(aux);

        let all_completed =
            milestones.iter().all(|m| m.status() == MilestoneStatus::Completed);
        let auto_release_ready = account.can_auto_release(&milestones);

        let entry_draft = AuditDraft::builder()
            .table(AuditTable::EscrowAccounts)
            .record_id(account_id.into())
            .action(AuditAction::Update)
            .old_values(old_values)
            .new_values(snapshot(&account)?)
            .metadata(format!("milestone_released:{milestone_id}"))
            .actor(actor)
            .build();

        audit.append(entry_draft, now)?;

        cell.account = account.clone();
        cell.milestones = milestones;

        Ok(MilestoneReleaseOutcome { account, milestone, all_completed, auto_release_ready })
    }

    /// Marks an account fully released. Terminal; used for the final
    /// (automatic or explicit) release.
    #[tracing::instrument(skip_all, fields(%account_id))]
    pub async fn finalize_release(
        &self,
        account_id: EscrowAccountId,
        actor: ActorContext,
    ) -> Result<EscrowAccount> {
        let cell = self.escrow_cell(account_id).await?;
        let mut cell = cell.lock().await;

        let mut audit = self.audit.lock().await;
        audit.ensure_writable()?;

        let now = Utc::now();

        let mut account = cell.account.clone();
        let old_values = snapshot(&account)?;

        account.mark_released()?;

        let aux = account.aux().touched(now);
        let (account, _) = account.with_aux(aux);

        let entry_draft = AuditDraft::builder()
            .table(AuditTable::EscrowAccounts)
            .record_id(account_id.into())
            .action(AuditAction::Update)
            .old_values(old_values)
            .new_values(snapshot(&account)?)
            .metadata("final_release".to_owned())
            .actor(actor)
            .build();

        audit.append(entry_draft, now)?;

        cell.account = account.clone();

        Ok(account)
    }

    /// Freezes an account: status `disputed` plus a freeze marker in the
    /// terms. Blocks all further releases until lifted externally.
    #[tracing::instrument(skip_all, fields(%account_id))]
    pub async fn freeze_escrow_account(
        &self,
        account_id: EscrowAccountId,
        reason: String,
        actor: ActorContext,
    ) -> Result<EscrowAccount> {
        let cell = self.escrow_cell(account_id).await?;
        let mut cell = cell.lock().await;

        let mut audit = self.audit.lock().await;
        audit.ensure_writable()?;

        let now = Utc::now();

        let mut account = cell.account.clone();
        let old_values = snapshot(&account)?;

        account.freeze(reason.clone(), now)?;

        let aux = account.aux().touched(now);
        let (account, _) = account.with_aux(aux);

        let entry_draft = AuditDraft::builder()
            .table(AuditTable::EscrowAccounts)
            .record_id(account_id.into())
            .action(AuditAction::Update)
            .old_values(old_values)
            .new_values(snapshot(&account)?)
            .metadata(format!("frozen:{reason}"))
            .actor(actor)
            .build();

        audit.append(entry_draft, now)?;

        cell.account = account.clone();

        Ok(account)
    }

    /// Retrieves an escrow account with its ordered milestones.
    #[tracing::instrument(skip_all, fields(%account_id))]
    pub async fn get_escrow_account(
        &self,
        account_id: EscrowAccountId,
    ) -> Result<Option<(EscrowAccount, Vec<Milestone>)>> {
        let Some(cell) = self.escrows.read().await.get(&account_id).cloned() else {
            return Ok(None);
        };

        let cell = cell.lock().await;

        Ok(Some((cell.account.clone(), cell.milestones.clone())))
    }

    /// Returns every audit entry in global write order.
    #[tracing::instrument(skip_all)]
    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.lock().await.entries().to_vec()
    }

    /// Verifies a single entry against its stored fields and
    /// `previous_hash`.
    ///
    /// A mismatch halts the chain against further writes and is returned as
    /// a tamper error. Note this validates one link only; historical
    /// tampering is caught by [`verify_audit_chain`](Self::verify_audit_chain),
    /// which re-derives the whole chain.
    #[tracing::instrument(skip_all, fields(seq))]
    pub async fn verify_audit_entry(&self, seq: u64) -> Result<AuditEntry> {
        let mut audit = self.audit.lock().await;

        let entry = audit
            .entry(seq)
            .cloned()
            .ok_or_else(|| SettlementStoreError::not_found(format!("audit entry {seq} not found")))?;

        if let Err(defect) = persistence::audit::verify_entry(&entry) {
            audit.halt();
            return Err(defect.into());
        }

        Ok(entry)
    }

    /// Full-chain scan: verifies every entry and every predecessor link.
    ///
    /// # Returns
    ///
    /// The number of verified entries on success. A defect halts the chain
    /// against further writes.
    #[tracing::instrument(skip_all)]
    pub async fn verify_audit_chain(&self) -> Result<u64> {
        self.audit.lock().await.verify().map_err(From::from)
    }

    async fn contract_cell(&self, contract_id: ContractId) -> Result<Arc<Mutex<ContractCell>>> {
        self.contracts.read().await.get(&contract_id).cloned().ok_or_else(|| {
            SettlementStoreError::not_found(format!("contract {contract_id} not found"))
        })
    }

    async fn escrow_cell(&self, account_id: EscrowAccountId) -> Result<Arc<Mutex<EscrowCell>>> {
        self.escrows.read().await.get(&account_id).cloned().ok_or_else(|| {
            SettlementStoreError::not_found(format!("escrow account {account_id} not found"))
        })
    }
}

fn snapshot<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(From::from)
}
