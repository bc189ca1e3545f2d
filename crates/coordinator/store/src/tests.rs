use std::sync::Arc;

use rust_decimal::Decimal;
use settlement_coordinator_domain::{
    audit::{ActorContext, ActorKind, AuditAction, AuditTable},
    contract::{Contract, ContractStatus, SignerRole},
    escrow::{EscrowAccount, EscrowStatus, EscrowTerms, LedgerError, MilestoneStatus},
};
use uuid::Uuid;

use crate::{
    MilestoneDraft, SettlementStore, SettlementStoreError, SignatureDraft, audit::verify_entries,
};

fn actor(n: u128) -> ActorContext {
    ActorContext::builder()
        .actor_id(Uuid::from_u128(n))
        .actor_kind(ActorKind::User)
        .ip_address("203.0.113.7".to_string())
        .user_agent("settlement-tests/1.0".to_string())
        .build()
}

fn contract() -> Contract<()> {
    Contract::builder()
        .id(Uuid::from_u128(1).into())
        .employer_id(Uuid::from_u128(2).into())
        .gig_worker_id(Uuid::from_u128(3).into())
        .job_id(Uuid::from_u128(4).into())
        .total_amount(Decimal::new(10_000_00, 2))
        .terms("one landing page, two revisions".to_string())
        .version_hash("a".repeat(64))
        .status(ContractStatus::PendingEmployerSignature)
        .aux(())
        .build()
}

fn escrow_account(automatic_release: bool) -> EscrowAccount<()> {
    EscrowAccount::builder()
        .id(Uuid::from_u128(10).into())
        .contract_id(Uuid::from_u128(1).into())
        .total_amount(Decimal::new(10_000_00, 2))
        .platform_fee(Decimal::new(500_00, 2))
        .available_amount(Decimal::new(9_500_00, 2))
        .milestone_based(true)
        .automatic_release(automatic_release)
        .fraud_insurance(false)
        .multi_signature(false)
        .risk_score(0.1)
        .status(EscrowStatus::Active)
        .terms(EscrowTerms::default())
        .aux(())
        .build()
}

fn signature(signer: u128, role: SignerRole) -> SignatureDraft {
    SignatureDraft::builder()
        .signer_id(Uuid::from_u128(signer).into())
        .role(role)
        .full_name("Jordan Reyes".to_string())
        .actor(actor(signer))
        .build()
}

fn milestones() -> Vec<MilestoneDraft> {
    vec![
        MilestoneDraft::builder()
            .id(Uuid::from_u128(100).into())
            .description("wireframes".to_string())
            .amount(Decimal::new(5_000_00, 2))
            .build(),
        MilestoneDraft::builder()
            .id(Uuid::from_u128(101).into())
            .description("final build".to_string())
            .amount(Decimal::new(4_500_00, 2))
            .build(),
    ]
}

#[tokio::test]
async fn signing_flow_appends_a_verifiable_chain() {
    let store = SettlementStore::new();

    store.create_contract(contract(), actor(2)).await.unwrap();
    store
        .apply_contract_signature(Uuid::from_u128(1).into(), signature(2, SignerRole::Employer))
        .await
        .unwrap();
    let (contract, sig) = store
        .apply_contract_signature(Uuid::from_u128(1).into(), signature(3, SignerRole::GigWorker))
        .await
        .unwrap();

    assert_eq!(contract.status(), ContractStatus::FullySigned);
    assert_eq!(sig.contract_version_hash(), contract.version_hash());

    let entries = store.audit_entries().await;
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].action(), AuditAction::Create);
    assert_eq!(entries[0].previous_hash(), "");
    assert_eq!(entries[1].previous_hash(), entries[0].hash_signature());
    assert_eq!(entries[2].previous_hash(), entries[1].hash_signature());
    assert_eq!(verify_entries(&entries), Ok(()));
    assert_eq!(store.verify_audit_chain().await.unwrap(), 3);

    let (fetched, sigs) = store.get_contract(Uuid::from_u128(1).into()).await.unwrap().unwrap();
    assert_eq!(fetched.status(), ContractStatus::FullySigned);
    assert_eq!(sigs.len(), 2);
}

#[tokio::test]
async fn rejected_signature_leaves_no_trace() {
    let store = SettlementStore::new();

    store.create_contract(contract(), actor(2)).await.unwrap();

    let err = store
        .apply_contract_signature(Uuid::from_u128(1).into(), signature(3, SignerRole::GigWorker))
        .await
        .unwrap_err();

    assert!(matches!(err, SettlementStoreError::Signature(_)));

    let (fetched, sigs) = store.get_contract(Uuid::from_u128(1).into()).await.unwrap().unwrap();
    assert_eq!(fetched.status(), ContractStatus::PendingEmployerSignature);
    assert!(sigs.is_empty());
    assert_eq!(store.audit_entries().await.len(), 1);
}

#[tokio::test]
async fn duplicate_contract_ids_are_rejected() {
    let store = SettlementStore::new();

    store.create_contract(contract(), actor(2)).await.unwrap();
    let err = store.create_contract(contract(), actor(2)).await.unwrap_err();

    assert!(matches!(err, SettlementStoreError::Duplicate(_)));
    assert_eq!(store.audit_entries().await.len(), 1);
}

#[tokio::test]
async fn concurrent_same_role_signatures_have_one_winner() {
    let store = Arc::new(SettlementStore::new());

    store.create_contract(contract(), actor(2)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .apply_contract_signature(
                    Uuid::from_u128(1).into(),
                    signature(2, SignerRole::Employer),
                )
                .await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            wins += 1;
        }
    }

    assert_eq!(wins, 1);

    let (fetched, sigs) = store.get_contract(Uuid::from_u128(1).into()).await.unwrap().unwrap();
    assert_eq!(fetched.status(), ContractStatus::PendingGigWorkerSignature);
    assert_eq!(sigs.len(), 1);
    assert_eq!(store.verify_audit_chain().await.unwrap(), 2);
}

#[tokio::test]
async fn milestone_releases_decrement_the_balance_in_order() {
    let store = SettlementStore::new();
    let account_id = Uuid::from_u128(10).into();

    store.create_escrow_account(escrow_account(true), actor(2)).await.unwrap();
    let defined = store.define_milestones(account_id, milestones(), actor(2)).await.unwrap();

    assert_eq!(defined.len(), 2);
    assert_eq!(defined[0].order_index(), 0);
    assert_eq!(defined[1].order_index(), 1);

    let outcome = store
        .apply_milestone_release(account_id, Uuid::from_u128(100).into(), actor(2))
        .await
        .unwrap();

    assert_eq!(outcome.account().available_amount(), Decimal::new(4_500_00, 2));
    assert_eq!(outcome.milestone().status(), MilestoneStatus::Completed);
    assert!(!outcome.all_completed());
    assert!(!outcome.auto_release_ready());

    let outcome = store
        .apply_milestone_release(account_id, Uuid::from_u128(101).into(), actor(2))
        .await
        .unwrap();

    assert_eq!(outcome.account().available_amount(), Decimal::ZERO);
    assert!(outcome.all_completed());
    assert!(outcome.auto_release_ready());

    let released = store.finalize_release(account_id, ActorContext::system()).await.unwrap();
    assert_eq!(released.status(), EscrowStatus::Released);
    assert_eq!(released.released_amount(), Decimal::new(10_000_00, 2));
}

#[tokio::test]
async fn released_milestones_cannot_be_released_twice() {
    let store = SettlementStore::new();
    let account_id = Uuid::from_u128(10).into();

    store.create_escrow_account(escrow_account(false), actor(2)).await.unwrap();
    store.define_milestones(account_id, milestones(), actor(2)).await.unwrap();
    store
        .apply_milestone_release(account_id, Uuid::from_u128(100).into(), actor(2))
        .await
        .unwrap();

    let err = store
        .apply_milestone_release(account_id, Uuid::from_u128(100).into(), actor(2))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SettlementStoreError::Ledger(LedgerError::MilestoneNotPending(MilestoneStatus::Completed))
    ));

    let (account, _) = store.get_escrow_account(account_id).await.unwrap().unwrap();
    assert_eq!(account.available_amount(), Decimal::new(4_500_00, 2));
}

#[tokio::test]
async fn milestones_are_defined_exactly_once_and_bounded_by_balance() {
    let store = SettlementStore::new();
    let account_id = Uuid::from_u128(10).into();

    store.create_escrow_account(escrow_account(false), actor(2)).await.unwrap();

    let oversized = vec![
        MilestoneDraft::builder()
            .id(Uuid::from_u128(100).into())
            .description("everything".to_string())
            .amount(Decimal::new(9_500_01, 2))
            .build(),
    ];
    let err = store.define_milestones(account_id, oversized, actor(2)).await.unwrap_err();
    assert!(matches!(
        err,
        SettlementStoreError::Ledger(LedgerError::MilestoneSumExceedsBalance { .. })
    ));

    store.define_milestones(account_id, milestones(), actor(2)).await.unwrap();

    let err = store.define_milestones(account_id, milestones(), actor(2)).await.unwrap_err();
    assert!(matches!(
        err,
        SettlementStoreError::Ledger(LedgerError::MilestonesAlreadyDefined)
    ));
}

#[tokio::test]
async fn frozen_accounts_refuse_releases_until_unfrozen() {
    let store = SettlementStore::new();
    let account_id = Uuid::from_u128(10).into();

    store.create_escrow_account(escrow_account(false), actor(2)).await.unwrap();
    store.define_milestones(account_id, milestones(), actor(2)).await.unwrap();

    let frozen = store
        .freeze_escrow_account(account_id, "chargeback reported".to_string(), actor(2))
        .await
        .unwrap();

    assert!(frozen.is_frozen());
    assert_eq!(frozen.status(), EscrowStatus::Disputed);
    assert_eq!(
        frozen.terms().freeze().map(|f| f.reason()),
        Some("chargeback reported")
    );

    let err = store
        .apply_milestone_release(account_id, Uuid::from_u128(100).into(), actor(2))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementStoreError::Ledger(LedgerError::Frozen)));

    let err = store
        .freeze_escrow_account(account_id, "again".to_string(), actor(2))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementStoreError::Ledger(LedgerError::Frozen)));
}

#[tokio::test]
async fn audit_lookups_cover_missing_and_valid_entries() {
    let store = SettlementStore::new();

    store.create_contract(contract(), actor(2)).await.unwrap();

    let entry = store.verify_audit_entry(0).await.unwrap();
    assert_eq!(entry.table(), AuditTable::Contracts);
    assert_eq!(entry.record_id(), Uuid::from_u128(1));

    let err = store.verify_audit_entry(99).await.unwrap_err();
    assert!(matches!(err, SettlementStoreError::NotFound(_)));

    let err = store.get_contract(Uuid::from_u128(42).into()).await.unwrap();
    assert!(err.is_none());
}
