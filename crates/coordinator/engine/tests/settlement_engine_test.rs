//! integration tests for settlement-coordinator-engine

use std::sync::Arc;

use rust_decimal::Decimal;
use settlement_coordinator_domain::{
    ContractId, EscrowAccountId, UserId,
    audit::{ActorContext, ActorKind},
    contract::{ContractStatus, SignatureError, SignerRole},
    escrow::{EscrowStatus, LedgerError, MilestoneStatus},
};
use settlement_coordinator_engine::{
    NotificationEvent, RiskGateConfig, ScoreScale, SettlementEngine, SettlementEngineError,
    request::{
        CancelContractRequest, DefineMilestonesRequest, FreezeEscrowRequest, FundEscrowRequest,
        GetEscrowAccountRequest, InitiateContractRequest, InitiateContractRequestError,
        MilestoneSpec, ReleaseMilestoneRequest, SignContractRequest,
    },
    response::{
        FundEscrowResponseDissolved, GetEscrowAccountResponseDissolved,
        InitiateContractResponseDissolved, ReleaseMilestoneResponseDissolved,
        SignContractResponseDissolved,
    },
};
use settlement_coordinator_store::SettlementStore;
use settlement_test_utils::{
    RecordingNotifier, RecordingPaymentGateway, SequentialIdGenerator, StubFraudOracle,
};
use uuid::Uuid;

const EMPLOYER: u128 = 1001;
const GIG_WORKER: u128 = 1002;
const JOB: u128 = 2001;

struct Harness {
    engine: SettlementEngine,
    oracle: Arc<StubFraudOracle>,
    payments: Arc<RecordingPaymentGateway>,
    notifier: Arc<RecordingNotifier>,
    ids: Arc<SequentialIdGenerator>,
}

fn harness() -> Harness {
    let oracle = Arc::new(StubFraudOracle::default());
    let payments = Arc::new(RecordingPaymentGateway::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let ids = Arc::new(SequentialIdGenerator::default());

    let oracle_dyn: Arc<dyn settlement_coordinator_engine::FraudOracle> = oracle.clone();
    let payments_dyn: Arc<dyn settlement_coordinator_engine::PaymentGateway> = payments.clone();
    let notifier_dyn: Arc<dyn settlement_coordinator_engine::NotificationService> =
        notifier.clone();
    let ids_dyn: Arc<dyn settlement_coordinator_engine::IdGenerator> = ids.clone();

    let engine = SettlementEngine::builder()
        .store(SettlementStore::new())
        .oracle(oracle_dyn)
        .risk_config(
            RiskGateConfig::builder()
                .block_threshold(0.8)
                .score_scale(ScoreScale::Unit)
                .build(),
        )
        .payments(payments_dyn)
        .notifier(notifier_dyn)
        .ids(ids_dyn)
        .build();

    Harness { engine, oracle, payments, notifier, ids }
}

fn user(n: u128) -> UserId {
    Uuid::from_u128(n).into()
}

fn actor(n: u128) -> ActorContext {
    ActorContext::builder()
        .actor_id(Uuid::from_u128(n))
        .actor_kind(ActorKind::User)
        .ip_address("203.0.113.7".to_string())
        .user_agent("settlement-tests/1.0".to_string())
        .build()
}

fn usd(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

async fn initiate(harness: &Harness) -> ContractId {
    let request = InitiateContractRequest::builder()
        .employer_id(user(EMPLOYER))
        .gig_worker_id(user(GIG_WORKER))
        .job_id(Uuid::from_u128(JOB).into())
        .total_amount(usd(10_000_00))
        .terms("one landing page, two revisions".to_string())
        .actor(actor(EMPLOYER))
        .build()
        .unwrap();

    let InitiateContractResponseDissolved { contract } =
        harness.engine.initiate_contract(request).await.unwrap().dissolve();

    contract.id()
}

async fn sign(harness: &Harness, contract_id: ContractId, signer: u128, name: &str) {
    let request = SignContractRequest::builder()
        .contract_id(contract_id)
        .signer_id(user(signer))
        .full_name(name.to_string())
        .actor(actor(signer))
        .build()
        .unwrap();

    harness.engine.sign_contract(request).await.unwrap();
}

async fn fully_sign(harness: &Harness, contract_id: ContractId) {
    sign(harness, contract_id, EMPLOYER, "Avery Chen").await;
    sign(harness, contract_id, GIG_WORKER, "Jordan Reyes").await;
}

async fn fund(harness: &Harness, contract_id: ContractId, automatic_release: bool) -> EscrowAccountId {
    let request = FundEscrowRequest::builder()
        .contract_id(contract_id)
        .total_amount(usd(10_000_00))
        .platform_fee(usd(500_00))
        .milestone_based(true)
        .automatic_release(automatic_release)
        .fraud_insurance(false)
        .multi_signature(false)
        .actor(actor(EMPLOYER))
        .build()
        .unwrap();

    let FundEscrowResponseDissolved { account } =
        harness.engine.fund_escrow(request).await.unwrap().dissolve();

    account.id()
}

async fn define_two_milestones(harness: &Harness, account_id: EscrowAccountId) -> Vec<Uuid> {
    let milestone_ids = vec![harness.ids.peek(0), harness.ids.peek(1)];

    let request = DefineMilestonesRequest::builder()
        .account_id(account_id)
        .milestones(vec![
            MilestoneSpec::builder()
                .description("wireframes".to_string())
                .amount(usd(5_000_00))
                .build(),
            MilestoneSpec::builder()
                .description("final build".to_string())
                .amount(usd(4_500_00))
                .build(),
        ])
        .actor(actor(EMPLOYER))
        .build()
        .unwrap();

    harness.engine.define_milestones(request).await.unwrap();

    milestone_ids
}

async fn release(
    harness: &Harness,
    account_id: EscrowAccountId,
    milestone_id: Uuid,
) -> Result<ReleaseMilestoneResponseDissolved, SettlementEngineError> {
    let request = ReleaseMilestoneRequest::builder()
        .account_id(account_id)
        .milestone_id(milestone_id.into())
        .actor(actor(EMPLOYER))
        .build();

    harness
        .engine
        .release_milestone(request)
        .await
        .map(settlement_coordinator_engine::response::ReleaseMilestoneResponse::dissolve)
}

#[tokio::test]
async fn full_settlement_flow_releases_everything_automatically() {
    let harness = harness();

    let contract_id = initiate(&harness).await;
    fully_sign(&harness, contract_id).await;

    let account_id = fund(&harness, contract_id, true).await;
    let milestone_ids = define_two_milestones(&harness, account_id).await;

    let first = release(&harness, account_id, milestone_ids[0]).await.unwrap();
    assert_eq!(first.account.available_amount(), usd(4_500_00));
    assert_eq!(first.milestone.status(), MilestoneStatus::Completed);
    assert!(!first.auto_released);

    let second = release(&harness, account_id, milestone_ids[1]).await.unwrap();
    assert_eq!(second.account.available_amount(), Decimal::ZERO);
    assert_eq!(second.account.status(), EscrowStatus::Released);
    assert!(second.auto_released);

    // both payouts went to the gig worker
    assert_eq!(
        harness.payments.payouts(),
        vec![(user(GIG_WORKER), usd(5_000_00)), (user(GIG_WORKER), usd(4_500_00))]
    );

    // the chain covers every state change of the flow
    let verified = harness.engine.verify_audit_chain().await.unwrap();
    assert_eq!(verified, harness.engine.list_audit_entries().await.len() as u64);

    let events = harness.notifier.events();
    assert!(events.contains(&NotificationEvent::ContractFullySigned { contract_id }));
    assert!(events.contains(&NotificationEvent::EscrowReleased { account_id }));
}

#[tokio::test]
async fn completion_percentage_tracks_released_milestones() {
    let harness = harness();

    let contract_id = initiate(&harness).await;
    fully_sign(&harness, contract_id).await;

    let account_id = fund(&harness, contract_id, false).await;
    let milestone_ids = define_two_milestones(&harness, account_id).await;

    release(&harness, account_id, milestone_ids[0]).await.unwrap();

    let request = GetEscrowAccountRequest::builder().account_id(account_id).build();
    let GetEscrowAccountResponseDissolved { account, milestones, completion_percentage } =
        harness.engine.get_escrow_account(request).await.unwrap().dissolve();

    assert_eq!(account.unwrap().released_amount(), usd(5_500_00));
    assert_eq!(milestones.len(), 2);
    assert_eq!(completion_percentage, 50.0);
}

#[tokio::test]
async fn signatures_are_enforced_in_order_through_the_engine() {
    let harness = harness();

    let contract_id = initiate(&harness).await;

    let request = SignContractRequest::builder()
        .contract_id(contract_id)
        .signer_id(user(GIG_WORKER))
        .full_name("Jordan Reyes".to_string())
        .actor(actor(GIG_WORKER))
        .build()
        .unwrap();
    let err = harness.engine.sign_contract(request).await.unwrap_err();
    assert!(matches!(err, SettlementEngineError::Signature(SignatureError::OutOfOrder)));

    let request = SignContractRequest::builder()
        .contract_id(contract_id)
        .signer_id(user(9999))
        .full_name("Nobody Special".to_string())
        .actor(actor(9999))
        .build()
        .unwrap();
    let err = harness.engine.sign_contract(request).await.unwrap_err();
    assert!(matches!(err, SettlementEngineError::Signature(SignatureError::NotParticipant)));
}

#[tokio::test]
async fn signing_binds_the_typed_name_to_the_terms_digest() {
    let harness = harness();

    let contract_id = initiate(&harness).await;

    let request = SignContractRequest::builder()
        .contract_id(contract_id)
        .signer_id(user(EMPLOYER))
        .full_name("Avery Chen".to_string())
        .actor(actor(EMPLOYER))
        .build()
        .unwrap();
    let SignContractResponseDissolved { contract, signature } =
        harness.engine.sign_contract(request).await.unwrap().dissolve();

    assert_eq!(contract.status(), ContractStatus::PendingGigWorkerSignature);
    assert_eq!(signature.role(), SignerRole::Employer);
    assert_eq!(signature.full_name(), "Avery Chen");
    assert_eq!(signature.contract_version_hash(), contract.version_hash());
    // SHA-256 hex digest of the terms text
    assert_eq!(contract.version_hash().len(), 64);
}

#[tokio::test]
async fn unsigned_contracts_cannot_be_funded() {
    let harness = harness();

    let contract_id = initiate(&harness).await;
    sign(&harness, contract_id, EMPLOYER, "Avery Chen").await;

    let request = FundEscrowRequest::builder()
        .contract_id(contract_id)
        .total_amount(usd(10_000_00))
        .platform_fee(usd(500_00))
        .milestone_based(true)
        .automatic_release(false)
        .fraud_insurance(false)
        .multi_signature(false)
        .actor(actor(EMPLOYER))
        .build()
        .unwrap();
    let err = harness.engine.fund_escrow(request).await.unwrap_err();

    assert!(matches!(err, SettlementEngineError::ContractNotFullySigned(id) if id == contract_id));
}

#[tokio::test]
async fn cancelled_contracts_reject_further_signatures() {
    let harness = harness();

    let contract_id = initiate(&harness).await;

    let request = CancelContractRequest::builder()
        .contract_id(contract_id)
        .cancelled_by(user(EMPLOYER))
        .reason("project descoped".to_string())
        .actor(actor(EMPLOYER))
        .build()
        .unwrap();
    harness.engine.cancel_contract(request).await.unwrap();

    let request = SignContractRequest::builder()
        .contract_id(contract_id)
        .signer_id(user(EMPLOYER))
        .full_name("Avery Chen".to_string())
        .actor(actor(EMPLOYER))
        .build()
        .unwrap();
    let err = harness.engine.sign_contract(request).await.unwrap_err();

    assert!(matches!(err, SettlementEngineError::Signature(SignatureError::Terminal)));
}

#[tokio::test]
async fn watchlisted_workers_cannot_trigger_releases() {
    let harness = harness();

    let contract_id = initiate(&harness).await;
    fully_sign(&harness, contract_id).await;
    let account_id = fund(&harness, contract_id, false).await;
    let milestone_ids = define_two_milestones(&harness, account_id).await;

    harness.oracle.watchlist(user(GIG_WORKER));

    let err = release(&harness, account_id, milestone_ids[0]).await.unwrap_err();
    assert!(matches!(err, SettlementEngineError::RiskBlocked(_)));

    // nothing moved
    assert!(harness.payments.payouts().is_empty());
    let request = GetEscrowAccountRequest::builder().account_id(account_id).build();
    let GetEscrowAccountResponseDissolved { account, .. } =
        harness.engine.get_escrow_account(request).await.unwrap().dissolve();
    assert_eq!(account.unwrap().available_amount(), usd(9_500_00));
}

#[tokio::test]
async fn high_risk_employers_cannot_fund_escrow() {
    let harness = harness();

    let contract_id = initiate(&harness).await;
    fully_sign(&harness, contract_id).await;

    harness.oracle.set_score(user(EMPLOYER), 0.85);

    let request = FundEscrowRequest::builder()
        .contract_id(contract_id)
        .total_amount(usd(10_000_00))
        .platform_fee(usd(500_00))
        .milestone_based(false)
        .automatic_release(false)
        .fraud_insurance(false)
        .multi_signature(false)
        .actor(actor(EMPLOYER))
        .build()
        .unwrap();
    let err = harness.engine.fund_escrow(request).await.unwrap_err();

    assert!(matches!(err, SettlementEngineError::RiskBlocked(_)));
}

#[tokio::test]
async fn oracle_outages_block_rather_than_allow() {
    let harness = harness();

    let contract_id = initiate(&harness).await;

    harness.oracle.set_unavailable(true);

    let request = SignContractRequest::builder()
        .contract_id(contract_id)
        .signer_id(user(EMPLOYER))
        .full_name("Avery Chen".to_string())
        .actor(actor(EMPLOYER))
        .build()
        .unwrap();
    let err = harness.engine.sign_contract(request).await.unwrap_err();

    assert!(matches!(err, SettlementEngineError::Collaborator(_)));
}

#[tokio::test]
async fn frozen_accounts_block_releases_until_further_notice() {
    let harness = harness();

    let contract_id = initiate(&harness).await;
    fully_sign(&harness, contract_id).await;
    let account_id = fund(&harness, contract_id, true).await;
    let milestone_ids = define_two_milestones(&harness, account_id).await;

    let request = FreezeEscrowRequest::builder()
        .account_id(account_id)
        .reason("chargeback reported".to_string())
        .actor(actor(EMPLOYER))
        .build()
        .unwrap();
    harness.engine.freeze_escrow(request).await.unwrap();

    let err = release(&harness, account_id, milestone_ids[0]).await.unwrap_err();
    assert!(matches!(err, SettlementEngineError::Ledger(LedgerError::Frozen)));
    assert!(harness.payments.payouts().is_empty());

    let events = harness.notifier.events();
    assert!(events.contains(&NotificationEvent::EscrowFrozen { account_id }));
}

#[tokio::test]
async fn payout_failures_do_not_roll_back_the_release() {
    let harness = harness();

    let contract_id = initiate(&harness).await;
    fully_sign(&harness, contract_id).await;
    let account_id = fund(&harness, contract_id, false).await;
    let milestone_ids = define_two_milestones(&harness, account_id).await;

    harness.payments.set_failing(true);

    let released = release(&harness, account_id, milestone_ids[0]).await.unwrap();

    assert_eq!(released.account.available_amount(), usd(4_500_00));
    assert_eq!(released.milestone.status(), MilestoneStatus::Completed);
    assert!(harness.payments.payouts().is_empty());
}

#[tokio::test]
async fn double_release_of_one_milestone_is_idempotent_rejected() {
    let harness = harness();

    let contract_id = initiate(&harness).await;
    fully_sign(&harness, contract_id).await;
    let account_id = fund(&harness, contract_id, false).await;
    let milestone_ids = define_two_milestones(&harness, account_id).await;

    release(&harness, account_id, milestone_ids[0]).await.unwrap();
    let err = release(&harness, account_id, milestone_ids[0]).await.unwrap_err();

    assert!(matches!(
        err,
        SettlementEngineError::Ledger(LedgerError::MilestoneNotPending(
            MilestoneStatus::Completed
        ))
    ));

    // only the first release paid out
    assert_eq!(harness.payments.payouts().len(), 1);
}

#[tokio::test]
async fn request_validation_rejects_bad_input_before_any_state_exists() {
    let harness = harness();

    let err = InitiateContractRequest::builder()
        .employer_id(user(EMPLOYER))
        .gig_worker_id(user(EMPLOYER))
        .job_id(Uuid::from_u128(JOB).into())
        .total_amount(usd(10_000_00))
        .terms("terms".to_string())
        .actor(actor(EMPLOYER))
        .build()
        .unwrap_err();
    assert_eq!(err, InitiateContractRequestError::SameParty);

    let err = InitiateContractRequest::builder()
        .employer_id(user(EMPLOYER))
        .gig_worker_id(user(GIG_WORKER))
        .job_id(Uuid::from_u128(JOB).into())
        .total_amount(Decimal::new(10_001, 3))
        .terms("terms".to_string())
        .actor(actor(EMPLOYER))
        .build()
        .unwrap_err();
    assert_eq!(err, InitiateContractRequestError::InvalidAmount(Decimal::new(10_001, 3)));

    assert!(harness.engine.list_audit_entries().await.is_empty());
}

#[tokio::test]
async fn audit_entries_are_verifiable_one_by_one() {
    let harness = harness();

    let contract_id = initiate(&harness).await;
    fully_sign(&harness, contract_id).await;

    let entries = harness.engine.list_audit_entries().await;
    assert_eq!(entries.len(), 3);

    for entry in &entries {
        let verified = harness.engine.verify_audit_entry(entry.seq()).await.unwrap();
        assert_eq!(verified.hash_signature(), entry.hash_signature());
    }

    let err = harness.engine.verify_audit_entry(99).await.unwrap_err();
    assert!(matches!(err, SettlementEngineError::NotFound(_)));
}
