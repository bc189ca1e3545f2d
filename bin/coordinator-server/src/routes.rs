use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use settlement_coordinator_domain::audit::{ActorContext, ActorKind};
use settlement_coordinator_engine::{
    request::{
        CancelContractRequest, DefineMilestonesRequest, FreezeEscrowRequest, FundEscrowRequest,
        GetContractRequest, GetEscrowAccountRequest, InitiateContractRequest, MilestoneSpec,
        ReleaseMilestoneRequest, RequestError, SignContractRequest,
    },
    response::{
        CancelContractResponseDissolved, DefineMilestonesResponseDissolved,
        FreezeEscrowResponseDissolved, FundEscrowResponseDissolved, GetContractResponseDissolved,
        GetEscrowAccountResponseDissolved, InitiateContractResponseDissolved,
        ReleaseMilestoneResponseDissolved, SignContractResponseDissolved,
    },
};
use uuid::Uuid;

use crate::{
    App, AppDissolved,
    error::AppError,
    payload::{
        request::{
            CancelContractRequestPayload, CancelContractRequestPayloadDissolved,
            DefineMilestonesRequestPayload, DefineMilestonesRequestPayloadDissolved,
            FreezeEscrowRequestPayload, FreezeEscrowRequestPayloadDissolved,
            FundEscrowRequestPayload, FundEscrowRequestPayloadDissolved,
            GetContractDetailsRequestPayload, GetContractDetailsRequestPayloadDissolved,
            GetEscrowAccountDetailsRequestPayload, GetEscrowAccountDetailsRequestPayloadDissolved,
            InitiateContractRequestPayload, InitiateContractRequestPayloadDissolved,
            MilestoneSpecPayloadDissolved, ReleaseMilestoneRequestPayload,
            ReleaseMilestoneRequestPayloadDissolved, SignContractRequestPayload,
            SignContractRequestPayloadDissolved, VerifyAuditRequestPayload,
            VerifyAuditRequestPayloadDissolved,
        },
        response::{
            CancelContractResponsePayload, DefineMilestonesResponsePayload,
            FreezeEscrowResponsePayload, FundEscrowResponsePayload,
            GetContractDetailsResponsePayload, GetEscrowAccountDetailsResponsePayload,
            InitiateContractResponsePayload, ListAuditEntriesResponsePayload,
            ReleaseMilestoneResponsePayload, SignContractResponsePayload,
            VerifyAuditResponsePayload,
        },
    },
};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

#[tracing::instrument(skip_all)]
pub async fn initiate_contract(
    State(app): State<App>,
    headers: HeaderMap,
    Json(payload): Json<InitiateContractRequestPayload>,
) -> Result<Json<InitiateContractResponsePayload>, AppError> {
    let AppDissolved { engine } = app.dissolve();

    let InitiateContractRequestPayloadDissolved {
        employer_id,
        gig_worker_id,
        job_id,
        total_amount,
        terms,
    } = payload.dissolve();

    let request = InitiateContractRequest::builder()
        .employer_id(employer_id.into())
        .gig_worker_id(gig_worker_id.into())
        .job_id(job_id.into())
        .total_amount(total_amount)
        .terms(terms)
        .actor(actor_from(&headers, employer_id))
        .build()
        .map_err(RequestError::from)?;

    let InitiateContractResponseDissolved { contract } =
        engine.initiate_contract(request).await?.dissolve();

    let response = InitiateContractResponsePayload::builder().contract(contract.into()).build();

    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
pub async fn sign_contract(
    State(app): State<App>,
    headers: HeaderMap,
    Json(payload): Json<SignContractRequestPayload>,
) -> Result<Json<SignContractResponsePayload>, AppError> {
    let AppDissolved { engine } = app.dissolve();

    let SignContractRequestPayloadDissolved { contract_id, signer_id, full_name } =
        payload.dissolve();

    let request = SignContractRequest::builder()
        .contract_id(contract_id.into())
        .signer_id(signer_id.into())
        .full_name(full_name)
        .actor(actor_from(&headers, signer_id))
        .build()
        .map_err(RequestError::from)?;

    let SignContractResponseDissolved { contract, signature } =
        engine.sign_contract(request).await?.dissolve();

    let response = SignContractResponsePayload::builder()
        .contract(contract.into())
        .signature(signature.into())
        .build();

    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
pub async fn cancel_contract(
    State(app): State<App>,
    headers: HeaderMap,
    Json(payload): Json<CancelContractRequestPayload>,
) -> Result<Json<CancelContractResponsePayload>, AppError> {
    let AppDissolved { engine } = app.dissolve();

    let CancelContractRequestPayloadDissolved { contract_id, cancelled_by, reason } =
        payload.dissolve();

    let request = CancelContractRequest::builder()
        .contract_id(contract_id.into())
        .cancelled_by(cancelled_by.into())
        .reason(reason)
        .actor(actor_from(&headers, cancelled_by))
        .build()
        .map_err(RequestError::from)?;

    let CancelContractResponseDissolved { contract } =
        engine.cancel_contract(request).await?.dissolve();

    let response = CancelContractResponsePayload::builder().contract(contract.into()).build();

    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
pub async fn get_contract_details(
    State(app): State<App>,
    Json(payload): Json<GetContractDetailsRequestPayload>,
) -> Result<Json<GetContractDetailsResponsePayload>, AppError> {
    let AppDissolved { engine } = app.dissolve();

    let GetContractDetailsRequestPayloadDissolved { contract_id } = payload.dissolve();

    let request = GetContractRequest::builder().contract_id(contract_id.into()).build();

    let GetContractResponseDissolved { contract, signatures } =
        engine.get_contract(request).await?.dissolve();

    let contract = contract.ok_or(AppError::ContractNotFound)?;

    let response = GetContractDetailsResponsePayload::builder()
        .contract(contract.into())
        .signatures(signatures.into_iter().map(From::from).collect())
        .build();

    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
pub async fn fund_escrow(
    State(app): State<App>,
    headers: HeaderMap,
    Json(payload): Json<FundEscrowRequestPayload>,
) -> Result<Json<FundEscrowResponsePayload>, AppError> {
    let AppDissolved { engine } = app.dissolve();

    let FundEscrowRequestPayloadDissolved {
        contract_id,
        total_amount,
        platform_fee,
        milestone_based,
        automatic_release,
        fraud_insurance,
        multi_signature,
        requested_by,
    } = payload.dissolve();

    let request = FundEscrowRequest::builder()
        .contract_id(contract_id.into())
        .total_amount(total_amount)
        .platform_fee(platform_fee)
        .milestone_based(milestone_based)
        .automatic_release(automatic_release)
        .fraud_insurance(fraud_insurance)
        .multi_signature(multi_signature)
        .actor(actor_from(&headers, requested_by))
        .build()
        .map_err(RequestError::from)?;

    let FundEscrowResponseDissolved { account } = engine.fund_escrow(request).await?.dissolve();

    let response = FundEscrowResponsePayload::builder().account(account.into()).build();

    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
pub async fn define_milestones(
    State(app): State<App>,
    headers: HeaderMap,
    Json(payload): Json<DefineMilestonesRequestPayload>,
) -> Result<Json<DefineMilestonesResponsePayload>, AppError> {
    let AppDissolved { engine } = app.dissolve();

    let DefineMilestonesRequestPayloadDissolved { account_id, milestones, requested_by } =
        payload.dissolve();

    let milestones = milestones
        .into_iter()
        .map(|spec| {
            let MilestoneSpecPayloadDissolved { description, amount } = spec.dissolve();

            MilestoneSpec::builder().description(description).amount(amount).build()
        })
        .collect();

    let request = DefineMilestonesRequest::builder()
        .account_id(account_id.into())
        .milestones(milestones)
        .actor(actor_from(&headers, requested_by))
        .build()
        .map_err(RequestError::from)?;

    let DefineMilestonesResponseDissolved { milestones } =
        engine.define_milestones(request).await?.dissolve();

    let response = DefineMilestonesResponsePayload::builder()
        .milestones(milestones.into_iter().map(From::from).collect())
        .build();

    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
pub async fn release_milestone(
    State(app): State<App>,
    headers: HeaderMap,
    Json(payload): Json<ReleaseMilestoneRequestPayload>,
) -> Result<Json<ReleaseMilestoneResponsePayload>, AppError> {
    let AppDissolved { engine } = app.dissolve();

    let ReleaseMilestoneRequestPayloadDissolved { account_id, milestone_id, requested_by } =
        payload.dissolve();

    let request = ReleaseMilestoneRequest::builder()
        .account_id(account_id.into())
        .milestone_id(milestone_id.into())
        .actor(actor_from(&headers, requested_by))
        .build();

    let ReleaseMilestoneResponseDissolved { account, milestone, auto_released } =
        engine.release_milestone(request).await?.dissolve();

    let response = ReleaseMilestoneResponsePayload::builder()
        .account(account.into())
        .milestone(milestone.into())
        .auto_released(auto_released)
        .build();

    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
pub async fn freeze_escrow(
    State(app): State<App>,
    headers: HeaderMap,
    Json(payload): Json<FreezeEscrowRequestPayload>,
) -> Result<Json<FreezeEscrowResponsePayload>, AppError> {
    let AppDissolved { engine } = app.dissolve();

    let FreezeEscrowRequestPayloadDissolved { account_id, reason, requested_by } =
        payload.dissolve();

    let request = FreezeEscrowRequest::builder()
        .account_id(account_id.into())
        .reason(reason)
        .actor(actor_from(&headers, requested_by))
        .build()
        .map_err(RequestError::from)?;

    let FreezeEscrowResponseDissolved { account } =
        engine.freeze_escrow(request).await?.dissolve();

    let response = FreezeEscrowResponsePayload::builder().account(account.into()).build();

    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
pub async fn get_escrow_account_details(
    State(app): State<App>,
    Json(payload): Json<GetEscrowAccountDetailsRequestPayload>,
) -> Result<Json<GetEscrowAccountDetailsResponsePayload>, AppError> {
    let AppDissolved { engine } = app.dissolve();

    let GetEscrowAccountDetailsRequestPayloadDissolved { account_id } = payload.dissolve();

    let request = GetEscrowAccountRequest::builder().account_id(account_id.into()).build();

    let GetEscrowAccountResponseDissolved { account, milestones, completion_percentage } =
        engine.get_escrow_account(request).await?.dissolve();

    let account = account.ok_or(AppError::EscrowAccountNotFound)?;

    let response = GetEscrowAccountDetailsResponsePayload::builder()
        .account(account.into())
        .milestones(milestones.into_iter().map(From::from).collect())
        .completion_percentage(completion_percentage)
        .build();

    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
pub async fn list_audit_entries(
    State(app): State<App>,
) -> Result<Json<ListAuditEntriesResponsePayload>, AppError> {
    let AppDissolved { engine } = app.dissolve();

    let entries = engine.list_audit_entries().await.into_iter().map(From::from).collect();

    let response = ListAuditEntriesResponsePayload::builder().entries(entries).build();

    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
pub async fn verify_audit(
    State(app): State<App>,
    Json(payload): Json<VerifyAuditRequestPayload>,
) -> Result<Json<VerifyAuditResponsePayload>, AppError> {
    let AppDissolved { engine } = app.dissolve();

    let VerifyAuditRequestPayloadDissolved { seq } = payload.dissolve();

    let response = match seq {
        Some(seq) => {
            let entry = engine.verify_audit_entry(seq).await?;

            VerifyAuditResponsePayload::builder().verified(1).entry(entry.into()).build()
        },
        None => {
            let verified = engine.verify_audit_chain().await?;

            VerifyAuditResponsePayload::builder().verified(verified).build()
        },
    };

    Ok(Json(response))
}

fn actor_from(headers: &HeaderMap, actor_id: Uuid) -> ActorContext {
    let header =
        |name: &str| headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_owned);

    ActorContext::builder()
        .actor_id(actor_id)
        .actor_kind(ActorKind::User)
        .maybe_ip_address(header("x-forwarded-for"))
        .maybe_user_agent(header("user-agent"))
        .maybe_session_id(header("x-session-id"))
        .build()
}
