#![allow(missing_docs)]

pub mod collaborators;
pub mod config;

mod error;
mod payload;
mod routes;

use std::sync::Arc;

use axum::{Router, routing};
use bon::Builder;
use dissolve_derive::Dissolve;
use settlement_coordinator_engine::SettlementEngine;

pub fn create_router(app: App) -> Router {
    Router::new()
        .route("/health", routing::get(routes::health))
        .route("/api/v1/contract/initiate", routing::post(routes::initiate_contract))
        .route("/api/v1/contract/sign", routing::post(routes::sign_contract))
        .route("/api/v1/contract/cancel", routing::post(routes::cancel_contract))
        .route("/api/v1/contract/details", routing::post(routes::get_contract_details))
        .route("/api/v1/escrow/fund", routing::post(routes::fund_escrow))
        .route("/api/v1/escrow/milestones/define", routing::post(routes::define_milestones))
        .route("/api/v1/escrow/milestone/release", routing::post(routes::release_milestone))
        .route("/api/v1/escrow/freeze", routing::post(routes::freeze_escrow))
        .route("/api/v1/escrow/details", routing::post(routes::get_escrow_account_details))
        .route("/api/v1/audit/list", routing::get(routes::list_audit_entries))
        .route("/api/v1/audit/verify", routing::post(routes::verify_audit))
        .with_state(app)
}

#[derive(Clone, Builder, Dissolve)]
pub struct App {
    engine: Arc<SettlementEngine>,
}
