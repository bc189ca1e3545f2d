use std::borrow::Cow;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use settlement_coordinator_engine::{SettlementEngineError, request::RequestError};

#[derive(Debug, thiserror::Error)]
pub(crate) enum AppError {
    #[error("settlement engine error: {0}")]
    Engine(Box<SettlementEngineError>),

    #[error("request error: {0}")]
    Request(#[from] RequestError),

    #[error("contract not found error")]
    ContractNotFound,

    #[error("escrow account not found error")]
    EscrowAccountNotFound,

    #[allow(dead_code)]
    #[error("other error: {0}")]
    Other(Cow<'static, str>),
}

impl From<SettlementEngineError> for AppError {
    fn from(err: SettlementEngineError) -> Self {
        Self::Engine(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = match &self {
            AppError::Request(_) => StatusCode::BAD_REQUEST,
            AppError::ContractNotFound | AppError::EscrowAccountNotFound => StatusCode::NOT_FOUND,
            AppError::Engine(err) => match err.as_ref() {
                SettlementEngineError::Request(_) => StatusCode::BAD_REQUEST,
                SettlementEngineError::NotFound(_) => StatusCode::NOT_FOUND,
                SettlementEngineError::RiskBlocked(_) => StatusCode::FORBIDDEN,
                // settlement rejections are retryable once state changes
                SettlementEngineError::Signature(_)
                | SettlementEngineError::Ledger(_)
                | SettlementEngineError::ContractNotFullySigned(_) => StatusCode::CONFLICT,
                SettlementEngineError::Collaborator(_) => StatusCode::BAD_GATEWAY,
                SettlementEngineError::TamperDetected { .. }
                | SettlementEngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match code {
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY => {
                tracing::error!("server error: {self}");
            },
            StatusCode::NOT_FOUND => tracing::info!("not found: {self}"),
            _ => tracing::warn!("client error: {self}"),
        }

        let body = Json(json!({ "code": code.as_u16(), "message": self.to_string() }));

        (code, body).into_response()
    }
}
