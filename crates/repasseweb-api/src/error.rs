//! Error types for repasseweb-api

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use repasseweb_core::{log_failure, CoreError, ErrorCode, ErrorDetails};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Not authenticated")]
    Unauthorized,
}

impl ApiError {
    /// Wrap a workflow failure, logging it under the operation name
    pub fn core(operation: &str, error: CoreError) -> Self {
        log_failure(operation, &error);
        ApiError::Core(error)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Core(e) => e.code(),
            ApiError::BadRequest { .. } => ErrorCode::ValidationError,
            ApiError::InvalidCredentials | ApiError::Unauthorized => ErrorCode::Unauthorized,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code() {
            ErrorCode::ValidationError
            | ErrorCode::InvalidFormat
            | ErrorCode::AlreadyProcessed
            | ErrorCode::Rejected => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::BackendError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> ErrorDetails {
        match self {
            ApiError::Core(e) => e.to_details(),
            other => ErrorDetails::new(other.code(), other.to_string()),
        }
    }
}

/// Short label shown as `error` in response bodies
fn label(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::ValidationError => "Dados inválidos",
        ErrorCode::InvalidFormat => "Formato de payload não suportado",
        ErrorCode::Unauthorized => "Não autorizado",
        ErrorCode::NotFound => "Não encontrado",
        ErrorCode::AlreadyProcessed => "Já processado",
        ErrorCode::Rejected => "Operação recusada",
        ErrorCode::BackendError => "Erro interno do servidor",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let details = self.details();
        let mut body = json!({
            "ok": false,
            "error": label(details.code),
            "message": details.message,
            "code": details.code,
        });
        if !details.suggestions.is_empty() {
            body["suggestions"] = json!(details.suggestions);
        }
        if let Some(extra) = details.details {
            body["details"] = extra;
        }
        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        log::info!("Rejected request body: {}", rejection.body_text());
        ApiError::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest {
            message: rejection.body_text(),
        }
    }
}
