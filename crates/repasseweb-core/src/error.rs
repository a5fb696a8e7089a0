//! Error types for repasseweb-core
//!
//! Every failure a workflow can surface to an admin is one of these
//! variants. The API layer maps them onto HTTP statuses through [`ErrorCode`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or invalid request field
    ValidationError,
    /// Request body shape not recognised
    InvalidFormat,
    /// Credentials or session rejected
    Unauthorized,
    /// Referenced row does not exist
    NotFound,
    /// Workflow step already ran for this record
    AlreadyProcessed,
    /// Stored procedure refused the operation
    Rejected,
    /// Database or transport failure
    BackendError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::InvalidFormat => write!(f, "INVALID_FORMAT"),
            ErrorCode::Unauthorized => write!(f, "UNAUTHORIZED"),
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::AlreadyProcessed => write!(f, "ALREADY_PROCESSED"),
            ErrorCode::Rejected => write!(f, "REJECTED"),
            ErrorCode::BackendError => write!(f, "BACKEND_ERROR"),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Expected outcome of bad input
    Info,
    /// Operation refused, state unchanged
    Warning,
    /// Operation failed for reasons outside the request
    Error,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
        }
    }
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    /// Create a new error detail
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            suggestions: vec![],
        }
    }

    /// Add detail information
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

/// Main error type for repasseweb-core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("{message}")]
    Validation { message: String },

    #[error("Unsupported payload format")]
    InvalidFormat,

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource} has already been processed")]
    AlreadyProcessed { resource: String },

    #[error("{message}")]
    Rejected { message: String },

    #[error("{message}")]
    Backend { message: String },

    #[error("Payout {movement_id} was created but not confirmed: {reason}")]
    UnconfirmedPayout { movement_id: String, reason: String },
}

impl CoreError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation { message: message.into() }
    }

    /// Shorthand for a backend failure, keeping the database message verbatim
    pub fn backend(message: impl Into<String>) -> Self {
        CoreError::Backend { message: message.into() }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::Validation { .. } => ErrorCode::ValidationError,
            CoreError::InvalidFormat => ErrorCode::InvalidFormat,
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::AlreadyProcessed { .. } => ErrorCode::AlreadyProcessed,
            CoreError::Rejected { .. } => ErrorCode::Rejected,
            CoreError::Backend { .. } | CoreError::UnconfirmedPayout { .. } => ErrorCode::BackendError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::Validation { .. } | CoreError::InvalidFormat | CoreError::NotFound { .. } => {
                ErrorSeverity::Info
            }
            CoreError::AlreadyProcessed { .. } | CoreError::Rejected { .. } => {
                ErrorSeverity::Warning
            }
            CoreError::Backend { .. } | CoreError::UnconfirmedPayout { .. } => ErrorSeverity::Error,
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::InvalidFormat => {
                details = details.with_suggestion(
                    "Send a body tagged with \"variant\": \"restaurante\" or \"usuario\".".to_string(),
                );
            }
            CoreError::AlreadyProcessed { .. } => {
                details = details.with_suggestion(
                    "Reload the listing; another admin may have handled this record.".to_string(),
                );
            }
            CoreError::UnconfirmedPayout { movement_id, .. } => {
                details = details.with_detail(serde_json::json!({ "id_movimentacao": movement_id }));
                details = details.with_suggestion(
                    "Confirm the movement through /api/pagamentos/confirmar once the transfer is done."
                        .to_string(),
                );
            }
            _ => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Log a failed operation at the level matching its severity
pub fn log_failure(operation: &str, error: &CoreError) {
    match error.severity() {
        ErrorSeverity::Error => log::error!(
            target: "repasseweb::error",
            "ERROR [{}] {} - Operation: {}",
            error.code(),
            error,
            operation
        ),
        ErrorSeverity::Warning => log::warn!(
            target: "repasseweb::error",
            "WARNING [{}] {} - Operation: {}",
            error.code(),
            error,
            operation
        ),
        ErrorSeverity::Info => log::info!(
            target: "repasseweb::error",
            "[{}] {} - Operation: {}",
            error.code(),
            error,
            operation
        ),
    }
}

// ==================== Tests ====================
