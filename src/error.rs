use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Sweep error: {0}")]
    Sweep(#[from] SweepError),

    #[error("Chain gateway error: {0}")]
    Chain(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Payment registry errors - rejected at creation, never persisted
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Payment not found: {0}")]
    NotFound(u64),

    #[error("Invalid interval: {0}s (minimum 60s)")]
    InvalidInterval(u64),

    #[error("Invalid amount: must be greater than zero")]
    InvalidAmount,

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),
}

/// Balance reservation ledger errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u128, available: u128 },
}

/// Execution dispatcher failure taxonomy
///
/// State errors (NotActive, NotDue, AlreadyProcessing) are expected and
/// non-fatal. InsufficientFunds triggers sweep withdrawal planning on the
/// next poll. External errors follow the reconciliation policy.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Payment not found: {0}")]
    NotFound(u64),

    #[error("Payment {0} is not active")]
    NotActive(u64),

    #[error("Payment {id} not due until {next_due}")]
    NotDue { id: u64, next_due: u64 },

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u128, available: u128 },

    #[error("Payment {0} is already being processed")]
    AlreadyProcessing(u64),

    #[error("External execution failed: {0}")]
    ExternalExecutionFailed(String),

    #[error("External call timed out")]
    ExternalTimeout,

    #[error("Payment {0} has an unreconciled transfer pending manual review")]
    Unreconciled(u64),
}

/// Liquidity sweep errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SweepError {
    #[error("Unknown pool: {0}")]
    UnknownPool(String),

    #[error("Position not found: {0}")]
    PositionNotFound(uuid::Uuid),
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match &self {
            AppError::Registry(RegistryError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "PAYMENT_NOT_FOUND",
                format!("Payment not found: {}", id),
                Some(serde_json::json!({ "payment_id": id })),
            ),
            AppError::Registry(RegistryError::InvalidInterval(interval)) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INTERVAL",
                format!("Interval {}s is below the 60s minimum", interval),
                None,
            ),
            AppError::Registry(RegistryError::InvalidAmount) => (
                StatusCode::BAD_REQUEST,
                "INVALID_AMOUNT",
                "Amount must be greater than zero".to_string(),
                None,
            ),
            AppError::Registry(RegistryError::InvalidRecipient(addr)) => (
                StatusCode::BAD_REQUEST,
                "INVALID_RECIPIENT",
                format!("Invalid recipient address: {}", addr),
                None,
            ),
            AppError::Ledger(LedgerError::InsufficientFunds { required, available }) => (
                StatusCode::CONFLICT,
                "INSUFFICIENT_FUNDS",
                "Insufficient pooled balance".to_string(),
                Some(serde_json::json!({
                    "required": required.to_string(),
                    "available": available.to_string(),
                })),
            ),
            AppError::Process(ProcessError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "PAYMENT_NOT_FOUND",
                format!("Payment not found: {}", id),
                Some(serde_json::json!({ "payment_id": id })),
            ),
            AppError::Process(ProcessError::NotActive(id)) => (
                StatusCode::CONFLICT,
                "PAYMENT_NOT_ACTIVE",
                format!("Payment {} is not active", id),
                Some(serde_json::json!({ "payment_id": id })),
            ),
            AppError::Process(ProcessError::NotDue { id, next_due }) => (
                StatusCode::CONFLICT,
                "PAYMENT_NOT_DUE",
                format!("Payment {} is not due yet", id),
                Some(serde_json::json!({ "payment_id": id, "next_due": next_due })),
            ),
            AppError::Process(ProcessError::InsufficientFunds { required, available }) => (
                StatusCode::CONFLICT,
                "INSUFFICIENT_FUNDS",
                "Insufficient pooled balance for this payment".to_string(),
                Some(serde_json::json!({
                    "required": required.to_string(),
                    "available": available.to_string(),
                })),
            ),
            AppError::Process(ProcessError::AlreadyProcessing(id)) => (
                StatusCode::CONFLICT,
                "ALREADY_PROCESSING",
                format!("Payment {} is already being processed", id),
                Some(serde_json::json!({ "payment_id": id })),
            ),
            AppError::Process(ProcessError::ExternalExecutionFailed(reason)) => (
                StatusCode::BAD_GATEWAY,
                "EXTERNAL_EXECUTION_FAILED",
                format!("External execution failed: {}", reason),
                None,
            ),
            AppError::Process(ProcessError::ExternalTimeout) => (
                StatusCode::GATEWAY_TIMEOUT,
                "EXTERNAL_TIMEOUT",
                "External call timed out".to_string(),
                None,
            ),
            AppError::Process(ProcessError::Unreconciled(id)) => (
                StatusCode::CONFLICT,
                "UNRECONCILED",
                format!(
                    "Payment {} has an unreconciled transfer pending manual review",
                    id
                ),
                Some(serde_json::json!({ "payment_id": id })),
            ),
            AppError::Sweep(e) => (StatusCode::CONFLICT, "SWEEP_ERROR", e.to_string(), None),
            AppError::Chain(msg) => (
                StatusCode::BAD_GATEWAY,
                "CHAIN_GATEWAY_ERROR",
                msg.clone(),
                None,
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Invalid credentials".to_string(),
                None,
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            AppError::InvalidInput(msg) | AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                msg.clone(),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("Error converting: {:?}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Chain(format!("HTTP request error: {:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
