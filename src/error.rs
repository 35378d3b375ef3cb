//! Error types for the ledger.
//!
//! - `BalanceError`: failures of the balance computation itself
//! - `StoreError`: persistence failures
//! - `ConfigError`: invalid environment configuration
//! - `ApiError`: what handlers return, mapped onto HTTP responses

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::schemas::ExpenseId;

#[derive(Debug, Error, PartialEq)]
pub enum BalanceError {
    #[error("cannot split an expense equally across a group with no members")]
    EmptyGroup,

    #[error("unknown split policy: {0}")]
    UnknownSplitPolicy(String),

    #[error("invalid percentage split data: {0}")]
    InvalidPercentageData(String),

    #[error("amount overflow while applying expense {0}")]
    Overflow(ExpenseId),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("corrupted record: {0}")]
    Corrupted(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid PORT value: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorResponse {
    message: &'static str,
    error: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Balance(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::BadRequest(_) => "Bad request",
            ApiError::NotFound(_) => "Resource not found",
            ApiError::Balance(err) => {
                tracing::error!("Balance computation failed: {}", err);
                "Internal server error"
            }
            ApiError::Store(err) => {
                tracing::error!("Store error: {}", err);
                "Internal server error"
            }
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            message,
            error: self.to_string(),
        })
    }
}
