use crate::services::batch::CsvImportError;
use crate::storage::StorageError;
use actix_web::{HttpResponse, ResponseError};
use qna_llm_sdk::error::LlmError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("Completion service error: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
        };

        match self {
            AppError::InvalidRequest(_) => HttpResponse::BadRequest().json(error_response),
            AppError::NotFound(_) => HttpResponse::NotFound().json(error_response),
            AppError::Storage(_) | AppError::Llm(_) | AppError::Io(_) => {
                HttpResponse::InternalServerError().json(error_response)
            }
        }
    }
}

impl AppError {
    fn error_type(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::NotFound(_) => "not_found",
            AppError::Storage(_) => "database_error",
            AppError::Llm(_) => "completion_error",
            AppError::Io(_) => "io_error",
        }
    }
}

impl From<CsvImportError> for AppError {
    fn from(err: CsvImportError) -> Self {
        match err {
            CsvImportError::Io(e) => AppError::Io(e),
            other => AppError::InvalidRequest(other.to_string()),
        }
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::InvalidRequest(format!("Malformed upload: {err}"))
    }
}

pub type AppResult<T> = Result<T, AppError>;
