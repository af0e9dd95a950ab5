use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::assignment::AssignmentError;
use crate::auth::AuthError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("email sending is not configured")]
    MailerNotConfigured,
    #[error("background task failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Csv(_) => StatusCode::BAD_REQUEST,
            AppError::Assignment(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            AppError::Assignment(_) => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Store(StoreError::DuplicateEmail(_)) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MailerNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}
