use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use log::error;
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Throttled {
        message: String,
        next_valid_visit_time: Option<DateTime<Utc>>,
    },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("validation failed")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
    /// `detail` is only populated when running in development mode.
    #[error("Internal server error")]
    Internal { detail: Option<String> },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_valid_visit_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl ApiError {
    pub fn throttled(
        message: impl Into<String>,
        next_valid_visit_time: Option<DateTime<Utc>>,
    ) -> Self {
        ApiError::Throttled {
            message: message.into(),
            next_valid_visit_time,
        }
    }

    /// Logs the underlying failure and hides it unless `expose` is set.
    pub fn internal(context: &str, err: impl std::fmt::Display, expose: bool) -> Self {
        error!("{}: {}", context, err);
        ApiError::Internal {
            detail: expose.then(|| err.to_string()),
        }
    }

    pub fn from_store(context: &str, err: StoreError, expose: bool) -> Self {
        Self::internal(context, err, expose)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            ApiError::Validation(errors) => builder.json(errors),
            ApiError::Throttled {
                message,
                next_valid_visit_time,
            } => builder.json(ErrorBody {
                message,
                next_valid_visit_time: *next_valid_visit_time,
                error: None,
            }),
            ApiError::Internal { detail } => builder.json(ErrorBody {
                message: "Internal server error",
                next_valid_visit_time: None,
                error: detail.as_deref(),
            }),
            other => {
                let message = other.to_string();
                builder.json(ErrorBody {
                    message: &message,
                    next_valid_visit_time: None,
                    error: None,
                })
            }
        }
    }
}
