use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use common::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum HttpApiError {
    #[error("{0}")]
    App(#[from] AppError),
    #[error("db error: {0}")]
    Db(db::DbError),
}

impl From<db::DbError> for HttpApiError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::Duplicate => {
                HttpApiError::App(AppError::Conflict("duplicate value".into()))
            }
            other => HttpApiError::Db(other),
        }
    }
}

impl HttpApiError {
    fn as_app(&self) -> Option<&AppError> {
        match self {
            HttpApiError::App(e) => Some(e),
            HttpApiError::Db(_) => None,
        }
    }
}

impl ResponseError for HttpApiError {
    fn status_code(&self) -> StatusCode {
        match self.as_app() {
            Some(AppError::Validation(_)) | Some(AppError::Conflict(_)) => StatusCode::BAD_REQUEST,
            Some(AppError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            Some(AppError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Some(AppError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut body = serde_json::json!({
            "success": false,
            "message": match self.as_app() {
                Some(app) => app.to_string(),
                None => "internal server error".to_string(),
            },
        });
        // failure detail stays out of production builds
        if status == StatusCode::INTERNAL_SERVER_ERROR && cfg!(debug_assertions) {
            body["error"] = serde_json::Value::String(format!("{self:?}"));
        }
        HttpResponse::build(status).json(body)
    }
}

/// Malformed identifiers are reported as not-found, never as a parse error.
pub fn parse_id(raw: &str) -> Result<Uuid, HttpApiError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("resource not found".into()).into())
}

pub fn validation(messages: Vec<String>) -> HttpApiError {
    AppError::Validation(messages).into()
}

pub fn not_found(what: &str) -> HttpApiError {
    AppError::NotFound(format!("{what} not found")).into()
}

pub fn unauthorized(msg: &str) -> HttpApiError {
    AppError::Unauthorized(msg.into()).into()
}

pub fn forbidden(msg: &str) -> HttpApiError {
    AppError::Forbidden(msg.into()).into()
}

pub fn conflict(msg: &str) -> HttpApiError {
    AppError::Conflict(msg.into()).into()
}
