use actix_web::{http::StatusCode, web::Json, HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

pub type RestResult<T, E = RestApiError> = std::result::Result<Json<T>, E>;

#[derive(Debug)]
pub struct RestApiError {
    pub code: RestApiErrorCode,
    pub message: String,
}

impl RestApiError {
    pub fn new(code: RestApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn database() -> Self {
        Self::new(
            RestApiErrorCode::Database,
            "Database query failed. Check the server logs.",
        )
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(RestApiErrorCode::Conflict, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(RestApiErrorCode::InvalidInput, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(RestApiErrorCode::Configuration, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RestApiErrorCode::Internal, message)
    }
}

#[derive(Debug)]
pub enum RestApiErrorCode {
    Database,
    Conflict,
    InvalidInput,
    Configuration,
    Internal,
}

impl fmt::Display for RestApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl fmt::Display for RestApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestApiErrorCode::Database => write!(f, "database"),
            RestApiErrorCode::Conflict => write!(f, "conflict"),
            RestApiErrorCode::InvalidInput => write!(f, "invalid_input"),
            RestApiErrorCode::Configuration => write!(f, "configuration"),
            RestApiErrorCode::Internal => write!(f, "internal"),
        }
    }
}

impl RestApiErrorCode {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Database => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ResponseError for RestApiError {
    fn error_response(&self) -> HttpResponse {
        let body = json!({
            "code": self.code.to_string(),
            "message": self.message,
        });
        HttpResponse::build(self.status_code())
            .content_type("application/json")
            .json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }
}
