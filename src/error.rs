use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidLanguage(String),

    #[error("{0}")]
    InvalidVoice(String),

    #[error("TTS generation failed: {0}")]
    TtsError(String),

    #[error("Speech service request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidLanguage(_) | AppError::InvalidVoice(_) => StatusCode::BAD_REQUEST,
            AppError::TtsError(_) | AppError::Upstream(_) | AppError::IoError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidLanguage(_) => "INVALID_LANGUAGE",
            AppError::InvalidVoice(_) => "INVALID_VOICE",
            AppError::TtsError(_) => "TTS_ERROR",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::IoError(_) => "IO_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!("Request failed: {} - {}", code, message);
        } else {
            tracing::warn!("Request rejected: {} - {}", code, message);
        }

        (
            status,
            Json(ErrorResponse {
                error: message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_bad_request() {
        assert_eq!(
            AppError::InvalidLanguage("nope".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidVoice("nope".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_validation_is_unprocessable() {
        let err = AppError::Validation("speed out of range".into());
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "speed out of range");
    }

    #[test]
    fn test_io_error_is_server_error() {
        let err = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "IO_ERROR");
        assert!(err.to_string().contains("disk full"));
    }
}
