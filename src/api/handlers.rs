use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::{StatusResponse, SynthesizeParams};
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::tts::Catalog;

pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "Welcome to the TTS API".to_string(),
        status: "active".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<Catalog> {
    Json(state.tts.catalog().await)
}

pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SynthesizeParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params.map_err(|e| AppError::Validation(e.body_text()))?;
    let request = params
        .into_request()
        .ok_or_else(|| AppError::Validation("Missing required query parameter: text".into()))?;

    let result = state.tts.synthesize(&request).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(result.format.content_type()),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        header_value(format!("attachment; filename={}", result.filename))?,
    );
    if let Some(seconds) = result.duration_seconds {
        headers.insert("X-Duration-Seconds", header_value(format!("{:.2}", seconds))?);
    }

    Ok((StatusCode::OK, headers, result.audio).into_response())
}

fn header_value(value: String) -> Result<HeaderValue, AppError> {
    HeaderValue::try_from(value).map_err(|e| AppError::TtsError(format!("Invalid header: {}", e)))
}
