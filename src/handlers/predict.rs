//! Prediction handler

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    Json,
};

use crate::logic::model::FeatureFrame;
use crate::models::PredictionResponse;
use crate::{AppError, AppResult, AppState};

/// Predict the CO2 and water footprint of one feature record
pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Json<PredictionResponse>> {
    if !is_json_content_type(&headers) {
        return Err(AppError::UnsupportedMediaType);
    }
    let body = body?;

    let record: serde_json::Value = serde_json::from_slice(&body)?;
    let frame = FeatureFrame::from_json(&record)?;

    tracing::debug!(
        "Predicting for {} columns [{}]",
        frame.len(),
        frame.column_names().collect::<Vec<_>>().join(", ")
    );

    let predictor = state.predictor.clone();
    let outputs = tokio::task::spawn_blocking(move || predictor.predict(&frame)).await??;

    let response = PredictionResponse::from_outputs(&outputs)?;
    tracing::info!(
        "Prediction: co2_emissions={}, water_consumption={}",
        response.co2_emissions,
        response.water_consumption
    );

    Ok(Json(response))
}

/// `application/json` or any `+json` media type
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type(&headers_with("application/json")));
        assert!(is_json_content_type(&headers_with("application/json; charset=utf-8")));
        assert!(is_json_content_type(&headers_with("Application/JSON")));
        assert!(is_json_content_type(&headers_with("application/vnd.api+json")));
    }

    #[test]
    fn test_non_json_content_types() {
        assert!(!is_json_content_type(&HeaderMap::new()));
        assert!(!is_json_content_type(&headers_with("text/plain")));
        assert!(!is_json_content_type(&headers_with("application/x-www-form-urlencoded")));
    }
}
