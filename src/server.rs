use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::ServiceError;
use crate::features::FeatureExtractor;
use crate::model::{Classifier, Prediction};

#[derive(Clone)]
pub struct AppState {
    pub extractor: FeatureExtractor,
    pub classifier: Arc<dyn Classifier>,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: Vec<Prediction>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ServiceError> {
    let Json(request) = payload.map_err(|e| ServiceError::InvalidBody(e.body_text()))?;
    let url = request
        .url
        .filter(|u| !u.is_empty())
        .ok_or(ServiceError::MissingUrl)?;

    Ok(Json(classify(&state, &url).await?))
}

/// Extract features for `url` and run them through the classifier as a one-row batch.
pub async fn classify(state: &AppState, url: &str) -> Result<PredictResponse, ServiceError> {
    let features = state.extractor.extract(url).await;
    let prediction = state.classifier.predict(&[features.to_row().to_vec()])?;
    Ok(PredictResponse { prediction })
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Handler panicked: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": format!("Error during prediction: {}", detail) })),
    )
        .into_response()
}
