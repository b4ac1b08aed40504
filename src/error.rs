use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("No URL provided")]
    MissingUrl,
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("Error during prediction: {0}")]
    Prediction(#[from] ModelError),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MissingUrl | ServiceError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ServiceError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("Rejected request: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
