//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::features::FeatureRecord;

use super::error::{Result, ServerError};
use super::state::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello world" }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Predict the species for one feature record.
///
/// The JSON extractor enforces the request contract: all seven fields
/// present and type-valid, enums inside their closed sets. Rejections
/// surface as 422 with the deserializer's message, which names the
/// offending field; they never reach the inference core.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<FeatureRecord>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(record) = payload.map_err(|rejection| ServerError::Validation(rejection.body_text()))?;

    info!("Received prediction request");
    let prediction = state.service.predict(&record).await?;
    info!(prediction = %prediction, "Prediction complete");

    Ok(Json(json!({ "prediction": prediction })))
}
