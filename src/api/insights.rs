use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};

use super::AppState;
use crate::auth::Claims;
use crate::error::AppError;
use crate::models::{InsightAction, InsightView};

pub async fn get_insight(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
) -> Result<Json<Option<InsightView>>, AppError> {
    Ok(Json(state.service.insight(&provider_id).await?))
}

pub async fn put_insight(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(provider_id): Path<String>,
    body: Result<Json<InsightAction>, JsonRejection>,
) -> Result<Json<InsightView>, AppError> {
    let Json(action) = body.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    state
        .service
        .apply_insight(&provider_id, &action, &claims.sub)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No insight recorded for {provider_id}")))
}
