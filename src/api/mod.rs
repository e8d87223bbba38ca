//! HTTP surface of the reporting API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, map_response_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{require_jwt, Authenticator};
use crate::config::Environment;
use crate::error::{AppError, ErrorBody, ServerFault};
use crate::service::RiskService;

mod insights;
mod provider;
mod scenario;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RiskService>,
    pub auth: Arc<Authenticator>,
    pub environment: Environment,
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/providerData", get(provider::sample))
        .route("/providerData/", get(provider::sample))
        .route("/providerData/cities", get(provider::cities))
        .route("/providerData/export/year/:year", get(provider::export_year))
        .route("/providerData/export/month/:month", get(provider::export_month))
        .route("/providerData/providerCount/:year", get(provider::provider_count))
        .route("/providerData/flaggedCount/:year", get(provider::flagged_count))
        .route("/providerData/highRiskScore/:year", get(provider::high_risk_score))
        .route(
            "/providerData/highRiskScoreCount/:year",
            get(provider::high_risk_score_count),
        )
        .route("/providerData/annual/:year", get(provider::annual))
        .route("/providerData/month/:month", get(provider::monthly))
        .route(
            "/providerData/insights/:provider_id",
            get(insights::get_insight).put(insights::put_insight),
        )
        .route("/providerData/:provider_id", get(provider::details))
        .route("/scenario/overall/:provider_id", get(scenario::overall))
        .route("/scenario/placed/:provider_id", get(scenario::placed))
        .route("/scenario/billed/:provider_id", get(scenario::billed))
        .route("/scenario/address/:provider_id", get(scenario::same_address))
        .route("/scenario/distance/:provider_id", get(scenario::distance))
        .route_layer(from_fn_with_state(state.auth.clone(), require_jwt));

    let api = Router::new()
        .route("/", get(api_banner))
        .route("/login", post(login))
        .merge(protected);

    Router::new()
        .route("/", get(root_banner))
        .nest("/api/v1", api)
        .fallback(not_found)
        .layer(map_response_with_state(state.environment, mask_server_faults))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root_banner() -> Json<Value> {
    Json(json!({ "message": "🦄🌈✨👋🌎🌍🌏✨🌈🦄" }))
}

async fn api_banner() -> Json<Value> {
    Json(json!({ "message": "API - 👋🌎🌍🌏" }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenBody {
    pub token: String,
}

async fn login(State(state): State<AppState>, body: Bytes) -> Result<Json<TokenBody>, AppError> {
    let token = state.auth.login(&body)?;
    Ok(Json(TokenBody { token }))
}

async fn not_found(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<ErrorBody>) {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new(format!("🔍 - Not Found - {target}"))),
    )
}

/// In production, server-side failure details stay in the logs.
async fn mask_server_faults(
    State(environment): State<Environment>,
    response: Response,
) -> Response {
    if !environment.is_production() || response.extensions().get::<ServerFault>().is_none() {
        return response;
    }
    let status = response.status();
    let message = status.canonical_reason().unwrap_or("Internal Server Error");
    (status, Json(ErrorBody::new(message))).into_response()
}
