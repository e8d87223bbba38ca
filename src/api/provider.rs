use axum::extract::{Path, Query, RawQuery, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::AppState;
use crate::error::AppError;
use crate::filter::{month_label, parse_month, parse_year, ReportFilter};
use crate::models::{
    CountView, HighRiskCountView, MonthlyView, ProviderDetailsView, ScoreView, YearlyView,
};
use crate::query::Page;

pub async fn sample(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    Ok(Json(state.service.sample().await?))
}

#[derive(Debug, Deserialize)]
pub struct CitySearch {
    search: Option<String>,
}

pub async fn cities(
    State(state): State<AppState>,
    Query(params): Query<CitySearch>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.service.cities(params.search.as_deref()).await?))
}

pub async fn details(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
) -> Result<Json<ProviderDetailsView>, AppError> {
    state
        .service
        .provider_details(&provider_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Provider not found".to_string()))
}

pub async fn monthly(
    State(state): State<AppState>,
    Path(month): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<MonthlyView>>, AppError> {
    let month = parse_month(&month)?;
    let filter = ReportFilter::from_query(query.as_deref());
    let views = state
        .service
        .monthly(month, &filter, Page::from_filter(&filter))
        .await?;
    Ok(Json(views))
}

pub async fn annual(
    State(state): State<AppState>,
    Path(year): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<YearlyView>>, AppError> {
    let year = parse_year(&year)?;
    let filter = ReportFilter::from_query(query.as_deref());
    let views = state
        .service
        .yearly(year, &filter, Page::from_filter(&filter))
        .await?;
    Ok(Json(views))
}

fn csv_attachment(period: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"provider-risk-{period}.csv\""),
            ),
        ],
        body,
    )
        .into_response()
}

pub async fn export_year(
    State(state): State<AppState>,
    Path(year): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let year = parse_year(&year)?;
    let filter = ReportFilter::from_query(query.as_deref());
    let body = state.service.yearly_export(year, &filter).await?;
    Ok(csv_attachment(&year.to_string(), body))
}

pub async fn export_month(
    State(state): State<AppState>,
    Path(month): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let month = parse_month(&month)?;
    let filter = ReportFilter::from_query(query.as_deref());
    let body = state.service.monthly_export(month, &filter).await?;
    Ok(csv_attachment(&month_label(month), body))
}

pub async fn provider_count(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> Result<Json<CountView>, AppError> {
    let count = state.service.provider_count(parse_year(&year)?).await?;
    Ok(Json(CountView { count }))
}

pub async fn flagged_count(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> Result<Json<CountView>, AppError> {
    let count = state.service.flagged_count(parse_year(&year)?).await?;
    Ok(Json(CountView { count }))
}

pub async fn high_risk_score(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> Result<Json<ScoreView>, AppError> {
    let score = state.service.highest_score(parse_year(&year)?).await?;
    Ok(Json(ScoreView { score }))
}

pub async fn high_risk_score_count(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> Result<Json<HighRiskCountView>, AppError> {
    Ok(Json(state.service.high_risk_count(parse_year(&year)?).await?))
}
