use axum::extract::{Path, State};
use axum::Json;

use super::AppState;
use crate::error::AppError;
use crate::models::{
    CapacityScenarioView, DistanceScenarioView, OverallScoreView, SameAddressScenarioView,
};

pub async fn overall(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
) -> Result<Json<Vec<OverallScoreView>>, AppError> {
    Ok(Json(state.service.overall_scenario(&provider_id).await?))
}

pub async fn placed(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
) -> Result<Json<Vec<CapacityScenarioView>>, AppError> {
    Ok(Json(state.service.placed_scenario(&provider_id).await?))
}

pub async fn billed(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
) -> Result<Json<Vec<CapacityScenarioView>>, AppError> {
    Ok(Json(state.service.billed_scenario(&provider_id).await?))
}

pub async fn same_address(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
) -> Result<Json<Vec<SameAddressScenarioView>>, AppError> {
    Ok(Json(state.service.same_address_scenario(&provider_id).await?))
}

pub async fn distance(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
) -> Result<Json<Vec<DistanceScenarioView>>, AppError> {
    Ok(Json(state.service.distance_scenario(&provider_id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::api::tests::{app, body_json, get};
    use crate::db::fake::FakeWarehouse;
    use crate::query::ParamValue;

    #[tokio::test]
    async fn placed_scenario_for_provider_123() {
        let warehouse = FakeWarehouse::new();
        warehouse.push_rows(vec![json!({
            "StartOfMonth": "2026-01-01",
            "provider_capacity": 5,
            "perc_deviation": 1.0,
            "placed_over_capacity_flag": false,
            "before_and_after_school": 2,
            "part_time": 3,
            "variable_schedule": 4,
            "full_time": 6,
            "subRows": [{
                "StartOfMonth": "2026-01-01",
                "hours_open": "08:00",
                "hours_close": "17:00",
                "child_placements": 10,
                "provider_capacity": 5,
                "perc_deviation": 1.0,
                "placed_over_capacity_flag": false,
                "before_and_after_school": 2,
                "part_time": 3,
                "variable_schedule": 4,
                "full_time": 6
            }]
        })]);

        let response = app(&warehouse)
            .oneshot(get("/api/v1/scenario/placed/123"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let week = json!({
            "serviceMonth": "2026-01-01",
            "riskFlag": false,
            "providerCapacity": 5,
            "fullTimeOverCap": true,
            "percDeviation": 1.0,
            "beforeAfterSchool": 2,
            "partTime": 3,
            "variableSchedule": 4,
            "fullTime": 6,
            "aveWklyPlacements": 10.0,
            "openTime": "08:00",
            "closeTime": "17:00"
        });
        let mut month = week.clone();
        month["subRows"] = json!([week]);
        assert_eq!(body_json(response).await, json!([month]));

        assert_eq!(
            warehouse.executed()[0].param("plid"),
            Some(&ParamValue::String("123".into()))
        );
    }

    #[tokio::test]
    async fn month_without_weeks_has_null_rollup() {
        let warehouse = FakeWarehouse::new();
        warehouse.push_rows(vec![json!({
            "start_of_month": "2026-02-01",
            "provider_capacity": 8,
            "billed_child_placements": 0,
            "perc_deviation": 0.0,
            "billed_over_capacity_flag": false,
            "before_and_after_school": 0,
            "part_time": 0,
            "variable_schedule": 0,
            "full_time": 0,
            "sub_rows": []
        })]);

        let response = app(&warehouse)
            .oneshot(get("/api/v1/scenario/billed/9"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body[0]["aveWklyPlacements"], json!(null));
        assert_eq!(body[0]["openTime"], json!(null));
        assert_eq!(body[0]["subRows"], json!([]));
    }

    #[tokio::test]
    async fn overall_scenario_scores_each_month() {
        let warehouse = FakeWarehouse::new();
        warehouse.push_rows(vec![
            json!({ "start_of_month": "2024-01-01", "over_billed_capacity": true,
                    "over_placement_capacity": true, "same_address_flag": true,
                    "distance_traveled_flag": true }),
            json!({ "start_of_month": "2024-02-01", "over_billed_capacity": null,
                    "over_placement_capacity": false, "same_address_flag": true,
                    "distance_traveled_flag": null }),
        ]);

        let response = app(&warehouse)
            .oneshot(get("/api/v1/scenario/overall/p-1"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body[0]["overallRiskScore"], 4);
        assert_eq!(body[1]["overallRiskScore"], 1);
        assert_eq!(body[1]["billedOverCapacity"], false);
    }

    #[tokio::test]
    async fn address_and_distance_routes_shape_rows() {
        let warehouse = FakeWarehouse::new();
        warehouse.push_rows(vec![json!({
            "start_of_month": "2024-01-01",
            "same_address_flag": true,
            "provider_licensing_id_match": "p-2",
            "provider_name_match": "Little Sprouts",
            "postal_address": "1 Elm St",
            "open_date": "2019-05-01",
            "close_date": null,
            "sub_rows": []
        })]);
        warehouse.push_rows(vec![]);
        let app = app(&warehouse);

        let response = app
            .clone()
            .oneshot(get("/api/v1/scenario/address/p-1"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body[0]["providerId"], "p-2");
        assert_eq!(body[0]["providerName"], "Little Sprouts");

        let response = app
            .oneshot(get("/api/v1/scenario/distance/p-1"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await, json!([]));
    }
}
