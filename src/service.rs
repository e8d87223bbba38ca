use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::db::QueryExecutor;
use crate::error::AppError;
use crate::filter::ReportFilter;
use crate::models::{
    BilledMonthRow, CapacityScenarioView, CityRow, CountRow, DistanceMonthRow,
    DistanceScenarioView, HighRiskCountView, InsightAction, InsightRow, InsightView,
    MonthlyRiskRow, MonthlyView, OverallScoreRow, OverallScoreView, PlacedMonthRow,
    ProviderDetailsRow, ProviderDetailsView, SameAddressMonthRow, SameAddressScenarioView,
    ScoreRow, YearlyRiskRow, YearlyView,
};
use crate::query::{self, Catalog, Page, YearlyHeadline};
use crate::risk::RiskPolicy;
use crate::{report, scenario};

/// Every report operation, independent of how it is invoked.
pub struct RiskService {
    executor: QueryExecutor,
    catalog: Catalog,
    policy: RiskPolicy,
}

impl RiskService {
    pub fn new(executor: QueryExecutor, catalog: Catalog, policy: RiskPolicy) -> Self {
        Self {
            executor,
            catalog,
            policy,
        }
    }

    pub async fn sample(&self) -> Result<Vec<Value>, AppError> {
        let rows = self
            .executor
            .fetch_all(&query::sample_rows(&self.catalog))
            .await?;
        Ok(rows.into_iter().map(Value::Object).collect())
    }

    pub async fn cities(&self, search: Option<&str>) -> Result<Vec<String>, AppError> {
        let rows: Vec<CityRow> = self
            .executor
            .fetch_as(&query::provider_cities(&self.catalog, search), "city")
            .await?;
        let mut cities: Vec<String> = rows.into_iter().map(|row| row.city).collect();
        cities.sort();
        cities.dedup();
        Ok(cities)
    }

    pub async fn provider_details(
        &self,
        provider_id: &str,
    ) -> Result<Option<ProviderDetailsView>, AppError> {
        let row: Option<ProviderDetailsRow> = self
            .executor
            .fetch_first(
                &query::provider_details(&self.catalog, provider_id),
                "provider details",
            )
            .await?;
        Ok(row.map(ProviderDetailsView::from))
    }

    pub async fn monthly(
        &self,
        month: NaiveDate,
        filter: &ReportFilter,
        page: Page,
    ) -> Result<Vec<MonthlyView>, AppError> {
        let statement = query::provider_monthly(&self.catalog, month, filter, page);
        let rows: Vec<MonthlyRiskRow> = self.executor.fetch_as(&statement, "monthly risk").await?;
        Ok(report::monthly_views(rows))
    }

    pub async fn yearly(
        &self,
        year: i32,
        filter: &ReportFilter,
        page: Page,
    ) -> Result<Vec<YearlyView>, AppError> {
        let statement = query::provider_yearly(&self.catalog, year, filter, page);
        let rows: Vec<YearlyRiskRow> = self.executor.fetch_as(&statement, "yearly risk").await?;
        Ok(report::yearly_views(rows, &self.policy))
    }

    pub async fn monthly_export(
        &self,
        month: NaiveDate,
        filter: &ReportFilter,
    ) -> Result<Vec<u8>, AppError> {
        let views = self.monthly(month, filter, Page::Unbounded).await?;
        report::monthly_csv(&views)
    }

    pub async fn yearly_export(
        &self,
        year: i32,
        filter: &ReportFilter,
    ) -> Result<Vec<u8>, AppError> {
        let views = self.yearly(year, filter, Page::Unbounded).await?;
        report::yearly_csv(&views)
    }

    async fn count(&self, year: i32, headline: YearlyHeadline) -> Result<i64, AppError> {
        let statement = query::yearly_headline(&self.catalog, year, headline);
        let row: Option<CountRow> = self.executor.fetch_first(&statement, "count").await?;
        Ok(row.map(|row| row.count).unwrap_or(0))
    }

    pub async fn provider_count(&self, year: i32) -> Result<i64, AppError> {
        self.count(year, YearlyHeadline::ProviderCount).await
    }

    pub async fn flagged_count(&self, year: i32) -> Result<i64, AppError> {
        self.count(year, YearlyHeadline::FlaggedCount).await
    }

    pub async fn high_risk_count(&self, year: i32) -> Result<HighRiskCountView, AppError> {
        let threshold = self.policy.high_risk_threshold;
        let count = self
            .count(year, YearlyHeadline::HighRiskCount { threshold })
            .await?;
        Ok(HighRiskCountView { count, threshold })
    }

    pub async fn highest_score(&self, year: i32) -> Result<Option<i64>, AppError> {
        let statement = query::yearly_headline(&self.catalog, year, YearlyHeadline::HighestScore);
        let row: Option<ScoreRow> = self.executor.fetch_first(&statement, "score").await?;
        Ok(row.and_then(|row| row.score))
    }

    pub async fn overall_scenario(
        &self,
        provider_id: &str,
    ) -> Result<Vec<OverallScoreView>, AppError> {
        let statement = query::scenario_overall(&self.catalog, provider_id);
        let rows: Vec<OverallScoreRow> = self.executor.fetch_as(&statement, "overall score").await?;
        Ok(scenario::overall_views(rows))
    }

    pub async fn placed_scenario(
        &self,
        provider_id: &str,
    ) -> Result<Vec<CapacityScenarioView>, AppError> {
        let statement = query::scenario_placed_over_capacity(&self.catalog, provider_id);
        let rows: Vec<PlacedMonthRow> = self
            .executor
            .fetch_as(&statement, "placed over capacity")
            .await?;
        Ok(scenario::placed_views(rows))
    }

    pub async fn billed_scenario(
        &self,
        provider_id: &str,
    ) -> Result<Vec<CapacityScenarioView>, AppError> {
        let statement = query::scenario_billed_over_capacity(&self.catalog, provider_id);
        let rows: Vec<BilledMonthRow> = self
            .executor
            .fetch_as(&statement, "billed over capacity")
            .await?;
        Ok(scenario::billed_views(rows))
    }

    pub async fn distance_scenario(
        &self,
        provider_id: &str,
    ) -> Result<Vec<DistanceScenarioView>, AppError> {
        let statement = query::scenario_distance_traveled(&self.catalog, provider_id);
        let rows: Vec<DistanceMonthRow> = self
            .executor
            .fetch_as(&statement, "distance traveled")
            .await?;
        Ok(scenario::distance_views(rows))
    }

    pub async fn same_address_scenario(
        &self,
        provider_id: &str,
    ) -> Result<Vec<SameAddressScenarioView>, AppError> {
        let statement = query::scenario_same_address(&self.catalog, provider_id);
        let rows: Vec<SameAddressMonthRow> =
            self.executor.fetch_as(&statement, "same address").await?;
        Ok(scenario::same_address_views(rows))
    }

    pub async fn insight(&self, provider_id: &str) -> Result<Option<InsightView>, AppError> {
        let statement = query::provider_insight(&self.catalog, provider_id);
        let row: Option<InsightRow> = self.executor.fetch_first(&statement, "insight").await?;
        Ok(row.map(InsightView::from))
    }

    /// Applies the action, records it in history, and returns the stored
    /// insight. The two writes are separate statements.
    pub async fn apply_insight(
        &self,
        provider_id: &str,
        action: &InsightAction,
        actor: &str,
    ) -> Result<Option<InsightView>, AppError> {
        let acted_at = action.acted_at().unwrap_or_else(Utc::now);
        tracing::info!(
            provider_id,
            action = action.name(),
            actor,
            comment_len = action.comment().len(),
            "applying insight action"
        );

        self.executor
            .execute(&query::write_insight(
                &self.catalog,
                provider_id,
                action,
                actor,
                acted_at,
            ))
            .await?;
        self.executor
            .execute(&query::record_insight_history(
                &self.catalog,
                provider_id,
                action,
                actor,
                acted_at,
            ))
            .await?;

        self.insight(provider_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::db::fake::{executor, FakeWarehouse};
    use crate::query::ParamValue;

    fn service(warehouse: &Arc<FakeWarehouse>) -> RiskService {
        RiskService::new(executor(warehouse), Catalog::default(), RiskPolicy::default())
    }

    #[tokio::test]
    async fn cities_are_sorted_and_distinct() {
        let warehouse = FakeWarehouse::new();
        warehouse.push_rows(vec![
            json!({ "city": "springfield" }),
            json!({ "city": "Springfield" }),
            json!({ "city": "Capital City" }),
            json!({ "city": "Springfield" }),
        ]);

        let cities = service(&warehouse).cities(Some("spr")).await.unwrap();
        assert_eq!(cities, vec!["Capital City", "Springfield", "springfield"]);
        assert_eq!(
            warehouse.executed()[0].param("search"),
            Some(&ParamValue::String("spr".into()))
        );
    }

    #[tokio::test]
    async fn empty_headline_results_default_sensibly() {
        let warehouse = FakeWarehouse::new();
        let service = service(&warehouse);
        assert_eq!(service.provider_count(2024).await.unwrap(), 0);
        assert_eq!(service.highest_score(2024).await.unwrap(), None);

        warehouse.push_rows(vec![json!({ "count": "17" })]);
        let view = service.high_risk_count(2024).await.unwrap();
        assert_eq!((view.count, view.threshold), (17, 44));
    }

    #[tokio::test]
    async fn export_is_unpaginated() {
        let warehouse = FakeWarehouse::new();
        warehouse.push_rows(vec![]);
        let csv = service(&warehouse)
            .yearly_export(2024, &ReportFilter::default())
            .await
            .unwrap();

        assert!(String::from_utf8(csv).unwrap().starts_with("Provider ID,"));
        let statement = &warehouse.executed()[0];
        assert!(!statement.text.contains("LIMIT"));
    }

    #[tokio::test]
    async fn insight_action_writes_then_records_history() {
        let warehouse = FakeWarehouse::new();
        warehouse.push_rows(vec![]);
        warehouse.push_rows(vec![]);
        warehouse.push_rows(vec![json!({
            "id": 1,
            "provider_licensing_id": "p-1",
            "is_flagged": true,
            "comment": "double billing",
            "created_at": "2024-05-01T12:00:00.000Z",
            "created_by": "team3si",
            "resolved_on": null,
            "history": [{
                "id": 1,
                "action": "CREATE",
                "comment": "double billing",
                "is_active": true,
                "created_at": "2024-05-01T12:00:00.000Z",
                "created_by": "team3si"
            }]
        })]);

        let action = InsightAction::Create {
            is_flagged: true,
            comment: "double billing".into(),
            created_at: None,
        };
        let view = service(&warehouse)
            .apply_insight("p-1", &action, "team3si")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(view.history.len(), 1);
        let executed = warehouse.executed();
        assert_eq!(executed.len(), 3);
        assert!(executed[0].text.contains("MERGE INTO"));
        assert!(executed[1].text.contains("INSERT INTO cusp_audit.demo.provider_insights_history"));
        assert_eq!(
            executed[1].param("acted_by"),
            Some(&ParamValue::String("team3si".into()))
        );
        assert_eq!(executed[0].param("acted_at"), executed[1].param("acted_at"));
        assert_eq!(warehouse.closed(), 3);
    }
}
