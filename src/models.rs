use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Warehouse rows. Every column is required to be present in the row; nullable
// columns are `Option`s that still fail when the column is missing.

#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyRiskRow {
    #[serde(deserialize_with = "de::text")]
    pub provider_licensing_id: String,
    #[serde(deserialize_with = "de::opt_text")]
    pub provider_name: Option<String>,
    #[serde(deserialize_with = "de::text", alias = "StartOfMonth")]
    pub start_of_month: String,
    #[serde(deserialize_with = "de::opt_flag")]
    pub over_billed_capacity: Option<bool>,
    #[serde(deserialize_with = "de::opt_flag")]
    pub over_placement_capacity: Option<bool>,
    #[serde(deserialize_with = "de::opt_flag")]
    pub same_address_flag: Option<bool>,
    #[serde(deserialize_with = "de::opt_flag")]
    pub distance_traveled_flag: Option<bool>,
    #[serde(deserialize_with = "de::opt_flag")]
    pub is_flagged: Option<bool>,
    #[serde(deserialize_with = "de::opt_text")]
    pub comment: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub postal_address: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub city: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YearlyRiskRow {
    #[serde(deserialize_with = "de::text")]
    pub provider_licensing_id: String,
    #[serde(deserialize_with = "de::opt_text")]
    pub provider_name: Option<String>,
    #[serde(deserialize_with = "de::integer")]
    pub total_billed_over_capacity: i64,
    #[serde(deserialize_with = "de::integer")]
    pub total_placed_over_capacity: i64,
    #[serde(deserialize_with = "de::integer")]
    pub total_distance_traveled: i64,
    #[serde(deserialize_with = "de::integer")]
    pub total_same_address: i64,
    #[serde(deserialize_with = "de::opt_flag")]
    pub is_flagged: Option<bool>,
    #[serde(deserialize_with = "de::opt_text")]
    pub comment: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub postal_address: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub city: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderDetailsRow {
    #[serde(deserialize_with = "de::text")]
    pub provider_licensing_id: String,
    #[serde(deserialize_with = "de::opt_text")]
    pub provider_name: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub provider_status: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub provider_type: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub provider_phone: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub provider_email: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub postal_address: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub city: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CityRow {
    #[serde(deserialize_with = "de::text")]
    pub city: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountRow {
    #[serde(deserialize_with = "de::integer")]
    pub count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRow {
    #[serde(deserialize_with = "de::opt_integer")]
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacedMonthRow {
    #[serde(deserialize_with = "de::text", alias = "StartOfMonth")]
    pub start_of_month: String,
    #[serde(deserialize_with = "de::integer")]
    pub provider_capacity: i64,
    #[serde(deserialize_with = "de::number")]
    pub perc_deviation: f64,
    #[serde(deserialize_with = "de::flag")]
    pub placed_over_capacity_flag: bool,
    #[serde(deserialize_with = "de::integer")]
    pub before_and_after_school: i64,
    #[serde(deserialize_with = "de::integer")]
    pub part_time: i64,
    #[serde(deserialize_with = "de::integer")]
    pub variable_schedule: i64,
    #[serde(deserialize_with = "de::integer")]
    pub full_time: i64,
    #[serde(alias = "subRows")]
    pub sub_rows: Vec<PlacedWeekRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacedWeekRow {
    #[serde(deserialize_with = "de::text", alias = "StartOfMonth")]
    pub start_of_month: String,
    #[serde(deserialize_with = "de::opt_text")]
    pub hours_open: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub hours_close: Option<String>,
    #[serde(deserialize_with = "de::integer")]
    pub child_placements: i64,
    #[serde(deserialize_with = "de::integer")]
    pub provider_capacity: i64,
    #[serde(deserialize_with = "de::number")]
    pub perc_deviation: f64,
    #[serde(deserialize_with = "de::integer")]
    pub before_and_after_school: i64,
    #[serde(deserialize_with = "de::integer")]
    pub part_time: i64,
    #[serde(deserialize_with = "de::integer")]
    pub variable_schedule: i64,
    #[serde(deserialize_with = "de::integer")]
    pub full_time: i64,
    #[serde(deserialize_with = "de::flag")]
    pub placed_over_capacity_flag: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BilledMonthRow {
    #[serde(deserialize_with = "de::text", alias = "StartOfMonth")]
    pub start_of_month: String,
    #[serde(deserialize_with = "de::integer")]
    pub provider_capacity: i64,
    #[serde(deserialize_with = "de::integer")]
    pub billed_child_placements: i64,
    #[serde(deserialize_with = "de::number")]
    pub perc_deviation: f64,
    #[serde(deserialize_with = "de::flag")]
    pub billed_over_capacity_flag: bool,
    #[serde(deserialize_with = "de::integer")]
    pub before_and_after_school: i64,
    #[serde(deserialize_with = "de::integer")]
    pub part_time: i64,
    #[serde(deserialize_with = "de::integer")]
    pub variable_schedule: i64,
    #[serde(deserialize_with = "de::integer")]
    pub full_time: i64,
    #[serde(alias = "subRows")]
    pub sub_rows: Vec<BilledWeekRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BilledWeekRow {
    #[serde(deserialize_with = "de::text", alias = "StartOfMonth")]
    pub start_of_month: String,
    #[serde(deserialize_with = "de::opt_text")]
    pub hours_open: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub hours_close: Option<String>,
    #[serde(deserialize_with = "de::integer")]
    pub billed_child_placements: i64,
    #[serde(deserialize_with = "de::integer")]
    pub provider_capacity: i64,
    #[serde(deserialize_with = "de::number")]
    pub perc_deviation: f64,
    #[serde(deserialize_with = "de::integer")]
    pub before_and_after_school: i64,
    #[serde(deserialize_with = "de::integer")]
    pub part_time: i64,
    #[serde(deserialize_with = "de::integer")]
    pub variable_schedule: i64,
    #[serde(deserialize_with = "de::integer")]
    pub full_time: i64,
    #[serde(deserialize_with = "de::flag")]
    pub billed_over_capacity_flag: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistanceMonthRow {
    #[serde(deserialize_with = "de::text", alias = "StartOfMonth")]
    pub start_of_month: String,
    #[serde(deserialize_with = "de::integer")]
    pub family_count: i64,
    #[serde(deserialize_with = "de::number")]
    pub average_distance_miles: f64,
    #[serde(deserialize_with = "de::flag")]
    pub distance_traveled_flag: bool,
    #[serde(alias = "subRows")]
    pub sub_rows: Vec<DistanceWeekRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistanceWeekRow {
    #[serde(deserialize_with = "de::text", alias = "StartOfMonth")]
    pub start_of_month: String,
    #[serde(deserialize_with = "de::integer")]
    pub family_count: i64,
    #[serde(deserialize_with = "de::number")]
    pub average_distance_miles: f64,
    #[serde(deserialize_with = "de::flag")]
    pub distance_traveled_flag: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SameAddressMonthRow {
    #[serde(deserialize_with = "de::text", alias = "StartOfMonth")]
    pub start_of_month: String,
    #[serde(deserialize_with = "de::flag")]
    pub same_address_flag: bool,
    #[serde(deserialize_with = "de::text")]
    pub provider_licensing_id_match: String,
    #[serde(deserialize_with = "de::opt_text")]
    pub provider_name_match: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub postal_address: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub open_date: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub close_date: Option<String>,
    #[serde(alias = "subRows")]
    pub sub_rows: Vec<SameAddressWeekRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SameAddressWeekRow {
    #[serde(deserialize_with = "de::text", alias = "StartOfMonth")]
    pub start_of_month: String,
    #[serde(deserialize_with = "de::flag")]
    pub same_address_flag: bool,
    #[serde(deserialize_with = "de::opt_text")]
    pub postal_address: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub provider_licensing_id_match: String,
    #[serde(deserialize_with = "de::opt_text")]
    pub provider_name_match: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub open_date: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub close_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverallScoreRow {
    #[serde(deserialize_with = "de::text", alias = "StartOfMonth", alias = "startOfMonth")]
    pub start_of_month: String,
    #[serde(deserialize_with = "de::opt_flag")]
    pub over_billed_capacity: Option<bool>,
    #[serde(deserialize_with = "de::opt_flag")]
    pub over_placement_capacity: Option<bool>,
    #[serde(deserialize_with = "de::opt_flag")]
    pub same_address_flag: Option<bool>,
    #[serde(deserialize_with = "de::opt_flag")]
    pub distance_traveled_flag: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightRow {
    #[serde(deserialize_with = "de::integer")]
    pub id: i64,
    #[serde(deserialize_with = "de::text")]
    pub provider_licensing_id: String,
    #[serde(deserialize_with = "de::opt_flag")]
    pub is_flagged: Option<bool>,
    #[serde(deserialize_with = "de::opt_text")]
    pub comment: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub created_by: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub resolved_on: Option<String>,
    pub history: Vec<InsightHistoryRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightHistoryRow {
    #[serde(deserialize_with = "de::integer")]
    pub id: i64,
    #[serde(deserialize_with = "de::text")]
    pub action: String,
    #[serde(deserialize_with = "de::opt_text")]
    pub comment: Option<String>,
    #[serde(deserialize_with = "de::opt_flag")]
    pub is_active: Option<bool>,
    #[serde(deserialize_with = "de::opt_text")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "de::opt_text")]
    pub created_by: Option<String>,
}

// UI view models.

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyView {
    pub provider_id: String,
    pub provider_name: Option<String>,
    pub service_month: String,
    pub billed_over_capacity: &'static str,
    pub placed_over_capacity: &'static str,
    pub same_address: &'static str,
    pub distance_traveled: &'static str,
    pub overall_risk_score: u8,
    pub flagged: bool,
    pub comment: Option<String>,
    pub postal_address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YearlyView {
    pub provider_id: String,
    pub provider_name: Option<String>,
    pub billed_over_capacity: i64,
    pub placed_over_capacity: i64,
    pub same_address: i64,
    pub distance_traveled: i64,
    pub overall_risk_score: i64,
    pub high_risk: bool,
    pub flagged: bool,
    pub comment: Option<String>,
    pub postal_address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDetailsView {
    pub provider_id: String,
    pub provider_name: Option<String>,
    pub status: Option<String>,
    pub provider_type: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub postal_address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
}

impl From<ProviderDetailsRow> for ProviderDetailsView {
    fn from(row: ProviderDetailsRow) -> Self {
        Self {
            provider_id: row.provider_licensing_id,
            provider_name: row.provider_name,
            status: row.provider_status,
            provider_type: row.provider_type,
            phone: row.provider_phone,
            email: row.provider_email,
            postal_address: row.postal_address,
            city: row.city,
            zip: row.zip,
        }
    }
}

/// Month (or week) row of the placed- and billed-over-capacity scenarios.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapacityScenarioView {
    pub service_month: String,
    pub risk_flag: bool,
    pub provider_capacity: i64,
    pub ave_wkly_placements: Option<f64>,
    pub perc_deviation: f64,
    pub before_after_school: i64,
    pub part_time: i64,
    pub variable_schedule: i64,
    pub full_time: i64,
    pub full_time_over_cap: bool,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_rows: Option<Vec<CapacityScenarioView>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistanceScenarioView {
    pub service_month: String,
    pub risk_flag: bool,
    pub distinct_enrolled: i64,
    pub ave_distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_rows: Option<Vec<DistanceScenarioView>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SameAddressScenarioView {
    pub service_month: String,
    pub risk_flag: bool,
    pub provider_id: String,
    pub provider_name: Option<String>,
    pub postal_address: Option<String>,
    pub open_date: Option<String>,
    pub close_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_rows: Option<Vec<SameAddressScenarioView>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverallScoreView {
    pub service_month: String,
    pub billed_over_capacity: bool,
    pub placed_over_capacity: bool,
    pub same_address: bool,
    pub distance_traveled: bool,
    pub overall_risk_score: u8,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsightView {
    pub id: i64,
    pub provider_id: String,
    pub is_flagged: bool,
    pub comment: Option<String>,
    pub created_at: Option<String>,
    pub created_by: Option<String>,
    pub resolved_on: Option<String>,
    pub history: Vec<InsightHistoryView>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsightHistoryView {
    pub id: i64,
    pub action: String,
    pub comment: Option<String>,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub created_by: Option<String>,
}

impl From<InsightRow> for InsightView {
    fn from(row: InsightRow) -> Self {
        let mut history: Vec<InsightHistoryView> = row
            .history
            .into_iter()
            .map(|entry| InsightHistoryView {
                id: entry.id,
                action: entry.action,
                comment: entry.comment,
                is_active: entry.is_active.unwrap_or(false),
                created_at: entry.created_at,
                created_by: entry.created_by,
            })
            .collect();
        history.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Self {
            id: row.id,
            provider_id: row.provider_licensing_id,
            is_flagged: row.is_flagged.unwrap_or(false),
            comment: row.comment,
            created_at: row.created_at,
            created_by: row.created_by,
            resolved_on: row.resolved_on,
            history,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CountView {
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreView {
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HighRiskCountView {
    pub count: i64,
    pub threshold: i64,
}

/// Body of `PUT /providerData/insights/:providerId`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "actionType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsightAction {
    Create {
        #[serde(deserialize_with = "de::flag")]
        is_flagged: bool,
        #[serde(default)]
        comment: String,
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    Update {
        #[serde(default)]
        comment: String,
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    Resolve {
        #[serde(default, deserialize_with = "de::flag")]
        is_flagged: bool,
        #[serde(default)]
        comment: String,
        #[serde(default)]
        resolved_on: Option<DateTime<Utc>>,
    },
}

impl InsightAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "CREATE",
            Self::Update { .. } => "UPDATE",
            Self::Resolve { .. } => "RESOLVE",
        }
    }

    pub fn comment(&self) -> &str {
        match self {
            Self::Create { comment, .. }
            | Self::Update { comment, .. }
            | Self::Resolve { comment, .. } => comment,
        }
    }

    /// Timestamp supplied by the client for this action, if any.
    pub fn acted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Create { created_at, .. } | Self::Update { created_at, .. } => *created_at,
            Self::Resolve { resolved_on, .. } => *resolved_on,
        }
    }
}

/// Lenient scalar decoding: the warehouse may hand back numbers and booleans
/// either natively or as strings depending on the column type.
pub(crate) mod de {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn as_text<E: Error>(value: Value) -> Result<Option<String>, E> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(E::custom(format!("expected text, found {other}"))),
        }
    }

    fn as_integer<E: Error>(value: Value) -> Result<Option<i64>, E> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Some)
                .ok_or_else(|| E::custom(format!("expected an integer, found {n}"))),
            Value::String(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| E::custom(format!("expected an integer, found {s:?}"))),
            other => Err(E::custom(format!("expected an integer, found {other}"))),
        }
    }

    fn as_number<E: Error>(value: Value) -> Result<Option<f64>, E> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| E::custom(format!("expected a number, found {n}"))),
            Value::String(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| E::custom(format!("expected a number, found {s:?}"))),
            other => Err(E::custom(format!("expected a number, found {other}"))),
        }
    }

    fn as_flag<E: Error>(value: Value) -> Result<Option<bool>, E> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(b)),
            Value::String(s) => match s.trim() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(E::custom(format!("expected a boolean, found {s:?}"))),
            },
            other => Err(E::custom(format!("expected a boolean, found {other}"))),
        }
    }

    fn required<T, E: Error>(value: Option<T>) -> Result<T, E> {
        value.ok_or_else(|| E::custom("unexpected null"))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        required(as_text(Value::deserialize(d)?)?)
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        as_text(Value::deserialize(d)?)
    }

    pub fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        required(as_integer(Value::deserialize(d)?)?)
    }

    pub fn opt_integer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        as_integer(Value::deserialize(d)?)
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        required(as_number(Value::deserialize(d)?)?)
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        required(as_flag(Value::deserialize(d)?)?)
    }

    pub fn opt_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        as_flag(Value::deserialize(d)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn monthly_row_requires_every_column() {
        let row = json!({
            "provider_licensing_id": "p-1",
            "provider_name": "Happy Days",
            "start_of_month": "2024-01-01",
            "over_billed_capacity": true,
            "over_placement_capacity": null,
            "same_address_flag": "false",
            "distance_traveled_flag": false,
            "is_flagged": null,
            "comment": null,
            "postal_address": "1 Elm St",
            "city": "Springfield",
            "zip": 12345
        });
        let parsed: MonthlyRiskRow = serde_json::from_value(row.clone()).unwrap();
        assert_eq!(parsed.over_billed_capacity, Some(true));
        assert_eq!(parsed.over_placement_capacity, None);
        assert_eq!(parsed.same_address_flag, Some(false));
        assert_eq!(parsed.zip.as_deref(), Some("12345"));

        let mut missing = row;
        missing.as_object_mut().unwrap().remove("comment");
        let err = serde_json::from_value::<MonthlyRiskRow>(missing).unwrap_err();
        assert!(err.to_string().contains("comment"), "{err}");
    }

    #[test]
    fn mismatched_types_fail_loudly() {
        let row = json!({ "count": "many" });
        assert!(serde_json::from_value::<CountRow>(row).is_err());

        let row = json!({ "count": "42" });
        assert_eq!(serde_json::from_value::<CountRow>(row).unwrap().count, 42);
    }

    #[test]
    fn insight_action_is_tagged_by_action_type() {
        let body = json!({
            "actionType": "CREATE",
            "is_flagged": "true",
            "comment": "Over capacity three months running",
            "created_at": "2024-05-01T12:00:00Z"
        });
        let action: InsightAction = serde_json::from_value(body).unwrap();
        assert_eq!(action.name(), "CREATE");
        assert_eq!(action.comment(), "Over capacity three months running");
        assert!(action.acted_at().is_some());

        let body = json!({ "actionType": "RESOLVE" });
        let action: InsightAction = serde_json::from_value(body).unwrap();
        assert_eq!(
            action,
            InsightAction::Resolve {
                is_flagged: false,
                comment: String::new(),
                resolved_on: None
            }
        );

        let body = json!({ "actionType": "DELETE" });
        assert!(serde_json::from_value::<InsightAction>(body).is_err());
    }

    #[test]
    fn insight_history_is_ordered_by_time() {
        let row: InsightRow = serde_json::from_value(json!({
            "id": 7,
            "provider_licensing_id": "p-1",
            "is_flagged": true,
            "comment": "watch",
            "created_at": "2024-02-01T00:00:00Z",
            "created_by": "team3si",
            "resolved_on": null,
            "history": [
                { "id": 2, "action": "UPDATE", "comment": "watch", "is_active": true,
                  "created_at": "2024-02-01T00:00:00Z", "created_by": "team3si" },
                { "id": 1, "action": "CREATE", "comment": "new", "is_active": true,
                  "created_at": "2024-01-01T00:00:00Z", "created_by": "team3si" }
            ]
        }))
        .unwrap();

        let view = InsightView::from(row);
        let actions: Vec<&str> = view.history.iter().map(|h| h.action.as_str()).collect();
        assert_eq!(actions, vec!["CREATE", "UPDATE"]);
        assert!(view.is_flagged);
    }
}
