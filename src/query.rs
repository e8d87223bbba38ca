use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use regex::Regex;

use crate::filter::{FlagStatus, ReportFilter, PAGE_SIZE};
use crate::models::InsightAction;

/// A bound value for a `:name` parameter marker.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Int(i64),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl ParamValue {
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::String(_) => "STRING",
            Self::Int(_) => "BIGINT",
            Self::Bool(_) => "BOOLEAN",
            Self::Date(_) => "DATE",
            Self::Timestamp(_) => "TIMESTAMP",
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::String(value) => value.clone(),
            Self::Int(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Date(value) => value.format("%Y-%m-%d").to_string(),
            Self::Timestamp(value) => value.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// SQL text plus its named parameters. Caller input only ever reaches the
/// warehouse through `params`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: BTreeMap<String, ParamValue>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn push_sql(&mut self, sql: &str) {
        self.text.push_str(sql);
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.params.insert(name.to_string(), value.into());
    }

    pub fn bind(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    #[cfg(test)]
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("valid identifier regex")
    })
}

/// Schemas holding the risk tables and the address table. These are the only
/// values spliced into SQL text, so they are validated up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    risk: String,
    addresses: String,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            risk: "cusp_audit.demo".to_string(),
            addresses: "cusp_audit.fake_data".to_string(),
        }
    }
}

impl Catalog {
    pub fn new(risk_schema: &str, address_schema: &str) -> anyhow::Result<Self> {
        for schema in [risk_schema, address_schema] {
            if !identifier_pattern().is_match(schema) {
                anyhow::bail!("invalid schema identifier {schema:?}");
            }
        }
        Ok(Self {
            risk: risk_schema.to_string(),
            addresses: address_schema.to_string(),
        })
    }

    fn risk(&self, table: &str) -> String {
        format!("{}.{}", self.risk, table)
    }

    fn addresses(&self) -> String {
        format!("{}.addresses", self.addresses)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Offset(i64),
    /// Exports return every matching row.
    Unbounded,
}

impl Page {
    pub fn from_filter(filter: &ReportFilter) -> Self {
        Self::Offset(filter.offset)
    }
}

fn push_flag_filter(statement: &mut Statement, flag_status: FlagStatus) {
    match flag_status.filter_value() {
        Some(true) => {
            statement.push_sql(" AND pi.is_flagged = :isFlagged");
            statement.set("isFlagged", true);
        }
        // Providers that were never annotated count as unflagged.
        Some(false) => {
            statement.push_sql(" AND (pi.is_flagged IS NULL OR pi.is_flagged = :isFlagged)");
            statement.set("isFlagged", false);
        }
        None => {}
    }
}

fn push_city_filter(statement: &mut Statement, filter: &ReportFilter) {
    if let Some(cities) = filter.cities_param() {
        statement.push_sql(
            " AND ARRAY_CONTAINS(TRANSFORM(SPLIT(:cities, ','), s -> TRIM(s)), a.city)",
        );
        statement.set("cities", cities);
    }
}

fn push_page(statement: &mut Statement, page: Page) {
    if let Page::Offset(offset) = page {
        statement.push_sql(" LIMIT :limit OFFSET :offset");
        statement.set("limit", PAGE_SIZE);
        statement.set("offset", offset.max(0));
    }
}

pub fn sample_rows(catalog: &Catalog) -> Statement {
    Statement::new(format!("SELECT * FROM {} LIMIT 10", catalog.risk("risk_scores")))
}

pub fn provider_details(catalog: &Catalog, provider_id: &str) -> Statement {
    let text = format!(
        r#"
        SELECT
          rp.provider_name,
          rp.provider_licensing_id,
          rp.provider_status,
          rp.provider_type,
          rp.provider_phone,
          rp.provider_email,
          a.postal_address,
          a.city,
          a.zip
        FROM {providers} rp
        JOIN {addresses} a ON rp.provider_address_uid = a.provider_address_uid
        WHERE rp.provider_licensing_id = :plid
        "#,
        providers = catalog.risk("risk_providers"),
        addresses = catalog.addresses(),
    );
    Statement::new(text).bind("plid", provider_id)
}

pub fn provider_monthly(
    catalog: &Catalog,
    month: NaiveDate,
    filter: &ReportFilter,
    page: Page,
) -> Statement {
    let text = format!(
        r#"
        SELECT
          rp.provider_licensing_id,
          rp.provider_name,
          dates.StartOfMonth AS start_of_month,
          dates.over_billed_capacity,
          dates.over_placement_capacity,
          dates.same_address_flag,
          dates.distance_traveled_flag,
          pi.is_flagged,
          pi.comment,
          a.postal_address,
          a.city,
          a.zip
        FROM (
          SELECT provider_licensing_id, StartOfMonth, over_billed_capacity,
            over_placement_capacity, same_address_flag, distance_traveled_flag
          FROM {scores}
          WHERE StartOfMonth = :month
        ) AS dates
        JOIN {providers} rp ON rp.provider_licensing_id = dates.provider_licensing_id
        LEFT JOIN {insights} pi ON rp.provider_licensing_id = pi.provider_licensing_id
        LEFT JOIN {addresses} a ON rp.provider_address_uid = a.provider_address_uid
        WHERE 1=1"#,
        scores = catalog.risk("risk_scores"),
        providers = catalog.risk("risk_providers"),
        insights = catalog.risk("provider_insights"),
        addresses = catalog.addresses(),
    );

    let mut statement = Statement::new(text).bind("month", month);
    push_flag_filter(&mut statement, filter.flag_status);
    push_city_filter(&mut statement, filter);
    statement.push_sql(" ORDER BY dates.StartOfMonth DESC");
    push_page(&mut statement, page);
    statement
}

fn yearly_combined(catalog: &Catalog) -> String {
    let monthly_total = |table: &str, flag: &str, total: &str| {
        format!(
            r#"SELECT provider_licensing_id,
              SUM(CASE WHEN {flag} THEN 1 ELSE 0 END) AS {total}
            FROM {table}
            WHERE YEAR(CAST(StartOfMonth AS DATE)) = :year
            GROUP BY provider_licensing_id"#,
            table = catalog.risk(table),
        )
    };

    format!(
        r#"
        WITH combined AS (
          SELECT
            COALESCE(b.provider_licensing_id, p.provider_licensing_id, d.provider_licensing_id, s.provider_licensing_id) AS provider_licensing_id,
            COALESCE(b.total_billed_over_capacity, 0) AS total_billed_over_capacity,
            COALESCE(p.total_placed_over_capacity, 0) AS total_placed_over_capacity,
            COALESCE(d.total_distance_traveled, 0) AS total_distance_traveled,
            COALESCE(s.total_same_address, 0) AS total_same_address,
            COALESCE(b.total_billed_over_capacity, 0) +
            COALESCE(p.total_placed_over_capacity, 0) +
            COALESCE(d.total_distance_traveled, 0) +
            COALESCE(s.total_same_address, 0) AS overall_risk_score
          FROM ({billed}) b
          FULL OUTER JOIN ({placed}) p
            ON b.provider_licensing_id = p.provider_licensing_id
          FULL OUTER JOIN ({distance}) d
            ON COALESCE(b.provider_licensing_id, p.provider_licensing_id) = d.provider_licensing_id
          FULL OUTER JOIN ({address}) s
            ON COALESCE(b.provider_licensing_id, p.provider_licensing_id, d.provider_licensing_id) = s.provider_licensing_id
        )"#,
        billed = monthly_total(
            "monthly_billed_over_capacity",
            "billed_over_capacity_flag",
            "total_billed_over_capacity"
        ),
        placed = monthly_total(
            "monthly_placed_over_capacity",
            "placed_over_capacity_flag",
            "total_placed_over_capacity"
        ),
        distance = monthly_total(
            "monthly_distance_traveled",
            "distance_traveled_flag",
            "total_distance_traveled"
        ),
        address = monthly_total(
            "monthly_providers_with_same_address",
            "same_address_flag",
            "total_same_address"
        ),
    )
}

pub fn provider_yearly(
    catalog: &Catalog,
    year: i32,
    filter: &ReportFilter,
    page: Page,
) -> Statement {
    let text = format!(
        r#"{combined}
        SELECT
          c.provider_licensing_id,
          pa.provider_name,
          c.total_billed_over_capacity,
          c.total_placed_over_capacity,
          c.total_distance_traveled,
          c.total_same_address,
          pi.is_flagged,
          pi.comment,
          a.postal_address,
          a.city,
          a.zip
        FROM combined c
        JOIN {providers} rp ON c.provider_licensing_id = rp.provider_licensing_id
        LEFT JOIN {attributes} pa ON c.provider_licensing_id = pa.provider_licensing_id
        LEFT JOIN {insights} pi ON c.provider_licensing_id = pi.provider_licensing_id
        LEFT JOIN {addresses} a ON rp.provider_address_uid = a.provider_address_uid
        WHERE 1=1"#,
        combined = yearly_combined(catalog),
        providers = catalog.risk("risk_providers"),
        attributes = catalog.risk("provider_attributes"),
        insights = catalog.risk("provider_insights"),
        addresses = catalog.addresses(),
    );

    let mut statement = Statement::new(text).bind("year", year);
    push_flag_filter(&mut statement, filter.flag_status);
    push_city_filter(&mut statement, filter);
    statement.push_sql(" ORDER BY c.overall_risk_score DESC, c.provider_licensing_id");
    push_page(&mut statement, page);
    statement
}

/// Headline figures over the yearly totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearlyHeadline {
    ProviderCount,
    FlaggedCount,
    HighestScore,
    HighRiskCount { threshold: i64 },
}

pub fn yearly_headline(catalog: &Catalog, year: i32, headline: YearlyHeadline) -> Statement {
    let providers = catalog.risk("risk_providers");
    let insights = catalog.risk("provider_insights");
    let body = match headline {
        YearlyHeadline::ProviderCount => format!(
            r#"
        SELECT COUNT(DISTINCT c.provider_licensing_id) AS count
        FROM combined c
        JOIN {providers} rp ON c.provider_licensing_id = rp.provider_licensing_id"#
        ),
        YearlyHeadline::FlaggedCount => format!(
            r#"
        SELECT COUNT(DISTINCT c.provider_licensing_id) AS count
        FROM combined c
        JOIN {providers} rp ON c.provider_licensing_id = rp.provider_licensing_id
        JOIN {insights} pi ON c.provider_licensing_id = pi.provider_licensing_id
        WHERE pi.is_flagged = true"#
        ),
        YearlyHeadline::HighestScore => format!(
            r#"
        SELECT MAX(c.overall_risk_score) AS score
        FROM combined c
        JOIN {providers} rp ON c.provider_licensing_id = rp.provider_licensing_id"#
        ),
        YearlyHeadline::HighRiskCount { .. } => format!(
            r#"
        SELECT COUNT(DISTINCT c.provider_licensing_id) AS count
        FROM combined c
        JOIN {providers} rp ON c.provider_licensing_id = rp.provider_licensing_id
        WHERE c.overall_risk_score >= :threshold"#
        ),
    };

    let mut statement =
        Statement::new(format!("{}{}", yearly_combined(catalog), body)).bind("year", year);
    if let YearlyHeadline::HighRiskCount { threshold } = headline {
        statement.set("threshold", threshold);
    }
    statement
}

pub fn provider_cities(catalog: &Catalog, search: Option<&str>) -> Statement {
    let text = format!(
        r#"
        SELECT DISTINCT a.city
        FROM {providers} rp
        JOIN {addresses} a ON rp.provider_address_uid = a.provider_address_uid
        WHERE a.city IS NOT NULL"#,
        providers = catalog.risk("risk_providers"),
        addresses = catalog.addresses(),
    );
    let mut statement = Statement::new(text);
    if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
        statement.push_sql(" AND INSTR(LOWER(a.city), LOWER(:search)) > 0");
        statement.set("search", search);
    }
    statement
}

pub fn scenario_overall(catalog: &Catalog, provider_id: &str) -> Statement {
    let text = format!(
        r#"
        SELECT
          dates.StartOfMonth AS start_of_month,
          dates.over_billed_capacity,
          dates.over_placement_capacity,
          dates.same_address_flag,
          dates.distance_traveled_flag
        FROM {scores} dates
        JOIN {providers} rp ON rp.provider_licensing_id = dates.provider_licensing_id
        WHERE dates.provider_licensing_id = :plid
        ORDER BY dates.StartOfMonth
        "#,
        scores = catalog.risk("risk_scores"),
        providers = catalog.risk("risk_providers"),
    );
    Statement::new(text).bind("plid", provider_id)
}

pub fn scenario_placed_over_capacity(catalog: &Catalog, provider_id: &str) -> Statement {
    let text = format!(
        r#"
        SELECT
          m.StartOfMonth AS start_of_month,
          m.provider_capacity,
          m.perc_deviation,
          m.placed_over_capacity_flag,
          m.before_and_after_school,
          m.part_time,
          m.variable_schedule,
          m.full_time,
          collect_list(
            named_struct(
              'start_of_month', p.placement_week,
              'child_placements', p.child_placements,
              'full_time', p.full_time,
              'before_and_after_school', p.before_and_after_school,
              'part_time', p.part_time,
              'variable_schedule', p.variable_schedule,
              'provider_capacity', p.provider_capacity,
              'hours_open', p.hours_open,
              'hours_close', p.hours_close,
              'placed_over_capacity_flag', p.placed_over_capacity_flag,
              'perc_deviation', p.perc_deviation
            )
          ) AS sub_rows
        FROM {monthly} m
        JOIN {weekly} p
          ON m.provider_licensing_id = p.provider_licensing_id
          AND date_trunc('month', m.StartOfMonth) = date_trunc('month', p.placement_week)
        WHERE m.provider_licensing_id = :plid
        GROUP BY
          m.StartOfMonth,
          m.provider_capacity,
          m.perc_deviation,
          m.placed_over_capacity_flag,
          m.before_and_after_school,
          m.part_time,
          m.variable_schedule,
          m.full_time
        ORDER BY m.StartOfMonth
        "#,
        monthly = catalog.risk("monthly_placed_over_capacity"),
        weekly = catalog.risk("placed_over_capacity"),
    );
    Statement::new(text).bind("plid", provider_id)
}

pub fn scenario_billed_over_capacity(catalog: &Catalog, provider_id: &str) -> Statement {
    let text = format!(
        r#"
        SELECT
          m.StartOfMonth AS start_of_month,
          m.provider_capacity,
          m.billed_child_placements,
          m.perc_deviation,
          m.billed_over_capacity_flag,
          m.before_and_after_school,
          m.part_time,
          m.variable_schedule,
          m.full_time,
          collect_list(
            named_struct(
              'start_of_month', b.service_week,
              'billed_child_placements', b.billed_child_placements,
              'full_time', b.full_time,
              'before_and_after_school', b.before_and_after_school,
              'part_time', b.part_time,
              'variable_schedule', b.variable_schedule,
              'provider_capacity', b.provider_capacity,
              'hours_open', b.hours_open,
              'hours_close', b.hours_close,
              'billed_over_capacity_flag', b.billed_over_capacity_flag,
              'perc_deviation', b.perc_deviation
            )
          ) AS sub_rows
        FROM {monthly} m
        JOIN {weekly} b
          ON m.provider_licensing_id = b.provider_licensing_id
          AND date_trunc('month', m.StartOfMonth) = date_trunc('month', b.service_week)
        WHERE m.provider_licensing_id = :plid
        GROUP BY
          m.StartOfMonth,
          m.provider_capacity,
          m.billed_child_placements,
          m.perc_deviation,
          m.billed_over_capacity_flag,
          m.before_and_after_school,
          m.part_time,
          m.variable_schedule,
          m.full_time
        ORDER BY m.StartOfMonth
        "#,
        monthly = catalog.risk("monthly_billed_over_capacity"),
        weekly = catalog.risk("billed_over_capacity"),
    );
    Statement::new(text).bind("plid", provider_id)
}

pub fn scenario_distance_traveled(catalog: &Catalog, provider_id: &str) -> Statement {
    let text = format!(
        r#"
        SELECT
          m.StartOfMonth AS start_of_month,
          m.family_count,
          m.average_distance_miles,
          m.distance_traveled_flag,
          collect_list(
            named_struct(
              'start_of_month', d.placement_week,
              'family_count', d.family_count,
              'average_distance_miles', d.average_distance_miles,
              'distance_traveled_flag', d.distance_traveled_flag
            )
          ) AS sub_rows
        FROM {monthly} m
        JOIN {weekly} d
          ON m.provider_licensing_id = d.provider_licensing_id
          AND date_trunc('month', m.StartOfMonth) = date_trunc('month', d.placement_week)
        WHERE m.provider_licensing_id = :plid
        GROUP BY
          m.StartOfMonth,
          m.family_count,
          m.average_distance_miles,
          m.distance_traveled_flag
        ORDER BY to_timestamp(m.StartOfMonth) DESC
        "#,
        monthly = catalog.risk("monthly_distance_traveled"),
        weekly = catalog.risk("distance_traveled"),
    );
    Statement::new(text).bind("plid", provider_id)
}

/// Matches are restricted to other providers at this provider's own postal
/// address, one row per (provider, matched provider, month), earliest first.
pub fn scenario_same_address(catalog: &Catalog, provider_id: &str) -> Statement {
    let text = format!(
        r#"
        SELECT *
        FROM (
          SELECT
            m.StartOfMonth AS start_of_month,
            m.same_address_flag,
            m.provider_licensing_id_match,
            m.provider_name_match,
            p.open_date,
            p.close_date,
            p.postal_address,
            collect_list(
              named_struct(
                'start_of_month', p.placement_week,
                'postal_address', p.postal_address,
                'same_address_flag', p.same_address_flag,
                'provider_licensing_id_match', p.provider_licensing_id_match,
                'provider_name_match', p.provider_name,
                'open_date', p.open_date,
                'close_date', p.close_date
              )
            ) AS sub_rows,
            row_number() OVER (
              PARTITION BY
                m.provider_licensing_id,
                m.provider_licensing_id_match,
                date_trunc('month', m.StartOfMonth)
              ORDER BY m.StartOfMonth
            ) AS rn
          FROM {monthly} m
          JOIN {providers} rp
            ON m.provider_licensing_id = rp.provider_licensing_id
          JOIN {weekly} p
            ON m.provider_licensing_id_match = p.provider_licensing_id
            AND m.provider_licensing_id = :plid
            AND p.postal_address = rp.postal_address
            AND m.provider_licensing_id <> m.provider_licensing_id_match
            AND date_trunc('month', m.StartOfMonth) = date_trunc('month', p.placement_week)
          GROUP BY
            m.StartOfMonth,
            m.same_address_flag,
            m.provider_licensing_id,
            m.provider_licensing_id_match,
            m.provider_name_match,
            p.postal_address,
            p.open_date,
            p.close_date
        ) t
        WHERE rn = 1
        ORDER BY start_of_month, postal_address
        "#,
        monthly = catalog.risk("monthly_providers_with_same_address"),
        providers = catalog.risk("risk_providers"),
        weekly = catalog.risk("providers_with_same_address"),
    );
    Statement::new(text).bind("plid", provider_id)
}

pub fn provider_insight(catalog: &Catalog, provider_id: &str) -> Statement {
    let text = format!(
        r#"
        SELECT
          p.id,
          p.provider_licensing_id,
          p.is_flagged,
          p.comment,
          p.created_at,
          p.created_by,
          p.resolved_on,
          filter(
            collect_list(
              named_struct(
                'id', h.id,
                'action', h.action_taken,
                'comment', h.comment,
                'is_active', h.is_active,
                'created_at', h.created_at,
                'created_by', h.created_by
              )
            ),
            item -> item.id IS NOT NULL
          ) AS history
        FROM {insights} p
        LEFT JOIN {history} h ON h.provider_insight_id = p.id
        WHERE p.provider_licensing_id = :plid
        GROUP BY p.id, p.provider_licensing_id, p.is_flagged, p.comment, p.created_at,
          p.created_by, p.resolved_on
        "#,
        insights = catalog.risk("provider_insights"),
        history = catalog.risk("provider_insights_history"),
    );
    Statement::new(text).bind("plid", provider_id)
}

/// Applies an insight action to the provider's annotation row.
pub fn write_insight(
    catalog: &Catalog,
    provider_id: &str,
    action: &InsightAction,
    actor: &str,
    acted_at: DateTime<Utc>,
) -> Statement {
    let insights = catalog.risk("provider_insights");
    let statement = match action {
        InsightAction::Create {
            is_flagged,
            comment,
            ..
        } => Statement::new(format!(
            r#"
        MERGE INTO {insights} AS target
        USING (
          SELECT
            :plid AS provider_licensing_id,
            :is_flagged AS is_flagged,
            :comment AS comment,
            :acted_at AS created_at,
            :acted_by AS created_by
        ) AS source
        ON target.provider_licensing_id = source.provider_licensing_id
        WHEN MATCHED THEN UPDATE SET
          target.is_flagged = source.is_flagged,
          target.comment = source.comment,
          target.created_at = source.created_at,
          target.created_by = source.created_by,
          target.resolved_on = NULL
        WHEN NOT MATCHED THEN
          INSERT (provider_licensing_id, is_flagged, comment, created_at, created_by)
          VALUES (source.provider_licensing_id, source.is_flagged, source.comment,
            source.created_at, source.created_by)
        "#
        ))
        .bind("is_flagged", *is_flagged)
        .bind("comment", comment.as_str())
        .bind("acted_by", actor),
        InsightAction::Update { comment, .. } => Statement::new(format!(
            r#"
        UPDATE {insights}
        SET comment = :comment
        WHERE provider_licensing_id = :plid
        "#
        ))
        .bind("comment", comment.as_str()),
        InsightAction::Resolve { is_flagged, .. } => Statement::new(format!(
            r#"
        UPDATE {insights}
        SET is_flagged = :is_flagged, comment = '', resolved_on = :acted_at
        WHERE provider_licensing_id = :plid
        "#
        ))
        .bind("is_flagged", *is_flagged),
    };

    let statement = statement.bind("plid", provider_id);
    if matches!(action, InsightAction::Update { .. }) {
        statement
    } else {
        statement.bind("acted_at", acted_at)
    }
}

/// Appends the audit entry that follows every insight write. A resolve keeps
/// the resolution note in history since the live comment is cleared.
pub fn record_insight_history(
    catalog: &Catalog,
    provider_id: &str,
    action: &InsightAction,
    actor: &str,
    acted_at: DateTime<Utc>,
) -> Statement {
    let comment = match action {
        InsightAction::Resolve { .. } => ":comment",
        _ => "comment",
    };
    let text = format!(
        r#"
        INSERT INTO {history} (
          provider_insight_id,
          created_at,
          created_by,
          action_taken,
          comment,
          is_active
        )
        SELECT id, :acted_at, :acted_by, :action, {comment}, is_flagged
        FROM {insights}
        WHERE provider_licensing_id = :plid
        "#,
        history = catalog.risk("provider_insights_history"),
        insights = catalog.risk("provider_insights"),
    );

    let mut statement = Statement::new(text)
        .bind("plid", provider_id)
        .bind("acted_at", acted_at)
        .bind("acted_by", actor)
        .bind("action", action.name());
    if let InsightAction::Resolve { comment, .. } = action {
        statement.set("comment", comment.as_str());
    }
    statement
}
