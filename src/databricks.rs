//! Client for the Databricks SQL Statement Execution API.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::db::{Row, Warehouse, WarehouseError, WarehouseSession};
use crate::query::Statement;

const STATEMENTS_PATH: &str = "/api/2.0/sql/statements";
const WAIT_TIMEOUT: &str = "10s";

#[derive(Debug, Clone)]
pub struct DatabricksWarehouse {
    client: Client,
    base_url: String,
    warehouse_id: String,
    poll_interval: Duration,
}

impl DatabricksWarehouse {
    /// `request_timeout` bounds each HTTP call, not the whole statement.
    pub fn new(
        host: &str,
        http_path: &str,
        token: &str,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .context("PAT_TOKEN is not a valid header value")?;
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .context("failed to build warehouse HTTP client")?;

        Ok(Self {
            client,
            base_url: normalize_host(host),
            warehouse_id: warehouse_id(http_path)?,
            poll_interval: Duration::from_millis(500),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn warehouse_id(&self) -> &str {
        &self.warehouse_id
    }
}

#[async_trait]
impl Warehouse for DatabricksWarehouse {
    async fn open_session(&self) -> Result<Box<dyn WarehouseSession>, WarehouseError> {
        Ok(Box::new(DatabricksSession {
            warehouse: self.clone(),
            pending: None,
        }))
    }
}

/// `https://` is assumed when the host has no scheme.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

/// The warehouse id is the last segment of an HTTP path such as
/// `/sql/1.0/warehouses/abc123`.
pub fn warehouse_id(http_path: &str) -> anyhow::Result<String> {
    http_path
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .with_context(|| format!("DATABRICKS_HTTP_PATH {http_path:?} has no warehouse id"))
}

struct DatabricksSession {
    warehouse: DatabricksWarehouse,
    /// Statement submitted but not yet seen in a terminal state.
    pending: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    statement: &'a str,
    warehouse_id: &'a str,
    parameters: Vec<Parameter>,
    disposition: &'static str,
    format: &'static str,
    wait_timeout: &'static str,
    on_wait_timeout: &'static str,
}

#[derive(Debug, Serialize)]
struct Parameter {
    name: String,
    value: String,
    #[serde(rename = "type")]
    sql_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    statement_id: String,
    status: StatementStatus,
    #[serde(default)]
    manifest: Option<Manifest>,
    #[serde(default)]
    result: Option<ResultChunk>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    schema: Schema,
}

#[derive(Debug, Default, Deserialize)]
struct Schema {
    #[serde(default)]
    columns: Vec<Column>,
}

#[derive(Debug, Clone, Deserialize)]
struct Column {
    name: String,
    type_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResultChunk {
    #[serde(default)]
    data_array: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    next_chunk_internal_link: Option<String>,
}

impl DatabricksSession {
    async fn submit(&self, statement: &Statement) -> Result<StatementResponse, WarehouseError> {
        let parameters = statement
            .params
            .iter()
            .map(|(name, value)| Parameter {
                name: name.clone(),
                value: value.render(),
                sql_type: value.sql_type(),
            })
            .collect();
        let body = SubmitRequest {
            statement: &statement.text,
            warehouse_id: &self.warehouse.warehouse_id,
            parameters,
            disposition: "INLINE",
            format: "JSON_ARRAY",
            wait_timeout: WAIT_TIMEOUT,
            on_wait_timeout: "CONTINUE",
        };

        let url = format!("{}{}", self.warehouse.base_url, STATEMENTS_PATH);
        let response = self.warehouse.client.post(url).json(&body).send().await?;
        read_json(response).await
    }

    async fn poll(&self, statement_id: &str) -> Result<StatementResponse, WarehouseError> {
        let url = format!(
            "{}{}/{}",
            self.warehouse.base_url, STATEMENTS_PATH, statement_id
        );
        let response = self.warehouse.client.get(url).send().await?;
        read_json(response).await
    }

    async fn next_chunk(&self, link: &str) -> Result<ResultChunk, WarehouseError> {
        let url = format!("{}{}", self.warehouse.base_url, link);
        let response = self.warehouse.client.get(url).send().await?;
        read_json(response).await
    }
}

#[async_trait]
impl WarehouseSession for DatabricksSession {
    async fn execute(&mut self, statement: &Statement) -> Result<Vec<Row>, WarehouseError> {
        let mut response = self.submit(statement).await?;
        self.pending = Some(response.statement_id.clone());

        while matches!(response.status.state.as_str(), "PENDING" | "RUNNING") {
            tokio::time::sleep(self.warehouse.poll_interval).await;
            response = self.poll(&response.statement_id).await?;
        }
        self.pending = None;

        if response.status.state != "SUCCEEDED" {
            let message = response
                .status
                .error
                .and_then(|err| err.message.or(err.error_code))
                .unwrap_or_else(|| "statement did not succeed".to_string());
            return Err(WarehouseError::statement(response.status.state, message));
        }

        let columns = response
            .manifest
            .map(|manifest| manifest.schema.columns)
            .unwrap_or_default();
        let mut rows = Vec::new();
        let mut chunk = response.result.unwrap_or_default();
        loop {
            for cells in chunk.data_array.take().unwrap_or_default() {
                rows.push(decode_row(&columns, cells)?);
            }
            match chunk.next_chunk_internal_link.take() {
                Some(link) => chunk = self.next_chunk(&link).await?,
                None => break,
            }
        }
        Ok(rows)
    }

    async fn close(self: Box<Self>) -> Result<(), WarehouseError> {
        let Some(statement_id) = self.pending.as_deref() else {
            return Ok(());
        };
        tracing::debug!(statement_id, "cancelling unfinished statement");
        let url = format!(
            "{}{}/{}/cancel",
            self.warehouse.base_url, STATEMENTS_PATH, statement_id
        );
        let response = self.warehouse.client.post(url).send().await?;
        if !response.status().is_success() {
            return Err(WarehouseError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, WarehouseError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(WarehouseError::Status {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|err| WarehouseError::Decode(err.to_string()))
}

fn decode_row(columns: &[Column], cells: Vec<Option<String>>) -> Result<Row, WarehouseError> {
    if cells.len() != columns.len() {
        return Err(WarehouseError::Decode(format!(
            "row has {} cells for {} columns",
            cells.len(),
            columns.len()
        )));
    }
    columns
        .iter()
        .zip(cells)
        .map(|(column, cell)| Ok((column.name.clone(), decode_cell(&column.type_name, cell)?)))
        .collect()
}

fn decode_cell(type_name: &str, cell: Option<String>) -> Result<Value, WarehouseError> {
    let Some(raw) = cell else {
        return Ok(Value::Null);
    };
    let invalid = |err: &dyn std::fmt::Display| {
        WarehouseError::Decode(format!("bad {type_name} value {raw:?}: {err}"))
    };

    match type_name.to_ascii_uppercase().as_str() {
        "BOOLEAN" => raw
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|err| invalid(&err)),
        "BYTE" | "SHORT" | "INT" | "LONG" | "BIGINT" => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|err| invalid(&err)),
        "FLOAT" | "DOUBLE" | "DECIMAL" => {
            let number = raw.parse::<f64>().map_err(|err| invalid(&err))?;
            Ok(Number::from_f64(number)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        "ARRAY" | "STRUCT" | "MAP" => serde_json::from_str(&raw).map_err(|err| invalid(&err)),
        _ => Ok(Value::String(raw)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::query::ParamValue;

    fn warehouse_with_timeout(server: &MockServer, timeout: Duration) -> DatabricksWarehouse {
        DatabricksWarehouse::new(
            &server.uri(),
            "/sql/1.0/warehouses/wh-42",
            "dapi-token",
            timeout,
        )
        .unwrap()
        .with_poll_interval(Duration::from_millis(5))
    }

    fn warehouse(server: &MockServer) -> DatabricksWarehouse {
        warehouse_with_timeout(server, Duration::from_secs(5))
    }

    fn succeeded(id: &str, data: Value) -> Value {
        json!({
            "statement_id": id,
            "status": { "state": "SUCCEEDED" },
            "manifest": { "schema": { "columns": [
                { "name": "provider_licensing_id", "type_name": "STRING" },
                { "name": "count", "type_name": "BIGINT" },
                { "name": "is_flagged", "type_name": "BOOLEAN" },
                { "name": "perc_deviation", "type_name": "DOUBLE" },
                { "name": "sub_rows", "type_name": "ARRAY" }
            ] } },
            "result": { "data_array": data }
        })
    }

    #[test]
    fn host_and_warehouse_id_are_normalized() {
        assert_eq!(
            normalize_host("dbc-1.cloud.databricks.com/"),
            "https://dbc-1.cloud.databricks.com"
        );
        assert_eq!(normalize_host("http://localhost:9000"), "http://localhost:9000");
        assert_eq!(warehouse_id("/sql/1.0/warehouses/abc123").unwrap(), "abc123");
        assert_eq!(warehouse_id("/sql/1.0/warehouses/abc123/").unwrap(), "abc123");
        assert!(warehouse_id("").is_err());
    }

    #[test]
    fn cells_decode_by_column_type() {
        assert_eq!(decode_cell("BOOLEAN", Some("true".into())).unwrap(), json!(true));
        assert_eq!(decode_cell("INT", Some("12".into())).unwrap(), json!(12));
        assert_eq!(decode_cell("DECIMAL", Some("0.25".into())).unwrap(), json!(0.25));
        assert_eq!(decode_cell("DATE", Some("2024-01-01".into())).unwrap(), json!("2024-01-01"));
        assert_eq!(decode_cell("STRING", None).unwrap(), Value::Null);
        assert_eq!(
            decode_cell("ARRAY", Some(r#"[{"id":1}]"#.into())).unwrap(),
            json!([{ "id": 1 }])
        );
        assert!(decode_cell("BIGINT", Some("lots".into())).is_err());
    }

    #[tokio::test]
    async fn submits_bound_parameters_and_decodes_rows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .and(header("authorization", "Bearer dapi-token"))
            .and(body_partial_json(json!({
                "warehouse_id": "wh-42",
                "disposition": "INLINE",
                "format": "JSON_ARRAY",
                "parameters": [
                    { "name": "month", "value": "2024-03-01", "type": "DATE" },
                    { "name": "plid", "value": "p-1", "type": "STRING" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(succeeded(
                "st-1",
                json!([["p-1", "4", "false", "1.5", "[]"], ["p-2", null, null, null, null]]),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let statement = Statement::new("SELECT 1")
            .bind("plid", "p-1")
            .bind("month", ParamValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        let mut session = warehouse(&server).open_session().await.unwrap();
        let rows = session.execute(&statement).await.unwrap();
        session.close().await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["count"], json!(4));
        assert_eq!(rows[0]["is_flagged"], json!(false));
        assert_eq!(rows[0]["perc_deviation"], json!(1.5));
        assert_eq!(rows[0]["sub_rows"], json!([]));
        assert_eq!(rows[1]["count"], Value::Null);
    }

    #[tokio::test]
    async fn slow_http_calls_hit_the_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(succeeded("st-slow", json!([])))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut session = warehouse_with_timeout(&server, Duration::from_millis(50))
            .open_session()
            .await
            .unwrap();
        let err = session.execute(&Statement::new("SELECT 1")).await.unwrap_err();

        assert!(matches!(err, WarehouseError::Http(ref source) if source.is_timeout()));
    }

    #[tokio::test]
    async fn polls_until_finished_and_follows_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statement_id": "st-2",
                "status": { "state": "PENDING" }
            })))
            .mount(&server)
            .await;

        let mut done = succeeded("st-2", json!([["p-1", "1", "true", "0", "[]"]]));
        done["result"]["next_chunk_internal_link"] =
            json!("/api/2.0/sql/statements/st-2/result/chunks/1");
        Mock::given(method("GET"))
            .and(path("/api/2.0/sql/statements/st-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(done))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/2.0/sql/statements/st-2/result/chunks/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data_array": [["p-2", "2", "false", "0", "[]"]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = warehouse(&server).open_session().await.unwrap();
        let rows = session.execute(&Statement::new("SELECT 1")).await.unwrap();

        let ids: Vec<&Value> = rows.iter().map(|row| &row["provider_licensing_id"]).collect();
        assert_eq!(ids, vec![&json!("p-1"), &json!("p-2")]);
    }

    #[tokio::test]
    async fn failed_statements_carry_the_warehouse_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statement_id": "st-3",
                "status": {
                    "state": "FAILED",
                    "error": {
                        "error_code": "BAD_REQUEST",
                        "message": "[TABLE_OR_VIEW_NOT_FOUND] risk_scores"
                    }
                }
            })))
            .mount(&server)
            .await;

        let mut session = warehouse(&server).open_session().await.unwrap();
        let err = session.execute(&Statement::new("SELECT 1")).await.unwrap_err();

        match err {
            WarehouseError::Statement { state, message } => {
                assert_eq!(state, "FAILED");
                assert!(message.contains("TABLE_OR_VIEW_NOT_FOUND"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_errors_surface_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("Invalid access token"))
            .mount(&server)
            .await;

        let mut session = warehouse(&server).open_session().await.unwrap();
        let err = session.execute(&Statement::new("SELECT 1")).await.unwrap_err();
        assert!(matches!(err, WarehouseError::Status { status: 403, .. }));
        assert!(err.to_string().contains("Invalid access token"));
    }

    #[tokio::test]
    async fn closing_an_unfinished_statement_cancels_it() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statement_id": "st-4",
                "status": { "state": "RUNNING" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/2.0/sql/statements/st-4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statement_id": "st-4",
                "status": { "state": "RUNNING" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/2.0/sql/statements/st-4/cancel"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = warehouse(&server).open_session().await.unwrap();
        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            session.execute(&Statement::new("SELECT 1")),
        )
        .await;
        assert!(outcome.is_err());
        session.close().await.unwrap();
    }
}
