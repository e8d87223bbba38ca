use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::error::AppError;
use crate::query::Statement;

/// One result row keyed by column name.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("warehouse request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("warehouse returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("statement {state}: {message}")]
    Statement { state: String, message: String },

    #[error("could not decode warehouse response: {0}")]
    Decode(String),
}

impl WarehouseError {
    pub fn statement(state: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Statement {
            state: state.into(),
            message: message.into(),
        }
    }
}

/// Something that can hand out short-lived query sessions.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn WarehouseSession>, WarehouseError>;
}

#[async_trait]
pub trait WarehouseSession: Send {
    async fn execute(&mut self, statement: &Statement) -> Result<Vec<Row>, WarehouseError>;

    /// Releases anything still held server side.
    async fn close(self: Box<Self>) -> Result<(), WarehouseError>;
}

/// Runs each statement in its own session and always closes it afterwards.
#[derive(Clone)]
pub struct QueryExecutor {
    warehouse: Arc<dyn Warehouse>,
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(warehouse: Arc<dyn Warehouse>, timeout: Duration) -> Self {
        Self { warehouse, timeout }
    }

    pub async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>, AppError> {
        let mut session = self.warehouse.open_session().await?;
        tracing::debug!(
            sql_len = statement.text.len(),
            params = ?statement.params.keys().collect::<Vec<_>>(),
            "executing statement"
        );

        let outcome = tokio::time::timeout(self.timeout, session.execute(statement)).await;

        if let Err(err) = session.close().await {
            tracing::warn!(error = %err, "failed to close warehouse session");
        }

        match outcome {
            Ok(Ok(rows)) => {
                tracing::debug!(rows = rows.len(), "statement finished");
                Ok(rows)
            }
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(AppError::Timeout(self.timeout)),
        }
    }

    /// Fetches and maps every row into `T`; a missing or mistyped column
    /// fails the whole request.
    pub async fn fetch_as<T: DeserializeOwned>(
        &self,
        statement: &Statement,
        record: &'static str,
    ) -> Result<Vec<T>, AppError> {
        self.fetch_all(statement)
            .await?
            .into_iter()
            .map(|row| map_row(row, record))
            .collect()
    }

    pub async fn fetch_first<T: DeserializeOwned>(
        &self,
        statement: &Statement,
        record: &'static str,
    ) -> Result<Option<T>, AppError> {
        match self.fetch_all(statement).await?.into_iter().next() {
            Some(row) => map_row(row, record).map(Some),
            None => Ok(None),
        }
    }

    pub async fn execute(&self, statement: &Statement) -> Result<(), AppError> {
        self.fetch_all(statement).await.map(|_| ())
    }
}

pub fn map_row<T: DeserializeOwned>(row: Row, record: &'static str) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|source| AppError::RowMapping { record, source })
}
