use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, ValueEnum};

use crate::auth::{DEFAULT_LOGIN_EMAIL, DEFAULT_LOGIN_PASSWORD};
use crate::databricks::DatabricksWarehouse;
use crate::db::QueryExecutor;
use crate::query::Catalog;
use crate::risk::{RiskPolicy, DEFAULT_HIGH_RISK_THRESHOLD};
use crate::service::RiskService;

#[derive(Debug, Clone, Args)]
pub struct WarehouseArgs {
    /// Databricks workspace host, with or without scheme
    #[arg(long = "databricks-host", env = "DATABRICKS_HOST")]
    pub host: String,
    /// SQL warehouse HTTP path, e.g. /sql/1.0/warehouses/<id>
    #[arg(long = "databricks-http-path", env = "DATABRICKS_HTTP_PATH")]
    pub http_path: String,
    #[arg(long = "pat-token", env = "PAT_TOKEN", hide_env_values = true)]
    pub token: String,
    #[arg(long, env = "RISK_SCHEMA", default_value = "cusp_audit.demo")]
    pub risk_schema: String,
    #[arg(long, env = "ADDRESS_SCHEMA", default_value = "cusp_audit.fake_data")]
    pub address_schema: String,
    /// Upper bound on a single warehouse statement and on each HTTP call it makes
    #[arg(long, env = "WAREHOUSE_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,
    /// Delay between status polls of a running statement
    #[arg(long, env = "WAREHOUSE_POLL_MS", default_value_t = 500)]
    pub poll_ms: u64,
    /// Yearly score at or above which a provider is high risk
    #[arg(long, env = "HIGH_RISK_THRESHOLD", default_value_t = DEFAULT_HIGH_RISK_THRESHOLD)]
    pub high_risk_threshold: i64,
}

impl WarehouseArgs {
    pub fn catalog(&self) -> anyhow::Result<Catalog> {
        Catalog::new(&self.risk_schema, &self.address_schema)
            .context("RISK_SCHEMA and ADDRESS_SCHEMA must be plain identifiers")
    }

    pub fn policy(&self) -> RiskPolicy {
        RiskPolicy {
            high_risk_threshold: self.high_risk_threshold,
        }
    }

    pub fn connect(&self) -> anyhow::Result<RiskService> {
        let timeout = Duration::from_secs(self.timeout_secs);
        let warehouse =
            DatabricksWarehouse::new(&self.host, &self.http_path, &self.token, timeout)?
                .with_poll_interval(Duration::from_millis(self.poll_ms));
        tracing::info!(warehouse_id = warehouse.warehouse_id(), "warehouse client ready");
        let executor = QueryExecutor::new(Arc::new(warehouse), timeout);
        Ok(RiskService::new(executor, self.catalog()?, self.policy()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,
    #[arg(long, env = "LOGIN_EMAIL", default_value = DEFAULT_LOGIN_EMAIL)]
    pub login_email: String,
    #[arg(
        long,
        env = "LOGIN_PASSWORD",
        default_value = DEFAULT_LOGIN_PASSWORD,
        hide_default_value = true
    )]
    pub login_password: String,
    #[arg(
        long = "node-env",
        env = "NODE_ENV",
        value_enum,
        default_value_t = Environment::Development
    )]
    pub environment: Environment,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        warehouse: WarehouseArgs,
        #[command(flatten)]
        serve: ServeArgs,
    }

    #[test]
    fn defaults_apply_when_only_required_args_given() {
        let cli = TestCli::try_parse_from([
            "provider-risk-api",
            "--databricks-host",
            "dbc-1.cloud.databricks.com",
            "--databricks-http-path",
            "/sql/1.0/warehouses/abc",
            "--pat-token",
            "dapi-1",
            "--jwt-secret",
            "secret",
        ])
        .unwrap();

        assert_eq!(cli.warehouse.timeout_secs, 60);
        assert_eq!(cli.warehouse.policy(), RiskPolicy::default());
        assert_eq!(cli.warehouse.catalog().unwrap(), Catalog::default());
        assert_eq!(cli.serve.port, 3000);
        assert_eq!(cli.serve.login_email, "team3si");
        assert!(!cli.serve.environment.is_production());
    }

    #[test]
    fn bad_schema_fails_at_startup() {
        let cli = TestCli::try_parse_from([
            "provider-risk-api",
            "--databricks-host",
            "h",
            "--databricks-http-path",
            "/sql/1.0/warehouses/abc",
            "--pat-token",
            "t",
            "--risk-schema",
            "demo; DROP",
            "--jwt-secret",
            "secret",
            "--node-env",
            "production",
        ])
        .unwrap();

        assert!(cli.warehouse.catalog().is_err());
        assert!(cli.serve.environment.is_production());
    }
}
