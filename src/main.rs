use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod api;
mod auth;
mod config;
mod databricks;
mod db;
mod error;
mod filter;
mod models;
mod query;
mod report;
mod risk;
mod scenario;
mod service;

use crate::config::{ServeArgs, WarehouseArgs};
use crate::filter::{FlagStatus, ReportFilter};

#[derive(Parser)]
#[command(name = "provider-risk-api")]
#[command(about = "Provider risk reporting API over a Databricks SQL warehouse", long_about = None)]
struct Cli {
    #[command(flatten)]
    warehouse: WarehouseArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Write a yearly or monthly risk report as CSV
    #[command(group(
        ArgGroup::new("period")
            .args(["year", "month"])
            .required(true)
            .multiple(false)
    ))]
    Export {
        #[arg(long)]
        year: Option<String>,
        /// Month as YYYY-MM
        #[arg(long)]
        month: Option<String>,
        #[arg(long, value_enum, default_value_t = FlagStatus::Either)]
        flag_status: FlagStatus,
        /// Restrict to a city; repeat for several
        #[arg(long = "city")]
        cities: Vec<String>,
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,provider_risk_api=debug,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let service = Arc::new(cli.warehouse.connect()?);

    match cli.command {
        Commands::Serve(args) => {
            let state = api::AppState {
                service,
                auth: Arc::new(auth::Authenticator::new(
                    &args.jwt_secret,
                    &args.login_email,
                    &args.login_password,
                )),
                environment: args.environment,
            };

            let addr = format!("0.0.0.0:{}", args.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            tracing::info!(%addr, environment = ?args.environment, "listening");

            axum::serve(listener, api::router(state))
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server error")?;
            tracing::info!("server stopped");
        }
        Commands::Export {
            year,
            month,
            flag_status,
            cities,
            out,
        } => {
            let filter = ReportFilter {
                offset: 0,
                flag_status,
                cities,
            };
            let csv = match (year, month) {
                (Some(year), _) => {
                    let year = filter::parse_year(&year)?;
                    service.yearly_export(year, &filter).await?
                }
                (None, Some(month)) => {
                    let month = filter::parse_month(&month)?;
                    service.monthly_export(month, &filter).await?
                }
                (None, None) => anyhow::bail!("either --year or --month is required"),
            };
            std::fs::write(&out, csv)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown requested");
}
