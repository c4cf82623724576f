use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use civicpulse_backend::config::{DEFAULT_CLASSIFICATION_BATCH_SIZE, DEFAULT_MERGE_RADIUS_METERS};
use civicpulse_backend::db::postgres_issue_repository::PostgresIssueRepository;
use civicpulse_backend::db::postgres_report_repository::PostgresReportRepository;
use civicpulse_backend::services::classification::{ClassificationEngine, KeywordClassifier};

/// One classification sweep over the unclassified backlog. Scheduled
/// externally (cron or a job runner); safe to re-run at any time.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let database_url =
        env::var("DATABASE_URL").context("DATABASE_URL is required to classify reports")?;
    let merge_radius_meters = env::var("MERGE_RADIUS_METERS")
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(DEFAULT_MERGE_RADIUS_METERS);
    let batch_size = env::var("CLASSIFICATION_BATCH_SIZE")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(DEFAULT_CLASSIFICATION_BATCH_SIZE);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to DATABASE_URL")?;

    let engine = ClassificationEngine::new(
        Arc::new(PostgresReportRepository { pool: pool.clone() }),
        Arc::new(PostgresIssueRepository { pool }),
        Arc::new(KeywordClassifier),
        merge_radius_meters,
        batch_size,
    );

    let summary = engine.run_batch().await?;

    println!(
        "examined {} report(s): {} linked, {} new issue(s), {} skipped",
        summary.examined, summary.linked, summary.created, summary.skipped
    );

    Ok(())
}
