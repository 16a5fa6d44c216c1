use anyhow::{Context, Result};
use blob_rename_migration::config::AppConfig;
use blob_rename_migration::services::azure_blob::{AzureBlobClient, SharedKeyCredential};
use blob_rename_migration::services::migration::{MigrationService, PollSettings};
use blob_rename_migration::services::repository::PostgresRecords;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;
    tracing::info!(
        account = %cfg.storage_account,
        container = %cfg.storage_container,
        "starting blob rename migration"
    );

    // --- Construct the clients the pipeline stages depend on ---
    let credential = SharedKeyCredential::new(&cfg.storage_account, &cfg.storage_access_key)?;
    let endpoint = cfg
        .storage_endpoint
        .clone()
        .unwrap_or_else(|| AzureBlobClient::account_endpoint(&cfg.storage_account));
    let blobs = AzureBlobClient::new(&endpoint, &cfg.storage_container, credential)?;
    let records = PostgresRecords::connect(&cfg.database_url)
        .await
        .context("connecting to database")?;

    // --- Run the pipeline ---
    let service = MigrationService::new(
        Arc::new(blobs),
        Arc::new(records),
        PollSettings {
            interval: cfg.poll_interval,
            deadline: cfg.copy_deadline,
        },
    );
    let summary = service
        .run()
        .await
        .context("fetching migration records")?;

    tracing::info!(
        records = summary.records,
        renamed = summary.renamed,
        skipped = summary.skipped,
        failed = summary.failed,
        rows_updated = summary.rows_updated,
        "migration finished"
    );

    Ok(())
}
