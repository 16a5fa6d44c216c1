use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::time::Duration;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub storage_account: String,
    pub storage_access_key: String,
    pub storage_container: String,
    pub storage_endpoint: Option<String>,
    pub poll_interval: Duration,
    pub copy_deadline: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Renames ticket document blobs and rewrites their database references"
)]
pub struct Args {
    /// Postgres connection URL (overrides MIGRATION_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Storage account name (overrides MIGRATION_STORAGE_ACCOUNT)
    #[arg(long)]
    pub storage_account: Option<String>,

    /// Base64-encoded storage access key (overrides MIGRATION_STORAGE_ACCESS_KEY)
    #[arg(long)]
    pub storage_access_key: Option<String>,

    /// Container holding the ticket documents (overrides MIGRATION_STORAGE_CONTAINER)
    #[arg(long)]
    pub storage_container: Option<String>,

    /// Blob endpoint override, e.g. an Azurite address (overrides MIGRATION_STORAGE_ENDPOINT)
    #[arg(long)]
    pub storage_endpoint: Option<String>,

    /// Seconds between copy-status polls (overrides MIGRATION_POLL_INTERVAL_SECS)
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Seconds before an unfinished copy counts as failed (overrides MIGRATION_COPY_DEADLINE_SECS)
    #[arg(long)]
    pub copy_deadline_secs: Option<u64>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    fn from_args(args: Args) -> Result<Self> {
        Ok(Self {
            database_url: required(args.database_url, "--database-url", "MIGRATION_DATABASE_URL")?,
            storage_account: required(
                args.storage_account,
                "--storage-account",
                "MIGRATION_STORAGE_ACCOUNT",
            )?,
            storage_access_key: required(
                args.storage_access_key,
                "--storage-access-key",
                "MIGRATION_STORAGE_ACCESS_KEY",
            )?,
            storage_container: required(
                args.storage_container,
                "--storage-container",
                "MIGRATION_STORAGE_CONTAINER",
            )?,
            storage_endpoint: optional(args.storage_endpoint, "MIGRATION_STORAGE_ENDPOINT"),
            poll_interval: Duration::from_secs(secs_or(
                args.poll_interval_secs,
                "MIGRATION_POLL_INTERVAL_SECS",
                1,
            )?),
            copy_deadline: Duration::from_secs(secs_or(
                args.copy_deadline_secs,
                "MIGRATION_COPY_DEADLINE_SECS",
                300,
            )?),
        })
    }
}

/// A setting that must come from either the CLI or the environment.
fn required(arg: Option<String>, flag: &str, var: &str) -> Result<String> {
    if let Some(value) = arg {
        return Ok(value);
    }
    env::var(var).with_context(|| format!("missing required setting: pass {} or set {}", flag, var))
}

/// A setting that may be absent entirely.
fn optional(arg: Option<String>, var: &str) -> Option<String> {
    arg.or_else(|| env::var(var).ok())
}

/// A numeric setting with a default when neither source provides it.
fn secs_or(arg: Option<u64>, var: &str, default: u64) -> Result<u64> {
    if let Some(value) = arg {
        return Ok(value);
    }
    match env::var(var) {
        Ok(value) => value
            .parse::<u64>()
            .with_context(|| format!("parsing {} value `{}`", var, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", var)),
    }
}
