//! certdesk Daemon
//!
//! Opens the certificate store, starts the job workers, and re-dispatches
//! certificates that were left `ready` when the daemon last stopped.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use certdesk_core::config::{self, Config};
use certdesk_core::tracing_init::{default_filter, init_tracing};
use certdesk_daemon::certificate::{
    CertificateRequester, EligibilitySelector, RecoveryDispatcher, automatable_types_from_config,
};
use certdesk_daemon::issuer::SelfSignedIssuer;
use certdesk_daemon::jobqueue::{JobQueue, JobQueueConfig};
use certdesk_daemon::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "certdesk-daemon")]
#[command(version, about = "certdesk daemon - certificate issuance dispatcher")]
struct Args {
    /// Database file path
    #[arg(long, env = "CERTDESK_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Extra JSON config file, layered over the global settings
    #[arg(long, env = "CERTDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for issued certificate material
    #[arg(long, env = "CERTDESK_CERTIFICATES_DIR")]
    certificates_dir: Option<PathBuf>,

    /// Number of job worker tasks
    #[arg(long)]
    workers: Option<usize>,

    /// Maximum number of queued jobs
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    /// CLI values take precedence over every config layer.
    fn apply_to(&self, config: &mut Config) {
        if let Some(path) = &self.db_path {
            config.daemon.database_path = Some(path.clone());
        }
        if let Some(dir) = &self.certificates_dir {
            config.daemon.certificates_dir = Some(dir.clone());
        }
        if let Some(workers) = self.workers {
            config.jobs.workers = workers;
        }
        if let Some(capacity) = self.queue_capacity {
            config.jobs.queue_capacity = capacity;
        }
        if self.log_json {
            config.daemon.log_json = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = config::load_config(args.config.as_deref())?;
    args.apply_to(&mut config);

    init_tracing(
        &default_filter("certdesk-daemon", &config.daemon.log_level),
        config.daemon.log_json,
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        workers = config.jobs.workers,
        queue_capacity = config.jobs.queue_capacity,
        "Starting certdesk-daemon"
    );

    let db_path = match config.daemon.database_path.clone() {
        Some(path) => path,
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).await?;

    let automatable = automatable_types_from_config(&config.certificates.automatable_types)?;

    let certificates_dir = match config.daemon.certificates_dir.clone() {
        Some(dir) => dir,
        None => default_certificates_dir()?,
    };
    info!(path = %certificates_dir.display(), "Writing issued certificates");

    let queue = Arc::new(JobQueue::start(JobQueueConfig {
        workers: config.jobs.workers,
        capacity: config.jobs.queue_capacity,
    }));

    let store = Arc::new(db.clone());
    let issuer = Arc::new(SelfSignedIssuer::new(certificates_dir));
    let requester = Arc::new(CertificateRequester::new(store.clone(), issuer));
    let selector = EligibilitySelector::new(store, &automatable);
    let dispatcher = RecoveryDispatcher::new(selector, queue.clone(), requester);

    let report = dispatcher.run().await;
    if let Some(reason) = &report.aborted {
        warn!(reason = %reason, "Startup recovery aborted");
    }

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C shutdown signal");

    queue.shutdown().await;
    db.close().await;

    info!("Daemon stopped");
    Ok(())
}

/// Default database path: `~/.config/certdesk/certdesk.db`
fn default_db_path() -> anyhow::Result<PathBuf> {
    if let Some(path) = config::database_path() {
        return Ok(path);
    }
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".config").join("certdesk").join("certdesk.db"))
}

/// Default certificate directory: `~/.config/certdesk/certificates/`
fn default_certificates_dir() -> anyhow::Result<PathBuf> {
    if let Some(dir) = config::certificates_dir() {
        return Ok(dir);
    }
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".config").join("certdesk").join("certificates"))
}
