//! Startup recovery of certificates left in the `ready` state.
//!
//! Records that were marked ready but never picked up (daemon stopped,
//! worker crashed) are selected once at startup and handed to the action
//! queue, one job per record.

use std::sync::Arc;

use tracing::{error, info};

use super::eligibility::EligibilitySelector;
use super::request::CertificateRequester;
use crate::jobqueue::{ActionQueue, Job};
use crate::storage::CertificateStatus;

/// Job name used for certificate requests.
pub const REQUEST_CERTIFICATE_JOB: &str = "RequestCertificate";

/// What a recovery pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Number of eligible records found.
    pub selected: usize,
    /// Records whose job was accepted by the queue.
    pub enqueued: Vec<i64>,
    /// Records whose job was rejected, with the reason.
    pub failed: Vec<(i64, String)>,
    /// Set when selection itself failed and nothing was enqueued.
    pub aborted: Option<String>,
}

pub struct RecoveryDispatcher {
    selector: EligibilitySelector,
    queue: Arc<dyn ActionQueue>,
    requester: Arc<CertificateRequester>,
}

impl RecoveryDispatcher {
    pub fn new(
        selector: EligibilitySelector,
        queue: Arc<dyn ActionQueue>,
        requester: Arc<CertificateRequester>,
    ) -> Self {
        Self {
            selector,
            queue,
            requester,
        }
    }

    /// Enqueue one request job per eligible `ready` record.
    ///
    /// Never fails: a selection error aborts the pass and a rejected job is
    /// recorded without affecting the remaining records.
    pub async fn run(&self) -> RecoveryReport {
        let mut report = RecoveryReport::default();

        let records = match self.selector.select(CertificateStatus::Ready).await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to select ready certificates");
                report.aborted = Some(e.to_string());
                return report;
            }
        };
        report.selected = records.len();

        for record in records {
            let id = record.id;
            let requester = Arc::clone(&self.requester);
            let job = Job::new(REQUEST_CERTIFICATE_JOB, move || async move {
                requester.request(id).await?;
                Ok(())
            });

            match self.queue.enqueue(job) {
                Ok(()) => report.enqueued.push(id),
                Err(e) => {
                    error!(certificate_id = id, error = %e, "Failed to enqueue certificate request");
                    report.failed.push((id, e.to_string()));
                }
            }
        }

        info!(
            selected = report.selected,
            enqueued = report.enqueued.len(),
            failed = report.failed.len(),
            "Certificate recovery complete"
        );
        report
    }
}
