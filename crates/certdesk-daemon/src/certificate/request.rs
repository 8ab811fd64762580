//! The "request certificate" action run by job workers.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::issuer::{CertificateIssuer, IssueError};
use crate::storage::{CertificateStatus, CertificateStore, DatabaseError};

/// What a request did with its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The record was claimed and a certificate issued.
    Issued { expires_on: i64 },
    /// The record was no longer `ready`; another request owns it.
    Skipped,
    /// The record was reset or deleted while provisioning; the result was
    /// not written.
    Discarded,
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Issue(#[from] IssueError),
}

/// Claims a ready record and drives it to `valid` or `error`.
pub struct CertificateRequester {
    store: Arc<dyn CertificateStore>,
    issuer: Arc<dyn CertificateIssuer>,
}

impl CertificateRequester {
    pub fn new(store: Arc<dyn CertificateStore>, issuer: Arc<dyn CertificateIssuer>) -> Self {
        Self { store, issuer }
    }

    /// Request a certificate for record `id`.
    ///
    /// The `ready -> provisioning` claim is a conditional update, so two
    /// requests for the same record never both reach the issuer.
    #[instrument(skip(self), fields(certificate_id = id))]
    pub async fn request(&self, id: i64) -> Result<RequestOutcome, RequestError> {
        let claimed = self
            .store
            .claim_certificate(id, CertificateStatus::Ready, CertificateStatus::Provisioning)
            .await?;
        if !claimed {
            info!("Certificate is no longer ready, skipping request");
            return Ok(RequestOutcome::Skipped);
        }

        let cert = match self.store.get_certificate(id).await {
            Ok(cert) => cert,
            Err(e) => {
                self.record_failure(id, &e.to_string()).await;
                return Err(e.into());
            }
        };

        match self.issuer.issue(&cert).await {
            Ok(issued) => match self.store.mark_certificate_valid(id, issued.expires_on).await {
                Ok(true) => {
                    info!(expires_on = issued.expires_on, "Certificate issued");
                    Ok(RequestOutcome::Issued {
                        expires_on: issued.expires_on,
                    })
                }
                Ok(false) => {
                    info!("Certificate left provisioning during the request, discarding result");
                    Ok(RequestOutcome::Discarded)
                }
                Err(e) => {
                    error!(certificate_id = id, error = %e, "Failed to record issued certificate");
                    let message = format!("Failed to record issued certificate: {e}");
                    self.record_failure(id, &message).await;
                    Err(e.into())
                }
            },
            Err(e) => {
                error!(error = %e, "Certificate request failed");
                self.record_failure(id, &e.to_string()).await;
                Err(e.into())
            }
        }
    }

    /// Best effort: the caller is already returning an error.
    async fn record_failure(&self, id: i64, message: &str) {
        match self.store.mark_certificate_error(id, message).await {
            Ok(true) => {}
            Ok(false) => {
                info!(certificate_id = id, "Certificate left provisioning, error not recorded");
            }
            Err(e) => {
                warn!(certificate_id = id, error = %e, "Failed to record certificate error");
            }
        }
    }
}
