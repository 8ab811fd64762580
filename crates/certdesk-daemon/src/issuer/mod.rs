//! Certificate issuance backends.
//!
//! [`CertificateIssuer`] is the boundary to whatever actually obtains a
//! certificate (an ACME client, a DNS-challenge runner, a local CA). The
//! daemon ships [`SelfSignedIssuer`] for development setups.

mod self_signed;

use async_trait::async_trait;

use crate::storage::{Certificate, CertificateType};

pub use self_signed::SelfSignedIssuer;

/// Result of a successful issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuedCertificate {
    /// Unix timestamp after which the certificate is no longer valid.
    pub expires_on: i64,
}

#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn issue(&self, cert: &Certificate) -> Result<IssuedCertificate, IssueError>;
}

/// Issuance errors.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    /// This backend cannot obtain certificates of the given type.
    #[error("Certificate type '{0}' cannot be requested")]
    Unsupported(CertificateType),

    /// The record lists no domain names.
    #[error("Certificate {0} has no domain names")]
    NoDomains(i64),

    /// Key or certificate generation failed.
    #[error("Certificate generation error: {0}")]
    Generation(String),

    /// Writing certificate material failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
