//! Self-signed issuer for development and air-gapped setups.
//!
//! Writes `fullchain.pem` and `privkey.pem` under
//! `<output_dir>/npm-<certificate id>/`, the same layout the proxy reads for
//! certificates obtained from a real authority.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rcgen::{CertificateParams, DnType, KeyPair};
use time::{Duration, OffsetDateTime};
use tracing::info;

use super::{CertificateIssuer, IssueError, IssuedCertificate};
use crate::storage::{Certificate, CertificateType};

/// Default lifetime of a generated certificate.
const DEFAULT_VALIDITY_DAYS: i64 = 90;

pub struct SelfSignedIssuer {
    output_dir: PathBuf,
    validity: Duration,
}

impl SelfSignedIssuer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            validity: Duration::days(DEFAULT_VALIDITY_DAYS),
        }
    }

    #[must_use]
    pub const fn with_validity_days(mut self, days: i64) -> Self {
        self.validity = Duration::days(days);
        self
    }

    /// Directory holding the material for one certificate.
    pub fn certificate_dir(&self, id: i64) -> PathBuf {
        self.output_dir.join(format!("npm-{id}"))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl CertificateIssuer for SelfSignedIssuer {
    async fn issue(&self, cert: &Certificate) -> Result<IssuedCertificate, IssueError> {
        match cert.cert_type {
            CertificateType::Http | CertificateType::Dns | CertificateType::Mkcert => {}
            CertificateType::Custom => return Err(IssueError::Unsupported(cert.cert_type)),
        }
        let Some(common_name) = cert.domain_names.first() else {
            return Err(IssueError::NoDomains(cert.id));
        };

        let mut params = CertificateParams::new(cert.domain_names.clone())
            .map_err(|e| IssueError::Generation(e.to_string()))?;
        params
            .distinguished_name
            .push(DnType::CommonName, common_name.as_str());
        let now = OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + self.validity;

        let key_pair = KeyPair::generate().map_err(|e| IssueError::Generation(e.to_string()))?;
        let generated = params
            .self_signed(&key_pair)
            .map_err(|e| IssueError::Generation(e.to_string()))?;

        let dir = self.certificate_dir(cert.id);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join("fullchain.pem"), generated.pem()).await?;
        tokio::fs::write(dir.join("privkey.pem"), key_pair.serialize_pem()).await?;

        let expires_on = params.not_after.unix_timestamp();
        info!(
            certificate_id = cert.id,
            domains = ?cert.domain_names,
            expires_on,
            path = %dir.display(),
            "Self-signed certificate written"
        );

        Ok(IssuedCertificate { expires_on })
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use certdesk_core::db::unix_timestamp;

    fn record(id: i64, cert_type: CertificateType, domains: &[&str]) -> Certificate {
        let mut cert = Certificate::new(
            cert_type,
            "test",
            domains.iter().map(|d| (*d).to_string()).collect(),
        );
        cert.id = id;
        cert
    }

    #[tokio::test]
    async fn writes_pem_files_and_reports_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = SelfSignedIssuer::new(dir.path()).with_validity_days(30);

        let issued = issuer
            .issue(&record(7, CertificateType::Http, &["example.com", "www.example.com"]))
            .await
            .unwrap();

        let cert_dir = issuer.certificate_dir(7);
        let chain = std::fs::read_to_string(cert_dir.join("fullchain.pem")).unwrap();
        let key = std::fs::read_to_string(cert_dir.join("privkey.pem")).unwrap();
        assert!(chain.contains("BEGIN CERTIFICATE"));
        assert!(key.contains("BEGIN PRIVATE KEY"));

        let expected = unix_timestamp() + 30 * 24 * 60 * 60;
        assert!((issued.expires_on - expected).abs() < 60);
    }

    #[tokio::test]
    async fn custom_certificates_are_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = SelfSignedIssuer::new(dir.path());

        let err = issuer
            .issue(&record(1, CertificateType::Custom, &["example.com"]))
            .await
            .unwrap_err();
        assert!(matches!(err, IssueError::Unsupported(CertificateType::Custom)));
        assert!(!issuer.certificate_dir(1).exists());
    }

    #[tokio::test]
    async fn empty_domain_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = SelfSignedIssuer::new(dir.path());

        let err = issuer
            .issue(&record(2, CertificateType::Dns, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, IssueError::NoDomains(2)));
    }
}
