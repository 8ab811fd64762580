//! Persistence adapter seam.
//!
//! Everything outside `storage` talks to certificates through
//! [`CertificateStore`], so services can be exercised against in-memory
//! fakes and the `SQLite` [`Database`] is injected rather than global.

use async_trait::async_trait;

use super::db::{Database, DatabaseError};
use super::list_query::ListQuery;
use super::models::{Certificate, CertificateAuthority, CertificateStatus, CertificateType, DnsProvider};

#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Insert a row and return the generated ID.
    async fn insert_certificate(&self, cert: &Certificate) -> Result<i64, DatabaseError>;

    /// Full-column overwrite by ID.
    async fn update_certificate(&self, cert: &Certificate) -> Result<(), DatabaseError>;

    async fn get_certificate(&self, id: i64) -> Result<Certificate, DatabaseError>;

    async fn soft_delete_certificate(&self, id: i64) -> Result<bool, DatabaseError>;

    async fn count_certificates(&self, query: &ListQuery) -> Result<i64, DatabaseError>;

    async fn list_certificates(&self, query: &ListQuery) -> Result<Vec<Certificate>, DatabaseError>;

    /// Live records in `status` with one of `types` and a resolved
    /// certificate authority.
    async fn select_certificates_by_status(
        &self,
        status: CertificateStatus,
        types: &[CertificateType],
    ) -> Result<Vec<Certificate>, DatabaseError>;

    /// Conditional status transition; `true` only when exactly one row moved.
    async fn claim_certificate(
        &self,
        id: i64,
        from: CertificateStatus,
        to: CertificateStatus,
    ) -> Result<bool, DatabaseError>;

    /// `provisioning -> valid`; `false` if the record left `provisioning`.
    async fn mark_certificate_valid(&self, id: i64, expires_on: i64) -> Result<bool, DatabaseError>;

    /// `provisioning -> error`; `false` if the record left `provisioning`.
    async fn mark_certificate_error(&self, id: i64, message: &str) -> Result<bool, DatabaseError>;

    async fn get_certificate_authority(
        &self,
        id: i64,
    ) -> Result<CertificateAuthority, DatabaseError>;

    async fn get_dns_provider(&self, id: i64) -> Result<DnsProvider, DatabaseError>;
}

#[async_trait]
impl CertificateStore for Database {
    async fn insert_certificate(&self, cert: &Certificate) -> Result<i64, DatabaseError> {
        Self::insert_certificate(self, cert).await
    }

    async fn update_certificate(&self, cert: &Certificate) -> Result<(), DatabaseError> {
        Self::update_certificate(self, cert).await
    }

    async fn get_certificate(&self, id: i64) -> Result<Certificate, DatabaseError> {
        Self::get_certificate(self, id).await
    }

    async fn soft_delete_certificate(&self, id: i64) -> Result<bool, DatabaseError> {
        Self::soft_delete_certificate(self, id).await
    }

    async fn count_certificates(&self, query: &ListQuery) -> Result<i64, DatabaseError> {
        Self::count_certificates(self, query).await
    }

    async fn list_certificates(&self, query: &ListQuery) -> Result<Vec<Certificate>, DatabaseError> {
        Self::list_certificates(self, query).await
    }

    async fn select_certificates_by_status(
        &self,
        status: CertificateStatus,
        types: &[CertificateType],
    ) -> Result<Vec<Certificate>, DatabaseError> {
        Self::select_certificates_by_status(self, status, types).await
    }

    async fn claim_certificate(
        &self,
        id: i64,
        from: CertificateStatus,
        to: CertificateStatus,
    ) -> Result<bool, DatabaseError> {
        Self::claim_certificate(self, id, from, to).await
    }

    async fn mark_certificate_valid(&self, id: i64, expires_on: i64) -> Result<bool, DatabaseError> {
        Self::mark_certificate_valid(self, id, expires_on).await
    }

    async fn mark_certificate_error(&self, id: i64, message: &str) -> Result<bool, DatabaseError> {
        Self::mark_certificate_error(self, id, message).await
    }

    async fn get_certificate_authority(
        &self,
        id: i64,
    ) -> Result<CertificateAuthority, DatabaseError> {
        Self::get_certificate_authority(self, id).await
    }

    async fn get_dns_provider(&self, id: i64) -> Result<DnsProvider, DatabaseError> {
        Self::get_dns_provider(self, id).await
    }
}
