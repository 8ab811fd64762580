//! Certificate authority and DNS provider queries.
//!
//! The daemon only reads these to resolve certificate associations; the
//! create queries exist so operators and tests can seed them.

use certdesk_core::db::unix_timestamp;
use sqlx::types::Json;

use super::db::{Database, DatabaseError};
use super::models::{CertificateAuthority, DnsProvider};

/// Parameters for creating a certificate authority.
pub struct CertificateAuthorityParams<'a> {
    pub name: &'a str,
    pub acmesh_server: &'a str,
    pub ca_bundle: &'a str,
    pub max_domains: i64,
    pub is_wildcard_supported: bool,
}

/// Parameters for creating a DNS provider.
pub struct DnsProviderParams<'a> {
    pub user_id: i64,
    pub name: &'a str,
    pub acmesh_name: &'a str,
    pub dns_sleep: i64,
    pub meta: &'a serde_json::Value,
}

impl Database {
    // =========================================================================
    // Certificate authority queries
    // =========================================================================

    /// Store a certificate authority.
    pub async fn create_certificate_authority(
        &self,
        params: &CertificateAuthorityParams<'_>,
    ) -> Result<CertificateAuthority, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "INSERT INTO certificate_authority (created_on, modified_on, name, acmesh_server, ca_bundle, max_domains, is_wildcard_supported) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(now)
        .bind(now)
        .bind(params.name)
        .bind(params.acmesh_server)
        .bind(params.ca_bundle)
        .bind(params.max_domains)
        .bind(params.is_wildcard_supported)
        .execute(self.pool())
        .await?;

        self.get_certificate_authority(result.last_insert_rowid())
            .await
    }

    /// Get a certificate authority by ID.
    pub async fn get_certificate_authority(
        &self,
        id: i64,
    ) -> Result<CertificateAuthority, DatabaseError> {
        sqlx::query_as::<_, CertificateAuthority>(
            "SELECT * FROM certificate_authority WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Certificate authority {id}")))
    }

    // =========================================================================
    // DNS provider queries
    // =========================================================================

    /// Store a DNS provider.
    pub async fn create_dns_provider(
        &self,
        params: &DnsProviderParams<'_>,
    ) -> Result<DnsProvider, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "INSERT INTO dns_provider (created_on, modified_on, user_id, name, acmesh_name, dns_sleep, meta) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(now)
        .bind(now)
        .bind(params.user_id)
        .bind(params.name)
        .bind(params.acmesh_name)
        .bind(params.dns_sleep)
        .bind(Json(params.meta))
        .execute(self.pool())
        .await?;

        self.get_dns_provider(result.last_insert_rowid()).await
    }

    /// Get a DNS provider by ID.
    pub async fn get_dns_provider(&self, id: i64) -> Result<DnsProvider, DatabaseError> {
        sqlx::query_as::<_, DnsProvider>("SELECT * FROM dns_provider WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("DNS provider {id}")))
    }
}
