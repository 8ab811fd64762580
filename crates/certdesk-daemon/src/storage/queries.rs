//! Certificate queries for the certdesk daemon.

use certdesk_core::db::unix_timestamp;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, error};

use super::db::{Database, DatabaseError};
use super::list_query::{FieldMap, ListQuery, QueryParam};
use super::models::{Certificate, CertificateStatus, CertificateType};

/// Table holding certificate records.
pub const CERTIFICATE_TABLE: &str = "certificate";

/// Fields a certificate list may filter or sort on.
pub const CERTIFICATE_FIELDS: FieldMap = &[
    ("id", "id"),
    ("created_on", "created_on"),
    ("modified_on", "modified_on"),
    ("user_id", "user_id"),
    ("type", "type"),
    ("certificate_authority_id", "certificate_authority_id"),
    ("dns_provider_id", "dns_provider_id"),
    ("name", "name"),
    ("domain_names", "domain_names"),
    ("expires_on", "expires_on"),
    ("status", "status"),
    ("is_ecc", "is_ecc"),
];

impl Database {
    /// Insert a certificate row and return the generated ID.
    ///
    /// The record's own `id` is ignored; validation happens in the service.
    pub async fn insert_certificate(&self, cert: &Certificate) -> Result<i64, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO certificate (
                created_on, modified_on, user_id, "type", certificate_authority_id,
                dns_provider_id, name, domain_names, expires_on, status,
                error_message, meta, is_ecc, is_deleted
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(cert.created_on)
        .bind(cert.modified_on)
        .bind(cert.user_id)
        .bind(cert.cert_type)
        .bind(cert.certificate_authority_id)
        .bind(cert.dns_provider_id)
        .bind(&cert.name)
        .bind(Json(&cert.domain_names))
        .bind(cert.expires_on)
        .bind(cert.status)
        .bind(&cert.error_message)
        .bind(Json(&cert.meta))
        .bind(cert.is_ecc)
        .bind(cert.is_deleted)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Overwrite every column of the certificate with the record's ID.
    pub async fn update_certificate(&self, cert: &Certificate) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE certificate SET
                created_on = ?,
                modified_on = ?,
                "type" = ?,
                user_id = ?,
                certificate_authority_id = ?,
                dns_provider_id = ?,
                name = ?,
                domain_names = ?,
                expires_on = ?,
                status = ?,
                error_message = ?,
                meta = ?,
                is_ecc = ?,
                is_deleted = ?
            WHERE id = ?
            "#,
        )
        .bind(cert.created_on)
        .bind(cert.modified_on)
        .bind(cert.cert_type)
        .bind(cert.user_id)
        .bind(cert.certificate_authority_id)
        .bind(cert.dns_provider_id)
        .bind(&cert.name)
        .bind(Json(&cert.domain_names))
        .bind(cert.expires_on)
        .bind(cert.status)
        .bind(&cert.error_message)
        .bind(Json(&cert.meta))
        .bind(cert.is_ecc)
        .bind(cert.is_deleted)
        .bind(cert.id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Certificate {}", cert.id)));
        }
        Ok(())
    }

    /// Get a certificate by ID, including soft-deleted rows.
    pub async fn get_certificate(&self, id: i64) -> Result<Certificate, DatabaseError> {
        sqlx::query_as::<_, Certificate>("SELECT * FROM certificate WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Certificate {id}")))
    }

    /// Flag a certificate as deleted. Returns `false` if no live row matched.
    pub async fn soft_delete_certificate(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE certificate SET is_deleted = 1, modified_on = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Run a count query produced by the list query builder.
    pub async fn count_certificates(&self, query: &ListQuery) -> Result<i64, DatabaseError> {
        let mut q = sqlx::query_scalar::<_, i64>(&query.sql);
        for param in &query.params {
            q = match param {
                QueryParam::Text(s) => q.bind(s.as_str()),
                QueryParam::Int(n) => q.bind(*n),
            };
        }
        Ok(q.fetch_optional(self.pool()).await?.unwrap_or(0))
    }

    /// Run a row query produced by the list query builder.
    pub async fn list_certificates(
        &self,
        query: &ListQuery,
    ) -> Result<Vec<Certificate>, DatabaseError> {
        let mut q = sqlx::query_as::<_, Certificate>(&query.sql);
        for param in &query.params {
            q = match param {
                QueryParam::Text(s) => q.bind(s.as_str()),
                QueryParam::Int(n) => q.bind(*n),
            };
        }
        Ok(q.fetch_all(self.pool()).await?)
    }

    /// Select live certificates in `status` whose type is one of `types` and
    /// whose certificate authority exists.
    ///
    /// No matching rows is an empty vector, not an error.
    pub async fn select_certificates_by_status(
        &self,
        status: CertificateStatus,
        types: &[CertificateType],
    ) -> Result<Vec<Certificate>, DatabaseError> {
        if types.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            r#"SELECT t.* FROM "certificate" t
            INNER JOIN "certificate_authority" c ON c."id" = t."certificate_authority_id"
            WHERE t."status" = "#,
        );
        qb.push_bind(status);
        qb.push(r#" AND t."certificate_authority_id" > 0 AND t."is_deleted" = 0 AND t."type" IN ("#);
        let mut separated = qb.separated(", ");
        for cert_type in types {
            separated.push_bind(*cert_type);
        }
        separated.push_unseparated(")");

        let sql = qb.sql().to_string();
        qb.build_query_as::<Certificate>()
            .fetch_all(self.pool())
            .await
            .map_err(|e| {
                error!(error = %e, %status, "Selecting certificates by status failed");
                debug!(query = %sql, %status, ?types, "Failed certificate status query");
                DatabaseError::from(e)
            })
    }

    /// Atomically move a certificate from `from` to `to`.
    ///
    /// Returns `true` only if this call changed the row. A concurrent or
    /// repeated claim on the same record returns `false`.
    pub async fn claim_certificate(
        &self,
        id: i64,
        from: CertificateStatus,
        to: CertificateStatus,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE certificate SET status = ?, modified_on = ? WHERE id = ? AND status = ? AND is_deleted = 0",
        )
        .bind(to)
        .bind(unix_timestamp())
        .bind(id)
        .bind(from)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Record a successful issuance.
    ///
    /// Only a live record still in `provisioning` is written. Returns
    /// `false` when the record was reset or deleted while the job ran.
    pub async fn mark_certificate_valid(
        &self,
        id: i64,
        expires_on: i64,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE certificate SET status = ?, expires_on = ?, error_message = '', modified_on = ? WHERE id = ? AND status = ? AND is_deleted = 0",
        )
        .bind(CertificateStatus::Valid)
        .bind(expires_on)
        .bind(unix_timestamp())
        .bind(id)
        .bind(CertificateStatus::Provisioning)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Record a failed issuance, keeping the message for operators.
    ///
    /// Guarded like [`Self::mark_certificate_valid`].
    pub async fn mark_certificate_error(
        &self,
        id: i64,
        message: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE certificate SET status = ?, error_message = ?, modified_on = ? WHERE id = ? AND status = ? AND is_deleted = 0",
        )
        .bind(CertificateStatus::Error)
        .bind(message)
        .bind(unix_timestamp())
        .bind(id)
        .bind(CertificateStatus::Provisioning)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
