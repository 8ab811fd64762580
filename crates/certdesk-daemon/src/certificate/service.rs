//! Certificate CRUD and listing.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::storage::{
    Certificate, CertificateStore, DatabaseError, Filter, ListMode, PageInfo, Sort,
    build_list_query,
};
use crate::storage::{CERTIFICATE_FIELDS, CERTIFICATE_TABLE};

/// Related entities a list may attach to each certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expansion {
    CertificateAuthority,
    DnsProvider,
}

impl Expansion {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CertificateAuthority => "certificate_authority",
            Self::DnsProvider => "dns_provider",
        }
    }
}

impl fmt::Display for Expansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Expansion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "certificate_authority" => Ok(Self::CertificateAuthority),
            "dns_provider" => Ok(Self::DnsProvider),
            other => Err(format!("unknown expansion: {other}")),
        }
    }
}

/// One page of certificates plus the request that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub items: Vec<Certificate>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub sort: Vec<Sort>,
    pub filter: Vec<Filter>,
}

/// Create, update, delete, and list certificate records.
pub struct CertificateService {
    store: Arc<dyn CertificateStore>,
}

impl CertificateService {
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self { store }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Certificate, DatabaseError> {
        self.store.get_certificate(id).await
    }

    /// Persist a new record, writing the generated ID back into `cert`.
    ///
    /// Fails without touching the store if `cert` already has an ID.
    #[instrument(skip(self, cert), fields(name = %cert.name))]
    pub async fn create(&self, cert: &mut Certificate) -> Result<i64, DatabaseError> {
        if cert.is_persisted() {
            return Err(DatabaseError::Validation(
                "Cannot create certificate when model already has an ID".into(),
            ));
        }

        cert.touch(true);
        let id = self.store.insert_certificate(cert).await?;
        cert.id = id;
        debug!(certificate_id = id, "Certificate created");
        Ok(id)
    }

    /// Overwrite a persisted record.
    ///
    /// Fails without touching the store if `cert` has no ID.
    #[instrument(skip(self, cert), fields(certificate_id = cert.id))]
    pub async fn update(&self, cert: &mut Certificate) -> Result<(), DatabaseError> {
        if !cert.is_persisted() {
            return Err(DatabaseError::Validation(
                "Cannot update certificate when model doesn't have an ID".into(),
            ));
        }

        cert.touch(false);
        self.store.update_certificate(cert).await
    }

    /// Soft-delete a record. Returns `false` if it was already deleted.
    pub async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        if id == 0 {
            return Err(DatabaseError::Validation(
                "Cannot delete certificate without an ID".into(),
            ));
        }
        self.store.soft_delete_certificate(id).await
    }

    /// List live certificates, sorted by name unless `page` says otherwise.
    ///
    /// A failure to expand one row is logged and leaves that row's related
    /// entity empty; it never fails the list.
    pub async fn list(
        &self,
        page: PageInfo,
        filters: Vec<Filter>,
        expand: &[Expansion],
    ) -> Result<ListResponse, DatabaseError> {
        let default_sort = Sort::asc("name");

        let count_query = build_list_query(
            CERTIFICATE_TABLE,
            &page,
            &default_sort,
            &filters,
            CERTIFICATE_FIELDS,
            ListMode::Count,
        )?;
        let total = self
            .store
            .count_certificates(&count_query)
            .await
            .inspect_err(|_| {
                debug!(query = %count_query.sql, params = ?count_query.params, "Certificate count query failed");
            })?;

        let rows_query = build_list_query(
            CERTIFICATE_TABLE,
            &page,
            &default_sort,
            &filters,
            CERTIFICATE_FIELDS,
            ListMode::Rows,
        )?;
        let mut items = self
            .store
            .list_certificates(&rows_query)
            .await
            .inspect_err(|_| {
                debug!(query = %rows_query.sql, params = ?rows_query.params, "Certificate list query failed");
            })?;

        if !expand.is_empty() {
            for item in &mut items {
                if let Err(e) = self.expand(item, expand).await {
                    error!(certificate_id = item.id, error = %e, "Certificate expansion failed");
                }
            }
        }

        let sort = if page.sort.is_empty() {
            vec![default_sort]
        } else {
            page.sort
        };

        Ok(ListResponse {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
            sort,
            filter: filters,
        })
    }

    /// Attach the requested related entities to `cert`.
    ///
    /// A zero reference means "none" and is not an error.
    pub async fn expand(
        &self,
        cert: &mut Certificate,
        expand: &[Expansion],
    ) -> Result<(), DatabaseError> {
        for expansion in expand {
            match expansion {
                Expansion::CertificateAuthority => {
                    if cert.certificate_authority_id > 0 {
                        cert.certificate_authority = Some(
                            self.store
                                .get_certificate_authority(cert.certificate_authority_id)
                                .await?,
                        );
                    }
                }
                Expansion::DnsProvider => {
                    if cert.dns_provider_id > 0 {
                        cert.dns_provider =
                            Some(self.store.get_dns_provider(cert.dns_provider_id).await?);
                    }
                }
            }
        }
        Ok(())
    }
}
