//! Selection of records the daemon may act on.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::storage::{Certificate, CertificateStatus, CertificateStore, CertificateType, DatabaseError};

/// Finds live, automatable records in a given status.
///
/// A record is eligible when it is not deleted, its type is in the
/// automatable set, and it references an existing certificate authority.
pub struct EligibilitySelector {
    store: Arc<dyn CertificateStore>,
    automatable: Vec<CertificateType>,
}

impl EligibilitySelector {
    pub fn new(store: Arc<dyn CertificateStore>, automatable: &[CertificateType]) -> Self {
        let mut types = Vec::with_capacity(automatable.len());
        for cert_type in automatable {
            if !types.contains(cert_type) {
                types.push(*cert_type);
            }
        }
        Self {
            store,
            automatable: types,
        }
    }

    pub fn automatable_types(&self) -> &[CertificateType] {
        &self.automatable
    }

    /// Eligible records in `status`. An empty automatable set selects
    /// nothing and skips the store.
    pub async fn select(&self, status: CertificateStatus) -> Result<Vec<Certificate>, DatabaseError> {
        if self.automatable.is_empty() {
            warn!("No automatable certificate types configured, nothing to select");
            return Ok(Vec::new());
        }

        let rows = self
            .store
            .select_certificates_by_status(status, &self.automatable)
            .await?;
        let fetched = rows.len();

        let selected: Vec<_> = rows
            .into_iter()
            .filter(|c| c.is_eligible(status, &self.automatable))
            .collect();

        if selected.len() != fetched {
            warn!(
                fetched,
                selected = selected.len(),
                "Store returned ineligible certificates, dropped them"
            );
        }
        debug!(status = %status, count = selected.len(), "Selected eligible certificates");
        Ok(selected)
    }
}
