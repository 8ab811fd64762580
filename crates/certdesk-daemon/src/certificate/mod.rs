//! Certificate services.
//!
//! - [`CertificateService`]: create, update, delete, and list records.
//! - [`EligibilitySelector`]: finds records the daemon may act on.
//! - [`CertificateRequester`]: the job that claims a record and issues it.
//! - [`RecoveryDispatcher`]: startup pass that enqueues stalled `ready` records.

mod eligibility;
mod recovery;
mod request;
mod service;

pub use eligibility::EligibilitySelector;
pub use recovery::{REQUEST_CERTIFICATE_JOB, RecoveryDispatcher, RecoveryReport};
pub use request::{CertificateRequester, RequestError, RequestOutcome};
pub use service::{CertificateService, Expansion, ListResponse};

use crate::storage::CertificateType;

/// Parse the configured automatable type names.
pub fn automatable_types_from_config(
    names: &[String],
) -> certdesk_core::Result<Vec<CertificateType>> {
    names
        .iter()
        .map(|name| {
            name.trim()
                .parse::<CertificateType>()
                .map_err(certdesk_core::Error::Config)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_configured_types() {
        let names = vec!["http".to_string(), " mkcert ".to_string()];
        assert_eq!(
            automatable_types_from_config(&names).unwrap(),
            vec![CertificateType::Http, CertificateType::Mkcert]
        );
    }

    #[test]
    fn rejects_unknown_type() {
        let names = vec!["ftp".to_string()];
        assert!(matches!(
            automatable_types_from_config(&names),
            Err(certdesk_core::Error::Config(_))
        ));
    }
}
