//! Database models for the certdesk daemon.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a certificate record.
///
/// Only `Ready` is acted on by the daemon. `Requested -> Ready` and
/// `Error -> Ready` are driven by operators or an external scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Requested,
    Ready,
    Provisioning,
    Valid,
    Error,
}

impl CertificateStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Ready => "ready",
            Self::Provisioning => "provisioning",
            Self::Valid => "valid",
            Self::Error => "error",
        }
    }

    /// Whether a record in this state may be handed to the action queue.
    pub const fn is_dispatchable(&self) -> bool {
        match self {
            Self::Ready => true,
            Self::Requested | Self::Provisioning | Self::Valid | Self::Error => false,
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CertificateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(Self::Requested),
            "ready" => Ok(Self::Ready),
            "provisioning" => Ok(Self::Provisioning),
            "valid" => Ok(Self::Valid),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown certificate status: {other}")),
        }
    }
}

/// How a certificate is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CertificateType {
    /// HTTP-01 challenge against a certificate authority.
    Http,
    /// DNS-01 challenge through a DNS provider.
    Dns,
    /// Uploaded by an operator; never requested automatically.
    Custom,
    /// Locally trusted development certificate.
    Mkcert,
}

impl CertificateType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Dns => "dns",
            Self::Custom => "custom",
            Self::Mkcert => "mkcert",
        }
    }

    /// Types requested automatically when no configuration says otherwise.
    pub const fn default_automatable() -> [Self; 2] {
        [Self::Http, Self::Dns]
    }
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CertificateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Self::Http),
            "dns" => Ok(Self::Dns),
            "custom" => Ok(Self::Custom),
            "mkcert" => Ok(Self::Mkcert),
            other => Err(format!("unknown certificate type: {other}")),
        }
    }
}

/// Certificate record from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Certificate {
    pub id: i64,
    pub created_on: i64,
    pub modified_on: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub cert_type: CertificateType,
    pub certificate_authority_id: i64,
    pub dns_provider_id: i64,
    pub name: String,
    #[sqlx(json)]
    pub domain_names: Vec<String>,
    pub expires_on: Option<i64>,
    pub status: CertificateStatus,
    pub error_message: String,
    #[sqlx(json)]
    pub meta: serde_json::Value,
    pub is_ecc: bool,
    pub is_deleted: bool,

    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<CertificateAuthority>,
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_provider: Option<DnsProvider>,
}

impl Certificate {
    /// A new, not yet persisted record in the `requested` state.
    pub fn new(cert_type: CertificateType, name: &str, domain_names: Vec<String>) -> Self {
        Self {
            id: 0,
            created_on: 0,
            modified_on: 0,
            user_id: 0,
            cert_type,
            certificate_authority_id: 0,
            dns_provider_id: 0,
            name: name.to_string(),
            domain_names,
            expires_on: None,
            status: CertificateStatus::Requested,
            error_message: String::new(),
            meta: serde_json::Value::Object(serde_json::Map::new()),
            is_ecc: false,
            is_deleted: false,
            certificate_authority: None,
            dns_provider: None,
        }
    }

    pub const fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Stamp modification time, and creation time when `created` is set.
    pub fn touch(&mut self, created: bool) {
        let now = certdesk_core::db::unix_timestamp();
        if created {
            self.created_on = now;
        }
        self.modified_on = now;
    }

    /// Whether this record may be dispatched for `status` given the set of
    /// automatically requested types.
    pub fn is_eligible(&self, status: CertificateStatus, automatable: &[CertificateType]) -> bool {
        !self.is_deleted
            && self.status == status
            && self.certificate_authority_id > 0
            && automatable.contains(&self.cert_type)
    }
}

/// Certificate authority record from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CertificateAuthority {
    pub id: i64,
    pub created_on: i64,
    pub modified_on: i64,
    pub name: String,
    pub acmesh_server: String,
    pub ca_bundle: String,
    pub max_domains: i64,
    pub is_wildcard_supported: bool,
    pub is_deleted: bool,
}

/// DNS provider record from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DnsProvider {
    pub id: i64,
    pub created_on: i64,
    pub modified_on: i64,
    pub user_id: i64,
    pub name: String,
    pub acmesh_name: String,
    pub dns_sleep: i64,
    #[sqlx(json)]
    pub meta: serde_json::Value,
    pub is_deleted: bool,
}
