//! `SQLite` storage for the certdesk daemon.
//!
//! Provides persistence for certificates, certificate authorities, and DNS
//! providers, the list query builder, and the [`CertificateStore`] adapter
//! trait the rest of the daemon is written against.

mod db;
pub mod list_query;
mod models;
mod queries;
mod queries_authorities;
mod store;


pub use db::{Database, DatabaseError};
pub use list_query::{
    FieldMap, Filter, FilterModifier, ListMode, ListQuery, PageInfo, QueryParam, Sort,
    SortDirection, build_list_query,
};
pub use models::*;
pub use queries::{CERTIFICATE_FIELDS, CERTIFICATE_TABLE};
pub use queries_authorities::{CertificateAuthorityParams, DnsProviderParams};
pub use store::CertificateStore;
