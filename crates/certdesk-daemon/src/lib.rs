//! certdesk Daemon Library
//!
//! Core functionality for the certdesk daemon:
//! - SQLite storage for certificates, authorities, and DNS providers
//! - Certificate CRUD, eligibility selection, and startup recovery
//! - Bounded action queue running certificate requests
//! - Issuer backends that produce certificate material

pub mod certificate;
pub mod issuer;
pub mod jobqueue;
pub mod storage;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod test_support;
