//! `certdesk` Core Library
//!
//! Shared functionality for `certdesk` components:
//! - `SQLite` pool setup, migrations macro, and the shared `DatabaseError`
//! - Configuration resolution and hierarchy
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
