//! Dirauth Core Library
//!
//! Core types, configuration, and errors shared by the dirauth crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::DirauthConfig;
pub use error::{Error, Result};

/// Dirauth version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Port used when the LDAP configuration leaves it unset
pub const DEFAULT_LDAP_PORT: u16 = 389;

/// Protocol version used when the LDAP configuration leaves it unset
pub const DEFAULT_PROTOCOL_VERSION: u8 = 2;
