//! Directory protocol seam
//!
//! The authenticator only talks to the directory through these traits, so a
//! connection can be swapped for a scripted one in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a directory connection
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Failed to connect to LDAP server: {0}")]
    Connect(String),

    /// Server answered with a non-zero result code
    #[error("LDAP operation failed with code {rc}: {diagnostic}")]
    Rejected { rc: u32, diagnostic: String },

    #[error("LDAP operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("LDAP protocol error: {0}")]
    Protocol(String),

    #[error("Unsupported LDAP protocol version: {0}")]
    UnsupportedVersion(u8),
}

impl DirectoryError {
    /// Message suitable for logs and failure results
    pub fn diagnostic(&self) -> String {
        match self {
            DirectoryError::Rejected { rc, diagnostic } if diagnostic.is_empty() => {
                format!("LDAP result code {}", rc)
            }
            DirectoryError::Rejected { diagnostic, .. } => diagnostic.clone(),
            other => other.to_string(),
        }
    }
}

/// Where and how to connect
#[derive(Debug, Clone)]
pub struct ConnectSpec {
    /// Fully resolved `ldap://host:port` or `ldaps://host:port`
    pub url: String,
    pub start_tls: bool,
    pub skip_tls_verify: bool,
    pub timeout: Duration,
}

/// One entry returned by a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    /// First value of `name`, if the server returned it
    pub fn first_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Opens fresh directory connections
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn connect(
        &self,
        spec: &ConnectSpec,
    ) -> Result<Box<dyn DirectoryConnection>, DirectoryError>;
}

/// An open directory connection
///
/// Callers must call `close` exactly once when done.
#[async_trait]
pub trait DirectoryConnection: Send {
    async fn set_protocol_version(&mut self, version: u8) -> Result<(), DirectoryError>;

    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    async fn anonymous_bind(&mut self) -> Result<(), DirectoryError>;

    /// Subtree search under `base` returning only `attrs`
    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    async fn close(&mut self) -> Result<(), DirectoryError>;
}
