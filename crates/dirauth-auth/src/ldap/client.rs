//! LDAP client backed by `ldap3`
//!
//! Opens one connection per authentication attempt. Supports LDAP, LDAPS
//! (SSL), and STARTTLS connections.

use crate::ldap::directory::{
    ConnectSpec, DirectoryConnection, DirectoryConnector, DirectoryEntry, DirectoryError,
};
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Scope, SearchEntry};
use tracing::{debug, warn};

/// Connector producing real `ldap3` connections
#[derive(Debug, Clone, Copy, Default)]
pub struct LdapClient;

impl LdapClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DirectoryConnector for LdapClient {
    async fn connect(
        &self,
        spec: &ConnectSpec,
    ) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(spec.timeout)
            .set_starttls(spec.start_tls)
            .set_no_tls_verify(spec.skip_tls_verify);

        debug!("Connecting to LDAP server: {}", spec.url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &spec.url)
            .await
            .map_err(|e| DirectoryError::Connect(e.to_string()))?;

        ldap3::drive!(conn);

        Ok(Box::new(LdapConnection { ldap }))
    }
}

/// A live `ldap3` connection
struct LdapConnection {
    ldap: Ldap,
}

#[async_trait]
impl DirectoryConnection for LdapConnection {
    async fn set_protocol_version(&mut self, version: u8) -> Result<(), DirectoryError> {
        match version {
            3 => Ok(()),
            // ldap3 always sends v3 bind requests
            2 => {
                warn!("LDAPv2 requested; the exchange will use LDAPv3");
                Ok(())
            }
            other => Err(DirectoryError::UnsupportedVersion(other)),
        }
    }

    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let result = self.ldap.simple_bind(dn, password).await.map_err(protocol)?;
        check(result)
    }

    async fn anonymous_bind(&mut self) -> Result<(), DirectoryError> {
        let result = self.ldap.simple_bind("", "").await.map_err(protocol)?;
        check(result)
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let ldap3::SearchResult(rs, result) = self
            .ldap
            .search(base, Scope::Subtree, filter, attrs.to_vec())
            .await
            .map_err(protocol)?;

        check(result)?;

        Ok(rs
            .into_iter()
            .map(|entry| {
                let entry = SearchEntry::construct(entry);
                DirectoryEntry {
                    dn: entry.dn,
                    attrs: entry.attrs.into_iter().collect(),
                }
            })
            .collect())
    }

    async fn close(&mut self) -> Result<(), DirectoryError> {
        self.ldap.unbind().await.map_err(protocol)
    }
}

fn protocol(e: LdapError) -> DirectoryError {
    DirectoryError::Protocol(e.to_string())
}

fn check(result: LdapResult) -> Result<(), DirectoryError> {
    if result.rc == 0 {
        Ok(())
    } else {
        Err(DirectoryError::Rejected {
            rc: result.rc,
            diagnostic: result.text,
        })
    }
}
