//! LDAP authentication
//!
//! One attempt = one fresh connection: connect, set the protocol version,
//! bind (directly or after a user search), close. The connection is closed
//! exactly once whatever the outcome.

use crate::ldap::client::LdapClient;
use crate::ldap::directory::{ConnectSpec, DirectoryConnection, DirectoryConnector, DirectoryError};
use crate::ldap::types::{BindMode, LdapConfig};
use crate::users::UserStore;
use dirauth_core::types::{AuthErrorCode, AuthResult, Credentials};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Verifies credentials against a directory server
pub struct LdapAuthenticator<C = LdapClient> {
    connector: C,
}

impl LdapAuthenticator<LdapClient> {
    pub fn new() -> Self {
        Self {
            connector: LdapClient::new(),
        }
    }
}

impl Default for LdapAuthenticator<LdapClient> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: DirectoryConnector> LdapAuthenticator<C> {
    pub fn with_connector(connector: C) -> Self {
        Self { connector }
    }

    /// Authenticate `creds` against the directory described by `config`
    ///
    /// Unknown local users are rejected before any network traffic. On
    /// success the username is returned as the identity for the caller to
    /// resolve in its own user store.
    pub async fn authenticate(
        &self,
        config: &LdapConfig,
        creds: &Credentials,
        users: &dyn UserStore,
    ) -> AuthResult {
        let username = creds.username.as_str();

        if username.is_empty() {
            debug!("Rejecting LDAP login with empty username");
            return AuthResult::failure_code(AuthErrorCode::InvalidUser);
        }

        if !users.user_exists(username).await {
            info!("Rejecting LDAP login for unknown user: {}", username);
            return AuthResult::failure_code(AuthErrorCode::InvalidUser);
        }

        // An empty password would turn the user bind into an unauthenticated bind
        if creds.password.is_empty() {
            info!("Rejecting LDAP login with empty password for: {}", username);
            return AuthResult::failure(AuthErrorCode::BindError, "Empty password");
        }

        let url = match config.server_url() {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot build LDAP server URL: {}", e);
                return AuthResult::failure(AuthErrorCode::ConnectError, e.to_string());
            }
        };

        let spec = ConnectSpec {
            url,
            start_tls: config.start_tls,
            skip_tls_verify: config.skip_tls_verify,
            timeout: config.connect_timeout,
        };

        let mut conn = match bounded(config.connect_timeout, self.connector.connect(&spec)).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Could not connect to LDAP server {}: {}", spec.url, e);
                return AuthResult::failure(AuthErrorCode::ConnectError, e.diagnostic());
            }
        };

        let result = self.exchange(config, creds, conn.as_mut()).await;

        if let Err(e) = bounded(config.operation_timeout, conn.close()).await {
            debug!("Error while closing LDAP connection: {}", e);
        }

        match &result {
            AuthResult::Success(identity) => {
                info!("LDAP authentication succeeded for: {}", identity)
            }
            AuthResult::Failure { code, message } => warn!(
                "LDAP authentication failed for {}: {} ({})",
                username,
                code,
                message.as_deref().unwrap_or("no diagnostic")
            ),
        }

        result
    }

    async fn exchange(
        &self,
        config: &LdapConfig,
        creds: &Credentials,
        conn: &mut dyn DirectoryConnection,
    ) -> AuthResult {
        let version = config.effective_protocol_version();
        if let Err(e) = conn.set_protocol_version(version).await {
            return AuthResult::failure(AuthErrorCode::ConnectError, e.diagnostic());
        }

        let user_dn = match config.mode {
            BindMode::SimpleBind => config.build_user_dn(&creds.username),
            BindMode::SearchAndBind => match find_user_dn(config, &creds.username, conn).await {
                Ok(dn) => dn,
                Err(failure) => return failure,
            },
        };

        debug!("Binding as user DN: {}", user_dn);

        match bounded(config.operation_timeout, conn.simple_bind(&user_dn, &creds.password)).await {
            Ok(()) => AuthResult::Success(creds.username.clone()),
            Err(e) => classify(AuthErrorCode::BindError, e),
        }
    }
}

/// Bind as the search identity and look up the single entry for `username`
async fn find_user_dn(
    config: &LdapConfig,
    username: &str,
    conn: &mut dyn DirectoryConnection,
) -> Result<String, AuthResult> {
    let limit = config.operation_timeout;

    let bound = match config.search_bind_dn() {
        Some(dn) => {
            debug!("Binding search identity: {}", dn);
            let password = config.bind_password.as_deref().unwrap_or_default();
            bounded(limit, conn.simple_bind(dn, password)).await
        }
        None => {
            debug!("Using anonymous bind for user search");
            bounded(limit, conn.anonymous_bind()).await
        }
    };
    bound.map_err(|e| classify(AuthErrorCode::SearchBindError, e))?;

    let filter = config.build_user_filter(username);
    debug!("Searching {} with filter: {}", config.search_base, filter);

    let entries = bounded(
        limit,
        conn.search(&config.search_base, &filter, &[config.search_attribute.as_str()]),
    )
    .await
    .map_err(|e| classify(AuthErrorCode::SearchError, e))?;

    debug!("User search returned {} entries", entries.len());

    match <[_; 1]>::try_from(entries) {
        Ok([entry]) => {
            debug!(
                "Found user DN: {} ({}={})",
                entry.dn,
                config.search_attribute,
                entry.first_attr(&config.search_attribute).unwrap_or("-")
            );
            Ok(entry.dn)
        }
        Err(entries) => Err(AuthResult::failure(
            AuthErrorCode::SearchError,
            format!("Expected exactly one entry for {}, found {}", filter, entries.len()),
        )),
    }
}

/// Run `op` with a deadline
async fn bounded<T>(
    limit: Duration,
    op: impl Future<Output = Result<T, DirectoryError>>,
) -> Result<T, DirectoryError> {
    tokio::time::timeout(limit, op)
        .await
        .map_err(|_| DirectoryError::Timeout(limit))?
}

/// Failure for a step; a timed-out bind or search counts as a bind error
fn classify(step: AuthErrorCode, err: DirectoryError) -> AuthResult {
    let code = match err {
        DirectoryError::Timeout(_) => AuthErrorCode::BindError,
        _ => step,
    };
    AuthResult::failure(code, err.diagnostic())
}
