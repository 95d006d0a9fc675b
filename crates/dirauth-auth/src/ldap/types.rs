//! LDAP configuration types
//!
//! Supports:
//! - Simple bind (DN built from prefix + username + suffix)
//! - Search and bind (DN discovered by a directory search)

use dirauth_core::config::LdapConfigSection;
use dirauth_core::{Error, Result, DEFAULT_LDAP_PORT, DEFAULT_PROTOCOL_VERSION};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Port used for `ldaps://` servers when neither the URL nor the config names one
const DEFAULT_LDAPS_PORT: u16 = 636;

// ============================================================================
// Bind Mode
// ============================================================================

/// How the user's DN is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindMode {
    /// DN = prefix + username + suffix
    #[default]
    SimpleBind,
    /// DN found by searching for the username, then bound
    SearchAndBind,
}

impl BindMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindMode::SimpleBind => "simplebind",
            BindMode::SearchAndBind => "searchandbind",
        }
    }
}

impl FromStr for BindMode {
    type Err = Error;

    /// An empty mode is accepted as simple bind
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "simplebind" => Ok(BindMode::SimpleBind),
            "searchandbind" => Ok(BindMode::SearchAndBind),
            other => Err(Error::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for BindMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// LDAP Configuration
// ============================================================================

/// Settings for one authentication attempt
#[derive(Clone)]
pub struct LdapConfig {
    /// Server URI or bare host
    pub server: String,

    /// Port; `None` (or 0) means 389
    pub port: Option<u16>,

    /// Protocol version; `None` means 2
    pub protocol_version: Option<u8>,

    pub mode: BindMode,

    /// [Simple bind] e.g. "cn=" or "uid="
    pub user_prefix: String,

    /// [Simple bind] e.g. ",dc=example,dc=com" or "@example.com"
    pub domain_suffix: String,

    /// [Search and bind] attribute matched against the username
    pub search_attribute: String,

    /// [Search and bind] base DN of the user search
    pub search_base: String,

    /// [Search and bind] filter ANDed with the attribute filter
    pub extra_filter: Option<String>,

    /// [Search and bind] search identity; anonymous when unset or empty
    pub bind_dn: Option<String>,

    pub bind_password: Option<String>,

    /// Offer LDAP as the default login method
    pub is_default: bool,

    pub start_tls: bool,

    pub skip_tls_verify: bool,

    pub connect_timeout: Duration,

    /// Bound on each bind and search
    pub operation_timeout: Duration,
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: None,
            protocol_version: None,
            mode: BindMode::default(),
            user_prefix: String::new(),
            domain_suffix: String::new(),
            search_attribute: String::new(),
            search_base: String::new(),
            extra_filter: None,
            bind_dn: None,
            bind_password: None,
            is_default: false,
            start_tls: false,
            skip_tls_verify: false,
            connect_timeout: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(10),
        }
    }
}

impl fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("protocol_version", &self.protocol_version)
            .field("mode", &self.mode)
            .field("user_prefix", &self.user_prefix)
            .field("domain_suffix", &self.domain_suffix)
            .field("search_attribute", &self.search_attribute)
            .field("search_base", &self.search_base)
            .field("extra_filter", &self.extra_filter)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &self.bind_password.as_ref().map(|_| "********"))
            .field("is_default", &self.is_default)
            .field("start_tls", &self.start_tls)
            .field("skip_tls_verify", &self.skip_tls_verify)
            .field("connect_timeout", &self.connect_timeout)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl TryFrom<&LdapConfigSection> for LdapConfig {
    type Error = Error;

    fn try_from(section: &LdapConfigSection) -> Result<Self> {
        if section.mode.trim().is_empty() {
            warn!("LDAP mode is not set; falling back to simple bind");
        }

        Ok(Self {
            server: section.server.clone(),
            port: section.port,
            protocol_version: section.protocol_version,
            mode: section.mode.parse()?,
            user_prefix: section.user_prefix.clone(),
            domain_suffix: section.domain_suffix.clone(),
            search_attribute: section.search_attribute.clone(),
            search_base: section.search_base.clone(),
            extra_filter: section.extra_filter.clone(),
            bind_dn: section.bind_dn.clone(),
            bind_password: section.bind_password.clone(),
            is_default: section.is_default,
            start_tls: section.start_tls,
            skip_tls_verify: section.skip_tls_verify,
            connect_timeout: Duration::from_secs(section.connect_timeout_seconds),
            operation_timeout: Duration::from_secs(section.operation_timeout_seconds),
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

impl LdapConfig {
    /// Configured port, or 389
    pub fn effective_port(&self) -> u16 {
        self.port.filter(|p| *p != 0).unwrap_or(DEFAULT_LDAP_PORT)
    }

    /// Configured protocol version, or 2
    pub fn effective_protocol_version(&self) -> u8 {
        self.protocol_version.unwrap_or(DEFAULT_PROTOCOL_VERSION)
    }

    /// Connection URL for the server
    ///
    /// A port written in the server URI wins over the configured port. A bare
    /// host is treated as `ldap://`.
    pub fn server_url(&self) -> Result<String> {
        let server = self.server.trim();
        if server.is_empty() {
            return Err(Error::InvalidConfig("LDAP server is required".to_string()));
        }

        let raw = if server.contains("://") {
            server.to_string()
        } else {
            format!("ldap://{}", server)
        };

        let mut url = Url::parse(&raw)
            .map_err(|e| Error::InvalidConfig(format!("Invalid LDAP server {}: {}", server, e)))?;

        if url.scheme() != "ldap" && url.scheme() != "ldaps" {
            return Err(Error::InvalidConfig(
                "Server URL must start with ldap:// or ldaps://".to_string(),
            ));
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(Error::InvalidConfig(format!(
                "LDAP server has no host: {}",
                server
            )));
        }

        if url.port().is_none() {
            let port = match self.port.filter(|p| *p != 0) {
                Some(p) => p,
                None if url.scheme() == "ldaps" => DEFAULT_LDAPS_PORT,
                None => DEFAULT_LDAP_PORT,
            };
            url.set_port(Some(port))
                .map_err(|_| Error::InvalidConfig(format!("Cannot set port on {}", server)))?;
        }

        Ok(url.to_string())
    }

    /// Simple-bind DN: plain concatenation, no escaping
    pub fn build_user_dn(&self, username: &str) -> String {
        format!("{}{}{}", self.user_prefix, username, self.domain_suffix)
    }

    /// Search filter for the username, ANDed with the extra filter when set
    pub fn build_user_filter(&self, username: &str) -> String {
        let base = format!("({}={})", self.search_attribute, username);
        match self.extra_filter.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => format!("(&{}{})", base, extra),
            _ => base,
        }
    }

    /// DN of the search identity, `None` for anonymous search
    pub fn search_bind_dn(&self) -> Option<&str> {
        self.bind_dn.as_deref().filter(|dn| !dn.is_empty())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.server_url()?;

        let version = self.effective_protocol_version();
        if version != 2 && version != 3 {
            return Err(Error::InvalidConfig(format!(
                "Unsupported LDAP protocol version: {}",
                version
            )));
        }

        if self.connect_timeout.is_zero() || self.operation_timeout.is_zero() {
            return Err(Error::InvalidConfig("Timeouts must be non-zero".to_string()));
        }

        if self.mode == BindMode::SearchAndBind {
            if self.search_attribute.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "Search attribute is required in search and bind mode".to_string(),
                ));
            }

            if self.search_base.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "Search base is required in search and bind mode".to_string(),
                ));
            }

            if let Some(extra) = self.extra_filter.as_deref().map(str::trim) {
                if !extra.is_empty() && !(extra.starts_with('(') && extra.ends_with(')')) {
                    return Err(Error::InvalidConfig(
                        "Extra user filter must be enclosed in parentheses".to_string(),
                    ));
                }
            }

            if self.search_bind_dn().is_some()
                && self.bind_password.as_deref().map_or(true, str::is_empty)
            {
                return Err(Error::InvalidConfig(
                    "Bind password is required when a bind DN is set".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Settings meaningful for the configured mode, with the bind password masked
    ///
    /// Simple bind hides the search settings and search and bind hides the
    /// prefix/suffix pair.
    pub fn relevant_settings(&self) -> Vec<(&'static str, String)> {
        let mut settings = vec![
            ("server", self.server.clone()),
            ("port", self.effective_port().to_string()),
            ("protocol_version", self.effective_protocol_version().to_string()),
            ("mode", self.mode.to_string()),
        ];

        match self.mode {
            BindMode::SimpleBind => {
                settings.push(("user_prefix", self.user_prefix.clone()));
                settings.push(("domain_suffix", self.domain_suffix.clone()));
            }
            BindMode::SearchAndBind => {
                settings.push(("search_attribute", self.search_attribute.clone()));
                settings.push(("search_base", self.search_base.clone()));
                settings.push(("extra_filter", self.extra_filter.clone().unwrap_or_default()));
                settings.push(("bind_dn", self.bind_dn.clone().unwrap_or_default()));
                settings.push((
                    "bind_password",
                    match self.bind_password.as_deref() {
                        Some(p) if !p.is_empty() => "********".to_string(),
                        _ => String::new(),
                    },
                ));
            }
        }

        settings.push(("is_default", self.is_default.to_string()));
        settings
    }
}
