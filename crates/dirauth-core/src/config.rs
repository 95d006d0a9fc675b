//! Configuration for Dirauth

use crate::types::UserIdentity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirauthConfig {
    #[serde(default)]
    pub ldap: LdapConfigSection,

    /// Local accounts allowed to log in through the directory
    #[serde(default)]
    pub users: Vec<UserIdentity>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DirauthConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| crate::Error::ConfigRead {
            path: path.to_string(),
            source,
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `DIRAUTH_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let ldap = &mut self.ldap;

        if let Some(server) = var("DIRAUTH_LDAP_SERVER") {
            ldap.server = server;
        }
        if let Some(port) = var("DIRAUTH_LDAP_PORT") {
            match port.parse() {
                Ok(p) => ldap.port = Some(p),
                Err(_) => tracing::warn!("Ignoring invalid DIRAUTH_LDAP_PORT: {}", port),
            }
        }
        if let Some(version) = var("DIRAUTH_LDAP_VERSION") {
            match version.parse() {
                Ok(v) => ldap.protocol_version = Some(v),
                Err(_) => tracing::warn!("Ignoring invalid DIRAUTH_LDAP_VERSION: {}", version),
            }
        }
        if let Some(mode) = var("DIRAUTH_LDAP_MODE") {
            ldap.mode = mode;
        }
        if let Some(prefix) = var("DIRAUTH_LDAP_USER_PREFIX") {
            ldap.user_prefix = prefix;
        }
        if let Some(suffix) = var("DIRAUTH_LDAP_DOMAIN_SUFFIX") {
            ldap.domain_suffix = suffix;
        }
        if let Some(attr) = var("DIRAUTH_LDAP_SEARCH_ATTRIBUTE") {
            ldap.search_attribute = attr;
        }
        if let Some(base) = var("DIRAUTH_LDAP_SEARCH_BASE") {
            ldap.search_base = base;
        }
        if let Some(filter) = var("DIRAUTH_LDAP_EXTRA_FILTER") {
            ldap.extra_filter = Some(filter);
        }
        if let Some(dn) = var("DIRAUTH_LDAP_BIND_DN") {
            ldap.bind_dn = Some(dn);
        }
        if let Some(pwd) = var("DIRAUTH_LDAP_BIND_PASSWORD") {
            ldap.bind_password = Some(pwd);
        }
        parse_var(&var, "DIRAUTH_LDAP_START_TLS", &mut ldap.start_tls);
        parse_var(&var, "DIRAUTH_LDAP_SKIP_TLS_VERIFY", &mut ldap.skip_tls_verify);
        parse_var(&var, "DIRAUTH_LDAP_IS_DEFAULT", &mut ldap.is_default);
        parse_var(&var, "DIRAUTH_LDAP_CONNECT_TIMEOUT", &mut ldap.connect_timeout_seconds);
        parse_var(&var, "DIRAUTH_LDAP_OPERATION_TIMEOUT", &mut ldap.operation_timeout_seconds);

        if let Some(users) = var("DIRAUTH_USERS") {
            self.users = users
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(UserIdentity::new)
                .collect();
        }

        if let Some(level) = var("DIRAUTH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("DIRAUTH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Overwrite `target` with the parsed value of `key`, keeping it on bad input
fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = var(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("Ignoring invalid {}: {}", key, raw),
        }
    }
}

/// LDAP settings as entered by an administrator
///
/// Kept close to the raw form values: the mode is a free string and the
/// port/version may be missing. `dirauth-auth` turns this into a typed config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfigSection {
    /// Server URI or host, e.g. "ldap://ldap.example.com" or "ldaps://ldap.example.com"
    #[serde(default)]
    pub server: String,

    /// Port number (389 when omitted)
    #[serde(default)]
    pub port: Option<u16>,

    /// LDAP protocol version (2 when omitted)
    #[serde(default)]
    pub protocol_version: Option<u8>,

    /// "simplebind" or "searchandbind"; empty means simple bind
    #[serde(default = "default_mode")]
    pub mode: String,

    /// [Simple bind] prefix placed before the username, e.g. "cn=" or "uid="
    #[serde(default)]
    pub user_prefix: String,

    /// [Simple bind] suffix placed after the username, e.g. ",dc=example,dc=com"
    #[serde(default)]
    pub domain_suffix: String,

    /// [Search and bind] attribute compared to the login, e.g. uid, cn, mail
    #[serde(default)]
    pub search_attribute: String,

    /// [Search and bind] base DN for the user search
    #[serde(default)]
    pub search_base: String,

    /// [Search and bind] extra filter ANDed to the attribute filter, with its
    /// own enclosing parentheses
    #[serde(default)]
    pub extra_filter: Option<String>,

    /// [Search and bind] DN used for the search; anonymous bind when empty
    #[serde(default)]
    pub bind_dn: Option<String>,

    /// [Search and bind] password for `bind_dn`
    #[serde(default)]
    pub bind_password: Option<String>,

    /// Make LDAP the default login method
    #[serde(default)]
    pub is_default: bool,

    /// Use STARTTLS
    #[serde(default)]
    pub start_tls: bool,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub connect_timeout_seconds: u64,

    /// Timeout for each bind or search, in seconds
    #[serde(default = "default_timeout")]
    pub operation_timeout_seconds: u64,
}

fn default_mode() -> String {
    "simplebind".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for LdapConfigSection {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: None,
            protocol_version: None,
            mode: default_mode(),
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
            connect_timeout_seconds: default_timeout(),
            operation_timeout_seconds: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
