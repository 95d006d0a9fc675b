//! Login lifecycle for the LDAP method
//!
//! The host drives a login through these calls, in order:
//! 1. `before_login`
//! 2. `login_form_fields`
//! 3. `after_login_form_submit`
//! 4. `new_user_session`

use crate::ldap::{DirectoryConnector, LdapAuthenticator, LdapClient, LdapConfig};
use crate::users::UserStore;
use dirauth_core::types::{AuthErrorCode, AuthResult, Credentials, UserIdentity};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Name under which the LDAP method registers itself
pub const PLUGIN_NAME: &str = "ldap";

/// Per-login state owned by the host
#[derive(Debug, Clone, Default)]
pub struct LoginContext {
    default_method: Option<String>,
}

impl LoginContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_default_method(&mut self, name: impl Into<String>) {
        self.default_method = Some(name.into());
    }

    pub fn default_method(&self) -> Option<&str> {
        self.default_method.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Password,
}

/// An input the host must render on the login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub max_length: usize,
}

const LOGIN_FIELDS: [LoginField; 2] = [
    LoginField {
        name: "user",
        label: "Username",
        kind: FieldKind::Text,
        max_length: 40,
    },
    LoginField {
        name: "password",
        label: "Password",
        kind: FieldKind::Password,
        max_length: 40,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

/// A submitted login form
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub method: FormMethod,
    pub values: HashMap<String, String>,
}

impl LoginForm {
    pub fn post<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method: FormMethod::Post,
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Result of `new_user_session`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Authenticated(UserIdentity),
    Rejected {
        code: AuthErrorCode,
        message: Option<String>,
    },
}

impl SessionOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionOutcome::Authenticated(_))
    }
}

/// LDAP login method
pub struct LdapAuthPlugin<C = LdapClient> {
    config: LdapConfig,
    authenticator: LdapAuthenticator<C>,
}

impl LdapAuthPlugin<LdapClient> {
    pub fn new(config: LdapConfig) -> Self {
        Self {
            config,
            authenticator: LdapAuthenticator::new(),
        }
    }
}

impl<C: DirectoryConnector> LdapAuthPlugin<C> {
    pub fn with_authenticator(config: LdapConfig, authenticator: LdapAuthenticator<C>) -> Self {
        Self {
            config,
            authenticator,
        }
    }

    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// Offer LDAP as the default method when configured so
    pub fn before_login(&self, ctx: &mut LoginContext) {
        if self.config.is_default {
            ctx.set_default_method(PLUGIN_NAME);
        }
    }

    pub fn login_form_fields(&self) -> &'static [LoginField] {
        &LOGIN_FIELDS
    }

    /// Read credentials from a POSTed login form
    pub fn after_login_form_submit(&self, form: &LoginForm) -> Option<Credentials> {
        if form.method != FormMethod::Post {
            debug!("Ignoring non-POST login form submission");
            return None;
        }

        Some(Credentials::new(
            form.get("user").unwrap_or_default(),
            form.get("password").unwrap_or_default(),
        ))
    }

    /// Authenticate and resolve the local account
    pub async fn new_user_session(
        &self,
        creds: &Credentials,
        users: &dyn UserStore,
    ) -> SessionOutcome {
        match self.authenticator.authenticate(&self.config, creds, users).await {
            AuthResult::Success(identity) => match users.resolve_user(&identity).await {
                Some(user) => SessionOutcome::Authenticated(user),
                None => {
                    warn!("User {} disappeared from the user store during login", identity);
                    SessionOutcome::Rejected {
                        code: AuthErrorCode::InvalidUser,
                        message: None,
                    }
                }
            },
            AuthResult::Failure { code, message } => SessionOutcome::Rejected { code, message },
        }
    }
}
