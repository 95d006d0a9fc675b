//! Authentication types shared between the authenticator and its callers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Username/password pair for a single login attempt
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// A local account as known to the host application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: None,
            email: None,
        }
    }
}

/// Failure classification returned to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCode {
    /// No local account for the username
    InvalidUser,
    /// Directory server unreachable
    ConnectError,
    /// Search identity (anonymous or service account) bind rejected
    SearchBindError,
    /// User search matched zero or several entries, or failed
    SearchError,
    /// User bind rejected
    BindError,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::InvalidUser => "InvalidUser",
            AuthErrorCode::ConnectError => "ConnectError",
            AuthErrorCode::SearchBindError => "SearchBindError",
            AuthErrorCode::SearchError => "SearchError",
            AuthErrorCode::BindError => "BindError",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one authentication attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    /// Directory accepted the credentials; carries the canonical username
    Success(String),
    /// Classified failure with an optional server diagnostic
    Failure {
        code: AuthErrorCode,
        message: Option<String>,
    },
}

impl AuthResult {
    pub fn failure(code: AuthErrorCode, message: impl Into<String>) -> Self {
        AuthResult::Failure {
            code,
            message: Some(message.into()),
        }
    }

    pub fn failure_code(code: AuthErrorCode) -> Self {
        AuthResult::Failure {
            code,
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthResult::Success(_))
    }

    pub fn identity(&self) -> Option<&str> {
        match self {
            AuthResult::Success(identity) => Some(identity),
            AuthResult::Failure { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<AuthErrorCode> {
        match self {
            AuthResult::Success(_) => None,
            AuthResult::Failure { code, .. } => Some(*code),
        }
    }
}
