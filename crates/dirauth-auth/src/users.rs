//! Local user store collaborator
//!
//! The directory only proves a password; whether the person may log in at all
//! is decided by the host application's own accounts.

use async_trait::async_trait;
use dirauth_core::types::UserIdentity;
use std::collections::HashMap;

/// Host-side account lookup
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Whether a local account exists for `username`
    async fn user_exists(&self, username: &str) -> bool;

    /// Load the local account for `username`
    async fn resolve_user(&self, username: &str) -> Option<UserIdentity>;
}

/// Fixed set of accounts, keyed by username
#[derive(Debug, Clone, Default)]
pub struct StaticUserStore {
    users: HashMap<String, UserIdentity>,
}

impl StaticUserStore {
    pub fn new(users: impl IntoIterator<Item = UserIdentity>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|user| (user.username.clone(), user))
                .collect(),
        }
    }

    pub fn from_usernames<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::new(names.into_iter().map(UserIdentity::new))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for StaticUserStore {
    async fn user_exists(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    async fn resolve_user(&self, username: &str) -> Option<UserIdentity> {
        self.users.get(username).cloned()
    }
}
