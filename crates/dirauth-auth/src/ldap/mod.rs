//! LDAP authentication module
//!
//! Provides directory-backed login via:
//! - Simple bind (DN derived from the username)
//! - Search and bind (DN found by a directory search)
//!
//! Every attempt uses a fresh connection that is always closed.

mod authenticator;
mod client;
mod directory;
#[cfg(test)]
pub(crate) mod mock;
mod types;

pub use authenticator::LdapAuthenticator;
pub use client::LdapClient;
pub use directory::{
    ConnectSpec, DirectoryConnection, DirectoryConnector, DirectoryEntry, DirectoryError,
};
pub use types::*;
