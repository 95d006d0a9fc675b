//! Directory authentication for Dirauth

pub mod ldap;
pub mod plugin;
pub mod users;

pub use ldap::{
    BindMode, DirectoryConnector, DirectoryError, LdapAuthenticator, LdapClient, LdapConfig,
};
pub use plugin::{LdapAuthPlugin, LoginContext, LoginForm, SessionOutcome};
pub use users::{StaticUserStore, UserStore};
