//! Scripted in-memory directory for tests

use crate::ldap::directory::{
    ConnectSpec, DirectoryConnection, DirectoryConnector, DirectoryEntry, DirectoryError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    // script
    accounts: HashMap<String, String>,
    search_results: Vec<String>,
    allow_anonymous: bool,
    refuse_connections: bool,
    search_fault: bool,
    bind_delay: Option<Duration>,
    search_delay: Option<Duration>,
    connect_delay: Option<Duration>,

    // recorded traffic
    connects: Vec<String>,
    versions: Vec<u8>,
    binds: Vec<(String, String)>,
    anonymous_binds: usize,
    searches: Vec<(String, String, Vec<String>)>,
    closes: usize,
}

/// Directory that answers from a script and records every call
#[derive(Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<MockState>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn with_account(self, dn: &str, password: &str) -> Self {
        self.state().accounts.insert(dn.to_string(), password.to_string());
        self
    }

    /// DNs returned by every search
    pub fn with_search_results(self, dns: &[&str]) -> Self {
        self.state().search_results = dns.iter().map(|dn| dn.to_string()).collect();
        self
    }

    pub fn allow_anonymous(self) -> Self {
        self.state().allow_anonymous = true;
        self
    }

    pub fn refuse_connections(self) -> Self {
        self.state().refuse_connections = true;
        self
    }

    pub fn fail_searches(self) -> Self {
        self.state().search_fault = true;
        self
    }

    pub fn stall_binds(self, delay: Duration) -> Self {
        self.state().bind_delay = Some(delay);
        self
    }

    pub fn stall_searches(self, delay: Duration) -> Self {
        self.state().search_delay = Some(delay);
        self
    }

    pub fn stall_connects(self, delay: Duration) -> Self {
        self.state().connect_delay = Some(delay);
        self
    }

    pub fn connects(&self) -> Vec<String> {
        self.state().connects.clone()
    }

    pub fn versions(&self) -> Vec<u8> {
        self.state().versions.clone()
    }

    pub fn binds(&self) -> Vec<(String, String)> {
        self.state().binds.clone()
    }

    pub fn anonymous_binds(&self) -> usize {
        self.state().anonymous_binds
    }

    pub fn searches(&self) -> Vec<(String, String, Vec<String>)> {
        self.state().searches.clone()
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }
}

#[async_trait]
impl DirectoryConnector for MockDirectory {
    async fn connect(
        &self,
        spec: &ConnectSpec,
    ) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        let (refuse, delay) = {
            let mut state = self.state();
            state.connects.push(spec.url.clone());
            (state.refuse_connections, state.connect_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if refuse {
            return Err(DirectoryError::Connect("Connection refused".to_string()));
        }

        Ok(Box::new(MockConnection {
            state: self.state.clone(),
        }))
    }
}

struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    async fn maybe_stall(&self) {
        let delay = self.state().bind_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DirectoryConnection for MockConnection {
    async fn set_protocol_version(&mut self, version: u8) -> Result<(), DirectoryError> {
        self.state().versions.push(version);
        Ok(())
    }

    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        self.state().binds.push((dn.to_string(), password.to_string()));
        self.maybe_stall().await;

        let state = self.state();
        match state.accounts.get(dn) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(DirectoryError::Rejected {
                rc: 49,
                diagnostic: "Invalid credentials".to_string(),
            }),
        }
    }

    async fn anonymous_bind(&mut self) -> Result<(), DirectoryError> {
        let allowed = {
            let mut state = self.state();
            state.anonymous_binds += 1;
            state.allow_anonymous
        };
        self.maybe_stall().await;

        if allowed {
            Ok(())
        } else {
            Err(DirectoryError::Rejected {
                rc: 48,
                diagnostic: "Inappropriate authentication".to_string(),
            })
        }
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let delay = {
            let mut state = self.state();
            state.searches.push((
                base.to_string(),
                filter.to_string(),
                attrs.iter().map(|a| a.to_string()).collect(),
            ));
            state.search_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if state.search_fault {
            return Err(DirectoryError::Protocol("Connection reset by peer".to_string()));
        }

        Ok(state
            .search_results
            .iter()
            .map(|dn| {
                // leading RDN doubles as the returned attribute
                let mut entry = DirectoryEntry::new(dn.as_str());
                let rdn = dn.split(',').next().unwrap_or_default();
                if let Some((attr, value)) = rdn.split_once('=') {
                    entry.attrs.insert(attr.to_string(), vec![value.to_string()]);
                }
                entry
            })
            .collect())
    }

    async fn close(&mut self) -> Result<(), DirectoryError> {
        self.state().closes += 1;
        Ok(())
    }
}
