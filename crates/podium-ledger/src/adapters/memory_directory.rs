//! In-memory username search cache.

use crate::domain::{Address, LedgerError, UserSummary};
use crate::ports::UserDirectory;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Users keyed by lowercase id.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<BTreeMap<String, Address>>,
}

impl InMemoryUserDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn add_user(&self, id: &str, address: Address) -> Result<(), LedgerError> {
        self.users.write().insert(id.to_lowercase(), address);
        Ok(())
    }

    async fn find_users_matching(&self, pattern: &str) -> Result<Vec<UserSummary>, LedgerError> {
        let needle = pattern.to_lowercase();
        Ok(self
            .users
            .read()
            .iter()
            .filter(|(id, _)| id.contains(&needle))
            .map(|(id, address)| UserSummary {
                address: *address,
                id: id.clone(),
            })
            .collect())
    }

    async fn lookup(&self, id: &str) -> Result<Option<Address>, LedgerError> {
        Ok(self.users.read().get(&id.to_lowercase()).copied())
    }
}
