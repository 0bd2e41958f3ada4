//! Read-only post view.

use super::ledger::Ledger;
use super::subscriptions::SubscriptionHandle;
use super::user::address_callback;
use crate::algorithms::{address_of, reduce_post, reduce_reference_set, reduce_reference_set_by, LogKind};
use crate::domain::{Address, LedgerError, PostContent};
use indexmap::IndexSet;

/// A post and the indexes hanging off it.
#[derive(Clone)]
pub struct Post {
    ledger: Ledger,
    address: Address,
}

impl std::fmt::Debug for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Post").field("address", &self.address).finish()
    }
}

impl Post {
    pub(crate) fn new(ledger: Ledger, address: Address) -> Self {
        Self { ledger, address }
    }

    /// Post address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Reassembled body and metadata.
    pub async fn content(&self) -> Result<PostContent, LedgerError> {
        let records = self.ledger.records_retrying(self.address).await?;
        Ok(reduce_post(&records))
    }

    /// Replies, oldest first.
    pub async fn reply_index(&self) -> Result<IndexSet<Address>, LedgerError> {
        let records = self
            .ledger
            .records_or_empty(address_of(LogKind::RepliesToPost, &self.address))
            .await?;
        Ok(reduce_reference_set(&records))
    }

    /// Accounts that promoted this post.
    pub async fn promotion_index(&self) -> Result<IndexSet<Address>, LedgerError> {
        let records = self
            .ledger
            .records_or_empty(address_of(LogKind::PromotionsOfPost, &self.address))
            .await?;
        Ok(reduce_reference_set_by(&records, "by"))
    }

    /// Accounts that reported this post.
    pub async fn report_index(&self) -> Result<IndexSet<Address>, LedgerError> {
        let records = self
            .ledger
            .records_or_empty(address_of(LogKind::ReportsOfPost, &self.address))
            .await?;
        Ok(reduce_reference_set_by(&records, "by"))
    }

    /// Called with the address of every new reply.
    pub async fn on_reply<F>(&self, callback: F) -> Result<SubscriptionHandle, LedgerError>
    where
        F: Fn(Address) + Send + Sync + 'static,
    {
        self.ledger
            .watch(
                address_of(LogKind::RepliesToPost, &self.address),
                address_callback(callback),
            )
            .await
    }
}
