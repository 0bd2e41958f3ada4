//! # Podium Ledger
//!
//! Client-side access layer over an append-only distributed ledger. Every
//! entity (profile, balance, follow graph, post) is a stream of immutable
//! records on its own log, and every view is rebuilt by replaying one.
//!
//! ## Core mechanisms
//!
//! | Mechanism | Description |
//! |-----------|-------------|
//! | Log addressing | `hash("<namespace>-<key>")` seeds an Ed25519 key; its public key is the log |
//! | Atomic writes | One signed submission lands on every target log |
//! | Idle inference | History is complete once 1 s passes without a record |
//! | Subscriptions | One ref-counted watch per log, closed after an idle lifetime |
//! | Reducers | Pure folds to profiles, balances, follow sets and post bodies |
//!
//! ## Module Structure
//!
//! ```text
//! podium-ledger/
//! ├── domain/          # Address, Record, Identity, PostContent, LedgerError
//! ├── algorithms/      # Addressing, chunking, reducers
//! ├── ports/           # LedgerNetwork, ObjectStore, UserDirectory
//! ├── adapters/        # In-memory implementations of the ports
//! ├── application/     # Timers, writer, history, subscriptions, Ledger/User/Post
//! ├── rpc/             # Method registry, sessions, dispatcher
//! └── config.rs        # LedgerConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod rpc;

// Re-exports
pub use adapters::{InMemoryLedger, InMemoryObjectStore, InMemoryUserDirectory};
pub use algorithms::{address_for, address_of, LogKind};
pub use application::{
    ActiveUser, History, Ledger, Post, SubscriptionFailure, SubscriptionHandle,
    SubscriptionManager, TimerRegistry, User, WriteBatch, Writer, HISTORY_IDLE_WINDOW,
};
pub use config::LedgerConfig;
pub use domain::{
    Address, Credentials, Document, ErrorKind, Identity, LedgerError, PostContent, RawRecord,
    Record, UserSummary,
};
pub use ports::{LedgerNetwork, ObjectStore, RawRecordStream, UserDirectory};
pub use rpc::{ErrorDocument, RpcDispatcher, Session};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
