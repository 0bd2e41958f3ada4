//! # Podium Node
//!
//! Network bootstrap for a Podium server.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `PODIUM_*` environment variables
//! 2. Resolve the live network record (resume it, or create a new iteration)
//! 3. Build the ledger for that network
//! 4. Create or sign in the root account; on first launch mint the initial
//!    supply, write the root profile and first post, seed reserved accounts
//! 5. Mark the network launched and hand out the RPC dispatcher
//!
//! ## Module Structure
//!
//! ```text
//! podium-node/
//! ├── config.rs      # NodeConfig (ledger settings + root account)
//! ├── bootstrap.rs   # NetworkRecord, Node, RunningNode
//! └── main.rs        # Binary entry point
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod config;

pub use bootstrap::{
    network_key, NetworkRecord, Node, NodeError, ReservedAccount, RunningNode, ACCOUNTS_KEY,
    LIVE_KEY,
};
pub use config::{NodeConfig, RootAccount};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
