//! # Adapters
//!
//! In-memory implementations of the outbound ports. They back the test
//! suites and the bootstrap binary; a production deployment swaps in real
//! network, object store and cache clients behind the same traits.

pub mod memory_directory;
pub mod memory_ledger;
pub mod memory_store;

pub use memory_directory::InMemoryUserDirectory;
pub use memory_ledger::InMemoryLedger;
pub use memory_store::InMemoryObjectStore;
