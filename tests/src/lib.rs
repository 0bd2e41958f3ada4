//! # Podium Test Suite
//!
//! Unified test crate for flows that cross crate boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── end_to_end.rs          # Users, posts, follows and feeds through Ledger
//!     ├── history_inference.rs   # Idle inference against a live network
//!     └── node_flows.rs          # Bootstrap + RPC sessions
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p podium-tests
//! cargo test -p podium-tests integration::end_to_end
//! ```

pub mod integration;
