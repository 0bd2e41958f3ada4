//! # Domain Module
//!
//! Core types for the ledger access layer: addresses, records, derived
//! views and the error taxonomy.

pub mod entities;
pub mod errors;
pub mod identity;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use identity::Identity;
pub use value_objects::*;
