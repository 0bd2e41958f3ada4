//! # Ports Module
//!
//! Traits for the external collaborators this layer depends on.

pub mod outbound;

pub use outbound::*;
