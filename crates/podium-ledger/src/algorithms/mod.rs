//! # Algorithms Module
//!
//! Pure functions: log addressing, post chunking and the reducers that
//! rebuild views from record streams.

pub mod addressing;
pub mod chunking;
pub mod reducers;

pub use addressing::{address_for, address_of, keystore_address, media_address, new_post_address, LogKind};
pub use chunking::{chunk_text, post_cost};
pub use reducers::{
    deep_merge, order_by_creation, reduce_balance, reduce_follow_set, reduce_post, reduce_profile,
    reduce_reference_set, reduce_reference_set_by,
};
