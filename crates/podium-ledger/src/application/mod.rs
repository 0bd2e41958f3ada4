//! # Application Layer
//!
//! Runtime machinery (timers, writes, history, subscriptions) and the
//! domain services built on it.

pub mod history;
pub mod ledger;
pub mod post;
pub mod subscriptions;
pub mod timers;
pub mod user;
pub mod writer;

pub use history::{History, HISTORY_IDLE_WINDOW};
pub use ledger::{Ledger, VIEW_RETRIES};
pub use post::Post;
pub use subscriptions::{
    ErrorCallback, RecordCallback, SubscriptionFailure, SubscriptionHandle, SubscriptionManager,
};
pub use timers::{TimerCallback, TimerRegistry};
pub use user::{ActiveUser, User, PROMOTION_COST};
pub use writer::{WriteBatch, Writer};
