//! # RPC Boundary
//!
//! Named methods over JSON arguments, dispatched against a [`Ledger`] on
//! behalf of a [`Session`]. Failures leave as [`ErrorDocument`]s carrying
//! the stable code table.
//!
//! [`Ledger`]: crate::application::Ledger

pub mod dispatcher;
pub mod error;
pub mod methods;
pub mod session;

pub use dispatcher::{FeedEvent, RpcDispatcher, RETRY_BUDGET};
pub use error::ErrorDocument;
pub use methods::{get_method_info, is_method_supported, Method, MethodInfo};
pub use session::Session;
