//! # Domain Errors
//!
//! One closed error enum for the whole layer, plus the table mapping each
//! kind to the stable numeric code and message shown to RPC clients.

use super::value_objects::Address;
use podium_crypto::CryptoError;
use thiserror::Error;

/// Ledger access layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// A log resolved but held no usable record.
    #[error("No data received from {address}")]
    NoData {
        /// Log that was queried
        address: Address,
    },

    /// No record observed within the hard timeout.
    #[error("Timed out waiting for records at {address}")]
    HistoryTimeout {
        /// Log that was queried
        address: Address,
    },

    /// A write was attempted with no destination logs.
    #[error("Received empty targets list")]
    EmptyTargets,

    /// The requested user id is already owned.
    #[error("A user with ID `{0}` already exists")]
    DuplicateUser(String),

    /// Post text was empty.
    #[error("Cannot post an empty string")]
    EmptyPostBody,

    /// Reply target could not be resolved.
    #[error("Cannot reply to nonexistent post {0}")]
    UnknownParentPost(Address),

    /// Balance does not cover the requested spend.
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientBalance {
        /// Current reconstructed balance
        balance: i64,
        /// Amount required
        required: i64,
    },

    /// Transfers must be non-negative.
    #[error("Cannot send < 0 funds (got {0})")]
    NegativeTransactionValue(i64),

    /// Operation requires a signed-in session.
    #[error("Sign in required")]
    Unauthenticated,

    /// Passphrase did not decrypt the stored key.
    #[error("Bad keypair with request")]
    InvalidCredentials,

    /// Request arguments were missing or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// RPC method name not recognised.
    #[error("Unknown method `{0}`")]
    UnknownMethod(String),

    /// Ledger network reported a failure.
    #[error("Ledger network error: {0}")]
    Network(String),

    /// The record stream for a log ended before anything arrived.
    #[error("Ledger stream for {address} closed")]
    Disconnected {
        /// Log whose stream ended
        address: Address,
    },

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,

    /// A record payload could not be decoded or encoded.
    #[error("Malformed record payload: {0}")]
    Codec(String),

    /// Key handling failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Startup configuration is missing or invalid.
    #[error("Environment misconfigured: {0}")]
    EnvironmentMisconfigured(String),
}

/// Fieldless tag for each `LedgerError` variant.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoData,
    HistoryTimeout,
    DuplicateUser,
    EmptyPostBody,
    UnknownParentPost,
    InsufficientBalance,
    NegativeTransactionValue,
    EmptyTargets,
    Unauthenticated,
    InvalidCredentials,
    InvalidArgument,
    UnknownMethod,
    Network,
    Disconnected,
    Cancelled,
    Codec,
    Crypto,
    EnvironmentMisconfigured,
}

/// Stable client-facing codes and messages.
pub const ERROR_TABLE: &[(ErrorKind, u16, &str)] = &[
    (ErrorKind::NoData, 1, "No data received."),
    (ErrorKind::HistoryTimeout, 2, "Timed out."),
    (ErrorKind::DuplicateUser, 3, "A user with that ID already exists."),
    (ErrorKind::EmptyPostBody, 4, "Cannot post an empty string."),
    (ErrorKind::UnknownParentPost, 5, "Cannot reply to nonexistent post."),
    (ErrorKind::InsufficientBalance, 6, "Insufficient funds."),
    (ErrorKind::NegativeTransactionValue, 7, "Cannot send < 0 funds."),
    (ErrorKind::EmptyTargets, 8, "Received empty targets list."),
    (ErrorKind::Unauthenticated, 101, "Forbidden: sign in required."),
    (ErrorKind::InvalidCredentials, 200, "Bad keypair with request."),
    (ErrorKind::InvalidArgument, 300, "Invalid argument."),
    (ErrorKind::UnknownMethod, 301, "Unknown method."),
    (ErrorKind::Network, 400, "Ledger network error."),
    (ErrorKind::Disconnected, 401, "Ledger stream closed."),
    (ErrorKind::Cancelled, 402, "Operation cancelled."),
    (ErrorKind::Codec, 403, "Malformed record payload."),
    (ErrorKind::Crypto, 404, "Cryptographic failure."),
    (ErrorKind::EnvironmentMisconfigured, 900, "Environment misconfigured."),
];

/// Code used when a kind is somehow missing from the table.
const UNKNOWN_CODE: u16 = 999;

impl LedgerError {
    /// Variant tag.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoData { .. } => ErrorKind::NoData,
            Self::HistoryTimeout { .. } => ErrorKind::HistoryTimeout,
            Self::EmptyTargets => ErrorKind::EmptyTargets,
            Self::DuplicateUser(_) => ErrorKind::DuplicateUser,
            Self::EmptyPostBody => ErrorKind::EmptyPostBody,
            Self::UnknownParentPost(_) => ErrorKind::UnknownParentPost,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::NegativeTransactionValue(_) => ErrorKind::NegativeTransactionValue,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::UnknownMethod(_) => ErrorKind::UnknownMethod,
            Self::Network(_) => ErrorKind::Network,
            Self::Disconnected { .. } => ErrorKind::Disconnected,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Codec(_) => ErrorKind::Codec,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::EnvironmentMisconfigured(_) => ErrorKind::EnvironmentMisconfigured,
        }
    }

    /// Numeric code from `ERROR_TABLE`.
    pub fn code(&self) -> u16 {
        lookup(self.kind()).map_or(UNKNOWN_CODE, |(code, _)| code)
    }

    /// Client-facing message from `ERROR_TABLE`.
    pub fn user_message(&self) -> &'static str {
        lookup(self.kind()).map_or("Unknown error.", |(_, message)| message)
    }

    /// True for `HistoryTimeout`, the error call sites may read as "empty log".
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::HistoryTimeout { .. })
    }
}

fn lookup(kind: ErrorKind) -> Option<(u16, &'static str)> {
    ERROR_TABLE
        .iter()
        .find(|(k, _, _)| *k == kind)
        .map(|(_, code, message)| (*code, *message))
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        Self::Codec(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_covers_every_kind_once() {
        let kinds: HashSet<_> = ERROR_TABLE.iter().map(|(k, _, _)| *k).collect();
        let codes: HashSet<_> = ERROR_TABLE.iter().map(|(_, c, _)| *c).collect();
        assert_eq!(kinds.len(), ERROR_TABLE.len());
        assert_eq!(codes.len(), ERROR_TABLE.len());
        assert_eq!(ERROR_TABLE.len(), 18);
    }

    #[test]
    fn test_timeout_code() {
        let err = LedgerError::HistoryTimeout {
            address: Address::from_bytes([1u8; 32]),
        };
        assert_eq!(err.code(), 2);
        assert_eq!(err.user_message(), "Timed out.");
        assert!(err.is_timeout());
    }

    #[test]
    fn test_domain_codes() {
        assert_eq!(LedgerError::DuplicateUser("al".into()).code(), 3);
        assert_eq!(LedgerError::EmptyPostBody.code(), 4);
        assert_eq!(
            LedgerError::InsufficientBalance { balance: 1, required: 2 }.code(),
            6
        );
        assert_eq!(LedgerError::NegativeTransactionValue(-5).code(), 7);
        assert_eq!(
            LedgerError::EnvironmentMisconfigured("PODIUM_NETWORK_ID".into()).code(),
            900
        );
    }

    #[test]
    fn test_display_carries_detail() {
        let err = LedgerError::InsufficientBalance { balance: 10, required: 25 };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("25"));
    }

    #[test]
    fn test_crypto_errors_convert() {
        let err: LedgerError = CryptoError::DecryptionFailed.into();
        assert_eq!(err.kind(), ErrorKind::Crypto);
    }
}
