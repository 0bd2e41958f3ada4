//! Client-facing error document.

use crate::domain::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `{code, message}` returned to RPC clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
    /// Stable numeric code.
    pub code: u16,
    /// Table message.
    pub message: String,
    /// Specifics of this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<LedgerError> for ErrorDocument {
    fn from(error: LedgerError) -> Self {
        Self {
            code: error.code(),
            message: error.user_message().to_string(),
            detail: Some(error.to_string()),
        }
    }
}

impl fmt::Display for ErrorDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorDocument {}
