//! Per-connection session state.

use crate::application::ActiveUser;
use crate::domain::{Address, LedgerError};
use indexmap::IndexSet;
use uuid::Uuid;

/// One client connection: anonymous until signed in.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    user: Option<ActiveUser>,
    feed: IndexSet<Address>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Fresh anonymous session.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            user: None,
            feed: IndexSet::new(),
        }
    }

    /// Session id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Signed-in account, if any.
    pub fn user(&self) -> Option<&ActiveUser> {
        self.user.as_ref()
    }

    /// Whether an account is signed in.
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Signed-in account or `Unauthenticated`.
    pub fn require_user(&self) -> Result<&ActiveUser, LedgerError> {
        self.user.as_ref().ok_or(LedgerError::Unauthenticated)
    }

    /// Attach `user`, replacing any previous one.
    pub fn sign_in(&mut self, user: ActiveUser) {
        self.user = Some(user);
    }

    /// Detach the account. Returns whether one was signed in.
    pub fn sign_out(&mut self) -> bool {
        self.user.take().is_some()
    }

    /// Authors whose posts are streamed to this session.
    pub fn feed(&self) -> &IndexSet<Address> {
        &self.feed
    }

    pub(crate) fn feed_mut(&mut self) -> &mut IndexSet<Address> {
        &mut self.feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_by_default() {
        let session = Session::new();
        assert!(!session.is_signed_in());
        assert_eq!(session.require_user().unwrap_err(), LedgerError::Unauthenticated);
        assert_ne!(session.id(), Session::new().id());
    }

    #[test]
    fn test_sign_out_anonymous_is_noop() {
        let mut session = Session::new();
        assert!(!session.sign_out());
    }
}
