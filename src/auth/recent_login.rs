//! Proof that a user has just re-entered their password.
//!
//! Destructive operations such as deleting an account require the user to
//! have authenticated recently, not just to hold a valid session cookie.

use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::account::get_account, user::UserID};

/// How long a [RecentLogin] stays valid.
pub const RECENT_LOGIN_WINDOW: Duration = Duration::minutes(5);

/// Evidence that `user_id` verified their password at `verified_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentLogin {
    user_id: UserID,
    verified_at: OffsetDateTime,
}

impl RecentLogin {
    #[cfg(test)]
    pub(crate) fn new_unchecked(user_id: UserID, verified_at: OffsetDateTime) -> Self {
        Self {
            user_id,
            verified_at,
        }
    }

    /// Check that this proof belongs to `user_id` and is still fresh at `now`.
    ///
    /// # Errors
    ///
    /// Returns [Error::RequiresRecentLogin] if the proof is for another user
    /// or is older than [RECENT_LOGIN_WINDOW].
    pub fn ensure_fresh(&self, user_id: UserID, now: OffsetDateTime) -> Result<(), Error> {
        if self.user_id != user_id || now - self.verified_at > RECENT_LOGIN_WINDOW {
            return Err(Error::RequiresRecentLogin);
        }

        Ok(())
    }
}

/// Verify `password` for `user_id` and return a fresh [RecentLogin].
///
/// # Errors
///
/// Returns [Error::IncorrectPassword] if the password is wrong, or an error
/// if the account could not be loaded.
pub fn reauthenticate(
    user_id: UserID,
    password: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<RecentLogin, Error> {
    let account = get_account(user_id, connection)?;

    match account.password_hash.verify(password) {
        Ok(true) => Ok(RecentLogin {
            user_id,
            verified_at: now,
        }),
        Ok(false) => Err(Error::IncorrectPassword),
        Err(error) => Err(Error::HashingError(error.to_string())),
    }
}
