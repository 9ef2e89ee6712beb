//! Single-use tokens for resetting a forgotten password.
//!
//! Only a SHA-512 digest of each token is stored, the raw token only ever
//! appears in the reset link sent to the user.

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha512};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{
        PasswordHash, ValidatedPassword,
        account::{Account, get_account_by_email, update_password},
    },
    endpoints,
    user::UserID,
};

/// How long a reset link can be used for.
pub const RESET_TOKEN_LIFETIME: Duration = Duration::hours(1);

/// Delivers password reset links to users.
pub trait PasswordResetNotifier: Send + Sync {
    /// Send `reset_url` to `email`.
    ///
    /// # Errors
    /// Returns [Error::NotificationError] if the link could not be delivered.
    fn send_reset_link(&self, email: &str, reset_url: &str) -> Result<(), Error>;
}

/// A [PasswordResetNotifier] that writes the reset link to the server log.
///
/// Useful for self-hosted setups without outgoing email, the administrator
/// passes the link on to the user.
#[derive(Debug, Clone, Default)]
pub struct LogPasswordResetNotifier;

impl PasswordResetNotifier for LogPasswordResetNotifier {
    fn send_reset_link(&self, email: &str, reset_url: &str) -> Result<(), Error> {
        tracing::info!("Password reset link for {email}: {reset_url}");
        Ok(())
    }
}

/// Create the table of outstanding reset tokens.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_password_reset_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS password_reset (
                token_hash TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                expires_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

fn hash_token(token: &str) -> String {
    format!("{:x}", Sha512::digest(token.as_bytes()))
}

/// The full URL of the page where `token` can be used.
pub fn reset_link(public_url: &str, token: &str) -> String {
    format!(
        "{}{}?token={token}",
        public_url.trim_end_matches('/'),
        endpoints::RESET_PASSWORD_VIEW
    )
}

/// Create a new reset token for `user_id` that expires [RESET_TOKEN_LIFETIME] after `now`.
///
/// # Errors
///
/// Returns an error if the token could not be stored.
pub fn issue_reset_token(
    user_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<String, Error> {
    let token = uuid::Uuid::new_v4().simple().to_string();

    connection.execute(
        "INSERT INTO password_reset (token_hash, user_id, expires_at) VALUES (?1, ?2, ?3)",
        (hash_token(&token), user_id, now + RESET_TOKEN_LIFETIME),
    )?;

    Ok(token)
}

/// Issue a reset token for the account registered with `email`.
///
/// Returns `None` if no account uses `email`.
///
/// # Errors
///
/// Returns an error if the account lookup or token storage failed.
pub fn request_password_reset(
    email: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Option<(Account, String)>, Error> {
    let account = match get_account_by_email(email, connection) {
        Ok(account) => account,
        Err(Error::NotFound) => return Ok(None),
        Err(error) => return Err(error),
    };

    let token = issue_reset_token(account.id, now, connection)?;

    Ok(Some((account, token)))
}

/// Check that `token` is a valid reset token at `now` and delete it.
///
/// # Errors
///
/// Returns [Error::InvalidResetToken] if the token is unknown, already used or expired.
pub fn consume_reset_token(
    token: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<UserID, Error> {
    let token_hash = hash_token(token);

    let row: Option<(UserID, OffsetDateTime)> = connection
        .query_row(
            "SELECT user_id, expires_at FROM password_reset WHERE token_hash = ?1",
            (&token_hash,),
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (user_id, expires_at) = row.ok_or(Error::InvalidResetToken)?;

    connection.execute(
        "DELETE FROM password_reset WHERE token_hash = ?1",
        (&token_hash,),
    )?;

    if expires_at <= now {
        return Err(Error::InvalidResetToken);
    }

    Ok(user_id)
}

/// Set a new password using a reset token.
///
/// # Errors
///
/// Returns [Error::InvalidResetToken] if the token cannot be used, or an error
/// if the new password could not be hashed or saved.
pub fn reset_password(
    token: &str,
    new_password: ValidatedPassword,
    hash_cost: u32,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<UserID, Error> {
    let user_id = consume_reset_token(token, now, connection)?;
    let password_hash = PasswordHash::new(new_password, hash_cost)?;

    update_password(user_id, password_hash, connection)?;

    Ok(user_id)
}
