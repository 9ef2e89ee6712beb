//! Code for creating the account table and looking up the credentials of users.
//!
//! An account holds what is needed to authenticate a user: their email,
//! display name and password hash. Everything else about the user lives in
//! their profile document.

use rusqlite::{Connection, Row};

use crate::{Error, auth::PasswordHash, user::UserID};

/// The credentials of a registered user.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The user's ID, shared with their profile document.
    pub id: UserID,
    /// The user's email address, normalised to lowercase.
    pub email: String,
    /// The name shown in the dashboard greeting.
    pub display_name: Option<String>,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// Check that `raw_email` looks like "name@domain.tld" and normalise it.
///
/// # Errors
///
/// Returns [Error::InvalidEmail] if the address is malformed.
pub fn parse_email(raw_email: &str) -> Result<String, Error> {
    let email = raw_email.trim().to_lowercase();

    let is_valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
                && domain
                    .split_once('.')
                    .is_some_and(|(name, tld)| !name.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    };

    if is_valid {
        Ok(email)
    } else {
        Err(Error::InvalidEmail(raw_email.to_owned()))
    }
}

/// Create the account table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                display_name TEXT,
                password TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new account into the database.
///
/// `email` should already be normalised with [parse_email].
///
/// # Errors
///
/// Returns a [Error::EmailInUse] if the email is already registered or a
/// [Error::SqlError] if another SQL related error occurred.
pub fn create_account(
    email: &str,
    display_name: Option<&str>,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<Account, Error> {
    let id = UserID::new_random();

    connection.execute(
        "INSERT INTO account (id, email, display_name, password) VALUES (?1, ?2, ?3, ?4)",
        (id, email, display_name, password_hash.as_str()),
    )?;

    Ok(Account {
        id,
        email: email.to_owned(),
        display_name: display_name.map(str::to_owned),
        password_hash,
    })
}

fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let raw_password_hash: String = row.get(3)?;

    Ok(Account {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
    })
}

/// Get the account with the ID `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_account(user_id: UserID, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare("SELECT id, email, display_name, password FROM account WHERE id = :id")?
        .query_row(&[(":id", &user_id)], map_account_row)
        .map_err(|error| error.into())
}

/// Get the account registered with `email`.
///
/// The email is normalised before the lookup.
///
/// # Errors
///
/// Returns [Error::NotFound] if no account uses `email`.
pub fn get_account_by_email(email: &str, connection: &Connection) -> Result<Account, Error> {
    let email = email.trim().to_lowercase();

    connection
        .prepare("SELECT id, email, display_name, password FROM account WHERE email = :email")?
        .query_row(&[(":email", &email)], map_account_row)
        .map_err(|error| error.into())
}

/// Check an email and password against the registered accounts.
///
/// # Errors
///
/// Returns [Error::InvalidCredentials] for an unknown email or a wrong
/// password, so callers cannot tell which one was wrong.
pub fn authenticate(
    email: &str,
    password: &str,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = match get_account_by_email(email, connection) {
        Ok(account) => account,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    match account.password_hash.verify(password) {
        Ok(true) => Ok(account),
        Ok(false) => Err(Error::InvalidCredentials),
        Err(error) => Err(Error::HashingError(error.to_string())),
    }
}

/// Set the name shown for the user.
///
/// # Errors
///
/// Returns [Error::NotFound] if the account does not exist.
pub fn set_display_name(
    user_id: UserID,
    display_name: &str,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET display_name = ?1 WHERE id = ?2",
        (display_name, user_id),
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

/// Replace the password of the account `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the account does not exist.
pub fn update_password(
    user_id: UserID,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET password = ?1 WHERE id = ?2",
        (password_hash.as_str(), user_id),
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

/// Delete the account `user_id` and any password reset tokens issued for it.
///
/// # Errors
///
/// Returns [Error::NotFound] if the account does not exist.
pub fn remove_account(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    connection.execute("DELETE FROM password_reset WHERE user_id = ?1", (user_id,))?;
    let rows_affected = connection.execute("DELETE FROM account WHERE id = ?1", (user_id,))?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}
