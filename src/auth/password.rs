//! This file defines types that handle password validation and hashing.
//! `ValidatedPassword` wraps a string and ensures it meets the minimum length.
//! `PasswordHash` converts a `ValidatedPassword` into a salted and hashed password.

use std::fmt::Display;

use bcrypt::{BcryptError, hash, verify};

use crate::Error;

/// The minimum number of characters in a password.
pub const MIN_PASSWORD_LENGTH: u8 = 6;

/// A password that has been validated, but not yet hashed.
///
/// This struct can be used to construct a [PasswordHash].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Create and validate a new password from a string.
    ///
    /// # Errors
    ///
    /// Returns [Error::TooWeak] if the password has fewer than
    /// [MIN_PASSWORD_LENGTH] characters.
    pub fn new(raw_password_string: &str) -> Result<Self, Error> {
        if raw_password_string.chars().count() < usize::from(MIN_PASSWORD_LENGTH) {
            return Err(Error::TooWeak(format!(
                "Password should be at least {MIN_PASSWORD_LENGTH} characters."
            )));
        }

        Ok(Self(raw_password_string.to_string()))
    }

    /// Create a new `ValidatedPassword` without any validation.
    ///
    /// The caller should ensure that `raw_password_string` is a valid and secure password.
    ///
    /// Not `unsafe`: an invalid password here breaks validation, not memory safety.
    pub fn new_unchecked(raw_password_string: &str) -> Self {
        Self(raw_password_string.to_string())
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", str::repeat("*", 8))
    }
}

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// An alias for the default encryption cost for hashing passwords.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Create a hashed password from a validated password with the specified `cost`.
    ///
    /// `cost` sets the bcrypt rounds, and so the time needed to verify a
    /// password. Pass [PasswordHash::DEFAULT_COST] outside of tests.
    ///
    /// # Errors
    ///
    /// This function will return an error if the password could not be hashed.
    pub fn new(password: ValidatedPassword, cost: u32) -> Result<Self, Error> {
        match hash(&password.0, cost) {
            Ok(password_hash) => Ok(Self(password_hash)),
            Err(e) => Err(Error::HashingError(e.to_string())),
        }
    }

    /// Create a new `PasswordHash` without any validation.
    ///
    /// The caller should ensure that `raw_password_hash` is a valid password hash.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_string())
    }

    /// Try to create a password hash from a raw password string.
    pub fn from_raw_password(raw_password: &str, cost: u32) -> Result<Self, Error> {
        let validated_password = ValidatedPassword::new(raw_password)?;
        PasswordHash::new(validated_password, cost)
    }

    /// Check that `raw_password` matches the stored password.
    pub fn verify(&self, raw_password: &str) -> Result<bool, BcryptError> {
        verify(raw_password, &self.0)
    }

    /// The hash string as stored in the database.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod validated_password_tests {
    use crate::{Error, auth::ValidatedPassword};

    #[test]
    fn new_fails_on_empty() {
        let result = ValidatedPassword::new("");

        assert!(matches!(result, Err(Error::TooWeak(_))));
    }

    #[test]
    fn new_fails_on_five_characters() {
        let result = ValidatedPassword::new("abcde");

        assert!(matches!(result, Err(Error::TooWeak(_))));
    }

    #[test]
    fn new_succeeds_on_six_characters() {
        let result = ValidatedPassword::new("abcdef");

        assert!(result.is_ok());
    }

    #[test]
    fn counts_characters_not_bytes() {
        let result = ValidatedPassword::new("ééééé");

        assert!(matches!(result, Err(Error::TooWeak(_))));
    }

    #[test]
    fn display_hides_password() {
        let password = ValidatedPassword::new_unchecked("hunter2");

        assert_eq!(password.to_string(), "********");
    }
}
