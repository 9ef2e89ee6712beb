//! User identifiers and the user profile document.
//!
//! The profile lives in the `users` collection under the user's ID and holds
//! the details shown on the settings page. Credentials are kept separately by
//! the auth module.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    Error,
    store::{DocumentId, DocumentRef, DocumentStore, from_fields, to_fields},
};

/// The collection that holds user profiles, keyed by user ID.
pub const USERS_COLLECTION: &str = "users";

/// A newtype wrapper for user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(Uuid);

impl UserID {
    /// Create a new, random user ID.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The document ID of this user's profile.
    pub fn as_document_id(&self) -> DocumentId {
        DocumentId::new(self.to_string())
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserID {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl ToSql for UserID {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for UserID {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        text.parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// The currencies a user can choose to display amounts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Currency {
    /// US dollar, also used for any unrecognised code.
    #[default]
    USD,
    /// Euro.
    EUR,
    /// Pound sterling.
    GBP,
    /// Japanese yen.
    JPY,
    /// New Zealand dollar.
    NZD,
    /// Australian dollar.
    AUD,
    /// Canadian dollar.
    CAD,
}

impl Currency {
    /// Every supported currency in the order shown in the settings form.
    pub const ALL: [Currency; 7] = [
        Currency::USD,
        Currency::EUR,
        Currency::GBP,
        Currency::JPY,
        Currency::NZD,
        Currency::AUD,
        Currency::CAD,
    ];

    /// The ISO 4217 code, e.g. "USD".
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::NZD => "NZD",
            Currency::AUD => "AUD",
            Currency::CAD => "CAD",
        }
    }

    /// The prefix used when formatting amounts.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::NZD => "NZ$",
            Currency::AUD => "A$",
            Currency::CAD => "CA$",
        }
    }

    /// The name shown in the settings form, e.g. "US Dollar (USD)".
    pub fn label(&self) -> &'static str {
        match self {
            Currency::USD => "US Dollar (USD)",
            Currency::EUR => "Euro (EUR)",
            Currency::GBP => "British Pound (GBP)",
            Currency::JPY => "Japanese Yen (JPY)",
            Currency::NZD => "New Zealand Dollar (NZD)",
            Currency::AUD => "Australian Dollar (AUD)",
            Currency::CAD => "Canadian Dollar (CAD)",
        }
    }

    /// Parse a currency code, falling back to [Currency::USD] for unknown codes.
    pub fn from_code(code: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|currency| currency.code().eq_ignore_ascii_case(code.trim()))
            .unwrap_or_default()
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code().to_owned()
    }
}

/// The user's display preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// The currency symbol used when displaying amounts.
    #[serde(default)]
    pub currency: Currency,
    /// Whether the user wants email updates. On for new accounts.
    #[serde(default = "default_email_notifications")]
    pub email_notifications: bool,
}

fn default_email_notifications() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            email_notifications: default_email_notifications(),
        }
    }
}

/// The profile document stored for each user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// The name shown in the navigation bar and on the settings page.
    #[serde(default)]
    pub full_name: String,
    /// A copy of the account's email, for display.
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub preferences: Preferences,
    /// Written once at sign-up and never kept in sync with the transactions.
    /// Balances are always computed from the transactions instead.
    #[serde(default)]
    pub total_balance: f64,
}

impl UserProfile {
    /// The profile written at sign-up.
    pub fn new(full_name: &str, email: &str) -> Self {
        Self {
            full_name: full_name.to_owned(),
            email: email.to_owned(),
            preferences: Preferences::default(),
            total_balance: 0.0,
        }
    }
}

/// Write the initial profile for a newly registered user.
///
/// # Errors
/// Returns an error if the store rejects the write.
pub async fn create_profile(
    user_id: UserID,
    profile: &UserProfile,
    store: &impl DocumentStore,
) -> Result<(), Error> {
    store
        .set(
            USERS_COLLECTION,
            &user_id.as_document_id(),
            to_fields(profile)?,
        )
        .await
}

/// Get a user's profile, `None` if the user has no profile document.
///
/// # Errors
/// Returns an error if the store could not be read or the document is malformed.
pub async fn get_profile(
    user_id: UserID,
    store: &impl DocumentStore,
) -> Result<Option<UserProfile>, Error> {
    match store
        .get(USERS_COLLECTION, &user_id.as_document_id())
        .await?
    {
        Some(document) => from_fields(document.fields).map(Some),
        None => Ok(None),
    }
}

/// The currency the user wants amounts shown in, [Currency::USD] if the
/// user has no profile.
///
/// # Errors
/// Returns an error if the profile could not be read.
pub async fn preferred_currency(
    user_id: UserID,
    store: &impl DocumentStore,
) -> Result<Currency, Error> {
    Ok(get_profile(user_id, store)
        .await?
        .map(|profile| profile.preferences.currency)
        .unwrap_or_default())
}

/// Save the fields edited on the settings page.
///
/// The preferences object is replaced as a whole.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no profile, or an error if the
/// store rejects the write.
pub async fn update_profile_settings(
    user_id: UserID,
    full_name: &str,
    preferences: &Preferences,
    store: &impl DocumentStore,
) -> Result<(), Error> {
    let patch = to_fields(&json!({
        "fullName": full_name,
        "preferences": preferences,
    }))?;

    store
        .update(USERS_COLLECTION, &user_id.as_document_id(), patch)
        .await
}

/// A reference to the user's profile document, used when deleting an account.
pub fn profile_ref(user_id: UserID) -> DocumentRef {
    DocumentRef::new(USERS_COLLECTION, user_id.as_document_id())
}
