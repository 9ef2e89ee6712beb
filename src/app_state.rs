//! Implements a struct that holds the state of the REST server.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{
    Error,
    auth::{AuthEvents, DEFAULT_COOKIE_DURATION, PasswordResetNotifier},
    db::initialize,
    store::{FileBlobStore, SQLiteDocumentStore},
};

/// The state of the REST server.
///
/// Every service a handler needs is held here and handed to the handlers
/// through axum's state extractors, there are no global handles.
#[derive(Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// The URL the app is reachable at, used to build links sent outside the app.
    pub public_url: String,

    /// The database connection, used for accounts and password reset tokens.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The store for user profiles and transactions.
    pub store: SQLiteDocumentStore,

    /// The store for receipt images.
    pub blobs: FileBlobStore,

    /// Publishes sign-in, sign-out and account deletion events.
    pub auth_events: AuthEvents,

    /// Delivers password reset links.
    pub reset_notifier: Arc<dyn PasswordResetNotifier>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        local_timezone: &str,
        receipts_dir: impl Into<PathBuf>,
        public_url: &str,
        reset_notifier: Arc<dyn PasswordResetNotifier>,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: local_timezone.to_owned(),
            public_url: public_url.to_owned(),
            store: SQLiteDocumentStore::new(connection.clone()),
            db_connection: connection,
            blobs: FileBlobStore::new(receipts_dir),
            auth_events: AuthEvents::new(),
            reset_notifier,
        })
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
