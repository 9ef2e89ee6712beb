use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;

use crate::{
    AppState, Error, PasswordResetNotifier,
    auth::{PasswordHash, create_account},
    store::{SQLiteDocumentStore, create_document_table},
    user::{UserID, UserProfile, create_profile},
};

pub(crate) fn get_test_store() -> SQLiteDocumentStore {
    let connection =
        Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
    create_document_table(&connection).expect("Could not create document table");

    SQLiteDocumentStore::new(Arc::new(Mutex::new(connection)))
}

/// Records reset links instead of sending them.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl PasswordResetNotifier for RecordingNotifier {
    fn send_reset_link(&self, email: &str, reset_url: &str) -> Result<(), Error> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_owned(), reset_url.to_owned()));

        Ok(())
    }
}

pub(crate) fn get_test_app_state(receipts_dir: &Path) -> AppState {
    get_test_app_state_with_notifier(receipts_dir, Arc::new(RecordingNotifier::default()))
}

pub(crate) fn get_test_app_state_with_notifier(
    receipts_dir: &Path,
    notifier: Arc<dyn PasswordResetNotifier>,
) -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

    AppState::new(
        connection,
        "foobar",
        "Etc/UTC",
        receipts_dir,
        "http://localhost:3000",
        notifier,
    )
    .expect("Could not create app state")
}

/// Register a user with an account and a profile, the password hash uses the
/// lowest bcrypt cost to keep tests fast.
pub(crate) async fn create_test_user(
    state: &AppState,
    email: &str,
    password: &str,
    full_name: &str,
) -> UserID {
    let hash = PasswordHash::from_raw_password(password, 4).unwrap();
    let account = {
        let connection = state.db_connection.lock().unwrap();
        create_account(email, Some(full_name), hash, &connection).unwrap()
    };

    create_profile(account.id, &UserProfile::new(full_name, email), &state.store)
        .await
        .unwrap();

    account.id
}
