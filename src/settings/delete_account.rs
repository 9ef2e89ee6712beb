//! Deleting a user's account and everything stored for them.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::{
        AuthEvents, AuthStateChange, RecentLogin, invalidate_auth_cookie, reauthenticate,
        remove_account,
    },
    endpoints,
    settings::page::DELETE_CONFIRMATION,
    store::{BlobStore, DocumentStore, FileBlobStore, SQLiteDocumentStore},
    transaction::{receipt_prefix, transaction_refs},
    user::{UserID, profile_ref},
};

/// The state needed to delete an account.
#[derive(Debug, Clone)]
pub struct DeleteAccountState {
    pub cookie_key: Key,
    pub db_connection: Arc<Mutex<Connection>>,
    pub store: SQLiteDocumentStore,
    pub blobs: FileBlobStore,
    pub auth_events: AuthEvents,
}

impl FromRef<AppState> for DeleteAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
            store: state.store.clone(),
            blobs: state.blobs.clone(),
            auth_events: state.auth_events.clone(),
        }
    }
}

impl FromRef<DeleteAccountState> for Key {
    fn from_ref(state: &DeleteAccountState) -> Self {
        state.cookie_key.clone()
    }
}

/// The data submitted by the delete account form.
#[derive(Debug, Deserialize)]
pub struct DeleteAccountForm {
    /// Must be exactly [DELETE_CONFIRMATION].
    pub confirmation: String,
    /// The account password, checked again before anything is deleted.
    pub password: String,
}

/// Delete the logged in user's account, transactions, profile and receipts,
/// then log them out and send them to the sign-up page.
///
/// The password entered in the form is the recent log in proof, so a
/// session cookie alone is never enough to delete an account.
pub async fn delete_account_endpoint(
    State(state): State<DeleteAccountState>,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
    Form(form): Form<DeleteAccountForm>,
) -> Response {
    if let Err(error) = delete_account(user_id, &form, &state).await {
        tracing::error!("could not delete account {user_id}: {error}");
        return error.into_alert_response();
    }

    state
        .auth_events
        .publish(AuthStateChange::AccountDeleted(user_id));

    (
        StatusCode::SEE_OTHER,
        HxRedirect(endpoints::SIGN_UP_VIEW.to_owned()),
        invalidate_auth_cookie(jar),
    )
        .into_response()
}

async fn delete_account(
    user_id: UserID,
    form: &DeleteAccountForm,
    state: &DeleteAccountState,
) -> Result<(), Error> {
    if form.confirmation != DELETE_CONFIRMATION {
        return Err(Error::ConfirmationMismatch);
    }

    let recent_login = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        reauthenticate(user_id, &form.password, OffsetDateTime::now_utc(), &connection)?
    };

    erase_account(user_id, &recent_login, OffsetDateTime::now_utc(), state).await
}

/// Remove everything stored for `user_id`.
///
/// Receipts go first so a failed blob delete leaves the account and its
/// records untouched. The account row is removed last.
async fn erase_account(
    user_id: UserID,
    recent_login: &RecentLogin,
    now: OffsetDateTime,
    state: &DeleteAccountState,
) -> Result<(), Error> {
    recent_login.ensure_fresh(user_id, now)?;

    state.blobs.delete_prefix(&receipt_prefix(user_id)).await?;

    let mut refs = transaction_refs(user_id, &state.store).await?;
    refs.push(profile_ref(user_id));

    state.store.batch_delete(&refs).await?;
    tracing::debug!("Deleted {} documents for user {user_id}", refs.len());

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    remove_account(user_id, &connection)
}
