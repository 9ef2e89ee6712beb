//! A web app for tracking personal income and expenses.
//!
//! Users sign up, record income and expense transactions (optionally with a
//! photo of the receipt), and see their balance, this month's income and
//! expenses, and a few charts.
//!
//! This library provides a REST API that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod dashboard;
mod db;
mod endpoints;
mod forgot_password;
mod html;
mod internal_server_error;
mod log_in;
mod log_out;
mod logging;
mod navigation;
mod not_found;
mod routing;
mod settings;
mod sign_up;
pub mod store;
mod timezone;
pub mod transaction;
pub mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{
    Account, AuthEvents, AuthStateChange, AuthSubscription, LogPasswordResetNotifier,
    PasswordHash, PasswordResetNotifier, ValidatedPassword, get_account_by_email,
    spawn_auth_event_logger, update_password,
};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use user::UserID;

use crate::{
    alert::Alert, internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The email and password did not match a registered account.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Tried to register an account with an email that is already registered.
    #[error("the email address is already in use")]
    EmailInUse,

    /// The email address is not of the form "name@domain.tld".
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The password given to confirm an action does not match the account password.
    #[error("incorrect password")]
    IncorrectPassword,

    /// The action needs a fresh log in and the user's last log in is too old.
    #[error("this operation requires a recent log in")]
    RequiresRecentLogin,

    /// The password reset token is unknown, already used, or expired.
    #[error("the password reset link is invalid or has expired")]
    InvalidResetToken,

    /// The auth cookie is missing or could not be decoded.
    #[error("no valid auth cookie in the cookie jar")]
    CookieMissing,

    /// There was an error formatting or parsing the expiry date of the auth cookie.
    ///
    /// Callers should pass in the original error as a string.
    #[error("could not handle auth cookie date-time: {0}")]
    InvalidDateFormat(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A required form field was missing or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The amount is not a number, or is zero or negative.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// The transaction type is neither "income" nor "expense".
    #[error("\"{0}\" is not a valid transaction type")]
    InvalidTransactionType(String),

    /// The category is not in the category list for the transaction type.
    #[error("\"{category}\" is not a valid {transaction_type} category")]
    InvalidCategory {
        /// The submitted category.
        category: String,
        /// The submitted transaction type.
        transaction_type: String,
    },

    /// The transaction date could not be parsed as YYYY-MM-DD.
    #[error("\"{0}\" is not a valid date")]
    InvalidDate(String),

    /// The account deletion confirmation text was not "DELETE".
    #[error("deletion cancelled or confirmation incorrect")]
    ConfirmationMismatch,

    /// The multipart form could not be parsed.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A document could not be converted to or from JSON.
    #[error("could not serialize document: {0}")]
    Serialization(String),

    /// A query referenced a field name that cannot be used in a query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Reading or writing a blob failed.
    #[error("blob storage failed: {0}")]
    BlobStorageError(String),

    /// A blob path was empty or tried to escape the blob store.
    #[error("invalid blob path \"{0}\"")]
    InvalidBlobPath(String),

    /// The password reset link could not be delivered.
    #[error("could not send password reset link: {0}")]
    NotificationError(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("account.email") =>
            {
                Error::EmailInUse
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Render the error as an alert fragment for htmx requests.
    fn into_alert_response(self) -> Response {
        match self {
            Error::MissingField(field) => Alert::error(
                "Missing information",
                &format!("Please fill in the {field} field."),
            )
            .into_response(StatusCode::BAD_REQUEST),
            Error::InvalidAmount(_) => Alert::error(
                "Invalid amount",
                "Please enter a valid amount greater than zero.",
            )
            .into_response(StatusCode::BAD_REQUEST),
            Error::InvalidTransactionType(transaction_type) => Alert::error(
                "Invalid transaction type",
                &format!("\"{transaction_type}\" is not income or expense."),
            )
            .into_response(StatusCode::BAD_REQUEST),
            Error::InvalidCategory {
                category,
                transaction_type,
            } => Alert::error(
                "Invalid category",
                &format!("\"{category}\" is not a valid {transaction_type} category."),
            )
            .into_response(StatusCode::BAD_REQUEST),
            Error::InvalidDate(date) => Alert::error(
                "Invalid date",
                &format!("\"{date}\" is not a valid date, use the date picker."),
            )
            .into_response(StatusCode::BAD_REQUEST),
            Error::MultipartError(_) | Error::InvalidBlobPath(_) => Alert::error(
                "Could not read the form",
                "The form or the attached receipt could not be read. Please try again.",
            )
            .into_response(StatusCode::BAD_REQUEST),
            Error::ConfirmationMismatch => {
                Alert::error_simple("Deletion cancelled or confirmation incorrect.")
                    .into_response(StatusCode::BAD_REQUEST)
            }
            Error::IncorrectPassword => Alert::error_simple("Incorrect password provided.")
                .into_response(StatusCode::BAD_REQUEST),
            Error::TooWeak(reason) => Alert::error("Password is too weak", &reason)
                .into_response(StatusCode::BAD_REQUEST),
            Error::InvalidResetToken => Alert::error(
                "Invalid reset link",
                "This password reset link is invalid or has expired. Request a new one.",
            )
            .into_response(StatusCode::BAD_REQUEST),
            Error::NotificationError(_) => Alert::error(
                "Could not send reset link",
                "The password reset link could not be sent. Please try again later.",
            )
            .into_response(StatusCode::INTERNAL_SERVER_ERROR),
            Error::RequiresRecentLogin => Alert::error(
                "Please log in again",
                "This operation requires a recent log in. Log out, log back in, and try again.",
            )
            .into_response(StatusCode::UNAUTHORIZED),
            Error::NotFound => Alert::error(
                "Not found",
                "Your profile could not be found. Try logging out and back in.",
            )
            .into_response(StatusCode::NOT_FOUND),
            Error::InvalidTimezoneError(timezone) => Alert::error(
                "Invalid Timezone Settings",
                &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            )
            .into_response(StatusCode::INTERNAL_SERVER_ERROR),
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                Alert::error(
                    "Something went wrong",
                    "An unexpected error occurred, check the server logs for more details.",
                )
                .into_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}
