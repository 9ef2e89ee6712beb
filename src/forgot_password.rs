//! Pages and endpoints for resetting a forgotten password.
//!
//! Requesting a reset sends a single-use link through the configured
//! [PasswordResetNotifier]. The link opens a form for choosing a new password.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::{
        MIN_PASSWORD_LENGTH, PasswordHash, PasswordResetNotifier, ValidatedPassword,
        request_password_reset, reset_link, reset_password,
    },
    endpoints,
    html::{LINK_STYLE, auth_card, base, password_input, submit_button, text_input},
};

/// Shown whether or not the email belongs to an account.
pub const RESET_REQUESTED_MSG: &str =
    "If an account exists for that email, a password reset link has been sent.";

/// The state needed to issue and redeem password reset links.
#[derive(Clone)]
pub struct PasswordResetState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The URL the app is reachable at, reset links point here.
    pub public_url: String,
    pub reset_notifier: Arc<dyn PasswordResetNotifier>,
}

impl FromRef<AppState> for PasswordResetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            public_url: state.public_url.clone(),
            reset_notifier: state.reset_notifier.clone(),
        }
    }
}

/// Issue a reset token for `email` and send the reset link.
///
/// Returns `false` without sending anything if no account uses `email`.
///
/// # Errors
/// Returns an error if the token could not be stored or the link could not be sent.
pub(crate) fn send_password_reset_link(
    email: &str,
    now: OffsetDateTime,
    state: &PasswordResetState,
) -> Result<bool, Error> {
    let issued = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        request_password_reset(email, now, &connection)?
    };

    let Some((account, token)) = issued else {
        tracing::debug!("Password reset requested for unknown email {email}");
        return Ok(false);
    };

    state
        .reset_notifier
        .send_reset_link(&account.email, &reset_link(&state.public_url, &token))?;
    tracing::info!("Sent password reset link to user {}", account.id);

    Ok(true)
}

fn forgot_password_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::PASSWORD_RESET_API)
            hx-target="#alert-container"
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            p class="text-sm text-gray-500 dark:text-gray-400"
            {
                "Enter the email you signed up with and we will send you a link to "
                "choose a new password."
            }

            (text_input("Email", "email", "email", "", None))

            (submit_button("Send reset link"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Remembered it? "
                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE) { "Log in here" }
            }
        }
    }
}

/// Renders the page for requesting a password reset link.
pub async fn get_forgot_password_page() -> Response {
    let content = auth_card("Forgot your password?", &forgot_password_form());
    base("Forgot Password", &[], &content).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Send a reset link to the account registered with the submitted email.
///
/// The response is the same whether or not the email belongs to an account.
pub async fn post_forgot_password(
    State(state): State<PasswordResetState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    match send_password_reset_link(&form.email, OffsetDateTime::now_utc(), &state) {
        Ok(_) => Alert::success("Check your email", RESET_REQUESTED_MSG)
            .into_response(StatusCode::OK),
        Err(error) => {
            tracing::error!("could not send password reset link: {error}");
            error.into_alert_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordQuery {
    #[serde(default)]
    pub token: String,
}

fn reset_password_form(token: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::RESET_PASSWORD_API)
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            input type="hidden" name="token" value=(token);

            (password_input("New Password", "password", MIN_PASSWORD_LENGTH, None))
            (password_input("Confirm Password", "confirm_password", MIN_PASSWORD_LENGTH, None))

            (submit_button("Reset password"))
        }
    }
}

/// Renders the form for choosing a new password with the token from a reset link.
pub async fn get_reset_password_page(Query(query): Query<ResetPasswordQuery>) -> Response {
    let content = auth_card("Choose a new password", &reset_password_form(&query.token));
    base("Reset Password", &[], &content).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

/// Set the new password and send the user to the log-in page.
pub async fn post_reset_password(
    State(state): State<PasswordResetState>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let password = match ValidatedPassword::new(&form.password) {
        Ok(password) => password,
        Err(error) => return error.into_alert_response(),
    };

    if form.password != form.confirm_password {
        return Alert::error_simple("Passwords do not match.")
            .into_response(StatusCode::BAD_REQUEST);
    }

    let result = match state.db_connection.lock() {
        Ok(connection) => reset_password(
            &form.token,
            password,
            PasswordHash::DEFAULT_COST,
            OffsetDateTime::now_utc(),
            &connection,
        ),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match result {
        Ok(user_id) => {
            tracing::info!("User {user_id} reset their password");
            (
                HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("could not reset password: {error}");
            error.into_alert_response()
        }
    }
}
