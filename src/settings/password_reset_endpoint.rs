use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use time::OffsetDateTime;

use crate::{
    Error,
    alert::Alert,
    auth::get_account,
    forgot_password::{PasswordResetState, send_password_reset_link},
    user::UserID,
};

/// Send a password reset link to the email of the logged in user.
pub async fn request_password_change_endpoint(
    State(state): State<PasswordResetState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let email = match account_email(user_id, &state) {
        Ok(email) => email,
        Err(error) => {
            tracing::error!("could not get account {user_id}: {error}");
            return error.into_alert_response();
        }
    };

    match send_password_reset_link(&email, OffsetDateTime::now_utc(), &state) {
        Ok(_) => Alert::success(
            "Password reset email sent",
            &format!("Check {email} for a link to choose a new password."),
        )
        .into_response(StatusCode::OK),
        Err(error) => {
            tracing::error!("could not send password reset link to {user_id}: {error}");
            error.into_alert_response()
        }
    }
}

fn account_email(user_id: UserID, state: &PasswordResetState) -> Result<String, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    Ok(get_account(user_id, &connection)?.email)
}
