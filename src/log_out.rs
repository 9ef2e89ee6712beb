//! Log-out route handler that invalidates authentication cookies and redirects users.

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};

use crate::{
    AppState,
    auth::{AuthEvents, AuthStateChange, invalidate_auth_cookie},
    endpoints,
    user::UserID,
};

/// The state needed to log out a user.
#[derive(Debug, Clone)]
pub struct LogOutState {
    pub cookie_key: Key,
    pub auth_events: AuthEvents,
}

impl FromRef<AppState> for LogOutState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            auth_events: state.auth_events.clone(),
        }
    }
}

impl FromRef<LogOutState> for Key {
    fn from_ref(state: &LogOutState) -> Self {
        state.cookie_key.clone()
    }
}

/// Invalidate the auth cookie and redirect the client to the log-in page.
pub async fn get_log_out(
    State(state): State<LogOutState>,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
) -> Response {
    let jar = invalidate_auth_cookie(jar);
    state.auth_events.publish(AuthStateChange::SignedOut(user_id));

    (jar, Redirect::to(endpoints::LOG_IN_VIEW)).into_response()
}
