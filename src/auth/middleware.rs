//! Authentication middleware that validates cookies, extends sessions, and handles redirects.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use time::Duration;

use crate::{
    AppState,
    auth::cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
    endpoints,
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Check the auth cookie and run the request with the user's ID attached.
/// Without a valid cookie, `get_redirect` builds the response that sends
/// the client to the log-in page.
///
/// Handlers behind this guard receive the user with `Extension(user_id): Extension<UserID>`.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect(endpoints::LOG_IN_VIEW);
        }
    };
    let user_id = match get_token_from_cookies(&jar) {
        Ok(token) => token.user_id,
        Err(_) => return get_redirect(endpoints::LOG_IN_VIEW),
    };

    parts.extensions.insert(user_id);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();

    // Handlers that end the session (log out, account deletion) set their own
    // cookie, which must not be overwritten with an extended one.
    if parts.headers.contains_key(SET_COOKIE) {
        return Response::from_parts(parts, body);
    }

    let jar = match extend_auth_cookie_duration_if_needed(jar.clone(), state.cookie_duration) {
        Ok(updated_jar) => updated_jar,
        Err(err) => {
            tracing::error!("Error extending cookie duration: {err:?}. Rolling back cookie jar.");
            jar
        }
    };
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}

/// Guard for full pages: a missing or expired auth cookie redirects to the
/// log-in page.
///
/// Handlers behind this guard receive the user with `Extension(user_id): Extension<UserID>`.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Guard for htmx endpoints: a missing or expired auth cookie answers with
/// an `HX-Redirect` to the log-in page.
///
/// Handlers behind this guard receive the user with `Extension(user_id): Extension<UserID>`.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// Middleware function that sends logged in users to the dashboard instead of
/// the log-in and sign-up pages.
pub async fn redirect_if_logged_in(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let is_logged_in = match PrivateCookieJar::<Key>::from_request_parts(&mut parts, &state).await
    {
        Ok(jar) => get_token_from_cookies(&jar).is_ok(),
        Err(_) => false,
    };

    if is_logged_in {
        return Redirect::to(endpoints::DASHBOARD_VIEW).into_response();
    }

    next.run(Request::from_parts(parts, body)).await
}
