//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The auth module handles the lower level authentication and cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{AuthEvents, AuthStateChange, authenticate, invalidate_auth_cookie, set_auth_cookie},
    endpoints,
    html::{LINK_STYLE, auth_card, base, password_input, submit_button, text_input},
};

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Invalid email or password.";

const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

fn log_in_form(email: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("Email", "email", "email", email, None))

            (password_input("Password", "password", 0, error_message))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            (submit_button("Log in"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Forgot your password? "
                a href=(endpoints::FORGOT_PASSWORD_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                    "Reset it here"
                }
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Don't have an account? "
                a href=(endpoints::SIGN_UP_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                    "Sign up here"
                }
            }
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page() -> Response {
    let log_in_form = log_in_form("", None);
    let content = auth_card("Log in to your account", &log_in_form);
    base("Log In", &[], &content).into_response()
}

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
    pub auth_events: AuthEvents,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
            auth_events: state.auth_events.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie is set and the client is
/// redirected to the dashboard page.
/// Otherwise, the form is returned with an error message explaining the problem.
/// An unknown email and a wrong password produce the same message.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let email = user_data.email.trim();

    let account = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return log_in_form(email, Some(INTERNAL_ERROR_MSG)).into_response();
            }
        };

        authenticate(email, &user_data.password, &connection)
    };

    let account = match account {
        Ok(account) => account,
        Err(Error::InvalidCredentials) => {
            tracing::debug!("Rejected log in for {email}");
            return log_in_form(email, Some(INVALID_CREDENTIALS_ERROR_MSG)).into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return log_in_form(email, Some(INTERNAL_ERROR_MSG)).into_response();
        }
    };

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    match set_auth_cookie(jar.clone(), account.id, cookie_duration) {
        Ok(updated_jar) => {
            state
                .auth_events
                .publish(AuthStateChange::SignedIn(account.id));

            (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
                updated_jar,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("Error setting auth cookie: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
                .into_response()
        }
    }
}

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password in the database, which has been verified.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Email entered during log-in.
    pub email: String,

    /// Password entered during log-in.
    pub password: String,

    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set
    /// (see the [MDN docs](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2)).
    /// The `Some` variant should be interpreted as `true` irregardless of the
    /// string value, and the `None` variant should be interpreted as `false`.
    pub remember_me: Option<String>,
}

#[cfg(test)]
mod log_in_page_tests {
    use std::iter::zip;

    use axum::http::{StatusCode, header::CONTENT_TYPE};

    use crate::{
        endpoints,
        log_in::get_log_in_page,
        test_utils::{
            assert_hx_post, assert_required_input, assert_submit_button, assert_valid_html,
            must_get_form, parse_html_document,
        },
    };

    #[tokio::test]
    async fn log_in_page_displays_form() {
        let response = get_log_in_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let form = must_get_form(&document);
        assert_hx_post(&form, endpoints::LOG_IN_API);
        assert_required_input(&form, "email", "email");
        assert_required_input(&form, "password", "password");
        assert_submit_button(&form);

        let link_selector = scraper::Selector::parse("a[href]").unwrap();
        let links = form.select(&link_selector).collect::<Vec<_>>();
        assert_eq!(links.len(), 2, "want 2 links, got {}", links.len());
        let want_endpoints = [endpoints::FORGOT_PASSWORD_VIEW, endpoints::SIGN_UP_VIEW];

        for (link, endpoint) in zip(links, want_endpoints) {
            assert_eq!(
                link.value().attr("href"),
                Some(endpoint),
                "want link to {}, got {:?}",
                endpoint,
                link.value().attr("href")
            );
        }
    }
}

#[cfg(test)]
mod log_in_tests {
    use axum::{
        Form, Router,
        body::Body,
        extract::{FromRef, State},
        http::{Response, StatusCode, header::SET_COOKIE},
        routing::post,
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
    use axum_test::TestServer;
    use time::{Duration, OffsetDateTime};

    use crate::{
        AppState,
        auth::{AuthStateChange, COOKIE_TOKEN},
        endpoints,
        log_in::{
            INVALID_CREDENTIALS_ERROR_MSG, LogInData, LoginState, REMEMBER_ME_COOKIE_DURATION,
            post_log_in,
        },
        test_utils::{
            assert_hx_redirect, assert_valid_html, create_test_user, field_error,
            get_test_app_state, parse_html_fragment,
        },
    };

    async fn get_state_with_user(dir: &std::path::Path) -> AppState {
        let state = get_test_app_state(dir);
        create_test_user(&state, "ann@example.com", "hunter2", "Ann").await;

        state
    }

    async fn new_log_in_request(state: &AppState, email: &str, password: &str) -> Response<Body> {
        let login_state = LoginState::from_ref(state);
        let jar = PrivateCookieJar::new(login_state.cookie_key.clone());

        post_log_in(
            State(login_state),
            jar,
            Form(LogInData {
                email: email.to_owned(),
                password: password.to_owned(),
                remember_me: None,
            }),
        )
        .await
    }

    /// Test helper macro to assert that two date times are within one second
    /// of each other. Used instead of a function so that the file and line
    /// number of the caller is included in the error message instead of the
    /// helper.
    macro_rules! assert_date_time_close {
        ($left:expr, $right:expr$(,)?) => {
            assert!(
                ($left - $right).abs() < Duration::seconds(2),
                "got date time {:?}, want {:?}",
                $left,
                $right
            );
        };
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_state_with_user(dir.path()).await;

        let response = new_log_in_request(&state, "ann@example.com", "hunter2").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
        assert_set_cookie(&response);
    }

    #[tokio::test]
    async fn email_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_state_with_user(dir.path()).await;

        let response = new_log_in_request(&state, " Ann@Example.com ", "hunter2").await;

        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn log_in_publishes_signed_in_event() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_state_with_user(dir.path()).await;
        let mut subscription = state.auth_events.subscribe();

        new_log_in_request(&state, "ann@example.com", "hunter2").await;

        assert!(matches!(
            subscription.next().await,
            Some(AuthStateChange::SignedIn(_))
        ));
    }

    #[tokio::test]
    async fn log_in_fails_with_incorrect_password() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_state_with_user(dir.path()).await;

        let response = new_log_in_request(&state, "ann@example.com", "wrongpassword").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_password_error(response, INVALID_CREDENTIALS_ERROR_MSG).await;
    }

    #[tokio::test]
    async fn unknown_email_gets_same_error_as_wrong_password() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_state_with_user(dir.path()).await;

        let response = new_log_in_request(&state, "bob@example.com", "hunter2").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_password_error(response, INVALID_CREDENTIALS_ERROR_MSG).await;
    }

    #[tokio::test]
    async fn log_in_fails_with_missing_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(LoginState::from_ref(&state));

        let server = TestServer::try_new(app).expect("Could not create test server.");

        server
            .post(endpoints::LOG_IN_API)
            .content_type("application/x-www-form-urlencoded")
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn remember_me_extends_auth_cookie_through_form() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_state_with_user(dir.path()).await;
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(LoginState::from_ref(&state));
        let server = TestServer::try_new(app).expect("Could not create test server.");
        let form = [
            ("email", "ann@example.com"),
            ("password", "hunter2"),
            ("remember_me", "on"),
        ];

        let response = server.post(endpoints::LOG_IN_API).form(&form).await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

        let token_cookie = response.cookie(COOKIE_TOKEN);
        assert_date_time_close!(
            token_cookie.expires_datetime().unwrap(),
            OffsetDateTime::now_utc() + REMEMBER_ME_COOKIE_DURATION
        );
    }

    #[track_caller]
    fn assert_set_cookie(response: &Response<Body>) {
        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|header| Cookie::parse(header.to_str().unwrap().to_owned()).ok())
            .find(|cookie| cookie.name() == COOKIE_TOKEN);

        assert!(cookie.is_some(), "want auth cookie to be set");
    }

    async fn assert_password_error(response: Response<Body>, want_message: &str) {
        let document = parse_html_fragment(response).await;
        assert_valid_html(&document);

        assert_eq!(
            field_error(&document, "password").as_deref(),
            Some(want_message)
        );
    }
}
