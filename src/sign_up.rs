//! The sign-up page and the endpoint that registers a new user.
//!
//! Registering creates the account used for logging in and the profile
//! document shown on the settings page, then logs the user in.

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
    auth::{
        AuthEvents, AuthStateChange, MIN_PASSWORD_LENGTH, PasswordHash, ValidatedPassword,
        create_account, parse_email, set_auth_cookie,
    },
    endpoints,
    html::{LINK_STYLE, auth_card, base, password_input, submit_button, text_input},
    internal_server_error::get_internal_server_error_redirect,
    store::SQLiteDocumentStore,
    user::{UserProfile, create_profile},
};

/// Error messages shown under the sign-up form fields.
#[derive(Debug, Default)]
struct FieldErrors {
    full_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    confirm_password: Option<String>,
}

fn sign_up_form(full_name: &str, email: &str, errors: &FieldErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("Full Name", "full_name", "text", full_name, errors.full_name.as_deref()))
            (text_input("Email", "email", "email", email, errors.email.as_deref()))
            (password_input(
                "Password",
                "password",
                MIN_PASSWORD_LENGTH,
                errors.password.as_deref(),
            ))
            (password_input(
                "Confirm Password",
                "confirm_password",
                MIN_PASSWORD_LENGTH,
                errors.confirm_password.as_deref(),
            ))

            (submit_button("Sign up"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                    "Log in here"
                }
            }
        }
    }
}

/// Display the sign-up page.
pub async fn get_sign_up_page() -> Response {
    let form = sign_up_form("", "", &FieldErrors::default());
    let content = auth_card("Create an account", &form);
    base("Sign Up", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct SignUpState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
    pub store: SQLiteDocumentStore,
    pub auth_events: AuthEvents,
}

impl FromRef<AppState> for SignUpState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
            store: state.store.clone(),
            auth_events: state.auth_events.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<SignUpState> for Key {
    fn from_ref(state: &SignUpState) -> Self {
        state.cookie_key.clone()
    }
}

/// The data submitted by the sign-up form.
#[derive(Serialize, Deserialize)]
pub struct SignUpForm {
    /// Trimmed before saving, must not be blank.
    pub full_name: String,
    /// Trimmed and lowercased before saving.
    pub email: String,
    /// At least six characters.
    pub password: String,
    /// Must equal `password`.
    pub confirm_password: String,
}

/// The validated sign-up form.
struct NewUser {
    full_name: String,
    email: String,
    password: ValidatedPassword,
}

fn validate(form: &SignUpForm) -> Result<NewUser, FieldErrors> {
    let mut errors = FieldErrors::default();

    let full_name = form.full_name.trim();
    if full_name.is_empty() {
        errors.full_name = Some("Please enter your full name.".to_owned());
    }

    let email = parse_email(&form.email)
        .inspect_err(|_| errors.email = Some("Please enter a valid email address.".to_owned()))
        .ok();

    let password = ValidatedPassword::new(&form.password)
        .inspect_err(|error| {
            errors.password = Some(match error {
                Error::TooWeak(reason) => reason.clone(),
                error => error.to_string(),
            })
        })
        .ok();

    if form.password != form.confirm_password {
        errors.confirm_password = Some("Passwords do not match.".to_owned());
    }

    match (email, password) {
        (Some(email), Some(password))
            if errors.full_name.is_none() && errors.confirm_password.is_none() =>
        {
            Ok(NewUser {
                full_name: full_name.to_owned(),
                email,
                password,
            })
        }
        _ => Err(errors),
    }
}

/// Register a new user, log them in and send them to the dashboard.
///
/// Validation problems are shown under the offending form fields.
pub async fn sign_up(
    State(state): State<SignUpState>,
    jar: PrivateCookieJar,
    Form(form): Form<SignUpForm>,
) -> Response {
    let new_user = match validate(&form) {
        Ok(new_user) => new_user,
        Err(errors) => {
            return sign_up_form(&form.full_name, &form.email, &errors).into_response();
        }
    };

    let password_hash = match PasswordHash::new(new_user.password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return get_internal_server_error_redirect();
        }
    };

    let account = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return get_internal_server_error_redirect();
            }
        };

        create_account(
            &new_user.email,
            Some(&new_user.full_name),
            password_hash,
            &connection,
        )
    };

    let account = match account {
        Ok(account) => account,
        Err(Error::EmailInUse) => {
            let errors = FieldErrors {
                email: Some("An account with this email already exists.".to_owned()),
                ..Default::default()
            };
            return sign_up_form(&form.full_name, &form.email, &errors).into_response();
        }
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            return get_internal_server_error_redirect();
        }
    };

    let profile = UserProfile::new(&new_user.full_name, &new_user.email);
    if let Err(error) = create_profile(account.id, &profile, &state.store).await {
        tracing::error!("could not create profile for {}: {error}", account.id);
        return get_internal_server_error_redirect();
    }

    match set_auth_cookie(jar, account.id, state.cookie_duration) {
        Ok(jar) => {
            state
                .auth_events
                .publish(AuthStateChange::SignedIn(account.id));

            (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
                jar,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("An error occurred while setting the auth cookie: {error}");
            get_internal_server_error_redirect()
        }
    }
}


#[cfg(test)]
mod sign_up_tests {
    use axum::{
        Form,
        body::Body,
        extract::{FromRef, State},
        http::{Response, StatusCode},
    };
    use axum_extra::extract::PrivateCookieJar;

    use crate::{
        AppState,
        auth::{AuthStateChange, authenticate, get_account},
        endpoints,
        sign_up::{SignUpForm, SignUpState, sign_up},
        test_utils::{
            assert_hx_redirect, create_test_user, field_errors, get_test_app_state,
            parse_html_fragment,
        },
        user::{Currency, get_profile},
    };

    fn form(full_name: &str, email: &str, password: &str, confirm_password: &str) -> SignUpForm {
        SignUpForm {
            full_name: full_name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            confirm_password: confirm_password.to_owned(),
        }
    }

    async fn post_sign_up(state: &AppState, form: SignUpForm) -> Response<Body> {
        let sign_up_state = SignUpState::from_ref(state);
        let jar = PrivateCookieJar::new(sign_up_state.cookie_key.clone());

        sign_up(State(sign_up_state), jar, Form(form)).await
    }

    async fn error_messages(response: Response<Body>) -> Vec<String> {
        field_errors(&parse_html_fragment(response).await)
    }

    #[tokio::test]
    async fn sign_up_creates_account_and_profile() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        let mut subscription = state.auth_events.subscribe();

        let response = post_sign_up(
            &state,
            form("  Ann Smith ", "Ann@Example.com", "hunter2", "hunter2"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);

        let account = {
            let connection = state.db_connection.lock().unwrap();
            authenticate("ann@example.com", "hunter2", &connection).unwrap()
        };
        let display_name = {
            let connection = state.db_connection.lock().unwrap();
            get_account(account.id, &connection).unwrap().display_name
        };
        assert_eq!(display_name.as_deref(), Some("Ann Smith"));

        let profile = get_profile(account.id, &state.store).await.unwrap().unwrap();
        assert_eq!(profile.full_name, "Ann Smith");
        assert_eq!(profile.email, "ann@example.com");
        assert_eq!(profile.preferences.currency, Currency::USD);
        assert!(profile.preferences.email_notifications);
        assert_eq!(profile.total_balance, 0.0);

        assert_eq!(
            subscription.next().await,
            Some(AuthStateChange::SignedIn(account.id))
        );
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());

        let response = post_sign_up(&state, form("Ann", "ann@example.com", "abc", "abc")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            error_messages(response).await,
            ["Password should be at least 6 characters."]
        );
    }

    #[tokio::test]
    async fn mismatched_passwords_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());

        let response =
            post_sign_up(&state, form("Ann", "ann@example.com", "hunter2", "hunter3")).await;

        assert_eq!(error_messages(response).await, ["Passwords do not match."]);
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());

        let response =
            post_sign_up(&state, form("Ann", "not-an-email", "hunter2", "hunter2")).await;

        assert_eq!(
            error_messages(response).await,
            ["Please enter a valid email address."]
        );
    }

    #[tokio::test]
    async fn email_in_use_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        create_test_user(&state, "ann@example.com", "hunter2", "Ann").await;

        let response =
            post_sign_up(&state, form("Ann Two", "ann@example.com", "hunter22", "hunter22")).await;

        assert_eq!(
            error_messages(response).await,
            ["An account with this email already exists."]
        );
    }
}
