use axum::{
    Extension, Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    Error,
    alert::Alert,
    auth::{get_account, set_display_name},
    settings::page::SettingsState,
    user::{Currency, Preferences, UserID, update_profile_settings},
};

/// The data submitted by the settings form.
#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    pub full_name: String,
    #[serde(default)]
    pub currency: String,
    /// Checkbox value, `Some` means checked.
    pub email_notifications: Option<String>,
}

/// Save the user's name and preferences.
///
/// The account display name is only written when it changed, the profile
/// is always patched.
pub async fn update_settings_endpoint(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<SettingsForm>,
) -> Response {
    match update_settings(user_id, &form, &state).await {
        Ok(()) => {
            Alert::success("Settings updated successfully!", "").into_response(StatusCode::OK)
        }
        Err(error) => {
            tracing::error!("could not update settings for {user_id}: {error}");
            error.into_alert_response()
        }
    }
}

async fn update_settings(
    user_id: UserID,
    form: &SettingsForm,
    state: &SettingsState,
) -> Result<(), Error> {
    let full_name = form.full_name.trim();
    if full_name.is_empty() {
        return Err(Error::MissingField("full name"));
    }

    {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let account = get_account(user_id, &connection)?;
        if account.display_name.as_deref() != Some(full_name) {
            set_display_name(user_id, full_name, &connection)?;
        }
    }

    let preferences = Preferences {
        currency: Currency::from_code(&form.currency),
        email_notifications: form.email_notifications.is_some(),
    };

    update_profile_settings(user_id, full_name, &preferences, &state.store).await
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension, Form,
        extract::{FromRef, State},
        http::StatusCode,
    };

    use crate::{
        auth::{PasswordHash, create_account, get_account},
        settings::{
            page::SettingsState,
            update_endpoint::{SettingsForm, update_settings_endpoint},
        },
        test_utils::{create_test_user, get_test_app_state, parse_html_fragment},
        user::{Currency, get_profile},
    };

    fn form(full_name: &str, currency: &str, email_notifications: bool) -> SettingsForm {
        SettingsForm {
            full_name: full_name.to_owned(),
            currency: currency.to_owned(),
            email_notifications: email_notifications.then(|| "on".to_owned()),
        }
    }

    #[tokio::test]
    async fn saves_name_and_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        let user_id = create_test_user(&state, "ann@example.com", "hunter2", "Ann").await;

        let response = update_settings_endpoint(
            State(SettingsState::from_ref(&state)),
            Extension(user_id),
            Form(form("  Ann Smith  ", "NZD", false)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Settings updated successfully!"), "got {text}");

        let display_name = {
            let connection = state.db_connection.lock().unwrap();
            get_account(user_id, &connection).unwrap().display_name
        };
        assert_eq!(display_name.as_deref(), Some("Ann Smith"));

        let profile = get_profile(user_id, &state.store).await.unwrap().unwrap();
        assert_eq!(profile.full_name, "Ann Smith");
        assert_eq!(profile.email, "ann@example.com");
        assert_eq!(profile.preferences.currency, Currency::NZD);
        assert!(!profile.preferences.email_notifications);
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        let user_id = create_test_user(&state, "ann@example.com", "hunter2", "Ann").await;

        let response = update_settings_endpoint(
            State(SettingsState::from_ref(&state)),
            Extension(user_id),
            Form(form("   ", "EUR", true)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let profile = get_profile(user_id, &state.store).await.unwrap().unwrap();
        assert_eq!(profile.preferences.currency, Currency::USD);
    }

    #[tokio::test]
    async fn missing_profile_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        let user_id = {
            let hash = PasswordHash::from_raw_password("hunter2", 4).unwrap();
            let connection = state.db_connection.lock().unwrap();
            create_account("bob@example.com", None, hash, &connection)
                .unwrap()
                .id
        };

        let response = update_settings_endpoint(
            State(SettingsState::from_ref(&state)),
            Extension(user_id),
            Form(form("Bob", "USD", true)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
