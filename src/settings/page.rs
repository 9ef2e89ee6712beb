use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::{MIN_PASSWORD_LENGTH, get_account},
    endpoints,
    html::{
        BUTTON_DANGER_STYLE, BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base, password_input, submit_button,
        text_input,
    },
    navigation::NavBar,
    store::SQLiteDocumentStore,
    user::{Currency, Preferences, UserID, get_profile},
};

/// The text the user must type to confirm deleting their account.
pub const DELETE_CONFIRMATION: &str = "DELETE";

const DELETE_PROMPT: &str =
    "Are you sure? This permanently deletes your account and all of your transactions.";

/// The state needed for the settings page and for saving settings.
#[derive(Debug, Clone)]
pub struct SettingsState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub store: SQLiteDocumentStore,
}

impl FromRef<AppState> for SettingsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            store: state.store.clone(),
        }
    }
}

/// The values shown in the settings form.
struct SettingsValues {
    full_name: String,
    email: String,
    preferences: Preferences,
}

/// Display the user's name, email and preferences with forms for changing them.
pub async fn get_settings_page(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let account = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_account(user_id, &connection)
            .inspect_err(|error| tracing::error!("could not get account {user_id}: {error}"))?
    };

    let preferences = get_profile(user_id, &state.store)
        .await
        .inspect_err(|error| tracing::error!("could not get profile for {user_id}: {error}"))?
        .map(|profile| profile.preferences)
        .unwrap_or_default();

    let values = SettingsValues {
        full_name: account.display_name.unwrap_or_default(),
        email: account.email,
        preferences,
    };

    Ok(settings_view(&values).into_response())
}

fn currency_select(selected: Currency) -> Markup {
    html! {
        div
        {
            label for="currency" class=(FORM_LABEL_STYLE) { "Currency" }

            select id="currency" name="currency" class=(FORM_TEXT_INPUT_STYLE)
            {
                @for currency in Currency::ALL {
                    option value=(currency.code()) selected[currency == selected]
                    {
                        (currency.label())
                    }
                }
            }
        }
    }
}

fn profile_form(values: &SettingsValues) -> Markup {
    html! {
        section class=(CARD_STYLE)
        {
            h2 class="text-lg font-semibold mb-4" { "Profile" }

            form
                id="settings-form"
                hx-post=(endpoints::SETTINGS_API)
                hx-target="#alert-container"
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                hx-disabled-elt="#submit-button"
                class="space-y-4 md:space-y-6"
            {
                (text_input("Full Name", "full_name", "text", &values.full_name, None))

                div
                {
                    label for="email" class=(FORM_LABEL_STYLE) { "Email" }

                    input
                        type="email"
                        id="email"
                        value=(values.email)
                        class=(FORM_TEXT_INPUT_STYLE)
                        disabled;
                }

                (currency_select(values.preferences.currency))

                div class="flex items-center gap-x-3"
                {
                    input
                        type="checkbox"
                        name="email_notifications"
                        id="email_notifications"
                        checked[values.preferences.email_notifications]
                        class="rounded-xs";

                    label for="email_notifications" class=(FORM_LABEL_STYLE)
                    {
                        "Email notifications"
                    }
                }

                (submit_button("Save Settings"))
            }
        }
    }
}

fn security_section() -> Markup {
    html! {
        section class=(CARD_STYLE)
        {
            h2 class="text-lg font-semibold mb-4" { "Security" }

            form
                id="change-password-form"
                hx-post=(endpoints::SETTINGS_PASSWORD_RESET)
                hx-target="#alert-container"
                hx-target-error="#alert-container"
                class="space-y-4"
            {
                p class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "We will email you a link to choose a new password."
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Change Password" }
            }
        }
    }
}

fn delete_account_section() -> Markup {
    html! {
        section class={ (CARD_STYLE) " border border-red-300 dark:border-red-800" }
        {
            h2 class="text-lg font-semibold mb-4 text-red-700 dark:text-red-400"
            {
                "Delete Account"
            }

            form
                id="delete-account-form"
                hx-post=(endpoints::DELETE_ACCOUNT)
                hx-target-error="#alert-container"
                hx-confirm=(DELETE_PROMPT)
                class="space-y-4"
            {
                p class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "Type " strong { (DELETE_CONFIRMATION) }
                    " and enter your password to delete your account."
                }

                (text_input("Confirmation", "confirmation", "text", "", None))

                (password_input("Password", "password", MIN_PASSWORD_LENGTH, None))

                button type="submit" class=(BUTTON_DANGER_STYLE) { "Delete Account" }
            }
        }
    }
}

fn settings_view(values: &SettingsValues) -> Markup {
    let nav_bar = NavBar::new(endpoints::SETTINGS_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-xl space-y-6"
            {
                h1 class="text-2xl font-bold" { "Settings" }

                (profile_form(values))
                (security_section())
                (delete_account_section())
            }
        }
    );

    base("Settings", &[], &content)
}
