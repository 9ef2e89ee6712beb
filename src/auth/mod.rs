//! Accounts, passwords, sessions and the notifications around them.

mod account;
mod cookie;
mod events;
mod middleware;
mod password;
mod password_reset;
mod recent_login;
mod token;

pub use account::{
    Account, authenticate, create_account, create_account_table, get_account,
    get_account_by_email, parse_email, remove_account, set_display_name, update_password,
};
pub use cookie::DEFAULT_COOKIE_DURATION;
pub(crate) use cookie::{get_token_from_cookies, invalidate_auth_cookie, set_auth_cookie};
pub use events::{AuthEvents, AuthStateChange, AuthSubscription, spawn_auth_event_logger};
pub use middleware::{AuthState, auth_guard, auth_guard_hx, redirect_if_logged_in};
pub use password::{MIN_PASSWORD_LENGTH, PasswordHash, ValidatedPassword};
pub use password_reset::{
    LogPasswordResetNotifier, PasswordResetNotifier, create_password_reset_table,
    request_password_reset, reset_link, reset_password,
};
pub use recent_login::{RecentLogin, reauthenticate};

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
