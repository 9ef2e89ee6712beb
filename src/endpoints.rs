//! The API endpoints URIs.

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for displaying a user's transactions and adding new ones.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The page with the income vs. expense and spending by category charts.
pub const ANALYTICS_VIEW: &str = "/analytics";
/// The page for editing the user's name and preferences.
pub const SETTINGS_VIEW: &str = "/settings";
/// The route for getting the sign-up page.
pub const SIGN_UP_VIEW: &str = "/sign_up";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page for requesting a password reset link.
pub const FORGOT_PASSWORD_VIEW: &str = "/forgot_password";
/// The page for choosing a new password, reached through a reset link.
pub const RESET_PASSWORD_VIEW: &str = "/reset_password";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";
/// The route for a user's receipt images.
pub const RECEIPT: &str = "/receipts/{user_id}/{file_name}";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to create users.
pub const USERS: &str = "/api/users";
/// The route for requesting a password reset link by email.
pub const PASSWORD_RESET_API: &str = "/api/password_reset";
/// The route for setting a new password with a reset token.
pub const RESET_PASSWORD_API: &str = "/api/reset_password";
/// The route to create transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route for the category options of a transaction type.
pub const CATEGORIES_API: &str = "/api/categories";
/// The route to save the user's settings.
pub const SETTINGS_API: &str = "/api/settings";
/// The route to send a password reset link to the logged in user.
pub const SETTINGS_PASSWORD_RESET: &str = "/api/settings/password_reset";
/// The route to delete the logged in user's account.
pub const DELETE_ACCOUNT: &str = "/api/account/delete";
