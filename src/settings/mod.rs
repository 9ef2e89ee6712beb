//! The settings page and the endpoints behind its forms.

mod delete_account;
mod page;
mod password_reset_endpoint;
mod update_endpoint;

pub use delete_account::delete_account_endpoint;
pub use page::get_settings_page;
pub use password_reset_endpoint::request_password_change_endpoint;
pub use update_endpoint::update_settings_endpoint;
