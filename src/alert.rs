//! Alert messages for reporting the outcome of form submissions.
//!
//! Alerts are rendered as HTML fragments. Forms point `hx-target-error` (and
//! `hx-target` where the success message is an alert) at `#alert-container`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

/// Alert message types for styling
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertType {
    Success,
    Error,
}

/// A success or error message with optional details.
#[derive(Debug, Clone)]
pub struct Alert<'a> {
    pub alert_type: AlertType,
    pub message: &'a str,
    pub details: &'a str,
}

impl<'a> Alert<'a> {
    /// Create a new success alert
    pub fn success(message: &'a str, details: &'a str) -> Self {
        Self {
            alert_type: AlertType::Success,
            message,
            details,
        }
    }

    /// Create a new error alert
    pub fn error(message: &'a str, details: &'a str) -> Self {
        Self {
            alert_type: AlertType::Error,
            message,
            details,
        }
    }

    /// Create a new error alert without details
    pub fn error_simple(message: &'a str) -> Self {
        Self::error(message, "")
    }

    pub fn into_html(self) -> Markup {
        let (container_style, role) = match self.alert_type {
            AlertType::Success => (
                "flex items-start gap-3 p-4 mb-4 text-sm rounded-lg border \
                text-green-800 bg-green-50 border-green-300 \
                dark:bg-gray-800 dark:text-green-400 dark:border-green-800",
                "status",
            ),
            AlertType::Error => (
                "flex items-start gap-3 p-4 mb-4 text-sm rounded-lg border \
                text-red-800 bg-red-50 border-red-300 \
                dark:bg-gray-800 dark:text-red-400 dark:border-red-800",
                "alert",
            ),
        };

        html! {
            div class=(container_style) role=(role) data-alert-type=(self.alert_type.as_str())
            {
                div class="flex-1"
                {
                    p class="font-semibold" { (self.message) }

                    @if !self.details.is_empty() {
                        p { (self.details) }
                    }
                }

                button
                    type="button"
                    aria-label="Dismiss"
                    class="font-bold"
                    onclick="this.parentElement.remove()"
                {
                    "×"
                }
            }
        }
    }

    pub fn into_response(self, status_code: StatusCode) -> Response {
        (status_code, self.into_html()).into_response()
    }
}

impl AlertType {
    fn as_str(&self) -> &'static str {
        match self {
            AlertType::Success => "success",
            AlertType::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use scraper::{Html, Selector};

    use crate::{
        alert::Alert,
        test_utils::parse_html_fragment,
    };

    #[test]
    fn renders_message_and_details() {
        let markup = Alert::error("Invalid amount", "Enter a number.").into_html();
        let html = Html::parse_fragment(&markup.into_string());

        let alert = html
            .select(&Selector::parse("div[role=alert]").unwrap())
            .next()
            .expect("no alert found");
        let text = alert.text().collect::<String>();
        assert!(text.contains("Invalid amount"));
        assert!(text.contains("Enter a number."));
    }

    #[tokio::test]
    async fn success_response_uses_status_role() {
        let response = Alert::success("Saved", "").into_response(StatusCode::OK);

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let status = html
            .select(&Selector::parse("div[role=status]").unwrap())
            .next()
            .expect("no success alert found");
        assert_eq!(status.value().attr("data-alert-type"), Some("success"));
    }
}
