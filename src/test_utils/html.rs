use axum::{body::Body, response::Response};
use scraper::Html;

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not read response body");

    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse a full page response, e.g. from a `get_*_page` handler.
pub(crate) async fn parse_html_document(response: Response<Body>) -> Html {
    Html::parse_document(&body_text(response).await)
}

/// Parse an htmx fragment response, e.g. a form swapped back with errors.
pub(crate) async fn parse_html_fragment(response: Response<Body>) -> Html {
    Html::parse_fragment(&body_text(response).await)
}

#[track_caller]
pub(crate) fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "want markup that parses cleanly, got errors: {:?}",
        html.errors
    );
}
