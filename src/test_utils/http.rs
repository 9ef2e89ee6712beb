use axum::{body::Body, http::StatusCode, response::Response};

#[track_caller]
pub(crate) fn assert_status_ok(response: &Response<Body>) {
    assert_eq!(response.status(), StatusCode::OK);
}

/// Check that an htmx response redirects the browser to `endpoint`.
#[track_caller]
pub(crate) fn assert_hx_redirect(response: &Response<Body>, endpoint: &str) {
    let location = response
        .headers()
        .get("hx-redirect")
        .and_then(|value| value.to_str().ok());

    assert_eq!(location, Some(endpoint), "want HX-Redirect to {endpoint}");
}
