//! Middleware for logging requests and responses.

use std::fmt::Debug;

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{
        HeaderMap, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

/// The number of characters of a body that are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest text request body read into memory for logging.
///
/// Form posts are far smaller than this, larger text bodies are rejected.
const MAX_BUFFERED_REQUEST_BYTES: usize = 64 * 1024;

const REDACTED_FIELDS: [&str; 2] = ["password", "confirm_password"];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] characters, it is
/// truncated and the full body is logged at the `debug` level.
///
/// Password fields in urlencoded forms are redacted. Multipart and binary
/// bodies are never buffered: they are summarised by their content type and
/// length, and streamed on to the handler untouched.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let body = if is_text(content_type(&parts.headers)) {
        let bytes = match axum::body::to_bytes(body, MAX_BUFFERED_REQUEST_BYTES).await {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::error!("could not read request body: {error}");
                return StatusCode::PAYLOAD_TOO_LARGE.into_response();
            }
        };

        log_message("Received request", &parts, &body_text(&parts.headers, &bytes));
        Body::from(bytes)
    } else {
        log_message("Received request", &parts, &body_summary(&parts.headers));
        body
    };

    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();

    if !is_text(content_type(&parts.headers)) {
        log_message("Sending response", &parts, &body_summary(&parts.headers));
        return Response::from_parts(parts, body);
    }

    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    log_message("Sending response", &parts, &body_text(&parts.headers, &bytes));

    Response::from_parts(parts, Body::from(bytes))
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn is_text(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.starts_with("text/")
        || content_type.contains("json")
        || content_type.contains("javascript")
        || content_type.starts_with("application/x-www-form-urlencoded")
}

/// Describe a body that is passed on without being read.
fn body_summary(headers: &HeaderMap) -> String {
    let content_type = content_type(headers);

    match headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
    {
        Some(length) => format!("<{length} bytes of {content_type}>"),
        None => format!("<streamed {content_type}>"),
    }
}

/// The loggable form of a text body.
fn body_text(headers: &HeaderMap, bytes: &Bytes) -> String {
    let text = String::from_utf8_lossy(bytes);

    if content_type(headers).starts_with("application/x-www-form-urlencoded") {
        redact_passwords(&text)
    } else {
        text.into_owned()
    }
}

fn redact_passwords(form_text: &str) -> String {
    form_text
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if REDACTED_FIELDS.contains(&name) => format!("{name}=********"),
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn log_message(message: &str, parts: &impl Debug, body: &str) {
    if body.chars().count() > LOG_BODY_LENGTH_LIMIT {
        let truncated: String = body.chars().take(LOG_BODY_LENGTH_LIMIT).collect();
        tracing::info!("{message}: {parts:#?}\nbody: {truncated}...");
        tracing::debug!("Full body: {body:?}");
    } else {
        tracing::info!("{message}: {parts:#?}\nbody: {body:?}");
    }
}
