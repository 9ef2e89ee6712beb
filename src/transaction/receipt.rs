//! Receipt images attached to transactions.
//!
//! Receipts are stored under `receipts/{user_id}/{timestamp_millis}_{file_name}`
//! and are only ever served to the user that uploaded them.

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};

use crate::{
    AppState, Error,
    store::{BlobStore, FileBlobStore},
    user::UserID,
};

/// The blob path prefix shared by all of a user's receipts.
pub fn receipt_prefix(user_id: UserID) -> String {
    format!("receipts/{user_id}")
}

/// Replace every character outside `[A-Za-z0-9.]` with an underscore.
pub fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// The blob path for a receipt uploaded by `user_id` at `timestamp_millis`.
pub fn receipt_path(user_id: UserID, timestamp_millis: i128, file_name: &str) -> String {
    format!(
        "{}/{timestamp_millis}_{}",
        receipt_prefix(user_id),
        sanitize_file_name(file_name)
    )
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// The state needed to serve receipts.
#[derive(Debug, Clone)]
pub struct ReceiptState {
    pub blobs: FileBlobStore,
}

impl FromRef<AppState> for ReceiptState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            blobs: state.blobs.clone(),
        }
    }
}

/// Serve a receipt image to its owner.
///
/// Receipts belonging to other users are reported as not found.
pub async fn get_receipt(
    State(state): State<ReceiptState>,
    Extension(user_id): Extension<UserID>,
    Path((owner_id, file_name)): Path<(String, String)>,
) -> Response {
    if owner_id != user_id.to_string() {
        tracing::warn!("user {user_id} requested a receipt belonging to {owner_id}");
        return Error::NotFound.into_response();
    }

    let path = format!("{}/{file_name}", receipt_prefix(user_id));

    match state.blobs.read(&path).await {
        Ok(bytes) => ([(CONTENT_TYPE, content_type_for(&file_name))], bytes).into_response(),
        Err(Error::NotFound) | Err(Error::InvalidBlobPath(_)) => Error::NotFound.into_response(),
        Err(error) => {
            tracing::error!("could not read receipt {path}: {error}");
            error.into_response()
        }
    }
}
